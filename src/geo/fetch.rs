//! Boundary retrieval for choropleth maps.
//!
//! Fetches run off the render path. Each request carries the token the view
//! issued for it so a late answer for a replaced spec can be recognized and
//! dropped.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ChartError, Result};
use crate::geo::boundary::{parse_boundaries, FeatureCollection};

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Where boundary documents come from.
pub trait BoundarySource: Send + Sync {
    /// Return the raw document body at `url`.
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP(S) source.
#[derive(Debug, Clone)]
pub struct HttpBoundarySource {
    timeout: Duration,
}

impl HttpBoundarySource {
    pub fn new(timeout: Duration) -> Self {
        HttpBoundarySource { timeout }
    }
}

impl Default for HttpBoundarySource {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }
}

impl BoundarySource for HttpBoundarySource {
    fn fetch(&self, url: &str) -> Result<String> {
        let fail = |reason: String| ChartError::BoundaryFetch {
            url: url.to_string(),
            reason,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| fail(format!("failed to create HTTP client: {e}")))?;

        let response = client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                fail("request timed out".to_string())
            } else if e.is_connect() {
                fail("connection failed".to_string())
            } else {
                fail(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {status}")));
        }

        response
            .text()
            .map_err(|e| fail(format!("failed to read response: {e}")))
    }
}

/// Local files under one directory, addressed by relative path or `file://`
/// URL. Paths resolving outside the directory are refused.
#[derive(Debug, Clone)]
pub struct FileBoundarySource {
    root: PathBuf,
}

impl FileBoundarySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileBoundarySource { root: root.into() }
    }
}

impl BoundarySource for FileBoundarySource {
    fn fetch(&self, url: &str) -> Result<String> {
        let fail = |reason: String| ChartError::BoundaryFetch {
            url: url.to_string(),
            reason,
        };

        let requested = Path::new(url.strip_prefix("file://").unwrap_or(url));
        let root = fs::canonicalize(&self.root)
            .map_err(|e| fail(format!("boundaries directory {}: {e}", self.root.display())))?;
        let resolved = fs::canonicalize(root.join(requested)).map_err(|e| fail(e.to_string()))?;
        if !resolved.starts_with(&root) {
            return Err(fail(format!("path is outside {}", root.display())));
        }
        fs::read_to_string(&resolved).map_err(|e| fail(e.to_string()))
    }
}

/// HTTP for `http(s)://` URLs. Other URLs are read from the boundaries
/// directory when one is configured and refused otherwise.
#[derive(Debug, Clone, Default)]
pub struct DefaultBoundarySource {
    http: HttpBoundarySource,
    file: Option<FileBoundarySource>,
}

impl DefaultBoundarySource {
    pub fn with_timeout(timeout: Duration) -> Self {
        DefaultBoundarySource {
            http: HttpBoundarySource::new(timeout),
            file: None,
        }
    }

    pub fn with_boundaries_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.file = Some(FileBoundarySource::new(dir));
        self
    }
}

impl BoundarySource for DefaultBoundarySource {
    fn fetch(&self, url: &str) -> Result<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.http.fetch(url);
        }
        match &self.file {
            Some(file) => file.fetch(url),
            None => Err(ChartError::BoundaryFetch {
                url: url.to_string(),
                reason: "only http(s) URLs are fetched without a boundaries directory".to_string(),
            }),
        }
    }
}

/// Fetch and parse in one step.
pub fn load_boundaries(source: &dyn BoundarySource, url: &str) -> Result<FeatureCollection> {
    let body = source.fetch(url)?;
    let boundaries = parse_boundaries(url, &body)?;
    debug!(url, features = boundaries.features.len(), "Boundaries loaded");
    Ok(boundaries)
}

/// A boundary fetch the view is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryRequest {
    pub token: u64,
    pub url: String,
}

#[derive(Debug)]
pub struct BoundaryDelivery {
    pub token: u64,
    pub result: Result<FeatureCollection>,
}

/// Runs each request on its own thread and reports back over a channel.
pub struct BoundaryFetcher {
    source: Arc<dyn BoundarySource>,
    tx: Sender<BoundaryDelivery>,
    rx: Receiver<BoundaryDelivery>,
}

impl BoundaryFetcher {
    pub fn new(source: Arc<dyn BoundarySource>) -> Self {
        let (tx, rx) = mpsc::channel();
        BoundaryFetcher { source, tx, rx }
    }

    pub fn spawn(&self, request: BoundaryRequest) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = load_boundaries(source.as_ref(), &request.url);
            if let Err(e) = &result {
                warn!(token = request.token, "Boundary fetch failed: {e}");
            }
            // The receiver only goes away with the fetcher itself.
            let _ = tx.send(BoundaryDelivery {
                token: request.token,
                result,
            });
        })
    }

    /// Next finished fetch, if any, without blocking.
    pub fn try_recv(&self) -> Option<BoundaryDelivery> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<BoundaryDelivery> {
        match self.rx.recv_timeout(timeout) {
            Ok(delivery) => Some(delivery),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
