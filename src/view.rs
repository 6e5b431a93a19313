//! Stateful host for one chart: owns the container, re-renders on every
//! change and matches boundary deliveries to the spec that asked for them.

use tracing::{debug, warn};

use crate::container::{Container, Placeholder};
use crate::dispatch::{self, RenderStatus};
use crate::error::Result;
use crate::geo::boundary::FeatureCollection;
use crate::geo::fetch::{load_boundaries, BoundaryFetcher, BoundaryRequest, BoundarySource};
use crate::spec::ChartSpec;
use crate::table::TableView;

/// What happened to a boundary delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    /// The token belongs to a request that has since been superseded.
    Stale,
    /// The fetch failed; the loading placeholder stays up.
    Failed,
}

#[derive(Debug, Default)]
pub struct ChartView {
    spec: Option<ChartSpec>,
    compact: bool,
    container: Container,
    next_token: u64,
    pending: Option<BoundaryRequest>,
    /// Last boundaries received, keyed by URL.
    boundaries: Option<(String, FeatureCollection)>,
}

impl ChartView {
    pub fn new(compact: bool, width_hint: Option<u32>) -> Self {
        ChartView {
            compact,
            container: Container::new(width_hint),
            ..Default::default()
        }
    }

    pub fn spec(&self) -> Option<&ChartSpec> {
        self.spec.as_ref()
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }

    /// Interactive table state, for paging and header clicks.
    pub fn table_mut(&mut self) -> Option<&mut TableView> {
        self.container.table_mut()
    }

    /// The boundary fetch this view is waiting on, if any.
    pub fn pending(&self) -> Option<&BoundaryRequest> {
        self.pending.as_ref()
    }

    /// Replace the spec and redraw from scratch.
    pub fn set_spec(&mut self, spec: ChartSpec) -> Option<BoundaryRequest> {
        self.spec = Some(spec);
        self.rerender()
    }

    pub fn set_compact(&mut self, compact: bool) -> Option<BoundaryRequest> {
        self.compact = compact;
        self.rerender()
    }

    pub fn resize(&mut self, width_hint: Option<u32>) -> Option<BoundaryRequest> {
        self.container.set_width_hint(width_hint);
        self.rerender()
    }

    /// Drop the spec and everything drawn for it. Outstanding fetches become
    /// stale.
    pub fn teardown(&mut self) {
        self.spec = None;
        self.pending = None;
        self.container.clear();
    }

    fn rerender(&mut self) -> Option<BoundaryRequest> {
        self.pending = None;
        let Some(spec) = &self.spec else {
            self.container.clear();
            return None;
        };

        match dispatch::render(spec, self.compact, &mut self.container) {
            RenderStatus::Complete => None,
            RenderStatus::AwaitingBoundaries { url } => {
                if let Some((cached_url, boundaries)) = &self.boundaries {
                    if *cached_url == url {
                        dispatch::render_with_boundaries(spec, self.compact, boundaries, &mut self.container);
                        return None;
                    }
                }
                self.next_token += 1;
                let request = BoundaryRequest {
                    token: self.next_token,
                    url,
                };
                debug!(token = request.token, url = %request.url, "Boundary fetch requested");
                self.pending = Some(request.clone());
                Some(request)
            }
        }
    }

    /// Hand a finished fetch to the view. Only the current request's token is
    /// accepted, whatever order fetches finish in.
    pub fn deliver(&mut self, token: u64, result: Result<FeatureCollection>) -> Delivery {
        let Some(request) = self.pending.as_ref().filter(|r| r.token == token) else {
            debug!(token, "Discarding stale boundary delivery");
            return Delivery::Stale;
        };
        let url = request.url.clone();
        self.pending = None;

        let boundaries = match result {
            Ok(boundaries) => boundaries,
            Err(e) => {
                warn!(url = %url, "Boundary fetch failed: {e}");
                return Delivery::Failed;
            }
        };

        if let Some(spec) = &self.spec {
            dispatch::render_with_boundaries(spec, self.compact, &boundaries, &mut self.container);
        }
        self.boundaries = Some((url, boundaries));
        Delivery::Applied
    }

    /// Fetch the pending boundaries on the calling thread.
    pub fn load_boundaries(&mut self, source: &dyn BoundarySource) -> Option<Delivery> {
        let request = self.pending.clone()?;
        let result = load_boundaries(source, &request.url);
        Some(self.deliver(request.token, result))
    }

    /// Start the pending fetch in the background.
    pub fn request_boundaries(&self, fetcher: &BoundaryFetcher) -> bool {
        match &self.pending {
            Some(request) => {
                fetcher.spawn(request.clone());
                true
            }
            None => false,
        }
    }

    /// Apply whatever the fetcher has finished, without blocking.
    pub fn pump(&mut self, fetcher: &BoundaryFetcher) -> Vec<Delivery> {
        let mut outcomes = Vec::new();
        while let Some(delivery) = fetcher.try_recv() {
            outcomes.push(self.deliver(delivery.token, delivery.result));
        }
        outcomes
    }

    /// True while the loading placeholder is up.
    pub fn is_loading(&self) -> bool {
        self.container.placeholder() == Some(Placeholder::LoadingBoundaries)
    }
}
