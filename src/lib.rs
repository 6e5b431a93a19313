// Library exports for chartspec

pub mod artifact;
pub mod canvas;
pub mod coerce;
pub mod container;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod geo;
pub mod plot;
pub mod scene;
pub mod spec;
pub mod table;
pub mod theme;
pub mod view;

pub use container::{Container, Output, Placeholder};
pub use dispatch::{render, route, RenderStatus, Route};
pub use error::{ChartError, Result};
pub use spec::{ChartKind, ChartSpec, GeoKind, GeoSpec, Row, SortOrder, SortSpec};
pub use view::{ChartView, Delivery};

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use geo::fetch::{BoundarySource, DefaultBoundarySource, DEFAULT_FETCH_TIMEOUT_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "svg")]
    #[default]
    Svg,
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "text")]
    Text,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    /// Width of the host area; full-mode plots and maps use it when the spec
    /// has no width.
    #[serde(default)]
    pub container_width: Option<u32>,
    #[serde(default)]
    pub compact: bool,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Fetch choropleth boundaries. When off, choropleths stay on their
    /// loading placeholder.
    #[serde(default = "default_fetch")]
    pub fetch_boundaries: bool,
    /// Directory that non-HTTP boundary URLs resolve against. Without it
    /// only http(s) URLs are fetched.
    #[serde(default)]
    pub boundaries_dir: Option<PathBuf>,
}

fn default_fetch_timeout() -> u64 { DEFAULT_FETCH_TIMEOUT_SECS }
fn default_fetch() -> bool { true }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            container_width: None,
            compact: false,
            format: OutputFormat::Svg,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            fetch_boundaries: true,
            boundaries_dir: None,
        }
    }
}

impl RenderOptions {
    pub fn boundary_source(&self) -> DefaultBoundarySource {
        let source = DefaultBoundarySource::with_timeout(Duration::from_secs(self.fetch_timeout_secs));
        match &self.boundaries_dir {
            Some(dir) => source.with_boundaries_dir(dir),
            None => source,
        }
    }
}

/// Render a spec to completion on the calling thread, fetching choropleth
/// boundaries from `source` when one is given.
pub fn render_spec(spec: ChartSpec, options: &RenderOptions, source: Option<&dyn BoundarySource>) -> ChartView {
    let mut view = ChartView::new(options.compact, options.container_width);
    view.set_spec(spec);
    if let Some(source) = source {
        view.load_boundaries(source);
    }
    view
}
