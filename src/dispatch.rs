//! Chooses the renderer for a spec.

use tracing::{debug, warn};

use crate::container::Container;
use crate::geo::{self, boundary::FeatureCollection, GeoPlan};
use crate::plot;
use crate::spec::{ChartKind, ChartSpec};
use crate::table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Geo,
    Table,
    Plot,
}

/// Geo specs need a `geo` block; everything unrecognized goes to the plot
/// renderer.
pub fn route(spec: &ChartSpec) -> Route {
    match (&spec.chart_type, &spec.geo) {
        (ChartKind::Geo, Some(_)) => Route::Geo,
        (ChartKind::Table, _) => Route::Table,
        _ => Route::Plot,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStatus {
    Complete,
    /// A choropleth is showing its loading placeholder until boundaries from
    /// `url` arrive.
    AwaitingBoundaries { url: String },
}

/// Render `spec` into `container`. Never fails: problems end up as
/// placeholders in the container.
pub fn render(spec: &ChartSpec, compact: bool, container: &mut Container) -> RenderStatus {
    if !spec.is_current_version() {
        warn!(version = %spec.version, "Unknown chart spec version, rendering as version 1");
    }

    let route = route(spec);
    debug!(chart_type = spec.chart_type.as_str(), ?route, compact, rows = spec.data.len(), "Dispatching chart");

    match (route, &spec.geo) {
        (Route::Geo, Some(geo)) => match geo::render(spec, geo, compact, container) {
            Some(url) => RenderStatus::AwaitingBoundaries { url },
            None => RenderStatus::Complete,
        },
        (Route::Table, _) => {
            table::render(spec, compact, container);
            RenderStatus::Complete
        }
        _ => {
            plot::render(spec, compact, container);
            RenderStatus::Complete
        }
    }
}

/// Finish a choropleth render with fetched boundaries. Returns false when the
/// spec is not a choropleth.
pub fn render_with_boundaries(
    spec: &ChartSpec,
    compact: bool,
    boundaries: &FeatureCollection,
    container: &mut Container,
) -> bool {
    match (route(spec), &spec.geo) {
        (Route::Geo, Some(geo)) if matches!(geo::plan(geo), GeoPlan::Choropleth { .. }) => {
            geo::render_choropleth(spec, geo, boundaries, compact, container);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Placeholder;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> ChartSpec {
        ChartSpec::from_value(value).unwrap()
    }

    #[test]
    fn test_routes() {
        assert_eq!(route(&spec(json!({"chart_type": "geo", "data": [], "geo": {"type": "points"}}))), Route::Geo);
        assert_eq!(route(&spec(json!({"chart_type": "geo", "data": []}))), Route::Plot);
        assert_eq!(route(&spec(json!({"chart_type": "table", "data": []}))), Route::Table);
        assert_eq!(route(&spec(json!({"chart_type": "table", "data": [], "geo": {"type": "points"}}))), Route::Table);
        assert_eq!(route(&spec(json!({"chart_type": "sankey", "data": []}))), Route::Plot);
        assert_eq!(route(&spec(json!({"chart_type": "waffle", "data": []}))), Route::Plot);
    }

    #[test]
    fn test_geo_without_geo_block_renders_fallback_dots() {
        let s = spec(json!({
            "chart_type": "geo",
            "data": [{"lat": 40, "lon": -74}],
            "x": "lon", "y": "lat"
        }));
        let mut container = Container::new(None);
        assert_eq!(render(&s, true, &mut container), RenderStatus::Complete);
        let plot = container.plot().unwrap();
        assert!(plot.marks.fallback);
    }

    #[test]
    fn test_choropleth_status() {
        let s = spec(json!({
            "chart_type": "geo",
            "data": [],
            "geo": {"type": "choropleth", "geojson_url": "https://example.com/us.json"}
        }));
        let mut container = Container::new(None);
        assert_eq!(
            render(&s, false, &mut container),
            RenderStatus::AwaitingBoundaries {
                url: "https://example.com/us.json".to_string()
            }
        );
        assert_eq!(container.placeholder(), Some(Placeholder::LoadingBoundaries));

        let fc = FeatureCollection { features: Vec::new() };
        assert!(render_with_boundaries(&s, false, &fc, &mut container));
        assert!(container.map().is_some());
    }

    #[test]
    fn test_boundaries_ignored_for_other_specs() {
        let s = spec(json!({"chart_type": "table", "data": [{"a": 1}]}));
        let mut container = Container::new(None);
        render(&s, false, &mut container);
        let fc = FeatureCollection { features: Vec::new() };
        assert!(!render_with_boundaries(&s, false, &fc, &mut container));
        assert!(container.table().is_some());
    }

    #[test]
    fn test_future_version_still_renders() {
        let s = spec(json!({"version": "2", "chart_type": "table", "data": [{"a": 1}]}));
        let mut container = Container::new(None);
        render(&s, false, &mut container);
        assert!(container.table().is_some());
    }
}
