//! The chart specification contract.
//!
//! A `ChartSpec` is produced outside this crate (usually by an agent storing a
//! "chart" artifact) and consumed read-only by the renderers. Unknown chart
//! kinds and geo types are preserved instead of rejected so the renderers can
//! apply their fallbacks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce;
use crate::error::Result;

/// Version string written by current producers.
pub const CURRENT_VERSION: &str = "1";

/// One data row: field name to scalar. Key order is preserved.
pub type Row = serde_json::Map<String, Value>;

/// Default map center (continental US).
pub const DEFAULT_CENTER: [f64; 2] = [39.0, -98.0];
pub const DEFAULT_ZOOM: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(default = "default_version")]
    pub version: String,
    pub chart_type: ChartKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub data: Vec<Row>,

    // Encodings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    // Presentation overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoSpec>,
}

fn default_version() -> String {
    CURRENT_VERSION.to_string()
}

impl ChartSpec {
    /// Parse a spec from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// The version field is informational; anything but the current version
    /// still renders.
    pub fn is_current_version(&self) -> bool {
        self.version.trim() == CURRENT_VERSION
    }

    /// Rows in render order: a sorted view when `sort` is set, input order
    /// otherwise. The spec itself is never reordered.
    pub fn ordered_rows(&self) -> Vec<&Row> {
        match &self.sort {
            Some(sort) => coerce::sort_rows(&self.data, &sort.field, sort.order),
            None => self.data.iter().collect(),
        }
    }
}

/// Closed set of chart kinds, plus the fallback for anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartKind {
    Bar,
    Line,
    Area,
    Dot,
    Geo,
    Table,
    Waffle,
    Tree,
    Unknown(String),
}

impl ChartKind {
    pub fn as_str(&self) -> &str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Area => "area",
            ChartKind::Dot => "dot",
            ChartKind::Geo => "geo",
            ChartKind::Table => "table",
            ChartKind::Waffle => "waffle",
            ChartKind::Tree => "tree",
            ChartKind::Unknown(name) => name,
        }
    }
}

impl From<String> for ChartKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "bar" => ChartKind::Bar,
            "line" => ChartKind::Line,
            "area" => ChartKind::Area,
            "dot" => ChartKind::Dot,
            "geo" => ChartKind::Geo,
            "table" => ChartKind::Table,
            "waffle" => ChartKind::Waffle,
            "tree" => ChartKind::Tree,
            _ => ChartKind::Unknown(name),
        }
    }
}

impl From<ChartKind> for String {
    fn from(kind: ChartKind) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

// Producers only ever write "asc" or "desc"; anything that isn't "asc" sorts
// descending.
impl From<String> for SortOrder {
    fn from(order: String) -> Self {
        if order.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

impl From<SortOrder> for String {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => "asc".to_string(),
            SortOrder::Desc => "desc".to_string(),
        }
    }
}

/// Geographic sub-spec, only meaningful when `chart_type` is `geo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoSpec {
    #[serde(rename = "type")]
    pub kind: GeoKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geojson_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
}

impl GeoSpec {
    pub fn lat_field(&self) -> &str {
        self.lat_field.as_deref().unwrap_or("lat")
    }

    pub fn lon_field(&self) -> &str {
        self.lon_field.as_deref().unwrap_or("lon")
    }

    pub fn value_field(&self) -> &str {
        self.value_field.as_deref().unwrap_or("value")
    }

    pub fn center(&self) -> [f64; 2] {
        self.center.unwrap_or(DEFAULT_CENTER)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom.unwrap_or(DEFAULT_ZOOM)
    }

    /// Boundary URL, treating an empty string as absent.
    pub fn geojson_url(&self) -> Option<&str> {
        self.geojson_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GeoKind {
    Points,
    Choropleth,
    Unknown(String),
}

impl From<String> for GeoKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "points" => GeoKind::Points,
            "choropleth" => GeoKind::Choropleth,
            _ => GeoKind::Unknown(name),
        }
    }
}

impl From<GeoKind> for String {
    fn from(kind: GeoKind) -> Self {
        match kind {
            GeoKind::Points => "points".to_string(),
            GeoKind::Choropleth => "choropleth".to_string(),
            GeoKind::Unknown(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_bar_spec() {
        let spec = ChartSpec::from_json(
            r#"{
                "version": "1",
                "chart_type": "bar",
                "title": "Daily Active Agents",
                "data": [{"day": "Mon", "count": 4}, {"day": "Tue", "count": 7}],
                "x": "day",
                "y": "count"
            }"#,
        )
        .unwrap();

        assert_eq!(spec.chart_type, ChartKind::Bar);
        assert_eq!(spec.title, "Daily Active Agents");
        assert_eq!(spec.data.len(), 2);
        assert_eq!(spec.x.as_deref(), Some("day"));
        assert!(spec.is_current_version());
        assert!(spec.geo.is_none());
    }

    #[test]
    fn test_unknown_chart_kind_is_preserved() {
        let spec = ChartSpec::from_value(json!({
            "chart_type": "scatter3d",
            "data": []
        }))
        .unwrap();
        assert_eq!(spec.chart_type, ChartKind::Unknown("scatter3d".to_string()));
        assert_eq!(spec.chart_type.as_str(), "scatter3d");
        assert_eq!(spec.version, "1");
    }

    #[test]
    fn test_row_key_order_preserved() {
        let spec = ChartSpec::from_json(
            r#"{"chart_type": "table", "data": [{"zeta": 1, "alpha": 2, "mid": 3}]}"#,
        )
        .unwrap();
        let keys: Vec<&String> = spec.data[0].keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_geo_defaults() {
        let spec = ChartSpec::from_value(json!({
            "chart_type": "geo",
            "data": [],
            "geo": {"type": "points"}
        }))
        .unwrap();
        let geo = spec.geo.unwrap();
        assert_eq!(geo.kind, GeoKind::Points);
        assert_eq!(geo.lat_field(), "lat");
        assert_eq!(geo.lon_field(), "lon");
        assert_eq!(geo.value_field(), "value");
        assert_eq!(geo.center(), [39.0, -98.0]);
        assert_eq!(geo.zoom(), 4.0);
        assert!(geo.geojson_url().is_none());
    }

    #[test]
    fn test_unknown_geo_kind_and_blank_url() {
        let geo: GeoSpec =
            serde_json::from_value(json!({"type": "hexbin", "geojson_url": "  "})).unwrap();
        assert_eq!(geo.kind, GeoKind::Unknown("hexbin".to_string()));
        assert!(geo.geojson_url().is_none());
    }

    #[test]
    fn test_sort_order_parsing() {
        let sort: SortSpec = serde_json::from_value(json!({"field": "n", "order": "ASC"})).unwrap();
        assert_eq!(sort.order, SortOrder::Asc);
        let sort: SortSpec = serde_json::from_value(json!({"field": "n", "order": "desc"})).unwrap();
        assert_eq!(sort.order, SortOrder::Desc);
        let sort: SortSpec = serde_json::from_value(json!({"field": "n"})).unwrap();
        assert_eq!(sort.order, SortOrder::Asc);
    }

    #[test]
    fn test_ordered_rows_does_not_mutate_spec() {
        let spec = ChartSpec::from_value(json!({
            "chart_type": "bar",
            "data": [{"n": 1}, {"n": 3}, {"n": 2}],
            "sort": {"field": "n", "order": "desc"}
        }))
        .unwrap();
        let ordered: Vec<i64> = spec
            .ordered_rows()
            .iter()
            .map(|r| r["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ordered, vec![3, 2, 1]);
        assert_eq!(spec.data[0]["n"], json!(1));
    }

    #[test]
    fn test_serialize_round_trip_keeps_kind_names() {
        let spec = ChartSpec::from_value(json!({"chart_type": "waffle", "data": []})).unwrap();
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["chart_type"], json!("waffle"));
        assert!(value.get("geo").is_none());
    }
}
