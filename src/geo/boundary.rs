//! GeoJSON boundary collections.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::coerce::display_string;
use crate::error::{ChartError, Result};

/// A linear ring of `(lon, lat)` positions.
pub type Ring = Vec<(f64, f64)>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

/// Positions keep any trailing altitude; only the first two ordinates are used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

impl Feature {
    /// `properties.name`, then `properties.NAME`, else empty.
    pub fn name(&self) -> String {
        let Some(props) = &self.properties else {
            return String::new();
        };
        ["name", "NAME"]
            .iter()
            .filter_map(|k| props.get(*k))
            .find(|v| !v.is_null())
            .map(display_string)
            .unwrap_or_default()
    }

    /// Polygons as lists of rings, outer ring first.
    pub fn polygons(&self) -> Vec<Vec<Ring>> {
        match &self.geometry {
            Some(Geometry::Polygon { coordinates }) => vec![rings(coordinates)],
            Some(Geometry::MultiPolygon { coordinates }) => coordinates.iter().map(|p| rings(p)).collect(),
            Some(Geometry::Unsupported) | None => Vec::new(),
        }
    }
}

fn rings(polygon: &[Vec<Vec<f64>>]) -> Vec<Ring> {
    polygon
        .iter()
        .map(|ring| {
            ring.iter()
                .filter_map(|pos| match pos.as_slice() {
                    [lon, lat, ..] => Some((*lon, *lat)),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

/// Parse a fetched body as a feature collection.
pub fn parse_boundaries(url: &str, body: &str) -> Result<FeatureCollection> {
    serde_json::from_str(body).map_err(|source| ChartError::BoundaryFormat {
        url: url.to_string(),
        source,
    })
}
