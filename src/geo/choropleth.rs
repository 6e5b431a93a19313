use std::collections::HashMap;

use plotters::style::RGBAColor;

use crate::coerce::{self, display_string};
use crate::geo::boundary::{FeatureCollection, Ring};
use crate::spec::{ChartSpec, Row};

pub const REGION_FILL_OPACITY: f64 = 0.8;
pub const REGION_STROKE: RGBAColor = RGBAColor(0x27, 0x27, 0x2A, 1.0);
pub const REGION_STROKE_WEIGHT: f64 = 1.0;

/// Region values keyed by display name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueLookup {
    values: HashMap<String, f64>,
}

impl ValueLookup {
    /// Key each row by `x` (default `name`), falling back to `label`
    /// (default `id`). Rows with an empty key or a non-numeric value are
    /// skipped; a later row overwrites an earlier one with the same key.
    pub fn from_rows(spec: &ChartSpec, rows: &[Row], value_field: &str) -> Self {
        let key_field = spec.x.as_deref().unwrap_or("name");
        let fallback_field = spec.label.as_deref().unwrap_or("id");

        let mut values = HashMap::new();
        for row in rows {
            let key = [key_field, fallback_field]
                .iter()
                .filter_map(|f| row.get(*f))
                .find(|v| !v.is_null())
                .map(display_string)
                .unwrap_or_default();
            if key.is_empty() {
                continue;
            }
            if let Some(value) = coerce::field_number(row, value_field) {
                values.insert(key, value);
            }
        }
        ValueLookup { values }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest value, never below 1.
    pub fn max_value(&self) -> f64 {
        self.values.values().copied().fold(1.0, f64::max)
    }
}

pub fn intensity(value: f64, max_value: f64) -> f64 {
    (value / max_value).clamp(0.0, 1.0)
}

/// Cyan ramp from faint to strong.
pub fn region_fill(intensity: f64) -> RGBAColor {
    RGBAColor(6, 182, 212, 0.15 + 0.7 * intensity)
}

/// A styled boundary feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub value: f64,
    pub intensity: f64,
    pub fill: RGBAColor,
    pub polygons: Vec<Vec<Ring>>,
}

/// Style every feature; unmatched features get value 0.
pub fn style_regions(boundaries: &FeatureCollection, lookup: &ValueLookup) -> Vec<Region> {
    let max_value = lookup.max_value();
    boundaries
        .features
        .iter()
        .map(|feature| {
            let name = feature.name();
            let value = lookup.get(&name).unwrap_or(0.0);
            let intensity = intensity(value, max_value);
            Region {
                value,
                intensity,
                fill: region_fill(intensity),
                polygons: feature.polygons(),
                name,
            }
        })
        .collect()
}
