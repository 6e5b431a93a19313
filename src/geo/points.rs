use crate::coerce::{self, display_string};
use crate::spec::{GeoSpec, Row};

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    /// `(field, value)` pairs in row order; absent in compact mode.
    pub popup: Option<Vec<(String, String)>>,
}

impl Marker {
    pub fn popup_text(&self) -> Option<String> {
        self.popup.as_ref().map(|fields| {
            fields
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join("\n")
        })
    }
}

/// One marker per row with numeric lat/lon; other rows are skipped.
pub fn markers(rows: &[Row], geo: &GeoSpec, compact: bool) -> Vec<Marker> {
    rows.iter()
        .filter_map(|row| {
            let lat = coerce::field_number(row, geo.lat_field())?;
            let lon = coerce::field_number(row, geo.lon_field())?;
            let popup = (!compact).then(|| {
                row.iter()
                    .map(|(k, v)| (k.clone(), display_string(v)))
                    .collect()
            });
            Some(Marker { lat, lon, popup })
        })
        .collect()
}
