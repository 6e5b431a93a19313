//! Dark theme and color handling.
//!
//! Every renderer draws with the same dark palette regardless of mark type;
//! only the font size changes between compact and full mode.

use plotters::style::RGBAColor;

/// Fill used when a spec gives no color encoding.
pub const DEFAULT_MARK_COLOR: RGBAColor = RGBAColor(0x73, 0x67, 0xF0, 1.0);

// === Theme ===

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// `None` is a transparent background.
    pub background: Option<RGBAColor>,
    pub text: RGBAColor,
    pub axis: RGBAColor,
    pub font_size: f64,
}

impl Theme {
    pub fn dark(compact: bool) -> Self {
        Theme {
            background: None,
            text: RGBAColor(0xCF, 0xD3, 0xEC, 1.0),
            axis: RGBAColor(0xCF, 0xD3, 0xEC, 0.4),
            font_size: if compact { 9.0 } else { 11.0 },
        }
    }
}

/// Opaque fill for raster output, where transparency is not available.
pub const RASTER_BACKGROUND: RGBAColor = RGBAColor(0x0B, 0x0D, 0x17, 1.0);

// === Color Parsing ===

/// Parse a CSS-ish color: `#RGB`, `#RRGGBB`, `#RRGGBBAA`, `rgb(...)`,
/// `rgba(...)` or a basic named color.
pub fn parse_color(color_str: &str) -> Option<RGBAColor> {
    let color_str = color_str.trim();

    if color_str.starts_with('#') {
        return parse_hex_color(color_str);
    }

    let lower = color_str.to_lowercase();
    if lower.starts_with("rgb") {
        return parse_rgb_function(&lower);
    }

    let (r, g, b) = match lower.as_str() {
        "white" => (255, 255, 255),
        "black" => (0, 0, 0),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "cyan" => (0, 255, 255),
        "magenta" => (255, 0, 255),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "pink" => (255, 192, 203),
        "brown" => (139, 69, 19),
        "gray" | "grey" => (128, 128, 128),
        "darkgray" | "darkgrey" => (64, 64, 64),
        "lightgray" | "lightgrey" => (192, 192, 192),
        "steelblue" => (70, 130, 180),
        "teal" => (0, 128, 128),
        _ => return None,
    };
    Some(RGBAColor(r, g, b, 1.0))
}

/// Parse hex color (#RGB, #RRGGBB or #RRGGBBAA)
fn parse_hex_color(hex: &str) -> Option<RGBAColor> {
    let hex = hex.trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some(RGBAColor(r, g, b, 1.0))
        }
        6 | 8 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            let a = if hex.len() == 8 {
                u8::from_str_radix(&hex[6..8], 16).ok()? as f64 / 255.0
            } else {
                1.0
            };
            Some(RGBAColor(r, g, b, a))
        }
        _ => None,
    }
}

/// Parse `rgb(r, g, b)` / `rgba(r, g, b, a)`
fn parse_rgb_function(s: &str) -> Option<RGBAColor> {
    let open = s.find('(')?;
    let inner = s[open + 1..].strip_suffix(')')?;
    let parts: Vec<f64> = inner
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;

    let channel = |v: f64| v.clamp(0.0, 255.0).round() as u8;
    match parts.as_slice() {
        [r, g, b] => Some(RGBAColor(channel(*r), channel(*g), channel(*b), 1.0)),
        [r, g, b, a] => Some(RGBAColor(channel(*r), channel(*g), channel(*b), a.clamp(0.0, 1.0))),
        _ => None,
    }
}

pub fn with_alpha(color: RGBAColor, alpha: f64) -> RGBAColor {
    RGBAColor(color.0, color.1, color.2, alpha.clamp(0.0, 1.0))
}

/// CSS text for a color, as carried on map regions.
pub fn css_rgba(color: RGBAColor) -> String {
    format!("rgba({}, {}, {}, {})", color.0, color.1, color.2, round_alpha(color.3))
}

fn round_alpha(a: f64) -> f64 {
    (a * 1000.0).round() / 1000.0
}

// === Categorical Schemes ===

const OBSERVABLE10: [&str; 10] = [
    "#4269d0", "#efb118", "#ff725c", "#6cc5b0", "#3ca951", "#ff8ab7", "#a463f2", "#97bbf5",
    "#9c6b4e", "#9498a0",
];
const TABLEAU10: [&str; 10] = [
    "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];
const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];
const SET2: [&str; 8] = [
    "#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854", "#ffd92f", "#e5c494", "#b3b3b3",
];

/// Ordinal color assignment: each distinct key gets the next scheme color,
/// in first-seen order, cycling when the scheme runs out.
#[derive(Debug, Clone)]
pub struct ColorScale {
    palette: Vec<RGBAColor>,
    keys: Vec<String>,
}

impl ColorScale {
    /// Unknown scheme names use `observable10`.
    pub fn new(scheme: Option<&str>) -> Self {
        let names: &[&str] = match scheme.map(|s| s.to_lowercase()).as_deref() {
            Some("tableau10") => &TABLEAU10,
            Some("category10") => &CATEGORY10,
            Some("set2") => &SET2,
            _ => &OBSERVABLE10,
        };
        ColorScale {
            palette: names.iter().filter_map(|c| parse_color(c)).collect(),
            keys: Vec::new(),
        }
    }

    pub fn color_for(&mut self, key: &str) -> RGBAColor {
        let idx = match self.keys.iter().position(|k| k == key) {
            Some(idx) => idx,
            None => {
                self.keys.push(key.to_string());
                self.keys.len() - 1
            }
        };
        self.palette[idx % self.palette.len()]
    }

    /// Legend entries in assignment order.
    pub fn entries(&self) -> Vec<(String, RGBAColor)> {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), self.palette[i % self.palette.len()]))
            .collect()
    }
}
