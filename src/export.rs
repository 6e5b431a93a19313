// Encoding of rendered output for files and terminals

use anyhow::{Context, Result};
use tracing::warn;

use crate::coerce::number_string;
use crate::container::{Container, Output};
use crate::geo::MapView;
use crate::plot::{Mark, PlotOutput};
use crate::theme::css_rgba;
use crate::OutputFormat;

/// Encode whatever the container holds. Tables and placeholders only have a
/// text form; an empty container encodes to nothing.
pub fn encode(container: &Container, format: OutputFormat) -> Result<Vec<u8>> {
    let Some(output) = container.output() else {
        return Ok(Vec::new());
    };

    let bytes = match (output, format) {
        (Output::Plot(plot), OutputFormat::Svg) => plot.svg.clone().into_bytes(),
        (Output::Plot(plot), OutputFormat::Png) => plot.to_png().context("Failed to encode plot as PNG")?,
        (Output::Plot(plot), OutputFormat::Text) => describe_plot(plot).into_bytes(),
        (Output::Map(map), OutputFormat::Svg) => map.svg.clone().into_bytes(),
        (Output::Map(map), OutputFormat::Png) => map.to_png().context("Failed to encode map as PNG")?,
        (Output::Map(map), OutputFormat::Text) => describe_map(map).into_bytes(),
        (Output::Table(table), format) => {
            if format != OutputFormat::Text {
                warn!(?format, "Tables only have a text form");
            }
            table.render_text().into_bytes()
        }
        (Output::Placeholder(p), _) => p.message().as_bytes().to_vec(),
    };
    Ok(bytes)
}

/// One line per mark with the number of items it draws.
pub fn describe_plot(plot: &PlotOutput) -> String {
    let mut lines = vec![format!("plot {}x{}", plot.width, plot.height)];
    for mark in &plot.marks.marks {
        let detail = match mark {
            Mark::BarY(bars) => format!("{} bars", bars.len()),
            Mark::RuleY(y) => format!("y = {}", number_string(*y)),
            Mark::Line { series, .. } | Mark::Area { series, .. } => {
                let points: usize = series.iter().map(|s| s.points.len()).sum();
                format!("{} series, {} points", series.len(), points)
            }
            Mark::Dot(dots) => format!("{} dots", dots.len()),
            Mark::Waffle { unit, columns } => {
                format!("{} columns, {} per cell", columns.len(), number_string(*unit))
            }
            Mark::Tree { layout, .. } => format!("{} nodes", layout.nodes.len()),
        };
        lines.push(format!("{}: {}", mark.name(), detail));
    }
    if plot.marks.fallback {
        lines.push("(fallback)".to_string());
    }
    for (key, _) in &plot.marks.legend {
        lines.push(format!("legend: {key}"));
    }
    lines.join("\n")
}

pub fn describe_map(map: &MapView) -> String {
    let mut lines = vec![format!(
        "map {:?} {}x{} center [{}, {}] zoom {}",
        map.mode,
        map.width,
        map.height,
        number_string(map.center[0]),
        number_string(map.center[1]),
        number_string(map.zoom)
    )];
    for marker in &map.markers {
        lines.push(format!(
            "marker {}, {}",
            number_string(marker.lat),
            number_string(marker.lon)
        ));
        if let Some(popup) = marker.popup_text() {
            lines.extend(popup.lines().map(|l| format!("  {l}")));
        }
    }
    for region in &map.regions {
        lines.push(format!(
            "region {}: {} ({:.2}) {}",
            if region.name.is_empty() { "?" } else { region.name.as_str() },
            number_string(region.value),
            region.intensity,
            css_rgba(region.fill)
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Placeholder;
    use crate::dispatch;
    use crate::spec::ChartSpec;
    use serde_json::json;

    #[test]
    fn test_empty_container_encodes_nothing() {
        let container = Container::new(None);
        assert!(encode(&container, OutputFormat::Svg).unwrap().is_empty());
    }

    #[test]
    fn test_placeholder_text() {
        let mut container = Container::new(None);
        container.replace(Output::Placeholder(Placeholder::UnsupportedGeo));
        let bytes = encode(&container, OutputFormat::Png).unwrap();
        assert_eq!(bytes, b"Unsupported geo type");
    }

    #[test]
    fn test_describe_plot() {
        let spec = ChartSpec::from_value(json!({
            "chart_type": "bar",
            "data": [{"k": "a", "n": 1}, {"k": "b", "n": 2}],
            "x": "k", "y": "n"
        }))
        .unwrap();
        let mut container = Container::new(None);
        dispatch::render(&spec, true, &mut container);
        let text = String::from_utf8(encode(&container, OutputFormat::Text).unwrap()).unwrap();
        assert_eq!(text, "plot 200x120\nbarY: 2 bars\nruleY: y = 0");
    }

    #[test]
    fn test_describe_points_map() {
        let spec = ChartSpec::from_value(json!({
            "chart_type": "geo",
            "geo": {"type": "points"},
            "data": [{"lat": 40.5, "lon": -74, "city": "NYC"}]
        }))
        .unwrap();
        let mut container = Container::new(None);
        dispatch::render(&spec, false, &mut container);
        let text = describe_map(container.map().unwrap());
        assert!(text.starts_with("map Points 600x400 center [39, -98] zoom 4"));
        assert!(text.contains("marker 40.5, -74\n  lat: 40.5\n  lon: -74\n  city: NYC"));
    }
}
