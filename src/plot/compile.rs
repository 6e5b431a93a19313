use anyhow::{bail, Result};
use plotters::style::RGBAColor;

use crate::plot::marks::{Mark, MarkSet, Series, XEncoding};
use crate::plot::scale::{continuous_domain, Scale};
use crate::plot::tree::TreeLayout;
use crate::scene::{DrawCommand, Scene, TextAnchor};
use crate::spec::ChartSpec;
use crate::theme::{with_alpha, Theme};

const BAND_PADDING: f64 = 0.1;
const TICK_LENGTH: f64 = 4.0;
const LEGEND_SWATCH: f64 = 10.0;
const BUMP_SEGMENTS: usize = 16;

// =============================================================================
// Frame
// =============================================================================

/// Pixel rectangle the marks are drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Frame {
    fn layout(set: &MarkSet, spec: &ChartSpec, width: u32, height: u32, compact: bool) -> Result<Self> {
        let is_tree = set.marks.iter().any(|m| matches!(m, Mark::Tree { .. }));
        let (mut left, mut top, mut right, bottom) = if compact {
            (4.0, 4.0, 4.0, 4.0)
        } else if set.axes {
            (48.0, 20.0, 20.0, 36.0)
        } else {
            (20.0, 20.0, 20.0, 20.0)
        };
        if is_tree {
            left += if compact { 10.0 } else { 40.0 };
            right += if compact { 40.0 } else { 90.0 };
        }
        if !compact {
            if !spec.title.is_empty() {
                top += 22.0;
            }
            if !set.legend.is_empty() {
                top += 18.0;
            }
        }

        let (width, height) = (width as f64, height as f64);
        let (left, right) = fit_margins(left, right, width);
        let (top, bottom) = fit_margins(top, bottom, height);
        let frame = Frame {
            left,
            top,
            right: width - right,
            bottom: height - bottom,
        };
        if frame.width() < 1.0 || frame.height() < 1.0 {
            bail!("Plot area is empty at {}x{}", width, height);
        }
        Ok(frame)
    }

    fn width(&self) -> f64 {
        self.right - self.left
    }

    fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Margins on one axis may take at most half of `extent`; larger margins
/// shrink proportionally.
fn fit_margins(start: f64, end: f64, extent: f64) -> (f64, f64) {
    let budget = extent / 2.0;
    let total = start + end;
    if total <= budget || total <= 0.0 {
        (start, end)
    } else {
        let k = budget / total;
        (start * k, end * k)
    }
}

// =============================================================================
// Scene compilation
// =============================================================================

/// Lay out data-space marks in pixel space.
pub fn compile_scene(
    set: &MarkSet,
    spec: &ChartSpec,
    width: u32,
    height: u32,
    compact: bool,
) -> Result<Scene> {
    let theme = Theme::dark(compact);
    let frame = Frame::layout(set, spec, width, height, compact)?;
    let mut scene = Scene::new(width, height, theme.background);

    let x = x_scale(set, &frame);
    let y = Scale::linear(
        continuous_domain(set.y_values(), set.y_zero),
        (frame.bottom, frame.top),
    );

    for mark in &set.marks {
        match mark {
            Mark::BarY(bars) => {
                let bw = x.bandwidth();
                for bar in bars {
                    let x0 = x.map(bar.x as f64);
                    scene.push(DrawCommand::DrawRect {
                        tl: (x0, y.map(bar.y0.max(bar.y1))),
                        br: (x0 + bw, y.map(bar.y0.min(bar.y1))),
                        fill: bar.color,
                    });
                }
            }
            Mark::RuleY(value) => {
                let py = y.map(*value);
                scene.push(DrawCommand::DrawLine {
                    points: vec![(frame.left, py), (frame.right, py)],
                    color: theme.text,
                    width: 1.0,
                });
            }
            Mark::Line { series, stroke_width } => {
                for s in series {
                    scene.push(DrawCommand::DrawLine {
                        points: pixel_points(s, &x, &y),
                        color: s.color,
                        width: *stroke_width,
                    });
                }
            }
            Mark::Area { series, fill_opacity } => {
                let (d0, d1) = y.domain;
                let base = y.map(0.0_f64.clamp(d0.min(d1), d0.max(d1)));
                for s in series {
                    let mut points = pixel_points(s, &x, &y);
                    let baseline: Vec<(f64, f64)> = points.iter().rev().map(|p| (p.0, base)).collect();
                    points.extend(baseline);
                    scene.push(DrawCommand::DrawPolygon {
                        points,
                        fill: with_alpha(s.color, *fill_opacity),
                        stroke: None,
                    });
                }
            }
            Mark::Dot(dots) => {
                for dot in dots {
                    scene.push(DrawCommand::DrawCircle {
                        center: (x.center(dot.x), y.map(dot.y)),
                        radius: dot.r,
                        fill: dot.color,
                        stroke: None,
                    });
                }
            }
            Mark::Waffle { unit, columns } => {
                let grid = WaffleGrid::new(&x, &y, *unit);
                for column in columns {
                    grid.push_cells(&mut scene, column.x, column.start, column.value, column.color);
                }
            }
            Mark::Tree { layout, color } => {
                compile_tree(&mut scene, layout, *color, &frame, &theme);
            }
        }
    }

    if !compact {
        if set.axes {
            compile_axes(&mut scene, spec, &x, &y, &frame, &theme);
        }
        compile_title_and_legend(&mut scene, set, spec, &theme);
    }

    Ok(scene)
}

fn x_scale(set: &MarkSet, frame: &Frame) -> Scale {
    let range = (frame.left, frame.right);
    match &set.x {
        XEncoding::Band(cats) => Scale::band(cats.clone(), range, BAND_PADDING),
        XEncoding::Point(cats) => Scale::point(cats.clone(), range),
        XEncoding::Continuous => Scale::linear(continuous_domain(set.x_values(), false), range),
        XEncoding::None => Scale::linear((0.0, 1.0), range),
    }
}

fn pixel_points(series: &Series, x: &Scale, y: &Scale) -> Vec<(f64, f64)> {
    series
        .points
        .iter()
        .map(|&(px, py)| (x.center(px), y.map(py)))
        .collect()
}

// =============================================================================
// Waffle
// =============================================================================

/// Square-ish cells filling each band bottom-up, `per_row` cells per row.
struct WaffleGrid<'a> {
    x: &'a Scale,
    y: &'a Scale,
    unit: f64,
    per_row: usize,
    cell_width: f64,
}

impl<'a> WaffleGrid<'a> {
    fn new(x: &'a Scale, y: &'a Scale, unit: f64) -> Self {
        let bandwidth = x.bandwidth();
        // Pixels per data unit vertically.
        let unit_height = (y.map(0.0) - y.map(unit)).abs().max(f64::EPSILON);
        let per_row = (bandwidth / unit_height).sqrt().round().clamp(1.0, 50.0) as usize;
        WaffleGrid {
            x,
            y,
            unit,
            per_row,
            cell_width: bandwidth / per_row as f64,
        }
    }

    fn push_cells(&self, scene: &mut Scene, category: usize, start: f64, value: f64, color: RGBAColor) {
        let from = start / self.unit;
        let to = (start + value) / self.unit;
        let band_x = self.x.map(category as f64);
        let row_value = self.per_row as f64 * self.unit;

        let mut k = from.floor();
        while k < to {
            let lo = k.max(from);
            let hi = (k + 1.0).min(to);
            let portion = hi - lo;
            if portion > 0.0 {
                let index = k as usize;
                let row = (index / self.per_row) as f64;
                let col = (index % self.per_row) as f64;
                let x0 = band_x + col * self.cell_width + (lo - k) * self.cell_width;
                let y_bottom = self.y.map(row * row_value);
                let y_top = self.y.map((row + 1.0) * row_value);
                scene.push(DrawCommand::DrawRect {
                    tl: (x0 + 0.5, y_top + 0.5),
                    br: (x0 + portion * self.cell_width - 0.5, y_bottom - 0.5),
                    fill: color,
                });
            }
            k += 1.0;
        }
    }
}

// =============================================================================
// Tree
// =============================================================================

fn compile_tree(scene: &mut Scene, layout: &TreeLayout, color: RGBAColor, frame: &Frame, theme: &Theme) {
    let position = |i: usize| {
        let node = &layout.nodes[i];
        (
            frame.left + node.depth * frame.width(),
            frame.top + node.breadth * frame.height(),
        )
    };

    let link_color = with_alpha(theme.text, 0.5);
    for &(parent, child) in &layout.links {
        scene.push(DrawCommand::DrawLine {
            points: bump_curve(position(parent), position(child)),
            color: link_color,
            width: 1.0,
        });
    }

    for (i, node) in layout.nodes.iter().enumerate() {
        let (px, py) = position(i);
        scene.push(DrawCommand::DrawCircle {
            center: (px, py),
            radius: 3.0,
            fill: if node.leaf { color } else { theme.text },
            stroke: None,
        });
        if node.name.is_empty() {
            continue;
        }
        let (dx, anchor) = if node.leaf {
            (6.0, TextAnchor::Start)
        } else {
            (-6.0, TextAnchor::End)
        };
        scene.push(DrawCommand::DrawText {
            pos: (px + dx, py),
            text: node.name.clone(),
            color: theme.text,
            size: theme.font_size,
            anchor,
        });
    }
}

/// Horizontal bump link: a cubic curve leaving and entering horizontally.
fn bump_curve(from: (f64, f64), to: (f64, f64)) -> Vec<(f64, f64)> {
    let mid_x = (from.0 + to.0) / 2.0;
    let (c1, c2) = ((mid_x, from.1), (mid_x, to.1));
    (0..=BUMP_SEGMENTS)
        .map(|i| {
            let t = i as f64 / BUMP_SEGMENTS as f64;
            let u = 1.0 - t;
            let a = u * u * u;
            let b = 3.0 * u * u * t;
            let c = 3.0 * u * t * t;
            let d = t * t * t;
            (
                a * from.0 + b * c1.0 + c * c2.0 + d * to.0,
                a * from.1 + b * c1.1 + c * c2.1 + d * to.1,
            )
        })
        .collect()
}

// =============================================================================
// Guides
// =============================================================================

fn compile_axes(scene: &mut Scene, spec: &ChartSpec, x: &Scale, y: &Scale, frame: &Frame, theme: &Theme) {
    scene.push(DrawCommand::DrawLine {
        points: vec![(frame.left, frame.bottom), (frame.right, frame.bottom)],
        color: theme.axis,
        width: 1.0,
    });
    let x_tick_count = ((frame.width() / 80.0) as usize).max(2);
    for (px, label) in x.ticks(x_tick_count, 40.0) {
        scene.push(DrawCommand::DrawLine {
            points: vec![(px, frame.bottom), (px, frame.bottom + TICK_LENGTH)],
            color: theme.axis,
            width: 1.0,
        });
        scene.push(text(theme, (px, frame.bottom + 14.0), label, TextAnchor::Middle));
    }

    let y_tick_count = ((frame.height() / 40.0) as usize).max(2);
    for (py, label) in y.ticks(y_tick_count, 0.0) {
        scene.push(DrawCommand::DrawLine {
            points: vec![(frame.left - TICK_LENGTH, py), (frame.left, py)],
            color: theme.axis,
            width: 1.0,
        });
        scene.push(text(theme, (frame.left - TICK_LENGTH - 2.0, py), label, TextAnchor::End));
    }

    let y_label = spec.y_label.as_deref().or(spec.y.as_deref()).unwrap_or_default();
    if !y_label.is_empty() {
        scene.push(text(theme, (4.0, frame.top - 10.0), format!("↑ {}", y_label), TextAnchor::Start));
    }
    let x_label = spec.x_label.as_deref().or(spec.x.as_deref()).unwrap_or_default();
    if !x_label.is_empty() {
        scene.push(text(theme, (frame.right, frame.bottom + 28.0), format!("{} →", x_label), TextAnchor::End));
    }
}

fn compile_title_and_legend(scene: &mut Scene, set: &MarkSet, spec: &ChartSpec, theme: &Theme) {
    let mut line_y = 14.0;
    if !spec.title.is_empty() {
        scene.push(DrawCommand::DrawText {
            pos: (8.0, line_y),
            text: spec.title.clone(),
            color: theme.text,
            size: theme.font_size + 3.0,
            anchor: TextAnchor::Start,
        });
        line_y += 22.0;
    }

    let mut cursor = 8.0;
    for (key, color) in &set.legend {
        scene.push(DrawCommand::DrawRect {
            tl: (cursor, line_y - LEGEND_SWATCH / 2.0),
            br: (cursor + LEGEND_SWATCH, line_y + LEGEND_SWATCH / 2.0),
            fill: *color,
        });
        cursor += LEGEND_SWATCH + 4.0;
        scene.push(text(theme, (cursor, line_y), key.clone(), TextAnchor::Start));
        // No text metrics without a font backend; estimate the label width.
        cursor += key.chars().count() as f64 * theme.font_size * 0.6 + 12.0;
    }
}

fn text(theme: &Theme, pos: (f64, f64), text: impl Into<String>, anchor: TextAnchor) -> DrawCommand {
    DrawCommand::DrawText {
        pos,
        text: text.into(),
        color: theme.text,
        size: theme.font_size,
        anchor,
    }
}

/// Text of every `DrawText` command in a scene, in draw order.
pub fn scene_text(scene: &Scene) -> Vec<&str> {
    scene
        .commands
        .iter()
        .filter_map(|c| match c {
            DrawCommand::DrawText { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::marks::build_marks;
    use serde_json::json;

    fn compile(value: serde_json::Value, width: u32, height: u32, compact: bool) -> Result<Scene> {
        let spec = ChartSpec::from_value(value).unwrap();
        let rows = spec.ordered_rows();
        let set = build_marks(&spec, &rows).unwrap();
        compile_scene(&set, &spec, width, height, compact)
    }

    fn rects(scene: &Scene) -> Vec<((f64, f64), (f64, f64))> {
        scene
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::DrawRect { tl, br, .. } => Some((*tl, *br)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_compact_bar_has_no_text() {
        let scene = compile(
            json!({
                "chart_type": "bar", "title": "Counts",
                "data": [{"d": "Mon", "n": 4}, {"d": "Tue", "n": 7}],
                "x": "d", "y": "n"
            }),
            200,
            120,
            true,
        )
        .unwrap();
        assert!(scene_text(&scene).is_empty());
        let bars = rects(&scene);
        assert_eq!(bars.len(), 2);
        // Taller value reaches higher on screen.
        assert!(bars[1].0 .1 < bars[0].0 .1);
        assert!(bars.iter().all(|(tl, br)| tl.0 >= 4.0 && br.0 <= 196.0));
    }

    #[test]
    fn test_full_mode_draws_title_and_axis_labels() {
        let scene = compile(
            json!({
                "chart_type": "line", "title": "Latency",
                "data": [{"t": 1, "ms": 20}, {"t": 2, "ms": 35}],
                "x": "t", "y": "ms", "y_label": "p95"
            }),
            600,
            400,
            false,
        )
        .unwrap();
        let texts = scene_text(&scene);
        assert!(texts.contains(&"Latency"));
        assert!(texts.contains(&"↑ p95"));
        assert!(texts.contains(&"t →"));
    }

    #[test]
    fn test_legend_entries_in_full_mode() {
        let scene = compile(
            json!({
                "chart_type": "dot",
                "data": [{"a": 1, "b": 1, "g": "x"}, {"a": 2, "b": 2, "g": "y"}],
                "x": "a", "y": "b", "color": "g"
            }),
            600,
            400,
            false,
        )
        .unwrap();
        let texts = scene_text(&scene);
        assert!(texts.contains(&"x") && texts.contains(&"y"));
    }

    #[test]
    fn test_narrow_surface_shrinks_margins() {
        let scene = compile(
            json!({"chart_type": "bar", "data": [{"a": "k", "b": 1}], "x": "a", "y": "b"}),
            40,
            30,
            false,
        )
        .unwrap();
        let bars = rects(&scene);
        assert_eq!(bars.len(), 1);
        let (tl, br) = bars[0];
        assert!(tl.0 >= 0.0 && br.0 <= 40.0);
        assert!(br.0 - tl.0 > 10.0);
    }

    #[test]
    fn test_degenerate_surface_is_an_error() {
        let result = compile(
            json!({"chart_type": "bar", "data": [{"a": "k", "b": 1}], "x": "a", "y": "b"}),
            1,
            1,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_waffle_cells_cover_value() {
        let scene = compile(
            json!({
                "chart_type": "waffle",
                "data": [{"k": "a", "n": 7.5}],
                "x": "k", "y": "n"
            }),
            200,
            120,
            true,
        )
        .unwrap();
        // Seven whole cells plus one partial cell.
        assert_eq!(rects(&scene).len(), 8);
    }

    #[test]
    fn test_tree_labels_and_links() {
        let scene = compile(
            json!({
                "chart_type": "tree",
                "data": [{"p": "org/eng"}, {"p": "org/ops"}],
                "x": "p"
            }),
            600,
            400,
            false,
        )
        .unwrap();
        let texts = scene_text(&scene);
        assert_eq!(texts, vec!["org", "eng", "ops"]);
        let links = scene
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawLine { .. }))
            .count();
        assert_eq!(links, 2);
    }

    #[test]
    fn test_bump_curve_endpoints() {
        let curve = bump_curve((0.0, 0.0), (10.0, 20.0));
        assert_eq!(curve.first(), Some(&(0.0, 0.0)));
        assert_eq!(curve.last(), Some(&(10.0, 20.0)));
        assert_eq!(curve.len(), BUMP_SEGMENTS + 1);
    }
}
