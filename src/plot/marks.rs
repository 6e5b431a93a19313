use anyhow::{bail, Result};
use plotters::style::RGBAColor;

use crate::coerce::{self, display_string, is_absent};
use crate::plot::tree::{self, TreeLayout};
use crate::spec::{ChartKind, ChartSpec, Row};
use crate::theme::{parse_color, ColorScale, DEFAULT_MARK_COLOR};

pub const LINE_WIDTH: f64 = 2.0;
pub const AREA_FILL_OPACITY: f64 = 0.3;
pub const DOT_RADIUS: f64 = 3.0;
pub const TREE_DELIMITER: char = '/';

// =============================================================================
// Marks (data space)
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    BarY(Vec<Bar>),
    RuleY(f64),
    Line {
        series: Vec<Series>,
        stroke_width: f64,
    },
    Area {
        series: Vec<Series>,
        fill_opacity: f64,
    },
    Dot(Vec<Dot>),
    Waffle {
        /// Data value represented by one cell.
        unit: f64,
        columns: Vec<WaffleColumn>,
    },
    Tree {
        layout: TreeLayout,
        color: RGBAColor,
    },
}

impl Mark {
    pub fn name(&self) -> &'static str {
        match self {
            Mark::BarY(_) => "barY",
            Mark::RuleY(_) => "ruleY",
            Mark::Line { .. } => "line",
            Mark::Area { .. } => "area",
            Mark::Dot(_) => "dot",
            Mark::Waffle { .. } => "waffle",
            Mark::Tree { .. } => "tree",
        }
    }
}

/// One bar segment; `x` is a category index. Bars sharing a category stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub x: usize,
    pub y0: f64,
    pub y1: f64,
    pub color: RGBAColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub key: Option<String>,
    pub color: RGBAColor,
    /// (x, y) where x is a category index for ordinal encodings.
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dot {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub color: RGBAColor,
}

/// Cells for one category; `start` is the stacked offset in data units.
#[derive(Debug, Clone, PartialEq)]
pub struct WaffleColumn {
    pub x: usize,
    pub start: f64,
    pub value: f64,
    pub color: RGBAColor,
}

/// How rows are placed horizontally.
#[derive(Debug, Clone, PartialEq)]
pub enum XEncoding {
    Band(Vec<String>),
    Point(Vec<String>),
    Continuous,
    /// Marks that position themselves (tree).
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkSet {
    pub marks: Vec<Mark>,
    pub x: XEncoding,
    /// Include zero in the y domain (bars, areas, waffles).
    pub y_zero: bool,
    pub axes: bool,
    pub legend: Vec<(String, RGBAColor)>,
    /// True when the chart kind was not recognized and the dot fallback ran.
    pub fallback: bool,
}

impl MarkSet {
    fn new(marks: Vec<Mark>, x: XEncoding) -> Self {
        MarkSet {
            marks,
            x,
            y_zero: false,
            axes: true,
            legend: Vec::new(),
            fallback: false,
        }
    }

    /// Every y value the marks occupy, for the y domain.
    pub fn y_values(&self) -> Vec<f64> {
        let mut values = Vec::new();
        for mark in &self.marks {
            match mark {
                Mark::BarY(bars) => {
                    for b in bars {
                        values.push(b.y0);
                        values.push(b.y1);
                    }
                }
                Mark::RuleY(y) => values.push(*y),
                Mark::Line { series, .. } | Mark::Area { series, .. } => {
                    values.extend(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));
                }
                Mark::Dot(dots) => values.extend(dots.iter().map(|d| d.y)),
                Mark::Waffle { columns, .. } => {
                    values.extend(columns.iter().map(|c| c.start + c.value));
                }
                Mark::Tree { .. } => {}
            }
        }
        values
    }

    /// Continuous x values, when the x encoding is continuous.
    pub fn x_values(&self) -> Vec<f64> {
        let mut values = Vec::new();
        for mark in &self.marks {
            match mark {
                Mark::Line { series, .. } | Mark::Area { series, .. } => {
                    values.extend(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)));
                }
                Mark::Dot(dots) => values.extend(dots.iter().map(|d| d.x)),
                _ => {}
            }
        }
        values
    }
}

// =============================================================================
// Fill resolution
// =============================================================================

enum Fill {
    Constant(RGBAColor),
    Field { name: String, scale: ColorScale },
}

impl Fill {
    /// `color` names a field when any row has it; otherwise a parseable color
    /// literal is used as a constant.
    fn resolve(spec: &ChartSpec, rows: &[&Row]) -> Self {
        match &spec.color {
            None => Fill::Constant(DEFAULT_MARK_COLOR),
            Some(color) => {
                let is_field = rows.iter().any(|r| r.contains_key(color));
                match parse_color(color) {
                    Some(constant) if !is_field => Fill::Constant(constant),
                    _ => Fill::Field {
                        name: color.clone(),
                        scale: ColorScale::new(spec.color_scheme.as_deref()),
                    },
                }
            }
        }
    }

    fn key(&self, row: &Row) -> Option<String> {
        match self {
            Fill::Constant(_) => None,
            Fill::Field { name, .. } => row.get(name).filter(|v| !v.is_null()).map(display_string),
        }
    }

    fn color(&mut self, row: &Row) -> RGBAColor {
        let key = self.key(row);
        match self {
            Fill::Constant(c) => *c,
            Fill::Field { scale, .. } => match key {
                Some(k) => scale.color_for(&k),
                None => DEFAULT_MARK_COLOR,
            },
        }
    }

    fn legend(&self) -> Vec<(String, RGBAColor)> {
        match self {
            Fill::Constant(_) => Vec::new(),
            Fill::Field { scale, .. } => scale.entries(),
        }
    }
}

// =============================================================================
// Positional helpers
// =============================================================================

/// Ordinal categories in first-appearance order.
fn categories(rows: &[&Row], field: &str) -> Vec<String> {
    let mut cats: Vec<String> = Vec::new();
    for row in rows {
        if let Some(v) = row.get(field).filter(|v| !v.is_null()) {
            let key = display_string(v);
            if !cats.contains(&key) {
                cats.push(key);
            }
        }
    }
    cats
}

fn category_index(cats: &[String], row: &Row, field: &str) -> Option<usize> {
    let v = row.get(field).filter(|v| !v.is_null())?;
    let key = display_string(v);
    cats.iter().position(|c| *c == key)
}

/// Continuous when every present x value is numeric, ordinal otherwise.
fn x_encoding(rows: &[&Row], field: &str) -> XEncoding {
    let mut any = false;
    for row in rows {
        let value = row.get(field);
        if is_absent(value) {
            continue;
        }
        if coerce::to_number(value).is_none() {
            return XEncoding::Point(categories(rows, field));
        }
        any = true;
    }
    if any {
        XEncoding::Continuous
    } else {
        XEncoding::Point(Vec::new())
    }
}

fn x_position(encoding: &XEncoding, row: &Row, field: &str) -> Option<f64> {
    match encoding {
        XEncoding::Continuous => coerce::field_number(row, field),
        XEncoding::Band(cats) | XEncoding::Point(cats) => {
            category_index(cats, row, field).map(|i| i as f64)
        }
        XEncoding::None => None,
    }
}

fn require<'a>(field: &'a Option<String>, kind: &ChartKind, channel: &str) -> Result<&'a str> {
    match field.as_deref() {
        Some(f) if !f.is_empty() => Ok(f),
        _ => bail!("{} chart requires a '{}' field", kind.as_str(), channel),
    }
}

// =============================================================================
// Mark construction
// =============================================================================

/// Build the marks for a spec from rows already in render order.
pub fn build_marks(spec: &ChartSpec, rows: &[&Row]) -> Result<MarkSet> {
    let mut set = match &spec.chart_type {
        ChartKind::Bar => bar_marks(spec, rows)?,
        ChartKind::Line => line_marks(spec, rows, false)?,
        ChartKind::Area => line_marks(spec, rows, true)?,
        ChartKind::Dot => dot_marks(spec, rows)?,
        ChartKind::Waffle => waffle_marks(spec, rows)?,
        ChartKind::Tree => tree_marks(spec, rows)?,
        // Table specs never reach the plot renderer through dispatch, and geo
        // specs only do when their geo block is missing.
        ChartKind::Geo | ChartKind::Table | ChartKind::Unknown(_) => fallback_marks(spec, rows),
    };
    if matches!(spec.chart_type, ChartKind::Unknown(_) | ChartKind::Geo | ChartKind::Table) {
        set.fallback = true;
    }
    Ok(set)
}

fn bar_marks(spec: &ChartSpec, rows: &[&Row]) -> Result<MarkSet> {
    let x = require(&spec.x, &spec.chart_type, "x")?;
    let y = require(&spec.y, &spec.chart_type, "y")?;
    let cats = categories(rows, x);
    let mut fill = Fill::resolve(spec, rows);

    // Positive values stack up from zero, negative values stack down.
    let mut pos_top = vec![0.0; cats.len()];
    let mut neg_top = vec![0.0; cats.len()];
    let mut bars = Vec::new();
    for row in rows {
        let (Some(xi), Some(v)) = (category_index(&cats, row, x), coerce::field_number(row, y)) else {
            continue;
        };
        let top = if v >= 0.0 { &mut pos_top[xi] } else { &mut neg_top[xi] };
        let y0 = *top;
        *top += v;
        bars.push(Bar {
            x: xi,
            y0,
            y1: *top,
            color: fill.color(row),
        });
    }

    let mut set = MarkSet::new(vec![Mark::BarY(bars), Mark::RuleY(0.0)], XEncoding::Band(cats));
    set.y_zero = true;
    set.legend = fill.legend();
    Ok(set)
}

fn line_marks(spec: &ChartSpec, rows: &[&Row], area: bool) -> Result<MarkSet> {
    let x = require(&spec.x, &spec.chart_type, "x")?;
    let y = require(&spec.y, &spec.chart_type, "y")?;
    let encoding = x_encoding(rows, x);
    let mut fill = Fill::resolve(spec, rows);

    // One series per color value, in first-seen order.
    let mut series: Vec<Series> = Vec::new();
    for row in rows {
        let (Some(px), Some(py)) = (x_position(&encoding, row, x), coerce::field_number(row, y)) else {
            continue;
        };
        let key = fill.key(row);
        let color = fill.color(row);
        match series.iter_mut().find(|s| s.key == key) {
            Some(s) => s.points.push((px, py)),
            None => series.push(Series {
                key,
                color,
                points: vec![(px, py)],
            }),
        }
    }

    let marks = if area {
        vec![
            Mark::Area {
                series: series.clone(),
                fill_opacity: AREA_FILL_OPACITY,
            },
            Mark::Line {
                series,
                stroke_width: LINE_WIDTH,
            },
        ]
    } else {
        vec![Mark::Line {
            series,
            stroke_width: LINE_WIDTH,
        }]
    };

    let mut set = MarkSet::new(marks, encoding);
    set.y_zero = area;
    set.legend = fill.legend();
    Ok(set)
}

fn dot_marks(spec: &ChartSpec, rows: &[&Row]) -> Result<MarkSet> {
    let x = require(&spec.x, &spec.chart_type, "x")?;
    let y = require(&spec.y, &spec.chart_type, "y")?;
    let encoding = x_encoding(rows, x);
    let mut fill = Fill::resolve(spec, rows);
    let size = spec.size.as_deref();

    let mut dots = Vec::new();
    for row in rows {
        let (Some(px), Some(py)) = (x_position(&encoding, row, x), coerce::field_number(row, y)) else {
            continue;
        };
        let r = match size {
            // Non-numeric sizes collapse to an invisible point.
            Some(field) => coerce::field_number(row, field).unwrap_or(0.0).max(0.0),
            None => DOT_RADIUS,
        };
        dots.push(Dot {
            x: px,
            y: py,
            r,
            color: fill.color(row),
        });
    }

    let mut set = MarkSet::new(vec![Mark::Dot(dots)], encoding);
    set.legend = fill.legend();
    Ok(set)
}

fn waffle_marks(spec: &ChartSpec, rows: &[&Row]) -> Result<MarkSet> {
    let x = require(&spec.x, &spec.chart_type, "x")?;
    let y = require(&spec.y, &spec.chart_type, "y")?;
    let cats = categories(rows, x);
    let mut fill = Fill::resolve(spec, rows);

    let mut tops = vec![0.0; cats.len()];
    let mut columns = Vec::new();
    for row in rows {
        let (Some(xi), Some(v)) = (category_index(&cats, row, x), coerce::field_number(row, y)) else {
            continue;
        };
        if v <= 0.0 {
            continue;
        }
        columns.push(WaffleColumn {
            x: xi,
            start: tops[xi],
            value: v,
            color: fill.color(row),
        });
        tops[xi] += v;
    }

    let max_total = tops.iter().cloned().fold(0.0, f64::max);
    let mut set = MarkSet::new(
        vec![Mark::Waffle {
            unit: waffle_unit(max_total),
            columns,
        }],
        XEncoding::Band(cats),
    );
    set.y_zero = true;
    set.legend = fill.legend();
    Ok(set)
}

/// Cell value that keeps the tallest column at or under 200 cells.
pub fn waffle_unit(max_total: f64) -> f64 {
    const MAX_CELLS: f64 = 200.0;
    if max_total <= MAX_CELLS {
        1.0
    } else {
        10f64.powf((max_total / MAX_CELLS).log10().ceil())
    }
}

fn tree_marks(spec: &ChartSpec, rows: &[&Row]) -> Result<MarkSet> {
    let path = require(&spec.x, &spec.chart_type, "x")?;
    let paths: Vec<String> = rows
        .iter()
        .filter_map(|r| r.get(path).filter(|v| !v.is_null()).map(display_string))
        .collect();

    let color = match spec.color.as_deref().and_then(parse_color) {
        Some(c) => c,
        None => DEFAULT_MARK_COLOR,
    };

    let mut set = MarkSet::new(
        vec![Mark::Tree {
            layout: tree::layout(paths, TREE_DELIMITER),
            color,
        }],
        XEncoding::None,
    );
    set.axes = false;
    Ok(set)
}

/// Plain dots at x/y with the default color. Missing encodings produce an
/// empty dot mark rather than an error.
fn fallback_marks(spec: &ChartSpec, rows: &[&Row]) -> MarkSet {
    let (Some(x), Some(y)) = (spec.x.as_deref(), spec.y.as_deref()) else {
        return MarkSet::new(vec![Mark::Dot(Vec::new())], XEncoding::Continuous);
    };
    let encoding = x_encoding(rows, x);
    let dots = rows
        .iter()
        .filter_map(|row| {
            Some(Dot {
                x: x_position(&encoding, row, x)?,
                y: coerce::field_number(row, y)?,
                r: DOT_RADIUS,
                color: DEFAULT_MARK_COLOR,
            })
        })
        .collect();
    MarkSet::new(vec![Mark::Dot(dots)], encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> ChartSpec {
        ChartSpec::from_value(value).unwrap()
    }

    fn build(spec: &ChartSpec) -> MarkSet {
        let rows = spec.ordered_rows();
        build_marks(spec, &rows).unwrap()
    }

    #[test]
    fn test_bar_marks_with_baseline_rule() {
        let s = spec(json!({
            "chart_type": "bar",
            "data": [{"day": "Mon", "count": 4}, {"day": "Tue", "count": 7}],
            "x": "day", "y": "count"
        }));
        let set = build(&s);
        assert_eq!(set.marks.len(), 2);
        assert_eq!(set.marks[1], Mark::RuleY(0.0));
        assert_eq!(set.x, XEncoding::Band(vec!["Mon".into(), "Tue".into()]));
        match &set.marks[0] {
            Mark::BarY(bars) => {
                assert_eq!(bars.len(), 2);
                assert_eq!(bars[1].y1, 7.0);
                assert_eq!(bars[0].color, DEFAULT_MARK_COLOR);
            }
            other => panic!("Expected BarY, got {:?}", other),
        }
        assert!(set.y_zero);
    }

    #[test]
    fn test_bar_categories_follow_sorted_order() {
        let s = spec(json!({
            "chart_type": "bar",
            "data": [{"k": "a", "n": 4}, {"k": "b", "n": 9}, {"k": "c", "n": 7}],
            "x": "k", "y": "n",
            "sort": {"field": "n", "order": "desc"}
        }));
        let set = build(&s);
        assert_eq!(set.x, XEncoding::Band(vec!["b".into(), "c".into(), "a".into()]));
    }

    #[test]
    fn test_bar_stacks_by_color() {
        let s = spec(json!({
            "chart_type": "bar",
            "data": [
                {"k": "a", "n": 2, "g": "x"},
                {"k": "a", "n": 3, "g": "y"}
            ],
            "x": "k", "y": "n", "color": "g"
        }));
        let set = build(&s);
        let Mark::BarY(bars) = &set.marks[0] else { panic!("Expected BarY") };
        assert_eq!((bars[1].y0, bars[1].y1), (2.0, 5.0));
        assert_ne!(bars[0].color, bars[1].color);
        assert_eq!(set.legend.len(), 2);
    }

    #[test]
    fn test_bar_requires_encodings() {
        let s = spec(json!({"chart_type": "bar", "data": [{"a": 1}], "x": "a"}));
        let rows = s.ordered_rows();
        let err = build_marks(&s, &rows).unwrap_err();
        assert!(err.to_string().contains("'y'"));
    }

    #[test]
    fn test_area_is_fill_plus_outline() {
        let s = spec(json!({
            "chart_type": "area",
            "data": [{"t": 1, "v": 2}, {"t": 2, "v": 5}],
            "x": "t", "y": "v"
        }));
        let set = build(&s);
        let names: Vec<&str> = set.marks.iter().map(Mark::name).collect();
        assert_eq!(names, vec!["area", "line"]);
        assert_eq!(set.x, XEncoding::Continuous);
        let Mark::Area { series: fill, fill_opacity } = &set.marks[0] else { panic!() };
        let Mark::Line { series: outline, stroke_width } = &set.marks[1] else { panic!() };
        assert_eq!(fill[0].points, outline[0].points);
        assert_eq!(*fill_opacity, AREA_FILL_OPACITY);
        assert_eq!(*stroke_width, LINE_WIDTH);
    }

    #[test]
    fn test_line_groups_series_by_color_and_uses_point_scale_for_text_x() {
        let s = spec(json!({
            "chart_type": "line",
            "data": [
                {"d": "Mon", "v": 1, "s": "a"},
                {"d": "Mon", "v": 2, "s": "b"},
                {"d": "Tue", "v": 3, "s": "a"}
            ],
            "x": "d", "y": "v", "color": "s"
        }));
        let set = build(&s);
        assert_eq!(set.x, XEncoding::Point(vec!["Mon".into(), "Tue".into()]));
        let Mark::Line { series, .. } = &set.marks[0] else { panic!() };
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].key.as_deref(), Some("a"));
        assert_eq!(series[0].points, vec![(0.0, 1.0), (1.0, 3.0)]);
    }

    #[test]
    fn test_dot_size_encoding() {
        let s = spec(json!({
            "chart_type": "dot",
            "data": [
                {"x": 1, "y": 1, "s": 5},
                {"x": 2, "y": 2, "s": "big"},
                {"x": 3, "y": 3}
            ],
            "x": "x", "y": "y", "size": "s"
        }));
        let set = build(&s);
        let Mark::Dot(dots) = &set.marks[0] else { panic!() };
        let radii: Vec<f64> = dots.iter().map(|d| d.r).collect();
        assert_eq!(radii, vec![5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_dot_default_radius_and_skips_bad_rows() {
        let s = spec(json!({
            "chart_type": "dot",
            "data": [{"x": 1, "y": 1}, {"x": 2, "y": "n/a"}],
            "x": "x", "y": "y"
        }));
        let set = build(&s);
        let Mark::Dot(dots) = &set.marks[0] else { panic!() };
        assert_eq!(dots.len(), 1);
        assert_eq!(dots[0].r, DOT_RADIUS);
    }

    #[test]
    fn test_unknown_kind_falls_back_to_dots() {
        let s = spec(json!({
            "chart_type": "scatter3d",
            "data": [{"a": 1, "b": 2}, {"a": 2, "b": 3}],
            "x": "a", "y": "b", "color": "a"
        }));
        let set = build(&s);
        assert!(set.fallback);
        let Mark::Dot(dots) = &set.marks[0] else { panic!() };
        assert_eq!(dots.len(), 2);
        assert!(dots.iter().all(|d| d.color == DEFAULT_MARK_COLOR));
        assert!(set.legend.is_empty());
    }

    #[test]
    fn test_fallback_without_encodings_is_empty_dot_mark() {
        let s = spec(json!({"chart_type": "geo", "data": [{"lat": 1}]}));
        let set = build(&s);
        assert!(set.fallback);
        assert_eq!(set.marks, vec![Mark::Dot(Vec::new())]);
    }

    #[test]
    fn test_waffle_columns_and_unit() {
        let s = spec(json!({
            "chart_type": "waffle",
            "data": [{"k": "a", "n": 12}, {"k": "b", "n": 0}, {"k": "c", "n": 30}],
            "x": "k", "y": "n"
        }));
        let set = build(&s);
        let Mark::Waffle { unit, columns } = &set.marks[0] else { panic!() };
        assert_eq!(*unit, 1.0);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].x, 2);
        assert_eq!(waffle_unit(5000.0), 100.0);
    }

    #[test]
    fn test_tree_suppresses_axes() {
        let s = spec(json!({
            "chart_type": "tree",
            "data": [{"p": "root/a"}, {"p": "root/b"}],
            "x": "p"
        }));
        let set = build(&s);
        assert!(!set.axes);
        assert_eq!(set.x, XEncoding::None);
        let Mark::Tree { layout, .. } = &set.marks[0] else { panic!() };
        assert_eq!(layout.nodes.len(), 3);
    }

    #[test]
    fn test_constant_color_literal() {
        let s = spec(json!({
            "chart_type": "bar",
            "data": [{"k": "a", "n": 1}],
            "x": "k", "y": "n", "color": "#ff0000"
        }));
        let set = build(&s);
        let Mark::BarY(bars) = &set.marks[0] else { panic!() };
        assert_eq!(bars[0].color, RGBAColor(255, 0, 0, 1.0));
        assert!(set.legend.is_empty());
    }
}
