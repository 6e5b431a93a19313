//! Plot renderer: bar, line, area, dot, waffle and tree charts.
//!
//! Rows become data-space marks (`marks`), marks are laid out into a pixel
//! scene (`compile`), and the scene is drawn through plotters (`canvas`).

pub mod compile;
pub mod marks;
pub mod scale;
pub mod tree;

use std::panic::{self, AssertUnwindSafe};

use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::canvas;
use crate::container::{Container, Output, Placeholder};
use crate::scene::Scene;
use crate::spec::ChartSpec;

pub use marks::{Mark, MarkSet};

pub const COMPACT_WIDTH: u32 = 200;
pub const COMPACT_HEIGHT: u32 = 120;
pub const DEFAULT_WIDTH: u32 = 600;
pub const DEFAULT_HEIGHT: u32 = 400;
/// Largest surface edge in pixels, for plots and maps alike.
pub const MAX_DIMENSION: u32 = 4096;

/// Surface size: fixed in compact mode, otherwise spec overrides, then the
/// container width, then defaults. Each edge is clamped to `1..=MAX_DIMENSION`.
pub fn dimensions(spec: &ChartSpec, width_hint: Option<u32>, compact: bool) -> (u32, u32) {
    if compact {
        return (COMPACT_WIDTH, COMPACT_HEIGHT);
    }
    (
        clamp_edge(spec.width.or(width_hint).unwrap_or(DEFAULT_WIDTH)),
        clamp_edge(spec.height.unwrap_or(DEFAULT_HEIGHT)),
    )
}

pub fn clamp_edge(pixels: u32) -> u32 {
    pixels.clamp(1, MAX_DIMENSION)
}

/// A rendered plot: inspectable marks, the pixel scene and its SVG form.
#[derive(Debug, Clone)]
pub struct PlotOutput {
    pub width: u32,
    pub height: u32,
    pub marks: MarkSet,
    pub scene: Scene,
    pub svg: String,
}

impl PlotOutput {
    pub fn to_png(&self) -> Result<Vec<u8>> {
        canvas::render_png(&self.scene)
    }
}

/// Build marks, lay them out and draw them. Errors here become the render
/// error placeholder.
pub fn build_plot(spec: &ChartSpec, width_hint: Option<u32>, compact: bool) -> Result<PlotOutput> {
    let (width, height) = dimensions(spec, width_hint, compact);
    let rows = spec.ordered_rows();

    let marks = marks::build_marks(spec, &rows).context("Failed to build marks")?;
    let scene = compile::compile_scene(&marks, spec, width, height, compact)
        .context("Failed to lay out plot")?;
    let svg = canvas::render_svg(&scene).context("Failed to draw plot")?;

    debug!(
        chart_type = spec.chart_type.as_str(),
        width,
        height,
        commands = scene.commands.len(),
        "Plot rendered"
    );

    Ok(PlotOutput {
        width,
        height,
        marks,
        scene,
        svg,
    })
}

/// Render a plot into the container, replacing its contents.
///
/// Empty data leaves the container empty. Any failure, including a panic in
/// the drawing backend, leaves the render error placeholder.
pub fn render(spec: &ChartSpec, compact: bool, container: &mut Container) {
    container.clear();
    if spec.data.is_empty() {
        return;
    }

    let width_hint = container.width_hint();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| build_plot(spec, width_hint, compact)));
    match outcome {
        Ok(Ok(output)) => container.replace(Output::Plot(output)),
        Ok(Err(e)) => {
            error!(chart_type = spec.chart_type.as_str(), "Chart render error: {e:#}");
            container.replace(Output::Placeholder(Placeholder::RenderError));
        }
        Err(_) => {
            error!(chart_type = spec.chart_type.as_str(), "Chart render error: drawing panicked");
            container.replace(Output::Placeholder(Placeholder::RenderError));
        }
    }
}
