use anyhow::{anyhow, Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::scene::{DrawCommand, Scene, TextAnchor};
use crate::theme::RASTER_BACKGROUND;

const FONT_FAMILY: &str = "sans-serif";

/// Largest edge `render_png` will allocate a pixel buffer for.
pub const MAX_RASTER_EDGE: u32 = 8192;

/// Execute a scene's commands on any plotters drawing area.
pub fn draw_scene<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, scene: &Scene) -> Result<()> {
    if let Some(background) = scene.background {
        root.fill(&background)
            .map_err(|e| anyhow!("Failed to fill background: {e:?}"))?;
    }

    for command in &scene.commands {
        match command {
            DrawCommand::DrawLine { points, color, width } => {
                if points.len() < 2 {
                    continue;
                }
                let style = ShapeStyle {
                    color: *color,
                    filled: false,
                    stroke_width: stroke(*width),
                };
                root.draw(&PathElement::new(to_pixels(points), style))
                    .map_err(|e| anyhow!("Failed to draw line: {e:?}"))?;
            }
            DrawCommand::DrawRect { tl, br, fill } => {
                root.draw(&Rectangle::new([pixel(*tl), pixel(*br)], fill.filled()))
                    .map_err(|e| anyhow!("Failed to draw rect: {e:?}"))?;
            }
            DrawCommand::DrawCircle { center, radius, fill, stroke: outline } => {
                let r = radius.max(0.0).round() as u32;
                if r == 0 {
                    continue;
                }
                root.draw(&Circle::new(pixel(*center), r, fill.filled()))
                    .map_err(|e| anyhow!("Failed to draw circle: {e:?}"))?;
                if let Some(outline) = outline {
                    root.draw(&Circle::new(pixel(*center), r, outline.stroke_width(1)))
                        .map_err(|e| anyhow!("Failed to draw circle outline: {e:?}"))?;
                }
            }
            DrawCommand::DrawPolygon { points, fill, stroke: outline } => {
                if points.len() < 3 {
                    continue;
                }
                let pixels = to_pixels(points);
                root.draw(&Polygon::new(pixels.clone(), fill.filled()))
                    .map_err(|e| anyhow!("Failed to draw polygon: {e:?}"))?;
                if let Some((color, width)) = outline {
                    let mut ring = pixels;
                    ring.push(ring[0]);
                    root.draw(&PathElement::new(ring, color.stroke_width(stroke(*width))))
                        .map_err(|e| anyhow!("Failed to draw polygon outline: {e:?}"))?;
                }
            }
            DrawCommand::DrawText { pos, text, color, size, anchor } => {
                let h_pos = match anchor {
                    TextAnchor::Start => HPos::Left,
                    TextAnchor::Middle => HPos::Center,
                    TextAnchor::End => HPos::Right,
                };
                let style = TextStyle::from((FONT_FAMILY, *size).into_font())
                    .color(color)
                    .pos(Pos::new(h_pos, VPos::Center));
                root.draw(&Text::new(text.clone(), pixel(*pos), style))
                    .map_err(|e| anyhow!("Failed to draw text: {e:?}"))?;
            }
        }
    }

    Ok(())
}

/// Render a scene as an SVG document.
pub fn render_svg(scene: &Scene) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (scene.width, scene.height)).into_drawing_area();
        draw_scene(&root, scene)?;
        root.present()
            .map_err(|e| anyhow!("Failed to present drawing: {e:?}"))?;
    }
    Ok(svg)
}

/// Rasterize a scene and encode it as PNG.
///
/// PNG output has no transparency; transparent scenes get the dark raster
/// background.
pub fn render_png(scene: &Scene) -> Result<Vec<u8>> {
    let (width, height) = (scene.width, scene.height);
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .filter(|&n| n > 0 && width <= MAX_RASTER_EDGE && height <= MAX_RASTER_EDGE)
        .ok_or_else(|| anyhow!("Cannot rasterize a {width}x{height} surface"))?;
    let mut buffer = vec![0u8; len];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        if scene.background.is_none() {
            root.fill(&RASTER_BACKGROUND)
                .map_err(|e| anyhow!("Failed to fill background: {e:?}"))?;
        }
        draw_scene(&root, scene)?;
        root.present()
            .map_err(|e| anyhow!("Failed to present drawing: {e:?}"))?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

fn pixel(p: (f64, f64)) -> (i32, i32) {
    (p.0.round() as i32, p.1.round() as i32)
}

fn to_pixels(points: &[(f64, f64)]) -> Vec<(i32, i32)> {
    points.iter().map(|&p| pixel(p)).collect()
}

fn stroke(width: f64) -> u32 {
    width.max(1.0).round() as u32
}
