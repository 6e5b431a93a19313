//! Geographic renderer: point markers or choropleth regions over a dark
//! Web Mercator base map.

pub mod boundary;
pub mod choropleth;
pub mod fetch;
pub mod points;
pub mod projection;

use anyhow::{Context, Result};
use plotters::style::RGBAColor;
use tracing::{debug, error};

use crate::canvas;
use crate::container::{Container, Output, Placeholder};
use crate::plot::{clamp_edge, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::scene::{DrawCommand, Scene};
use crate::spec::{ChartSpec, GeoKind, GeoSpec};
use crate::theme::{with_alpha, DEFAULT_MARK_COLOR};

use boundary::FeatureCollection;
use choropleth::{Region, ValueLookup, REGION_FILL_OPACITY, REGION_STROKE, REGION_STROKE_WEIGHT};
use points::Marker;
use projection::Projection;

pub const DARK_TILES: &str = "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png";
pub const TILE_ATTRIBUTION: &str = "&copy; <a href=\"https://carto.com/\">CARTO</a>";

pub const COMPACT_MAP_WIDTH: u32 = 200;
pub const COMPACT_MAP_HEIGHT: u32 = 120;

const MAP_BASE: RGBAColor = RGBAColor(0x11, 0x11, 0x13, 1.0);
const MARKER_RADIUS: f64 = 5.0;
const MARKER_OUTLINE: RGBAColor = RGBAColor(0xCF, 0xD3, 0xEC, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoMode {
    Points,
    Choropleth,
}

/// What a geo spec asks for, decided before anything is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoPlan {
    Points,
    Choropleth { url: String },
    Unsupported,
}

pub fn plan(geo: &GeoSpec) -> GeoPlan {
    match (&geo.kind, geo.geojson_url()) {
        (GeoKind::Points, _) => GeoPlan::Points,
        (GeoKind::Choropleth, Some(url)) => GeoPlan::Choropleth { url: url.to_string() },
        _ => GeoPlan::Unsupported,
    }
}

/// Map interactions; compact maps are static.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub zoom_control: bool,
    pub scroll_wheel_zoom: bool,
    pub dragging: bool,
    pub popups: bool,
}

impl Interaction {
    pub fn for_mode(compact: bool) -> Self {
        Interaction {
            zoom_control: !compact,
            scroll_wheel_zoom: !compact,
            dragging: !compact,
            popups: !compact,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapView {
    pub mode: GeoMode,
    pub width: u32,
    pub height: u32,
    pub center: [f64; 2],
    pub zoom: f64,
    pub interaction: Interaction,
    pub tile_url: &'static str,
    pub attribution: &'static str,
    pub markers: Vec<Marker>,
    pub regions: Vec<Region>,
    pub scene: Scene,
    pub svg: String,
}

impl MapView {
    pub fn to_png(&self) -> Result<Vec<u8>> {
        canvas::render_png(&self.scene)
    }
}

pub fn map_dimensions(spec: &ChartSpec, width_hint: Option<u32>, compact: bool) -> (u32, u32) {
    if compact {
        return (COMPACT_MAP_WIDTH, COMPACT_MAP_HEIGHT);
    }
    (
        clamp_edge(spec.width.or(width_hint).unwrap_or(DEFAULT_WIDTH)),
        clamp_edge(spec.height.unwrap_or(DEFAULT_HEIGHT)),
    )
}

/// Render a geo spec. Points and unsupported specs finish immediately; a
/// choropleth shows the loading placeholder and returns the boundary URL it
/// is waiting on.
pub fn render(spec: &ChartSpec, geo: &GeoSpec, compact: bool, container: &mut Container) -> Option<String> {
    container.clear();
    match plan(geo) {
        GeoPlan::Points => {
            let markers = points::markers(&spec.data, geo, compact);
            let drawn = build_map(GeoMode::Points, spec, geo, compact, container.width_hint(), markers, Vec::new());
            place(container, drawn);
            None
        }
        GeoPlan::Choropleth { url } => {
            container.replace(Output::Placeholder(Placeholder::LoadingBoundaries));
            Some(url)
        }
        GeoPlan::Unsupported => {
            debug!(geo_type = ?geo.kind, "Unsupported geo type");
            container.replace(Output::Placeholder(Placeholder::UnsupportedGeo));
            None
        }
    }
}

/// Finish a choropleth once its boundaries have arrived.
pub fn render_choropleth(
    spec: &ChartSpec,
    geo: &GeoSpec,
    boundaries: &FeatureCollection,
    compact: bool,
    container: &mut Container,
) {
    container.clear();
    let lookup = ValueLookup::from_rows(spec, &spec.data, geo.value_field());
    let regions = choropleth::style_regions(boundaries, &lookup);
    let drawn = build_map(GeoMode::Choropleth, spec, geo, compact, container.width_hint(), Vec::new(), regions);
    place(container, drawn);
}

fn place(container: &mut Container, drawn: Result<MapView>) {
    match drawn {
        Ok(view) => container.replace(Output::Map(view)),
        Err(e) => {
            error!("Chart render error: {e:#}");
            container.replace(Output::Placeholder(Placeholder::RenderError));
        }
    }
}

fn build_map(
    mode: GeoMode,
    spec: &ChartSpec,
    geo: &GeoSpec,
    compact: bool,
    width_hint: Option<u32>,
    markers: Vec<Marker>,
    regions: Vec<Region>,
) -> Result<MapView> {
    let (width, height) = map_dimensions(spec, width_hint, compact);
    let center = geo.center();
    let zoom = geo.zoom();
    let projection = Projection::new(center, zoom, width, height);

    let mut scene = Scene::new(width, height, Some(MAP_BASE));
    for region in &regions {
        let fill = with_alpha(region.fill, region.fill.3 * REGION_FILL_OPACITY);
        for polygon in &region.polygons {
            let mut rings = polygon
                .iter()
                .map(|ring| ring.iter().map(|&(lon, lat)| projection.project(lat, lon)).collect::<Vec<_>>());
            if let Some(outer) = rings.next() {
                scene.push(DrawCommand::DrawPolygon {
                    points: outer,
                    fill,
                    stroke: Some((REGION_STROKE, REGION_STROKE_WEIGHT)),
                });
            }
            for hole in rings {
                scene.push(DrawCommand::DrawLine {
                    points: hole,
                    color: REGION_STROKE,
                    width: REGION_STROKE_WEIGHT,
                });
            }
        }
    }
    for marker in &markers {
        scene.push(DrawCommand::DrawCircle {
            center: projection.project(marker.lat, marker.lon),
            radius: MARKER_RADIUS,
            fill: DEFAULT_MARK_COLOR,
            stroke: Some(MARKER_OUTLINE),
        });
    }

    let svg = canvas::render_svg(&scene).context("Failed to draw map")?;
    debug!(?mode, markers = markers.len(), regions = regions.len(), "Map rendered");

    Ok(MapView {
        mode,
        width,
        height,
        center,
        zoom,
        interaction: Interaction::for_mode(compact),
        tile_url: DARK_TILES,
        attribution: TILE_ATTRIBUTION,
        markers,
        regions,
        scene,
        svg,
    })
}
