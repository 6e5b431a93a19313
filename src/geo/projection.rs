use std::f64::consts::PI;

pub const TILE_SIZE: f64 = 256.0;
/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Web Mercator viewport: a `width` x `height` window centered on `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    origin: (f64, f64),
    zoom: f64,
}

impl Projection {
    /// `center` is `[lat, lon]`.
    pub fn new(center: [f64; 2], zoom: f64, width: u32, height: u32) -> Self {
        let (cx, cy) = world_pixel(center[0], center[1], zoom);
        Projection {
            origin: (cx - width as f64 / 2.0, cy - height as f64 / 2.0),
            zoom,
        }
    }

    /// Viewport pixel of a coordinate.
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (x, y) = world_pixel(lat, lon, self.zoom);
        (x - self.origin.0, y - self.origin.1)
    }
}

/// Global pixel position at `zoom`, origin at the north-west corner.
pub fn world_pixel(lat: f64, lon: f64, zoom: f64) -> (f64, f64) {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin = (lat * PI / 180.0).sin();
    let x = (lon + 180.0) / 360.0 * scale;
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * scale;
    (x, y)
}
