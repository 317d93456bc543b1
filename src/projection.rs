use crate::ir::{Bounds, Vertex};

/// Ground resolution of a 256px Web-Mercator tile at zoom 0, in meters per pixel.
pub const METERS_PER_PIXEL_Z0: f64 = 156543.03392;
/// Meters covered by one degree of latitude.
pub const METERS_PER_DEGREE: f64 = 111320.0;

const TILE_SIZE: f64 = 256.0;
const MAX_ZOOM: i32 = 22;

/// Convert a screen-pixel distance to degrees at `zoom`, measured at
/// `latitude`. Passing latitude 0 gives the zoom-only approximation.
pub fn pixels_to_local(pixels: f64, zoom: i32, latitude: f64) -> f64 {
    let meters_per_pixel = METERS_PER_PIXEL_Z0 * latitude.to_radians().cos() / 2f64.powi(zoom);
    pixels * meters_per_pixel / METERS_PER_DEGREE
}

/// The host map component, as seen by the label engine.
pub trait Projection {
    fn zoom(&self) -> i32;

    fn viewport_bounds(&self) -> Bounds;

    fn viewport_contains(&self, vertex: Vertex) -> bool {
        self.viewport_bounds().contains(vertex)
    }

    fn pixels_to_local(&self, pixels: f64, latitude: f64) -> f64 {
        pixels_to_local(pixels, self.zoom(), latitude)
    }

    /// Degrees per screen pixel using the equator approximation. The
    /// solver and name placement use this so one tuning works everywhere.
    fn local_per_px(&self) -> f64 {
        self.pixels_to_local(1.0, 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercatorView {
    pub bounds: Bounds,
    pub zoom: i32,
}

impl WebMercatorView {
    pub fn new(bounds: Bounds, zoom: i32) -> Self {
        Self { bounds, zoom }
    }

    /// Largest integer zoom at which the longitude span of `bounds` fits in
    /// `width_px` screen pixels.
    pub fn fit(bounds: Bounds, width_px: f64) -> Self {
        let span = bounds.lon_span();
        if span <= 0.0 || width_px <= 0.0 || !span.is_finite() {
            return Self { bounds, zoom: 0 };
        }
        let scale = width_px * 360.0 / (TILE_SIZE * span);
        let zoom = scale.log2().floor() as i32;
        Self {
            bounds,
            zoom: zoom.clamp(0, MAX_ZOOM),
        }
    }
}

impl Projection for WebMercatorView {
    fn zoom(&self) -> i32 {
        self.zoom
    }

    fn viewport_bounds(&self) -> Bounds {
        self.bounds
    }
}
