use std::f64::consts::SQRT_2;

pub const LON_MIN: f64 = -180.0;
pub const LON_MAX: f64 = 180.0;
pub const LAT_MIN: f64 = -60.0;
pub const LAT_MAX: f64 = 90.0;

/// Gall stereographic plane coordinates for a lon/lat pair in degrees.
pub fn gall_project(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();
    (lon / SQRT_2, (1.0 + SQRT_2 / 2.0) * (lat / 2.0).tan())
}

/// Maps the projected map window onto a pixel grid, y flipped so that north
/// is up.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    min_x: f64,
    min_y: f64,
    scale_x: f64,
    scale_y: f64,
    height: u32,
}

impl Viewport {
    pub fn world(width: u32, height: u32) -> Self {
        let (min_x, min_y) = gall_project(LON_MIN, LAT_MIN);
        let (max_x, max_y) = gall_project(LON_MAX, LAT_MAX);
        Self {
            min_x,
            min_y,
            scale_x: width.saturating_sub(1) as f64 / (max_x - min_x),
            scale_y: height.saturating_sub(1) as f64 / (max_y - min_y),
            height,
        }
    }

    pub fn to_pixel(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (x, y) = gall_project(lon, lat);
        let px = ((x - self.min_x) * self.scale_x).round() as i32;
        let py = (self.height as i32 - 1) - ((y - self.min_y) * self.scale_y).round() as i32;
        (px, py)
    }
}
