use std::f64::consts::FRAC_PI_4;

/// Radius of the sphere used by the display projection (EPSG:3857)
pub const EARTH_RADIUS: f64 = 6_378_137.;

/// Latitude where the square web map world ends
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

pub const HALF_WORLD: f64 = std::f64::consts::PI * EARTH_RADIUS;

pub fn forward(lon: f64, lat: f64) -> (f64, f64) {
    (
        EARTH_RADIUS * lon.to_radians(),
        EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.).tan().ln(),
    )
}

pub fn inverse(x: f64, y: f64) -> (f64, f64) {
    (
        (x / EARTH_RADIUS).to_degrees(),
        (2. * (y / EARTH_RADIUS).exp().atan() - 2. * FRAC_PI_4).to_degrees(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_corner() {
        let (x, y) = forward(180., MAX_LATITUDE);
        assert!((x - HALF_WORLD).abs() < 1e-6);
        assert!((y - HALF_WORLD).abs() < 1e-3);
    }

    #[test]
    fn test_inverse() {
        let (x, y) = forward(-7.5898, 33.5731);
        let (lon, lat) = inverse(x, y);
        assert!((lon + 7.5898).abs() < 1e-12);
        assert!((lat - 33.5731).abs() < 1e-12);
    }
}
