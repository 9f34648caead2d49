use super::datum::{self, Ellipsoid, Helmert};

use std::f64::consts::FRAC_PI_2;
use std::f64::consts::FRAC_PI_4;

/// Lambert Conformal Conic with one standard parallel (EPSG method 9801).
/// Angles in degrees, offsets in meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LambertZone {
    pub latitude_of_origin: f64,
    pub central_meridian: f64,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub ellipsoid: Ellipsoid,
    pub to_wgs84: Helmert,
}

/// constants of the cone, derived once per call from the zone parameters
struct Cone {
    n: f64,
    f: f64,
    r0: f64,
    e: f64,
    a: f64,
}

impl LambertZone {
    fn cone(&self) -> Cone {
        let e = self.ellipsoid.e();
        let phi0 = self.latitude_of_origin.to_radians();

        let n = phi0.sin();
        let m0 = phi0.cos() / (1. - e * e * phi0.sin().powi(2)).sqrt();
        let t0 = isometric_colatitude(phi0, e);
        let f = m0 / (n * t0.powf(n));
        let r0 = self.ellipsoid.a * f * t0.powf(n) * self.scale_factor;

        Cone {
            n,
            f,
            r0,
            e,
            a: self.ellipsoid.a,
        }
    }

    /// geodetic (lon, lat) on the zone's own datum to (easting, northing)
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let c = self.cone();
        let t = isometric_colatitude(lat.to_radians(), c.e);
        let r = c.a * c.f * t.powf(c.n) * self.scale_factor;
        let theta = c.n * (lon - self.central_meridian).to_radians();

        (
            self.false_easting + r * theta.sin(),
            self.false_northing + c.r0 - r * theta.cos(),
        )
    }

    /// (easting, northing) to geodetic (lon, lat) on the zone's own datum
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let c = self.cone();
        let dx = x - self.false_easting;
        let dy = c.r0 - (y - self.false_northing);

        let r = c.n.signum() * dx.hypot(dy);
        let theta = if c.n < 0. {
            (-dx).atan2(-dy)
        } else {
            dx.atan2(dy)
        };
        let t = (r / (c.a * self.scale_factor * c.f)).powf(1. / c.n);

        let mut phi = FRAC_PI_2 - 2. * t.atan();
        for _ in 0..32 {
            let es = c.e * phi.sin();
            let next = FRAC_PI_2 - 2. * (t * ((1. - es) / (1. + es)).powf(c.e / 2.)).atan();
            let done = (next - phi).abs() < 1e-14;
            phi = next;
            if done {
                break;
            }
        }

        (
            (theta / c.n).to_degrees() + self.central_meridian,
            phi.to_degrees(),
        )
    }

    /// WGS84 (lon, lat) to zone (easting, northing), including the datum shift
    pub fn project_wgs84(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (lon, lat) = datum::shift_from_wgs84(lon, lat, &self.ellipsoid, &self.to_wgs84);
        self.project(lon, lat)
    }

    /// zone (easting, northing) to WGS84 (lon, lat), including the datum shift
    pub fn unproject_wgs84(&self, x: f64, y: f64) -> (f64, f64) {
        let (lon, lat) = self.unproject(x, y);
        datum::shift_to_wgs84(lon, lat, &self.ellipsoid, &self.to_wgs84)
    }
}

/// t in the EPSG formulation, tan(pi/4 - phi/2) corrected for the eccentricity
fn isometric_colatitude(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.).tan() / ((1. - es) / (1. + es)).powf(e / 2.)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::MERCHICH_NORD_MAROC;
    use crate::projection::Projection;

    fn nord_maroc() -> LambertZone {
        match MERCHICH_NORD_MAROC.projection {
            Projection::Lambert(zone) => zone,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_origin_maps_to_false_origin() {
        let zone = nord_maroc();
        let (x, y) = zone.project(zone.central_meridian, zone.latitude_of_origin);

        assert!((x - 500_000.).abs() < 1e-6);
        assert!((y - 300_000.).abs() < 1e-6);
    }

    #[test]
    fn test_project_unproject() {
        let zone = nord_maroc();
        for &(lon, lat) in &[(-9.5, 30.1), (-5.4, 33.3), (-1.2, 35.8), (-7.6, 33.57)] {
            let (x, y) = zone.project(lon, lat);
            let (lon2, lat2) = zone.unproject(x, y);

            assert!((lon - lon2).abs() < 1e-10, "{lon} {lon2}");
            assert!((lat - lat2).abs() < 1e-10, "{lat} {lat2}");
        }
    }

    #[test]
    fn test_scale_factor_at_origin() {
        let zone = nord_maroc();
        // one arc second of longitude along the origin parallel
        let (x1, _) = zone.project(zone.central_meridian, zone.latitude_of_origin);
        let (x2, _) = zone.project(zone.central_meridian + 1. / 3600., zone.latitude_of_origin);

        let e2 = zone.ellipsoid.e2();
        let phi = zone.latitude_of_origin.to_radians();
        let nu = zone.ellipsoid.a / (1. - e2 * phi.sin().powi(2)).sqrt();
        let ground = nu * phi.cos() * (1. / 3600f64).to_radians();

        assert!(((x2 - x1) / ground - zone.scale_factor).abs() < 1e-6);
    }
}
