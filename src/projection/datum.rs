/// Reference ellipsoid, axes in meters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    pub a: f64,
    pub b: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.,
        b: 6_356_752.314_245_179,
    };

    pub const CLARKE_1880_IGN: Ellipsoid = Ellipsoid {
        a: 6_378_249.2,
        b: 6_356_515.,
    };

    /// first eccentricity squared
    pub fn e2(&self) -> f64 {
        1. - (self.b * self.b) / (self.a * self.a)
    }

    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }

    /// (lon, lat) in radians and ellipsoidal height to earth centered cartesian
    pub fn to_geocentric(&self, lon: f64, lat: f64, h: f64) -> [f64; 3] {
        let e2 = self.e2();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = self.a / (1. - e2 * sin_lat * sin_lat).sqrt();

        [
            (n + h) * cos_lat * lon.cos(),
            (n + h) * cos_lat * lon.sin(),
            (n * (1. - e2) + h) * sin_lat,
        ]
    }

    /// inverse of `to_geocentric`, returns (lon, lat, h) with angles in radians
    pub fn from_geocentric(&self, xyz: [f64; 3]) -> (f64, f64, f64) {
        let [x, y, z] = xyz;
        let e2 = self.e2();

        let p = x.hypot(y);
        let lon = y.atan2(x);

        let mut lat = z.atan2(p * (1. - e2));
        let mut h = 0.;
        for _ in 0..16 {
            let sin_lat = lat.sin();
            let n = self.a / (1. - e2 * sin_lat * sin_lat).sqrt();
            h = p / lat.cos() - n;

            let next = z.atan2(p * (1. - e2 * n / (n + h)));
            let done = (next - lat).abs() < 1e-14;
            lat = next;
            if done {
                break;
            }
        }
        (lon, lat, h)
    }
}

/// Seven parameter Helmert transform in the position vector convention.
/// Translations in meters, rotations in arc seconds, scale in ppm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Helmert {
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    pub ds: f64,
}

const ARC_SECOND: f64 = std::f64::consts::PI / (180. * 3600.);

impl Helmert {
    pub const IDENTITY: Helmert = Helmert::translation(0., 0., 0.);

    pub const fn translation(tx: f64, ty: f64, tz: f64) -> Helmert {
        Helmert {
            tx,
            ty,
            tz,
            rx: 0.,
            ry: 0.,
            rz: 0.,
            ds: 0.,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Helmert::IDENTITY
    }

    pub fn apply(&self, xyz: [f64; 3]) -> [f64; 3] {
        let [x, y, z] = xyz;
        let (rx, ry, rz) = (
            self.rx * ARC_SECOND,
            self.ry * ARC_SECOND,
            self.rz * ARC_SECOND,
        );
        let m = 1. + self.ds * 1e-6;

        [
            self.tx + m * (x - rz * y + ry * z),
            self.ty + m * (rz * x + y - rx * z),
            self.tz + m * (-ry * x + rx * y + z),
        ]
    }

    /// exact for translations, first order for the rotation terms
    pub fn apply_inverse(&self, xyz: [f64; 3]) -> [f64; 3] {
        let m = 1. + self.ds * 1e-6;
        let x = (xyz[0] - self.tx) / m;
        let y = (xyz[1] - self.ty) / m;
        let z = (xyz[2] - self.tz) / m;
        let (rx, ry, rz) = (
            self.rx * ARC_SECOND,
            self.ry * ARC_SECOND,
            self.rz * ARC_SECOND,
        );

        [x + rz * y - ry * z, -rz * x + y + rx * z, ry * x - rx * y + z]
    }
}

/// Moves geodetic (lon, lat) degrees from `source` with `to_wgs84` onto WGS84
pub fn shift_to_wgs84(lon: f64, lat: f64, source: &Ellipsoid, to_wgs84: &Helmert) -> (f64, f64) {
    if to_wgs84.is_identity() && *source == Ellipsoid::WGS84 {
        return (lon, lat);
    }
    let xyz = source.to_geocentric(lon.to_radians(), lat.to_radians(), 0.);
    let (lon, lat, _) = Ellipsoid::WGS84.from_geocentric(to_wgs84.apply(xyz));
    (lon.to_degrees(), lat.to_degrees())
}

/// Moves WGS84 (lon, lat) degrees onto the `target` datum.
///
/// Heights are dropped on both legs, so the direct inverse is refined until
/// `shift_to_wgs84` reproduces the input.
pub fn shift_from_wgs84(lon: f64, lat: f64, target: &Ellipsoid, to_wgs84: &Helmert) -> (f64, f64) {
    if to_wgs84.is_identity() && *target == Ellipsoid::WGS84 {
        return (lon, lat);
    }
    let xyz = Ellipsoid::WGS84.to_geocentric(lon.to_radians(), lat.to_radians(), 0.);
    let (guess_lon, guess_lat, _) = target.from_geocentric(to_wgs84.apply_inverse(xyz));
    let (mut guess_lon, mut guess_lat) = (guess_lon.to_degrees(), guess_lat.to_degrees());

    for _ in 0..8 {
        let (fwd_lon, fwd_lat) = shift_to_wgs84(guess_lon, guess_lat, target, to_wgs84);
        let (d_lon, d_lat) = (lon - fwd_lon, lat - fwd_lat);
        guess_lon += d_lon;
        guess_lat += d_lat;
        if d_lon.abs() < 1e-13 && d_lat.abs() < 1e-13 {
            break;
        }
    }
    (guess_lon, guess_lat)
}
