pub mod datum;
pub mod lambert;
pub mod mercator;

pub use self::datum::{Ellipsoid, Helmert};
pub use self::lambert::LambertZone;

use crate::{Error, Result};

use geo::Coord;
use proj4rs::{transform::transform, Proj};

use std::borrow::Cow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrsKind {
    Geographic,
    Projected,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    /// WGS84 longitude/latitude in degrees
    Geographic,
    /// the display CRS of the map, spherical mercator on WGS84
    WebMercator,
    Lambert(LambertZone),
    /// any other EPSG code, handed to proj4rs
    Proj4 { epsg: u16, geographic: bool },
}

/// Approximate area where the regional Lambert zones are defined
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Envelope {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

pub const REGIONAL_ENVELOPE: Envelope = Envelope {
    min_lon: -19.,
    min_lat: 20.,
    max_lon: 1.,
    max_lat: 38.,
};

/// Immutable coordinate reference system descriptor
#[derive(Clone, Debug, PartialEq)]
pub struct Crs {
    pub code: Cow<'static, str>,
    pub name: Cow<'static, str>,
    pub projection: Projection,
}

pub const WGS84: Crs = Crs {
    code: Cow::Borrowed("EPSG:4326"),
    name: Cow::Borrowed("WGS 84"),
    projection: Projection::Geographic,
};

pub const WEB_MERCATOR: Crs = Crs {
    code: Cow::Borrowed("EPSG:3857"),
    name: Cow::Borrowed("WGS 84 / Pseudo-Mercator"),
    projection: Projection::WebMercator,
};

/// Merchich datum, shared by all regional zones
const MERCHICH_TO_WGS84: Helmert = Helmert::translation(31., 146., 47.);

const fn merchich_zone(
    latitude_of_origin: f64,
    scale_factor: f64,
    false_easting: f64,
    false_northing: f64,
) -> LambertZone {
    LambertZone {
        latitude_of_origin,
        central_meridian: -5.4,
        scale_factor,
        false_easting,
        false_northing,
        ellipsoid: Ellipsoid::CLARKE_1880_IGN,
        to_wgs84: MERCHICH_TO_WGS84,
    }
}

pub const MERCHICH_NORD_MAROC: Crs = Crs {
    code: Cow::Borrowed("EPSG:26191"),
    name: Cow::Borrowed("Merchich / Nord Maroc"),
    projection: Projection::Lambert(merchich_zone(33.3, 0.999_625_769, 500_000., 300_000.)),
};

pub const MERCHICH_SUD_MAROC: Crs = Crs {
    code: Cow::Borrowed("EPSG:26192"),
    name: Cow::Borrowed("Merchich / Sud Maroc"),
    projection: Projection::Lambert(merchich_zone(29.7, 0.999_615_596, 500_000., 300_000.)),
};

pub const MERCHICH_SAHARA_NORD: Crs = Crs {
    code: Cow::Borrowed("EPSG:26194"),
    name: Cow::Borrowed("Merchich / Sahara Nord"),
    projection: Projection::Lambert(merchich_zone(26.1, 0.999_616_304, 1_200_000., 400_000.)),
};

pub const MERCHICH_SAHARA_SUD: Crs = Crs {
    code: Cow::Borrowed("EPSG:26195"),
    name: Cow::Borrowed("Merchich / Sahara Sud"),
    projection: Projection::Lambert(merchich_zone(22.5, 0.999_616_437, 1_500_000., 400_000.)),
};

pub const BUILTIN: [&Crs; 6] = [
    &WGS84,
    &WEB_MERCATOR,
    &MERCHICH_NORD_MAROC,
    &MERCHICH_SUD_MAROC,
    &MERCHICH_SAHARA_NORD,
    &MERCHICH_SAHARA_SUD,
];

/// The regional zones a user can pick for drawing or tabular imports
pub fn regional_zones() -> impl Iterator<Item = &'static Crs> {
    BUILTIN
        .into_iter()
        .filter(|crs| matches!(crs.projection, Projection::Lambert(_)))
}

/// Accepts "EPSG:26191", "epsg:26191" or "26191"
pub fn lookup(code: &str) -> Result<Crs> {
    let trimmed = code.trim();
    let number = trimmed
        .strip_prefix("EPSG:")
        .or_else(|| trimmed.strip_prefix("epsg:"))
        .unwrap_or(trimmed);
    let epsg: u16 = number
        .parse()
        .map_err(|_| Error::UnknownCrs(code.to_string()))?;

    let canonical = format!("EPSG:{epsg}");
    if let Some(crs) = BUILTIN.into_iter().find(|crs| crs.code == canonical) {
        return Ok(crs.clone());
    }

    let def = crs_definitions::from_code(epsg).ok_or_else(|| Error::UnknownCrs(code.to_string()))?;
    log::debug!("{canonical} resolved through crs-definitions: {}", def.proj4);

    Ok(Crs {
        code: Cow::Owned(canonical),
        name: Cow::Owned(format!("EPSG:{epsg}")),
        projection: Projection::Proj4 {
            epsg,
            geographic: def.proj4.contains("+proj=longlat"),
        },
    })
}

impl Crs {
    pub fn kind(&self) -> CrsKind {
        match self.projection {
            Projection::Geographic => CrsKind::Geographic,
            Projection::Proj4 {
                geographic: true, ..
            } => CrsKind::Geographic,
            _ => CrsKind::Projected,
        }
    }

    fn domain_error(&self, point: Coord, reason: &str) -> Error {
        Error::projection(self.code.clone(), point, reason)
    }

    /// point expressed in this CRS to WGS84 (lon, lat) degrees
    pub fn to_geographic(&self, point: Coord) -> Result<Coord> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(self.domain_error(point, "coordinate is not a finite number"));
        }

        let (lon, lat) = match &self.projection {
            Projection::Geographic => (point.x, point.y),
            Projection::WebMercator => {
                if point.x.abs() > mercator::HALF_WORLD * (1. + 1e-9)
                    || point.y.abs() > mercator::HALF_WORLD * (1. + 1e-9)
                {
                    return Err(self.domain_error(point, "outside the web mercator square"));
                }
                mercator::inverse(point.x, point.y)
            }
            Projection::Lambert(zone) => {
                let (lon, lat) = zone.unproject_wgs84(point.x, point.y);
                if !REGIONAL_ENVELOPE.contains(lon, lat) {
                    return Err(self.domain_error(point, "outside the zone validity envelope"));
                }
                (lon, lat)
            }
            Projection::Proj4 { epsg, geographic } => {
                let local = Proj::from_epsg_code(*epsg)?;
                let wgs = Proj::from_epsg_code(4326)?;

                // proj4rs works in radians for geographic systems
                let mut p = if *geographic {
                    (point.x.to_radians(), point.y.to_radians())
                } else {
                    (point.x, point.y)
                };
                transform(&local, &wgs, &mut p)?;
                (p.0.to_degrees(), p.1.to_degrees())
            }
        };

        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90. {
            return Err(self.domain_error(point, "numeric overflow"));
        }
        Ok(Coord { x: lon, y: lat })
    }

    /// WGS84 (lon, lat) degrees to a point expressed in this CRS
    pub fn project(&self, lon_lat: Coord) -> Result<Coord> {
        let Coord { x: lon, y: lat } = lon_lat;
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90. {
            return Err(self.domain_error(lon_lat, "not a valid longitude/latitude"));
        }

        let (x, y) = match &self.projection {
            Projection::Geographic => (lon, lat),
            Projection::WebMercator => {
                if lat.abs() > mercator::MAX_LATITUDE {
                    return Err(self.domain_error(lon_lat, "latitude beyond the web mercator limit"));
                }
                mercator::forward(lon, lat)
            }
            Projection::Lambert(zone) => {
                if !REGIONAL_ENVELOPE.contains(lon, lat) {
                    return Err(self.domain_error(lon_lat, "outside the zone validity envelope"));
                }
                zone.project_wgs84(lon, lat)
            }
            Projection::Proj4 { epsg, geographic } => {
                let local = Proj::from_epsg_code(*epsg)?;
                let wgs = Proj::from_epsg_code(4326)?;

                let mut p = (lon.to_radians(), lat.to_radians());
                transform(&wgs, &local, &mut p)?;
                if *geographic {
                    (p.0.to_degrees(), p.1.to_degrees())
                } else {
                    p
                }
            }
        };

        if !x.is_finite() || !y.is_finite() {
            return Err(self.domain_error(lon_lat, "numeric overflow"));
        }
        Ok(Coord { x, y })
    }

    /// point expressed in this CRS to the display CRS
    pub fn to_display(&self, point: Coord) -> Result<Coord> {
        forward(point, self, &WEB_MERCATOR)
    }
}

/// Transforms `point` from `from` to `to`, passing through WGS84
pub fn forward(point: Coord, from: &Crs, to: &Crs) -> Result<Coord> {
    if from.code == to.code {
        return Ok(point);
    }
    let lon_lat = from.to_geographic(point)?;
    to.project(lon_lat)
}

/// display CRS to WGS84 (lon, lat)
pub fn display_to_geographic(point: Coord) -> Result<Coord> {
    WEB_MERCATOR.to_geographic(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_builtin_and_aliases() {
        assert_eq!(lookup("EPSG:26191").unwrap(), MERCHICH_NORD_MAROC);
        assert_eq!(lookup("epsg:3857").unwrap(), WEB_MERCATOR);
        assert_eq!(lookup(" 4326 ").unwrap(), WGS84);
        assert!(matches!(lookup("EPSG:abc"), Err(Error::UnknownCrs(_))));
        assert_eq!(regional_zones().count(), 4);
    }

    #[test]
    fn test_zone_origin_reprojects_to_reference_point() {
        let p = forward(
            Coord {
                x: 500_000.,
                y: 300_000.,
            },
            &MERCHICH_NORD_MAROC,
            &WGS84,
        )
        .unwrap();

        assert!((p.x + 5.4).abs() < 0.01, "lon {}", p.x);
        assert!((p.y - 33.3).abs() < 0.01, "lat {}", p.y);
    }

    #[test]
    fn test_zone_round_trip_within_a_millimeter() {
        for zone in regional_zones() {
            let zone_origin = match &zone.projection {
                Projection::Lambert(z) => z,
                _ => unreachable!(),
            };
            for dx in [-150_000., -20_000., 0., 35_000., 120_000.] {
                for dy in [-100_000., 0., 80_000.] {
                    let p = Coord {
                        x: zone_origin.false_easting + dx,
                        y: zone_origin.false_northing + dy,
                    };
                    let geographic = zone.to_geographic(p).unwrap();
                    let again = zone
                        .to_geographic(zone.project(geographic).unwrap())
                        .unwrap();

                    let meters_lat = (again.y - geographic.y).abs() * 111_320.;
                    let meters_lon =
                        (again.x - geographic.x).abs() * 111_320. * geographic.y.to_radians().cos();
                    assert!(meters_lat < 1e-3 && meters_lon < 1e-3, "{} {:?}", zone.code, p);
                }
            }
        }
    }

    #[test]
    fn test_outside_envelope_is_rejected() {
        let paris = Coord { x: 2.35, y: 48.85 };
        let err = MERCHICH_NORD_MAROC.project(paris).unwrap_err();
        assert!(matches!(err, Error::Projection { .. }));

        let far_east = Coord {
            x: 3_000_000.,
            y: 300_000.,
        };
        assert!(MERCHICH_NORD_MAROC.to_geographic(far_east).is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let casablanca = Coord {
            x: -7.5898,
            y: 33.5731,
        };
        let display = WGS84.to_display(casablanca).unwrap();
        let back = display_to_geographic(display).unwrap();

        assert!((back.x - casablanca.x).abs() < 1e-12);
        assert!((back.y - casablanca.y).abs() < 1e-12);
        assert!(WEB_MERCATOR
            .project(Coord { x: 0., y: 89. })
            .is_err());
    }

    #[test]
    fn test_non_finite_input() {
        let bad = Coord {
            x: f64::NAN,
            y: 1.,
        };
        assert!(WEB_MERCATOR.to_geographic(bad).is_err());
    }
}
