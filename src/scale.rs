//! Conversion between map scale denominators and display resolution.
//!
//! The display CRS is conformal, so one projected unit only equals one ground
//! meter at the equator. Ground distance shrinks with `cos(latitude)`.

use crate::{Error, Result};

use std::fmt;
use std::str::FromStr;

pub const METERS_PER_INCH: f64 = 0.0254;
pub const DOTS_PER_INCH: f64 = 96.;
/// size of one screen pixel in meters at 96 dpi
pub const METERS_PER_DOT: f64 = METERS_PER_INCH / DOTS_PER_INCH;

pub const MAX_LATITUDE: f64 = 89.5;

fn latitude_factor(latitude: f64) -> Result<f64> {
    if latitude.is_nan() || latitude.abs() >= MAX_LATITUDE {
        return Err(Error::InvalidLatitude(latitude));
    }
    Ok(latitude.to_radians().cos())
}

fn positive(value: f64) -> Result<f64> {
    if value.is_finite() && value > 0. {
        Ok(value)
    } else {
        Err(Error::InvalidScale(value))
    }
}

/// Display CRS units per pixel for the scale `1:scale_denominator` at `latitude`
pub fn resolution_for_scale(scale_denominator: f64, latitude: f64) -> Result<f64> {
    let cos = latitude_factor(latitude)?;
    Ok(positive(scale_denominator)? * METERS_PER_DOT / cos)
}

/// Scale denominator shown by a map drawn at `resolution` display units per pixel
pub fn scale_for_resolution(resolution: f64, latitude: f64) -> Result<f64> {
    let cos = latitude_factor(latitude)?;
    Ok(positive(resolution)? * cos / METERS_PER_DOT)
}

/// Ground meters covered by one pixel at `resolution`
pub fn ground_resolution(resolution: f64, latitude: f64) -> Result<f64> {
    Ok(positive(resolution)? * latitude_factor(latitude)?)
}

/// A scale denominator and the label it is presented with
#[derive(Clone, Debug, PartialEq)]
pub struct Scale {
    denominator: f64,
    label: String,
}

impl Scale {
    pub fn new(denominator: f64) -> Result<Self> {
        let denominator = positive(denominator)?;
        Ok(Scale {
            label: default_label(denominator),
            denominator,
        })
    }

    pub fn with_label(denominator: f64, label: impl Into<String>) -> Result<Self> {
        Ok(Scale {
            denominator: positive(denominator)?,
            label: label.into(),
        })
    }

    pub fn denominator(&self) -> f64 {
        self.denominator
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// the label as it appears in exported file names
    pub fn file_label(&self) -> String {
        self.label.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

/// "25k" for 1:25 000, plain number otherwise
fn default_label(denominator: f64) -> String {
    let rounded = denominator.round();
    if (denominator - rounded).abs() < 1e-9 && rounded >= 1000. && rounded % 1000. == 0. {
        format!("{}k", rounded as u64 / 1000)
    } else if (denominator - rounded).abs() < 1e-9 {
        format!("{}", rounded as u64)
    } else {
        format!("{denominator}")
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1:{}", self.denominator)
    }
}

/// Accepts "1:25000", "1:25 000" or "25000"
impl FromStr for Scale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits: String = s
            .trim()
            .trim_start_matches("1:")
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
            .collect();
        let denominator = digits.parse::<f64>().map_err(|_| Error::InvalidScale(f64::NAN))?;
        Scale::new(denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equator_resolution() {
        let res = resolution_for_scale(1000., 0.).unwrap();
        assert!((res - 0.264_583_333_333).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_law() {
        for &scale in &[1., 500., 1000., 25_000., 1e6, 3.3e7] {
            for &lat in &[-89.4, -60., -33.3, 0., 12.5, 33.5731, 70., 89.49] {
                let res = resolution_for_scale(scale, lat).unwrap();
                let back = scale_for_resolution(res, lat).unwrap();
                assert!(((back - scale) / scale).abs() < 1e-4, "{scale} {lat} {back}");
            }
        }
    }

    #[test]
    fn test_latitude_increases_resolution() {
        let equator = resolution_for_scale(1000., 0.).unwrap();
        let north = resolution_for_scale(1000., 60.).unwrap();
        assert!((north / equator - 2.).abs() < 1e-9);
        assert!((ground_resolution(north, 60.).unwrap() - equator).abs() < 1e-12);
    }

    #[test]
    fn test_polar_latitudes_rejected() {
        assert!(matches!(
            resolution_for_scale(1000., 89.5),
            Err(Error::InvalidLatitude(_))
        ));
        assert!(matches!(
            scale_for_resolution(1., -90.),
            Err(Error::InvalidLatitude(_))
        ));
        assert!(matches!(
            scale_for_resolution(1., f64::NAN),
            Err(Error::InvalidLatitude(_))
        ));
    }

    #[test]
    fn test_non_positive_scale() {
        assert!(matches!(
            resolution_for_scale(0., 10.),
            Err(Error::InvalidScale(_))
        ));
        assert!(Scale::new(-5.).is_err());
    }

    #[test]
    fn test_scale_parsing_and_labels() {
        let scale: Scale = "1:25 000".parse().unwrap();
        assert_eq!(scale.denominator(), 25_000.);
        assert_eq!(scale.label(), "25k");
        assert_eq!(scale.to_string(), "1:25000");

        let scale = Scale::with_label(1000., " 1 km").unwrap();
        assert_eq!(scale.file_label(), "1km");

        assert_eq!(Scale::new(1500.).unwrap().label(), "1500");
        assert!("abc".parse::<Scale>().is_err());
    }
}
