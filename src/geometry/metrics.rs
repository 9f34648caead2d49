use super::{extent_of, Extent, Feature, Geometry};
use crate::projection::display_to_geographic;
use crate::scale::scale_for_resolution;
use crate::Result;

use geo::orient::{Direction, Orient};
use geo::{Coord, GeodesicArea, MapCoords, Polygon};

/// Ground measurements of a single feature, on the WGS84 ellipsoid
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Metrics {
    pub area_sq_meters: Option<f64>,
    pub perimeter_meters: Option<f64>,
}

fn geographic_polygon(polygon: &Polygon) -> Result<Polygon> {
    let exterior_only = Polygon::new(polygon.exterior().clone(), vec![]);
    let polygon: Polygon = exterior_only.try_map_coords(display_to_geographic)?;
    Ok(polygon.orient(Direction::Default))
}

fn polygon_metrics(polygon: &Polygon) -> Result<(f64, f64)> {
    let polygon = geographic_polygon(polygon)?;
    Ok((polygon.geodesic_area_unsigned(), polygon.geodesic_perimeter()))
}

#[allow(deprecated)]
fn line_length(line: &geo::LineString) -> Result<f64> {
    use geo::GeodesicLength;
    let line: geo::LineString = line.try_map_coords(display_to_geographic)?;
    Ok(line.geodesic_length())
}

/// Area for polygons, perimeter for polygons and length for lines
pub fn metrics_of(feature: &Feature) -> Result<Metrics> {
    Ok(match &feature.geometry {
        Geometry::Point(_) => Metrics::default(),
        Geometry::LineString(line) => Metrics {
            area_sq_meters: None,
            perimeter_meters: Some(line_length(line)?),
        },
        Geometry::Polygon(polygon) => {
            let (area, perimeter) = polygon_metrics(polygon)?;
            Metrics {
                area_sq_meters: Some(area),
                perimeter_meters: Some(perimeter),
            }
        }
        Geometry::MultiPolygon(multi) => {
            let mut area = 0.;
            let mut perimeter = 0.;
            for polygon in &multi.0 {
                let (a, p) = polygon_metrics(polygon)?;
                area += a;
                perimeter += p;
            }
            Metrics {
                area_sq_meters: Some(area),
                perimeter_meters: Some(perimeter),
            }
        }
    })
}

/// What the map shows about the current selection
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionSummary {
    pub extent: Extent,
    pub center: Coord,
    /// center as WGS84 (lon, lat)
    pub center_lon_lat: Coord,
    pub area_sq_meters: Option<f64>,
    pub perimeter_meters: Option<f64>,
    /// scale implied by `resolution` at the center latitude
    pub scale_denominator: Option<f64>,
}

/// `None` for an empty selection
pub fn summarize<'a>(
    features: impl IntoIterator<Item = &'a Feature> + Clone,
    resolution: Option<f64>,
) -> Result<Option<SelectionSummary>> {
    let Some(extent) = extent_of(features.clone()) else {
        return Ok(None);
    };
    let center = extent.center();
    let center_lon_lat = display_to_geographic(center)?;

    let mut area: Option<f64> = None;
    let mut perimeter: Option<f64> = None;
    for feature in features {
        let metrics = metrics_of(feature)?;
        if let Some(a) = metrics.area_sq_meters {
            *area.get_or_insert(0.) += a;
        }
        if let Some(p) = metrics.perimeter_meters {
            *perimeter.get_or_insert(0.) += p;
        }
    }

    let scale_denominator = resolution
        .map(|res| scale_for_resolution(res, center_lon_lat.y))
        .transpose()?;

    Ok(Some(SelectionSummary {
        extent,
        center,
        center_lon_lat,
        area_sq_meters: area,
        perimeter_meters: perimeter,
        scale_denominator,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::WGS84;
    use geo::{LineString, Point};

    /// 0.01 degree square around (lon, lat), converted into the display CRS
    fn geographic_square(lon: f64, lat: f64, clockwise: bool) -> Feature {
        let mut ring = vec![
            Coord { x: lon, y: lat },
            Coord { x: lon + 0.01, y: lat },
            Coord {
                x: lon + 0.01,
                y: lat + 0.01,
            },
            Coord { x: lon, y: lat + 0.01 },
        ];
        if clockwise {
            ring.reverse();
        }
        let geometry = Geometry::polygon(ring).unwrap().to_display(&WGS84).unwrap();
        Feature::new(geometry)
    }

    #[test]
    fn test_polygon_area_matches_ground() {
        let metrics = metrics_of(&geographic_square(-6.8, 34., false)).unwrap();
        let area = metrics.area_sq_meters.unwrap();

        // 0.01 degrees is ~1109 m north-south and ~923 m east-west at 34N
        let expected = 1109. * 923.;
        assert!((area - expected).abs() / expected < 0.01, "{area}");
        assert!(metrics.perimeter_meters.unwrap() > 4000.);
    }

    #[test]
    fn test_winding_does_not_change_area() {
        let ccw = metrics_of(&geographic_square(-6.8, 34., false)).unwrap();
        let cw = metrics_of(&geographic_square(-6.8, 34., true)).unwrap();

        let (a, b) = (ccw.area_sq_meters.unwrap(), cw.area_sq_meters.unwrap());
        assert!(a >= 0. && b >= 0.);
        assert!((a - b).abs() < 1e-6 * a);
    }

    #[test]
    fn test_line_and_point() {
        let line = Geometry::LineString(LineString::from(vec![(0., 0.), (0., 1.)]))
            .to_display(&WGS84)
            .unwrap();
        let metrics = metrics_of(&Feature::new(line)).unwrap();

        assert!(metrics.area_sq_meters.is_none());
        // one degree of latitude at the equator
        assert!((metrics.perimeter_meters.unwrap() - 110_574.).abs() < 5.);

        let point = metrics_of(&Feature::new(Geometry::Point(Point::new(0., 0.)))).unwrap();
        assert_eq!(point, Metrics::default());
    }

    #[test]
    fn test_summary() {
        let features = vec![
            geographic_square(-6.8, 34., false),
            geographic_square(-6.7, 34.1, false),
        ];
        let summary = summarize(&features, Some(1.)).unwrap().unwrap();

        assert!((summary.center_lon_lat.x + 6.745).abs() < 1e-9);
        assert!(summary.area_sq_meters.unwrap() > 2. * 1109. * 900.);
        let scale = summary.scale_denominator.unwrap();
        let expected = (34.055f64).to_radians().cos() / crate::scale::METERS_PER_DOT;
        assert!((scale - expected).abs() / expected < 1e-3);

        let empty: Vec<Feature> = vec![];
        assert!(summarize(&empty, None).unwrap().is_none());
    }
}
