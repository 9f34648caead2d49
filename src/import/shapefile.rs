use super::{ImportFormat, SourceFeatures};
use crate::geometry::{AttributeValue, Attributes, Feature, Geometry};
use crate::parameters::ImportParameters;
use crate::projection::{self, Crs, MERCHICH_NORD_MAROC, MERCHICH_SAHARA_NORD, MERCHICH_SAHARA_SUD};
use crate::projection::{MERCHICH_SUD_MAROC, WEB_MERCATOR, WGS84};
use crate::{Error, Result};

use ::shapefile::dbase::{FieldValue, Record};
use ::shapefile::{PolygonRing, Shape};
use geo::{Coord, MultiPolygon, Point};

use std::fs;
use std::path::Path;

/// Zone named by the WKT of a `.prj` sidecar, `fallback` when it is not recognised
pub fn crs_from_prj(wkt: &str, fallback: Crs) -> Crs {
    let normalized = wkt.to_ascii_uppercase().replace(' ', "_");

    // ordered so "SAHARA_SUD" is not read as "SUD_MAROC"
    let by_name = [
        ("SAHARA_NORD", &MERCHICH_SAHARA_NORD),
        ("SAHARA_SUD", &MERCHICH_SAHARA_SUD),
        ("NORD_MAROC", &MERCHICH_NORD_MAROC),
        ("SUD_MAROC", &MERCHICH_SUD_MAROC),
        ("PSEUDO_MERCATOR", &WEB_MERCATOR),
    ];
    if let Some((_, crs)) = by_name.iter().find(|(key, _)| normalized.contains(key)) {
        return (*crs).clone();
    }

    // outermost AUTHORITY is the last one in the text
    const AUTHORITY: &str = "AUTHORITY[\"EPSG\",";
    if let Some(start) = normalized.rfind(AUTHORITY) {
        let code: String = normalized[start + AUTHORITY.len()..]
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(crs) = projection::lookup(&code) {
            return crs;
        }
    }

    if normalized.starts_with("GEOGCS") {
        return WGS84;
    }

    log::warn!("Unrecognised .prj, assuming {}", fallback.code);
    fallback
}

fn attribute(value: FieldValue) -> Option<AttributeValue> {
    match value {
        FieldValue::Character(Some(s)) => Some(AttributeValue::Text(s.trim().to_string())),
        FieldValue::Memo(s) => Some(AttributeValue::Text(s)),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => {
            Some(AttributeValue::Number(n))
        }
        FieldValue::Float(Some(n)) => Some(AttributeValue::Number(n as f64)),
        FieldValue::Integer(n) => Some(AttributeValue::Number(n as f64)),
        FieldValue::Logical(Some(b)) => Some(AttributeValue::Bool(b)),
        _ => None,
    }
}

fn attributes(record: Record) -> Attributes {
    let mut fields: Vec<(String, AttributeValue)> = record
        .into_iter()
        .filter_map(|(k, v)| attribute(v).map(|v| (k, v)))
        .collect();
    // dbase records are unordered
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields.into_iter().collect()
}

fn lines<P>(parts: &[Vec<P>], xy: impl Fn(&P) -> Coord) -> Result<Vec<Geometry>> {
    parts
        .iter()
        .map(|part| Geometry::line(part.iter().map(&xy).collect()))
        .collect()
}

/// outer rings of the shape, holes are not kept
fn polygons<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Coord) -> Result<Vec<Geometry>> {
    let mut outer = Vec::new();
    for ring in rings {
        if let PolygonRing::Outer(points) = ring {
            if let Geometry::Polygon(p) = Geometry::polygon(points.iter().map(&xy).collect())? {
                outer.push(p);
            }
        }
    }
    Ok(match outer.len() {
        0 => return Err(Error::InvalidGeometry("polygon without outer ring".to_string())),
        1 => vec![Geometry::Polygon(outer.remove(0))],
        _ => vec![Geometry::MultiPolygon(MultiPolygon::new(outer))],
    })
}

fn points<P>(points: &[P], xy: impl Fn(&P) -> Coord) -> Vec<Geometry> {
    points.iter().map(|p| Geometry::Point(Point(xy(p)))).collect()
}

/// Shapes as geometries, multi part lines and multipoints are split.
/// `Ok(vec![])` for null shapes.
pub(crate) fn shape_geometries(shape: &Shape) -> Result<Vec<Geometry>> {
    macro_rules! xy {
        () => {
            |p| Coord { x: p.x, y: p.y }
        };
    }

    match shape {
        Shape::NullShape => Ok(vec![]),
        Shape::Point(p) => Ok(vec![Geometry::Point(Point::new(p.x, p.y))]),
        Shape::PointM(p) => Ok(vec![Geometry::Point(Point::new(p.x, p.y))]),
        Shape::PointZ(p) => Ok(vec![Geometry::Point(Point::new(p.x, p.y))]),
        Shape::Polyline(l) => lines(l.parts(), xy!()),
        Shape::PolylineM(l) => lines(l.parts(), xy!()),
        Shape::PolylineZ(l) => lines(l.parts(), xy!()),
        Shape::Polygon(p) => polygons(p.rings(), xy!()),
        Shape::PolygonM(p) => polygons(p.rings(), xy!()),
        Shape::PolygonZ(p) => polygons(p.rings(), xy!()),
        Shape::Multipoint(m) => Ok(points(m.points(), xy!())),
        Shape::MultipointM(m) => Ok(points(m.points(), xy!())),
        Shape::MultipointZ(m) => Ok(points(m.points(), xy!())),
        Shape::Multipatch(_) => Err(Error::InvalidGeometry(
            "multipatch shapes are not supported".to_string(),
        )),
    }
}

/// Reads `path` with its `.dbf`, the zone comes from the `.prj` when present
pub(crate) fn read(path: &Path, params: &ImportParameters) -> Result<SourceFeatures> {
    let format = ImportFormat::Shapefile;
    let zone = projection::lookup(&params.zone)?;
    let crs = match fs::read_to_string(path.with_extension("prj")) {
        Ok(wkt) => crs_from_prj(&wkt, zone),
        Err(_) => {
            log::info!("No .prj next to {}, using {}", path.display(), zone.code);
            zone
        }
    };

    let mut reader = ::shapefile::Reader::from_path(path).map_err(|e| Error::parse(format, e))?;

    let mut features = Vec::new();
    let mut skipped = 0;
    for entry in reader.iter_shapes_and_records() {
        let (shape, record) = entry.map_err(|e| Error::parse(format, e))?;
        match shape_geometries(&shape) {
            Ok(geometries) if geometries.is_empty() => skipped += 1,
            Ok(geometries) => {
                let attributes = attributes(record);
                features.extend(
                    geometries
                        .into_iter()
                        .map(|g| Feature::with_attributes(g, attributes.clone())),
                );
            }
            Err(e) => {
                log::warn!("Shape skipped: {e}");
                skipped += 1;
            }
        }
    }

    Ok(SourceFeatures {
        crs,
        features,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::shapefile::{Polygon, Polyline};

    #[test]
    fn test_prj_detection() {
        let nord = r#"PROJCS["Merchich_Nord_Maroc",GEOGCS["GCS_Merchich",DATUM["D_Merchich"]]]"#;
        assert_eq!(crs_from_prj(nord, WGS84), MERCHICH_NORD_MAROC);

        let sahara = r#"PROJCS["Merchich / Sahara Sud",GEOGCS["Merchich"]]"#;
        assert_eq!(crs_from_prj(sahara, WGS84), MERCHICH_SAHARA_SUD);

        let geographic = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984"]]"#;
        assert_eq!(crs_from_prj(geographic, MERCHICH_NORD_MAROC), WGS84);

        let with_code = r#"PROJCS["Local",GEOGCS["X",AUTHORITY["EPSG","4807"]],AUTHORITY["EPSG","26192"]]"#;
        assert_eq!(crs_from_prj(with_code, WGS84), MERCHICH_SUD_MAROC);

        assert_eq!(crs_from_prj("LOCAL_CS[\"?\"]", MERCHICH_NORD_MAROC), MERCHICH_NORD_MAROC);
    }

    #[test]
    fn test_shapes() {
        let polygon = Polygon::with_rings(vec![
            PolygonRing::Outer(vec![
                ::shapefile::Point::new(0., 0.),
                ::shapefile::Point::new(0., 10.),
                ::shapefile::Point::new(10., 10.),
                ::shapefile::Point::new(0., 0.),
            ]),
            PolygonRing::Inner(vec![
                ::shapefile::Point::new(1., 1.),
                ::shapefile::Point::new(2., 1.),
                ::shapefile::Point::new(2., 2.),
                ::shapefile::Point::new(1., 1.),
            ]),
        ]);
        let geometries = shape_geometries(&Shape::Polygon(polygon)).unwrap();
        assert_eq!(geometries.len(), 1);
        match &geometries[0] {
            Geometry::Polygon(p) => assert!(p.interiors().is_empty()),
            other => panic!("expected polygon, got {other:?}"),
        }

        let line = Polyline::new(vec![
            ::shapefile::Point::new(0., 0.),
            ::shapefile::Point::new(5., 5.),
        ]);
        assert!(matches!(
            shape_geometries(&Shape::Polyline(line)).unwrap()[0],
            Geometry::LineString(_)
        ));
        assert!(shape_geometries(&Shape::NullShape).unwrap().is_empty());
    }

    #[test]
    fn test_attribute_values() {
        assert_eq!(
            attribute(FieldValue::Character(Some("Ain Sebaa  ".to_string()))),
            Some(AttributeValue::from("Ain Sebaa"))
        );
        assert_eq!(attribute(FieldValue::Integer(7)), Some(AttributeValue::Number(7.)));
        assert_eq!(attribute(FieldValue::Numeric(None)), None);
    }
}
