use super::{geographic, ImportFormat, SourceFeatures};
use crate::geometry::{AttributeValue, Attributes, Feature, Geometry};
use crate::{Error, Result};

use ::geojson::{GeoJson, JsonObject, Value};
use geo::{Coord, LineString, MultiPolygon, Point, Polygon};
use serde_json::Value as JsonValue;

fn attribute(value: &JsonValue) -> Option<AttributeValue> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(AttributeValue::Bool(*b)),
        JsonValue::Number(n) => n.as_f64().map(AttributeValue::Number),
        JsonValue::String(s) => Some(AttributeValue::Text(s.clone())),
        other => Some(AttributeValue::Text(other.to_string())),
    }
}

fn attributes(properties: Option<&JsonObject>) -> Attributes {
    properties
        .into_iter()
        .flat_map(|p| p.iter())
        .filter_map(|(k, v)| attribute(v).map(|v| (k.clone(), v)))
        .collect()
}

fn coord(position: &[f64]) -> Result<Coord> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(Error::InvalidGeometry(format!(
            "position with {} values",
            position.len()
        ))),
    }
}

fn coords(positions: &[Vec<f64>]) -> Result<Vec<Coord>> {
    positions.iter().map(|p| coord(p)).collect()
}

/// outer ring only, holes are not kept
fn polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon> {
    let outer = rings
        .first()
        .ok_or_else(|| Error::InvalidGeometry("polygon without rings".to_string()))?;
    match Geometry::polygon(coords(outer)?)? {
        Geometry::Polygon(p) => Ok(p),
        _ => Err(Error::InvalidGeometry("expected a polygon".to_string())),
    }
}

/// One GeoJSON geometry as one or more of ours, multi geometries other than
/// multipolygons are split
fn geometries(value: &Value) -> Result<Vec<Geometry>> {
    Ok(match value {
        Value::Point(p) => vec![Geometry::Point(Point(coord(p)?))],
        Value::MultiPoint(points) => points
            .iter()
            .map(|p| Ok(Geometry::Point(Point(coord(p)?))))
            .collect::<Result<_>>()?,
        Value::LineString(line) => vec![Geometry::line(coords(line)?)?],
        Value::MultiLineString(lines) => lines
            .iter()
            .map(|l| Geometry::line(coords(l)?))
            .collect::<Result<_>>()?,
        Value::Polygon(rings) => vec![Geometry::Polygon(polygon(rings)?)],
        Value::MultiPolygon(polygons) => {
            let polygons = polygons
                .iter()
                .map(|rings| polygon(rings))
                .collect::<Result<Vec<_>>>()?;
            vec![Geometry::MultiPolygon(MultiPolygon::new(polygons))]
        }
        Value::GeometryCollection(collection) => {
            let mut all = Vec::new();
            for geometry in collection {
                all.extend(geometries(&geometry.value)?);
            }
            all
        }
    })
}

pub(crate) fn parse(text: &str) -> Result<SourceFeatures> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| Error::parse(ImportFormat::GeoJson, e))?;

    let entries: Vec<(Option<::geojson::Geometry>, Attributes)> = match geojson {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .map(|f| {
                let attributes = attributes(f.properties.as_ref());
                (f.geometry, attributes)
            })
            .collect(),
        GeoJson::Feature(f) => {
            let attributes = attributes(f.properties.as_ref());
            vec![(f.geometry, attributes)]
        }
        GeoJson::Geometry(g) => vec![(Some(g), Attributes::new())],
    };

    let mut features = Vec::new();
    let mut skipped = 0;
    for (geometry, attributes) in entries {
        let Some(geometry) = geometry else {
            log::warn!("GeoJSON feature without geometry skipped");
            skipped += 1;
            continue;
        };
        match geometries(&geometry.value) {
            Ok(list) => features.extend(
                list.into_iter()
                    .map(|g| Feature::with_attributes(g, attributes.clone())),
            ),
            Err(e) => {
                log::warn!("GeoJSON feature skipped: {e}");
                skipped += 1;
            }
        }
    }

    Ok(geographic(features, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "name": "Parcel 12", "area": 1520.5, "built": false, "note": null },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[-6.84, 34.01], [-6.83, 34.01], [-6.83, 34.02], [-6.84, 34.02], [-6.84, 34.01]],
                        [[-6.838, 34.012], [-6.836, 34.012], [-6.836, 34.014], [-6.838, 34.012]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "MultiPoint", "coordinates": [[-6.8, 34.0], [-6.7, 34.1, 12.0]] }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "LineString", "coordinates": [[-6.8, 34.0]] }
            },
            { "type": "Feature", "properties": {}, "geometry": null }
        ]
    }"#;

    #[test]
    fn test_collection() {
        let source = parse(COLLECTION).unwrap();

        assert_eq!(source.crs.code, "EPSG:4326");
        assert_eq!(source.features.len(), 3);
        assert_eq!(source.skipped, 2);

        let parcel = &source.features[0];
        match &parcel.geometry {
            Geometry::Polygon(p) => {
                assert_eq!(p.exterior().0.len(), 5);
                assert!(p.interiors().is_empty());
            }
            _ => panic!("expected polygon"),
        }
        assert_eq!(
            parcel.attributes.get("name"),
            Some(&AttributeValue::from("Parcel 12"))
        );
        assert_eq!(parcel.attributes.get("area"), Some(&AttributeValue::Number(1520.5)));
        assert_eq!(parcel.attributes.get("built"), Some(&AttributeValue::Bool(false)));
        assert!(parcel.attributes.get("note").is_none());

        assert_eq!(
            source.features[2].geometry,
            Geometry::Point(Point::new(-6.7, 34.1))
        );
    }

    #[test]
    fn test_bare_geometry() {
        let source = parse(r#"{"type": "Point", "coordinates": [-5.0, 33.0]}"#).unwrap();
        assert_eq!(source.features.len(), 1);
        assert!(source.features[0].attributes.is_empty());
    }
}
