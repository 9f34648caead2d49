use super::{ImportFormat, SourceFeatures};
use crate::geometry::{Attributes, Feature, Geometry};
use crate::projection::Crs;
use crate::{Error, Result};

use ::dxf::entities::{Entity, EntityType};
use ::dxf::Drawing;
use geo::{Coord, Point};

use std::f64::consts::TAU;
use std::io::Cursor;

/// segments used to approximate circles
const CIRCLE_SEGMENTS: usize = 64;

fn coord(p: &::dxf::Point) -> Coord {
    Coord { x: p.x, y: p.y }
}

fn path(coords: Vec<Coord>, closed: bool) -> Result<Geometry> {
    if closed {
        Geometry::polygon(coords)
    } else {
        Geometry::line(coords)
    }
}

/// `None` for entities without a map geometry (dimensions, blocks, hatches, ...)
fn entity_geometry(entity: &Entity) -> Option<Result<Geometry>> {
    Some(match &entity.specific {
        EntityType::Line(line) => Geometry::line(vec![coord(&line.p1), coord(&line.p2)]),
        EntityType::LwPolyline(polyline) => path(
            polyline
                .vertices
                .iter()
                .map(|v| Coord { x: v.x, y: v.y })
                .collect(),
            polyline.is_closed(),
        ),
        EntityType::Polyline(polyline) => path(
            polyline.vertices().map(|v| coord(&v.location)).collect(),
            polyline.is_closed(),
        ),
        EntityType::Circle(circle) => Geometry::polygon(
            (0..CIRCLE_SEGMENTS)
                .map(|i| {
                    let angle = TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                    Coord {
                        x: circle.center.x + circle.radius * angle.cos(),
                        y: circle.center.y + circle.radius * angle.sin(),
                    }
                })
                .collect(),
        ),
        EntityType::ModelPoint(point) => Ok(Geometry::Point(Point(coord(&point.location)))),
        EntityType::Text(text) => Ok(Geometry::Point(Point(coord(&text.location)))),
        _ => return None,
    })
}

/// Reads lines, polylines, circles, points and texts. Coordinates are in `zone`.
pub(crate) fn parse(bytes: &[u8], zone: Crs) -> Result<SourceFeatures> {
    let drawing = Drawing::load(&mut Cursor::new(bytes))
        .map_err(|e| Error::parse(ImportFormat::Dxf, e))?;

    let mut features = Vec::new();
    let mut skipped = 0;
    let mut ignored = 0;

    for entity in drawing.entities() {
        let geometry = match entity_geometry(entity) {
            Some(Ok(geometry)) => geometry,
            Some(Err(e)) => {
                log::warn!("DXF entity on layer {} skipped: {e}", entity.common.layer);
                skipped += 1;
                continue;
            }
            None => {
                ignored += 1;
                continue;
            }
        };

        let mut attributes = Attributes::new();
        attributes.insert("layer", entity.common.layer.as_str());
        let mut feature = Feature::with_attributes(geometry, attributes);
        if let EntityType::Text(text) = &entity.specific {
            feature.attributes.insert("text", text.value.as_str());
            feature.label = Some(text.value.clone());
        }
        features.push(feature);
    }

    if ignored > 0 {
        log::debug!("{ignored} DXF entities without map geometry ignored");
    }

    Ok(SourceFeatures {
        crs: zone,
        features,
        skipped,
    })
}
