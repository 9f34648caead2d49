use super::{geographic, ImportFormat, SourceFeatures};
use crate::geometry::{Attributes, Feature, Geometry};
use crate::{Error, Result};

use geo::{Coord, MultiPolygon, Point};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use std::io::{Cursor, Read};

/// The placemark being read
#[derive(Default)]
struct Placemark {
    name: Option<String>,
    attributes: Attributes,
    geometries: Vec<Geometry>,
    /// key of the `<Data>` element currently open
    data_key: Option<String>,
    failed: usize,
}

impl Placemark {
    fn into_features(self) -> Vec<Feature> {
        let Placemark {
            name,
            mut attributes,
            geometries,
            ..
        } = self;
        if let Some(name) = &name {
            attributes.insert("name", name.as_str());
        }

        // polygons of a MultiGeometry stay together
        let (polygons, others): (Vec<_>, Vec<_>) = geometries
            .into_iter()
            .partition(|g| matches!(g, Geometry::Polygon(_)));
        let mut geometries = others;
        match polygons.len() {
            0 => {}
            1 => geometries.extend(polygons),
            _ => geometries.push(Geometry::MultiPolygon(MultiPolygon::new(
                polygons
                    .into_iter()
                    .filter_map(|g| match g {
                        Geometry::Polygon(p) => Some(p),
                        _ => None,
                    })
                    .collect(),
            ))),
        }

        geometries
            .into_iter()
            .map(|g| Feature {
                label: name.clone(),
                ..Feature::with_attributes(g, attributes.clone())
            })
            .collect()
    }
}

/// "lon,lat[,alt]" tuples separated by whitespace
fn parse_coordinates(text: &str) -> Result<Vec<Coord>> {
    text.split_whitespace()
        .map(|tuple| {
            let mut values = tuple.split(',').map(|v| v.trim().parse::<f64>());
            match (values.next(), values.next()) {
                (Some(Ok(x)), Some(Ok(y))) => Ok(Coord { x, y }),
                _ => Err(Error::InvalidGeometry(format!("bad coordinate tuple {tuple}"))),
            }
        })
        .collect()
}

fn attribute(e: &BytesStart, key: &str, format: ImportFormat) -> Result<Option<String>> {
    match e.try_get_attribute(key).map_err(|e| Error::parse(format, e))? {
        Some(a) => Ok(Some(
            a.unescape_value()
                .map_err(|e| Error::parse(format, e))?
                .to_string(),
        )),
        None => Ok(None),
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

/// Reads placemarks with points, lines and polygon outer rings. Styles and
/// polygon holes are ignored.
pub(crate) fn parse(text: &str, format: ImportFormat) -> Result<SourceFeatures> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut placemark: Option<Placemark> = None;
    let mut text_buffer = String::new();

    let mut features = Vec::new();
    let mut skipped = 0;

    loop {
        match reader.read_event().map_err(|e| Error::parse(format, e))? {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "Placemark" {
                    placemark = Some(Placemark::default());
                } else if let (Some(p), "Data" | "SimpleData") = (placemark.as_mut(), name.as_str()) {
                    p.data_key = attribute(&e, "name", format)?;
                }
                text_buffer.clear();
                path.push(name);
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|e| Error::parse(format, e))?;
                text_buffer.push_str(&text);
            }
            Event::CData(e) => {
                text_buffer.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(_) => {
                let Some(name) = path.pop() else {
                    return Err(Error::parse(format, "unbalanced closing tag"));
                };
                let parent = path.last().map(String::as_str);
                let text = std::mem::take(&mut text_buffer);

                if name == "Placemark" {
                    if let Some(p) = placemark.take() {
                        if p.geometries.is_empty() && p.failed == 0 {
                            log::warn!("{format} placemark without geometry skipped");
                            skipped += 1;
                        }
                        skipped += p.failed;
                        features.extend(p.into_features());
                    }
                    continue;
                }
                let Some(p) = placemark.as_mut() else {
                    continue;
                };

                match (name.as_str(), parent) {
                    ("name", Some("Placemark")) => p.name = Some(text.trim().to_string()),
                    ("value", Some("Data")) | ("SimpleData", _) => {
                        if let Some(key) = p.data_key.take() {
                            p.attributes.insert(key, text.trim());
                        }
                    }
                    ("coordinates", Some(kind)) => {
                        let in_hole = path.iter().any(|n| n == "innerBoundaryIs");
                        let geometry = parse_coordinates(&text).and_then(|c| match kind {
                            "Point" => c
                                .first()
                                .map(|c| Geometry::Point(Point(*c)))
                                .ok_or_else(|| Error::InvalidGeometry("empty point".to_string())),
                            "LineString" => Geometry::line(c),
                            "LinearRing" if !in_hole => Geometry::polygon(c),
                            _ => Err(Error::InvalidGeometry(format!("coordinates in {kind}"))),
                        });
                        match geometry {
                            Ok(g) => p.geometries.push(g),
                            Err(_) if in_hole => {}
                            Err(e) => {
                                log::warn!("{format} geometry skipped: {e}");
                                p.failed += 1;
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if features.is_empty() && skipped == 0 {
        log::warn!("{format} file holds no placemarks");
    }
    Ok(geographic(features, skipped))
}

/// KMZ is a zip holding `doc.kml` (or any .kml) next to icons and overlays
pub(crate) fn parse_kmz(bytes: &[u8]) -> Result<SourceFeatures> {
    let format = ImportFormat::Kmz;
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::parse(format, e))?;

    let entry = archive
        .file_names()
        .filter(|n| n.to_ascii_lowercase().ends_with(".kml"))
        .min_by_key(|n| (!n.eq_ignore_ascii_case("doc.kml"), n.to_string()))
        .map(str::to_string)
        .ok_or_else(|| Error::parse(format, "archive holds no .kml document"))?;
    log::debug!("Reading {entry} from kmz");

    let mut text = String::new();
    archive
        .by_name(&entry)
        .map_err(|e| Error::parse(format, e))?
        .read_to_string(&mut text)
        .map_err(|e| Error::parse(format, e))?;

    parse(&text, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AttributeValue;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Survey</name>
    <Placemark>
      <name>Well &amp; pump</name>
      <ExtendedData>
        <Data name="depth"><value>42</value></Data>
      </ExtendedData>
      <Point><coordinates>-6.83,34.02,0</coordinates></Point>
    </Placemark>
    <Placemark>
      <name>Field</name>
      <Polygon>
        <outerBoundaryIs><LinearRing><coordinates>
          -6.84,34.01 -6.83,34.01 -6.83,34.02 -6.84,34.01
        </coordinates></LinearRing></outerBoundaryIs>
        <innerBoundaryIs><LinearRing><coordinates>
          -6.836,34.012 -6.835,34.012 -6.835,34.013 -6.836,34.012
        </coordinates></LinearRing></innerBoundaryIs>
      </Polygon>
    </Placemark>
    <Placemark>
      <MultiGeometry>
        <Polygon><outerBoundaryIs><LinearRing><coordinates>0,0 1,0 1,1 0,0</coordinates></LinearRing></outerBoundaryIs></Polygon>
        <Polygon><outerBoundaryIs><LinearRing><coordinates>2,0 3,0 3,1 2,0</coordinates></LinearRing></outerBoundaryIs></Polygon>
        <LineString><coordinates>0,2 1,2</coordinates></LineString>
      </MultiGeometry>
    </Placemark>
    <Placemark><name>Broken</name><Point><coordinates>abc</coordinates></Point></Placemark>
  </Document>
</kml>"#;

    #[test]
    fn test_placemarks() {
        let source = parse(DOCUMENT, ImportFormat::Kml).unwrap();

        assert_eq!(source.features.len(), 4);
        assert_eq!(source.skipped, 1);

        let well = &source.features[0];
        assert_eq!(well.label.as_deref(), Some("Well & pump"));
        assert_eq!(well.attributes.get("depth"), Some(&AttributeValue::from("42")));
        assert_eq!(well.geometry, Geometry::Point(Point::new(-6.83, 34.02)));

        match &source.features[1].geometry {
            Geometry::Polygon(p) => {
                assert_eq!(p.exterior().0.len(), 4);
                assert!(p.interiors().is_empty());
            }
            other => panic!("expected polygon, got {other:?}"),
        }

        assert!(matches!(source.features[2].geometry, Geometry::LineString(_)));
        match &source.features[3].geometry {
            Geometry::MultiPolygon(m) => assert_eq!(m.0.len(), 2),
            other => panic!("expected multipolygon, got {other:?}"),
        }
    }

    #[test]
    fn test_kmz() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file("files/style.txt", options).unwrap();
        zip.write_all(b"not kml").unwrap();
        zip.start_file("doc.kml", options).unwrap();
        zip.write_all(DOCUMENT.as_bytes()).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let source = parse_kmz(&bytes).unwrap();
        assert_eq!(source.features.len(), 4);

        assert!(matches!(
            parse_kmz(b"plain text"),
            Err(Error::Parse {
                format: ImportFormat::Kmz,
                ..
            })
        ));
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse("<kml><Placemark></kml>", ImportFormat::Kml).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
