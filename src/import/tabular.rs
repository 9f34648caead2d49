use super::{ImportFormat, SourceFeatures};
use crate::geometry::{Attributes, Feature, Geometry};
use crate::parameters::ImportParameters;
use crate::projection;
use crate::{Error, Result};

use csv::{ReaderBuilder, StringRecord};
use geo::Point;

const X_COLUMNS: [&str; 9] = ["x", "easting", "est", "e", "coord_x", "coordx", "x_coord", "lon", "longitude"];
const Y_COLUMNS: [&str; 9] = ["y", "northing", "nord", "n", "coord_y", "coordy", "y_coord", "lat", "latitude"];
const LABEL_COLUMNS: [&str; 6] = ["label", "name", "nom", "point", "id", "num"];

/// Parses numbers written with thousands separators, spaces (including
/// non-breaking ones) or a decimal comma: "1 234,5", "1.234,5", "1,234.5"
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}' && *c != '\'')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');
    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let normalized = match (last_comma, last_dot) {
        // the later separator is the decimal one
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if commas == 1 => cleaned.replace(',', "."),
        (Some(_), None) => cleaned.replace(',', ""),
        (None, Some(_)) if dots > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// The delimiter found most often in the header line, among ';', tab and ','
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    [b';', b'\t', b',']
        .into_iter()
        .max_by_key(|d| {
            // ties go to the earlier candidate
            let count = header.bytes().filter(|b| b == d).count();
            (count, match d {
                b';' => 2,
                b'\t' => 1,
                _ => 0,
            })
        })
        .unwrap_or(b',')
}

/// lower case alphanumeric runs of a header, "Coord. X (m)" gives ["coord", "x", "m"]
fn header_tokens(header: &str) -> Vec<String> {
    header
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// First column whose header is one of `candidates`, ignoring case and
/// punctuation. When none is, a header starting or ending with a candidate
/// word is accepted ("X (m)", "X_Lambert", "Lambert Y").
fn find_column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
    let tokens: Vec<Vec<String>> = headers.iter().map(header_tokens).collect();
    fn normalized(candidate: &str) -> String {
        header_tokens(candidate).concat()
    }

    let exact = candidates.iter().find_map(|candidate| {
        let candidate = normalized(candidate);
        tokens.iter().position(|t| t.concat() == candidate)
    });

    exact.or_else(|| {
        candidates
            .iter()
            .map(|candidate| normalized(candidate))
            // "e" and "n" alone are too common as words ("N° borne") to match on
            .filter(|candidate| candidate.len() > 1 || candidate == "x" || candidate == "y")
            .find_map(|candidate| {
                tokens.iter().position(|t| {
                    t.first() == Some(&candidate) || t.last() == Some(&candidate)
                })
            })
    })
}

/// Point rows in the zone of `params`. Rows whose coordinates do not parse
/// are skipped.
pub(crate) fn parse(bytes: &[u8], params: &ImportParameters) -> Result<SourceFeatures> {
    let format = ImportFormat::Tabular;
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}');
    let zone = projection::lookup(&params.zone)?;

    let mut reader = ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(|e| Error::parse(format, e))?.clone();
    let x = find_column(&headers, &X_COLUMNS)
        .ok_or_else(|| Error::parse(format, "no X/easting column found"))?;
    let y = find_column(&headers, &Y_COLUMNS)
        .ok_or_else(|| Error::parse(format, "no Y/northing column found"))?;
    let label = match &params.label_column {
        Some(column) => find_column(&headers, &[column.as_str()]),
        None => find_column(&headers, &LABEL_COLUMNS),
    };
    log::debug!(
        "Tabular columns: x={}, y={}, label={:?}",
        &headers[x],
        &headers[y],
        label.map(|l| &headers[l])
    );

    let mut features = Vec::new();
    let mut skipped = 0;
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Row {} skipped: {e}", row + 2);
                skipped += 1;
                continue;
            }
        };

        let coords = (
            record.get(x).and_then(parse_number),
            record.get(y).and_then(parse_number),
        );
        let (Some(px), Some(py)) = coords else {
            log::warn!("Row {} skipped: coordinates do not parse", row + 2);
            skipped += 1;
            continue;
        };

        let attributes: Attributes = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, (_, value))| *i != x && *i != y && !value.is_empty())
            .map(|(_, (key, value))| (key, value))
            .collect();

        let mut feature = Feature::with_attributes(Geometry::Point(Point::new(px, py)), attributes);
        feature.label = label
            .and_then(|l| record.get(l))
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        features.push(feature);
    }

    Ok(SourceFeatures {
        crs: zone,
        features,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{load_bytes, ImportFormat};

    #[test]
    fn test_number_formats() {
        assert_eq!(parse_number("500000"), Some(500_000.));
        assert_eq!(parse_number("500 000,25"), Some(500_000.25));
        assert_eq!(parse_number("500\u{a0}000"), Some(500_000.));
        assert_eq!(parse_number("1.234.567,5"), Some(1_234_567.5));
        assert_eq!(parse_number("1,234,567.5"), Some(1_234_567.5));
        assert_eq!(parse_number("-6,85"), Some(-6.85));
        assert_eq!(parse_number("12.5"), Some(12.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_delimiter() {
        assert_eq!(sniff_delimiter("Nom;X;Y\n"), b';');
        assert_eq!(sniff_delimiter("name\tx\ty"), b'\t');
        assert_eq!(sniff_delimiter("name,x,y"), b',');
        assert_eq!(sniff_delimiter("x"), b';');
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let mut text = String::from("Nom;X;Y;Type\n");
        for i in 0..10 {
            let x = if i == 3 || i == 7 {
                "n/a".to_string()
            } else {
                format!("{} {:03},5", 500 + i, i * 10)
            };
            text.push_str(&format!("B{i};{x};300 100,0;borne\n"));
        }

        let layer = load_bytes(
            ImportFormat::Tabular,
            "bornes",
            text.as_bytes(),
            &ImportParameters::default(),
        )
        .unwrap();

        assert_eq!(layer.features.len(), 8);
        assert_eq!(layer.skipped, 2);
        assert_eq!(layer.source_crs.code, "EPSG:26191");
        assert_eq!(layer.features[0].label.as_deref(), Some("B0"));
        assert!(layer.features[0].attributes.get("Type").is_some());
        assert!(layer.features[0].attributes.get("X").is_none());
    }

    #[test]
    fn test_label_column_and_missing_columns() {
        let params = ImportParameters {
            label_column: Some("Code".to_string()),
            ..Default::default()
        };
        let source = parse(b"Code,Easting,Northing\nP1,500000,300000\n", &params).unwrap();
        assert_eq!(source.features[0].label.as_deref(), Some("P1"));

        let source = parse(
            "N° borne;X (m);Y_Lambert;Altitude\n12;500 000,5;300 000;41\n".as_bytes(),
            &ImportParameters::default(),
        )
        .unwrap();
        assert_eq!(source.features.len(), 1);
        match &source.features[0].geometry {
            Geometry::Point(p) => assert_eq!((p.x(), p.y()), (500_000.5, 300_000.)),
            other => panic!("expected point, got {other:?}"),
        }

        assert!(matches!(
            parse(b"a,b\n1,2\n", &params),
            Err(Error::Parse {
                format: ImportFormat::Tabular,
                ..
            })
        ));
    }
}
