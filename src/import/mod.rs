//! Vector file import. Every adapter yields features in the coordinates of its
//! file, this module moves them into the display CRS.

pub mod dxf;
pub mod geojson;
pub mod kml;
pub mod shapefile;
pub mod tabular;

use crate::geometry::Feature;
use crate::parameters::ImportParameters;
use crate::projection::{self, Crs, WGS84};
use crate::{Error, Result};

use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportFormat {
    GeoJson,
    Kml,
    Kmz,
    Dxf,
    Shapefile,
    Tabular,
}

impl ImportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "geojson" | "json" => Some(ImportFormat::GeoJson),
            "kml" => Some(ImportFormat::Kml),
            "kmz" => Some(ImportFormat::Kmz),
            "dxf" => Some(ImportFormat::Dxf),
            "shp" => Some(ImportFormat::Shapefile),
            "csv" | "tsv" | "txt" => Some(ImportFormat::Tabular),
            _ => None,
        }
    }
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportFormat::GeoJson => f.write_str("GeoJSON"),
            ImportFormat::Kml => f.write_str("KML"),
            ImportFormat::Kmz => f.write_str("KMZ"),
            ImportFormat::Dxf => f.write_str("DXF"),
            ImportFormat::Shapefile => f.write_str("Shapefile"),
            ImportFormat::Tabular => f.write_str("tabular"),
        }
    }
}

/// Features as read from a file, still in `crs`
#[derive(Debug)]
pub(crate) struct SourceFeatures {
    pub crs: Crs,
    pub features: Vec<Feature>,
    /// entries dropped while parsing
    pub skipped: usize,
}

/// A parsed file, features in the display CRS
#[derive(Clone, Debug)]
pub struct ImportedLayer {
    pub name: String,
    pub format: ImportFormat,
    pub source_crs: Crs,
    pub features: Vec<Feature>,
    /// rows or features dropped because they could not be parsed or reprojected
    pub skipped: usize,
}

fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "layer".to_string())
}

/// Reads and reprojects the file at `path`, the format follows the extension
pub fn load_file(path: &Path, params: &ImportParameters) -> Result<ImportedLayer> {
    let format = ImportFormat::from_path(path).ok_or_else(|| {
        Error::parse(
            ImportFormat::Tabular,
            format!("unsupported file extension {}", path.display()),
        )
    })?;
    log::info!("Importing {} as {format}", path.display());

    let source = match format {
        ImportFormat::Shapefile => shapefile::read(path, params)?,
        _ => {
            let bytes = fs::read(path)?;
            return load_bytes(format, &layer_name(path), &bytes, params);
        }
    };
    Ok(into_display(layer_name(path), format, source))
}

/// Parses an in-memory file. Shapefiles need their sidecar files and are only
/// read through [`load_file`].
pub fn load_bytes(
    format: ImportFormat,
    name: &str,
    bytes: &[u8],
    params: &ImportParameters,
) -> Result<ImportedLayer> {
    let source = match format {
        ImportFormat::GeoJson => geojson::parse(&utf8(format, bytes)?)?,
        ImportFormat::Kml => kml::parse(&utf8(format, bytes)?, ImportFormat::Kml)?,
        ImportFormat::Kmz => kml::parse_kmz(bytes)?,
        ImportFormat::Dxf => dxf::parse(bytes, projection::lookup(&params.zone)?)?,
        ImportFormat::Tabular => tabular::parse(bytes, params)?,
        ImportFormat::Shapefile => {
            return Err(Error::parse(format, "shapefiles are read from disk with their .dbf"));
        }
    };
    Ok(into_display(name.to_string(), format, source))
}

fn utf8(format: ImportFormat, bytes: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::parse(format, e))?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Moves every feature into the display CRS, dropping those that fail
fn into_display(name: String, format: ImportFormat, source: SourceFeatures) -> ImportedLayer {
    let SourceFeatures {
        crs,
        features,
        mut skipped,
    } = source;

    let mut projected = Vec::with_capacity(features.len());
    for mut feature in features {
        match feature.geometry.to_display(&crs) {
            Ok(geometry) => {
                feature.geometry = geometry;
                projected.push(feature);
            }
            Err(e) => {
                log::warn!("Skipping {} feature: {e}", feature.geometry.kind_name());
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        log::warn!("{name}: {skipped} entries skipped");
    }
    log::info!("{name}: {} features loaded from {}", projected.len(), crs.code);

    ImportedLayer {
        name,
        format,
        source_crs: crs,
        features: projected,
        skipped,
    }
}

/// Geographic formats are always WGS84
pub(crate) fn geographic(features: Vec<Feature>, skipped: usize) -> SourceFeatures {
    SourceFeatures {
        crs: WGS84,
        features,
        skipped,
    }
}
