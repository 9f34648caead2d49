use crate::geometry::FeatureId;
use crate::import::ImportFormat;
use crate::workspace::LayerId;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// crate specific Error enum
#[derive(Error, Debug)]
pub enum Error {
    #[error("({x}, {y}) cannot be transformed in {crs}: {reason}")]
    Projection {
        crs: String,
        x: f64,
        y: f64,
        reason: String,
    },
    #[error("Latitude {0} is outside (-89.5, 89.5), scale is undefined")]
    InvalidLatitude(f64),
    #[error("Scale or resolution must be a positive number, got {0}")]
    InvalidScale(f64),
    #[error("Could not read {format} file: {reason}")]
    Parse { format: ImportFormat, reason: String },
    #[error("Export of {width}x{height} px exceeds the {limit} px limit, choose a smaller scale or area")]
    ExportTooLarge { width: u64, height: u64, limit: u32 },
    #[error("The selected layer has no features to export")]
    EmptySelection,
    #[error("Nothing is selected for export")]
    NoSelection,
    #[error("An export is already in progress")]
    ExportInProgress,
    #[error("Unknown coordinate reference system {0}")]
    UnknownCrs(String),
    #[error("No feature with id {0}")]
    UnknownFeature(FeatureId),
    #[error("No layer with id {0}")]
    UnknownLayer(LayerId),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Lookup failed: {0}")]
    Lookup(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Tiff(#[from] tiff::TiffError),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    ProjError(#[from] proj4rs::errors::Error),
}

impl Error {
    pub(crate) fn parse(format: ImportFormat, reason: impl std::fmt::Display) -> Self {
        Error::Parse {
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn projection(
        crs: impl Into<String>,
        point: geo::Coord,
        reason: impl Into<String>,
    ) -> Self {
        Error::Projection {
            crs: crs.into(),
            x: point.x,
            y: point.y,
            reason: reason.into(),
        }
    }
}
