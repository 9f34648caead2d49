use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::parameters::{ExportMode, ExportParameters, ImportParameters, MAX_EXPORT_DIMENSION};

/// Export georeferenced rasters of drawn or imported map features
#[derive(Parser, Clone, Debug)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Transform a point between two coordinate reference systems
    Reproject {
        /// Source CRS, e.g. EPSG:26191
        #[arg(long, default_value = "EPSG:26191")]
        from: String,

        /// Target CRS, e.g. EPSG:4326
        #[arg(long, default_value = "EPSG:4326")]
        to: String,

        #[arg(allow_negative_numbers = true)]
        x: f64,

        #[arg(allow_negative_numbers = true)]
        y: f64,
    },

    /// Convert between a scale denominator and a display resolution at a latitude
    Scale {
        /// Latitude in degrees, within (-89.5, 89.5)
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,

        /// Scale denominator, e.g. 25000 for 1:25 000
        #[arg(long, conflicts_with = "resolution", required_unless_present = "resolution")]
        scale: Option<f64>,

        /// Display units per pixel
        #[arg(long)]
        resolution: Option<f64>,
    },

    /// Import a vector file and print its features and selection summary
    Inspect {
        in_file: PathBuf,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Import a vector file and export it as a zipped GeoTIFF-style raster
    Export {
        in_file: PathBuf,

        #[command(flatten)]
        import: ImportArgs,

        /// Scale denominator of the output, e.g. 25000 for 1:25 000
        #[arg(short, long)]
        scale: f64,

        /// Scale label used in the file name, defaults to e.g. "25k"
        #[arg(long)]
        label: Option<String>,

        /// Path to output directory, created if it doesn't exist
        #[arg(short, long, default_value = ".")]
        output_directory: PathBuf,

        /// Clip the raster to the polygons instead of their bounding box
        #[arg(long, action)]
        clip: bool,

        /// Leave the features themselves out of the raster
        #[arg(long, action)]
        hide_overlays: bool,

        /// Place name used in the file name, looked up online when missing
        #[arg(long)]
        location: Option<String>,

        /// Never query online services
        #[arg(long, action)]
        offline: bool,

        /// Last part of the file name
        #[arg(long, default_value = "topoma")]
        suffix: String,

        /// Largest allowed width or height in pixels
        #[arg(long, default_value_t = MAX_EXPORT_DIMENSION)]
        max_dimension: u32,
    },
}

#[derive(ClapArgs, Clone, Debug)]
pub struct ImportArgs {
    /// CRS of files that don't state one (DXF, CSV, shapefiles without .prj)
    #[arg(short, long, default_value = "EPSG:26191")]
    pub zone: String,

    /// Column holding point labels in CSV files
    #[arg(long)]
    pub label_column: Option<String>,
}

impl ImportArgs {
    pub fn parameters(&self) -> ImportParameters {
        ImportParameters {
            zone: self.zone.clone(),
            label_column: self.label_column.clone(),
        }
    }
}

impl Args {
    pub fn parse_cli() -> Args {
        Args::parse()
    }
}

impl Command {
    /// `None` for commands that don't export
    pub fn export_parameters(&self) -> Option<ExportParameters> {
        match self {
            Command::Export {
                clip,
                hide_overlays,
                location,
                suffix,
                max_dimension,
                ..
            } => Some(ExportParameters {
                mode: if *clip {
                    ExportMode::ClipToShape
                } else {
                    ExportMode::BoundingBox
                },
                hide_overlays: *hide_overlays,
                suffix: suffix.clone(),
                location_slug: location.clone(),
                max_dimension: *max_dimension,
            }),
            _ => None,
        }
    }
}
