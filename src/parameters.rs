use std::fmt::Display;

use crate::projection::MERCHICH_NORD_MAROC;

/// Hard ceiling on either side of an exported raster
pub const MAX_EXPORT_DIMENSION: u32 = 16_384;

#[derive(Clone, Debug)]
pub struct ExportParameters {
    pub mode: ExportMode,

    /// leave drawn and imported vectors out of the raster
    pub hide_overlays: bool,

    // file naming
    pub suffix: String,
    pub location_slug: Option<String>,

    pub max_dimension: u32,
}

impl Default for ExportParameters {
    fn default() -> Self {
        Self {
            mode: Default::default(),
            hide_overlays: false,
            suffix: "topoma".to_string(),
            location_slug: None,
            max_dimension: MAX_EXPORT_DIMENSION,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    #[default]
    BoundingBox,
    ClipToShape,
}

impl Display for ExportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportMode::BoundingBox => f.write_str("bbox"),
            ExportMode::ClipToShape => f.write_str("clip"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImportParameters {
    /// CRS of files that do not state one (DXF, tabular, shapefiles without .prj)
    pub zone: String,

    /// column holding point labels in tabular files, guessed when `None`
    pub label_column: Option<String>,
}

impl Default for ImportParameters {
    fn default() -> Self {
        Self {
            zone: MERCHICH_NORD_MAROC.code.to_string(),
            label_column: None,
        }
    }
}
