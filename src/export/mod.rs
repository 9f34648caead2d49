//! Raster export: sizing, rendering, georeferencing and packaging of a selection.

pub mod archive;
pub mod naming;
pub mod world_file;

pub use self::archive::{encode_tiff, ExportArtifact};
pub use self::naming::{base_name, slugify, DEFAULT_LOCATION};
pub use self::world_file::{WorldFile, WGS84_PRJ};

use crate::geometry::{extent_of, Extent, Feature};
use crate::parameters::{ExportMode, ExportParameters};
use crate::projection::display_to_geographic;
use crate::raster::{composite, ClipMask, MapSurface, ViewGuard, ViewState};
use crate::scale::{resolution_for_scale, Scale};
use crate::workspace::{ExportTarget, Workspace};
use crate::{Error, Result};

use chrono::NaiveDate;
use geo::Coord;

use std::fmt;

/// What is going to be exported
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub target: ExportTarget,
    pub scale: Scale,
}

#[derive(Clone, Debug, Default)]
pub enum ExportState {
    #[default]
    Idle,
    Selected(Selection),
    Processing,
    Done(Box<ExportArtifact>),
}

impl ExportState {
    pub fn name(&self) -> &'static str {
        match self {
            ExportState::Idle => "idle",
            ExportState::Selected(_) => "selected",
            ExportState::Processing => "processing",
            ExportState::Done(_) => "done",
        }
    }
}

/// Steps of an export run, reported in this order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportStep {
    Bounds,
    Resolution,
    Sizing,
    Rendering,
    Compositing,
    Restoring,
    Georeferencing,
    Encoding,
    Packaging,
}

impl fmt::Display for ExportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportStep::Bounds => "Computing selection bounds",
            ExportStep::Resolution => "Deriving resolution from scale",
            ExportStep::Sizing => "Sizing output raster",
            ExportStep::Rendering => "Rendering map at export resolution",
            ExportStep::Compositing => "Compositing layers",
            ExportStep::Restoring => "Restoring map view",
            ExportStep::Georeferencing => "Computing world file",
            ExportStep::Encoding => "Encoding tiff",
            ExportStep::Packaging => "Packing archive",
        })
    }
}

/// Extent, resolution and raster size of an export, decided before any rendering
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportPlan {
    pub extent: Extent,
    pub center_lon_lat: Coord,
    /// display CRS units per pixel
    pub resolution: f64,
    pub width: u32,
    pub height: u32,
}

impl ExportPlan {
    pub fn new(extent: Extent, scale: &Scale, max_dimension: u32) -> Result<Self> {
        let center_lon_lat = display_to_geographic(extent.center())?;
        let resolution = resolution_for_scale(scale.denominator(), center_lon_lat.y)?;
        ExportPlan::with_resolution(extent, center_lon_lat, resolution, max_dimension)
    }

    fn with_resolution(
        extent: Extent,
        center_lon_lat: Coord,
        resolution: f64,
        max_dimension: u32,
    ) -> Result<Self> {
        // a single point still gets one pixel
        let width = (extent.width() / resolution).ceil().max(1.);
        let height = (extent.height() / resolution).ceil().max(1.);

        if width > max_dimension as f64 || height > max_dimension as f64 {
            return Err(Error::ExportTooLarge {
                width: width as u64,
                height: height as u64,
                limit: max_dimension,
            });
        }

        Ok(ExportPlan {
            extent,
            center_lon_lat,
            resolution,
            width: width as u32,
            height: height as u32,
        })
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            size: (self.width, self.height),
            resolution: self.resolution,
            center: self.extent.center(),
        }
    }
}

/// Drives the `Idle -> Selected -> Processing -> Done` export workflow
#[derive(Debug, Default)]
pub struct ExportPipeline {
    params: ExportParameters,
    state: ExportState,
}

impl ExportPipeline {
    pub fn new(params: ExportParameters) -> Self {
        ExportPipeline {
            params,
            state: ExportState::Idle,
        }
    }

    pub fn params(&self) -> &ExportParameters {
        &self.params
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    pub fn artifact(&self) -> Option<&ExportArtifact> {
        match &self.state {
            ExportState::Done(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn select(&mut self, target: ExportTarget, scale: Scale) -> Result<()> {
        if matches!(self.state, ExportState::Processing) {
            return Err(Error::ExportInProgress);
        }
        self.state = ExportState::Selected(Selection { target, scale });
        Ok(())
    }

    pub fn reset(&mut self) {
        if !matches!(self.state, ExportState::Processing) {
            self.state = ExportState::Idle;
        }
    }

    /// Runs the selected export against `surface`.
    ///
    /// `location` names the place for the file name unless the parameters
    /// carry a slug. On failure the pipeline falls back to `Idle` and the
    /// surface keeps the view it had before.
    pub fn run<S: MapSurface + ?Sized>(
        &mut self,
        workspace: &Workspace,
        surface: &mut S,
        location: &str,
        date: NaiveDate,
        mut progress: impl FnMut(ExportStep),
    ) -> Result<&ExportArtifact> {
        let selection = match std::mem::replace(&mut self.state, ExportState::Processing) {
            ExportState::Selected(selection) => selection,
            ExportState::Processing => return Err(Error::ExportInProgress),
            previous => {
                self.state = previous;
                return Err(Error::NoSelection);
            }
        };

        match self.process(&selection, workspace, surface, location, date, &mut progress) {
            Ok(artifact) => {
                self.state = ExportState::Done(Box::new(artifact));
                self.artifact().ok_or(Error::NoSelection)
            }
            Err(e) => {
                log::error!("Export failed: {e}");
                self.state = ExportState::Idle;
                Err(e)
            }
        }
    }

    fn process<S: MapSurface + ?Sized>(
        &self,
        selection: &Selection,
        workspace: &Workspace,
        surface: &mut S,
        location: &str,
        date: NaiveDate,
        progress: &mut impl FnMut(ExportStep),
    ) -> Result<ExportArtifact> {
        let mut step = |s: ExportStep| {
            log::info!("{s}");
            progress(s);
        };

        step(ExportStep::Bounds);
        let features = workspace.target_features(&selection.target)?;
        let extent = extent_of(features.iter().copied()).ok_or(Error::EmptySelection)?;

        step(ExportStep::Resolution);
        let center_lon_lat = display_to_geographic(extent.center())?;
        let resolution = resolution_for_scale(selection.scale.denominator(), center_lon_lat.y)?;
        log::debug!(
            "{} at latitude {:.4} gives {resolution:.6} units/px",
            selection.scale,
            center_lon_lat.y
        );

        step(ExportStep::Sizing);
        let plan = ExportPlan::with_resolution(
            extent,
            center_lon_lat,
            resolution,
            self.params.max_dimension,
        )?;
        let view = plan.view();
        log::info!("Output raster is {}x{} px", plan.width, plan.height);

        step(ExportStep::Rendering);
        let image = {
            let mut guard = ViewGuard::apply(surface, view)?;
            let frames = guard.render()?;

            step(ExportStep::Compositing);
            let clip = match self.params.mode {
                ExportMode::BoundingBox => None,
                ExportMode::ClipToShape => clip_mask(&features, &view),
            };
            let image = composite(
                plan.width,
                plan.height,
                &frames,
                clip.as_ref(),
                self.params.hide_overlays,
            );

            step(ExportStep::Restoring);
            image
        };

        step(ExportStep::Georeferencing);
        let frame = view.extent();
        let top_left = display_to_geographic(frame.top_left())?;
        let bottom_right = display_to_geographic(frame.bottom_right())?;
        let world_file = WorldFile::from_corners(top_left, bottom_right, plan.width, plan.height);

        step(ExportStep::Encoding);
        let slug = match &self.params.location_slug {
            Some(slug) => slugify(slug),
            None => slugify(location),
        };
        let base = base_name(
            &slug,
            &selection.scale.file_label(),
            center_lon_lat,
            date,
            &self.params.suffix,
        );

        step(ExportStep::Packaging);
        ExportArtifact::package(&base, &image, world_file)
    }
}

/// Clip region of the polygons in the selection, `None` when there are none
fn clip_mask(features: &[&Feature], view: &ViewState) -> Option<ClipMask> {
    let rings: Vec<_> = features
        .iter()
        .flat_map(|f| f.geometry.outer_rings())
        .collect();
    if rings.is_empty() {
        log::warn!("Selection has no polygon to clip to, exporting the bounding box");
        return None;
    }
    Some(ClipMask::from_rings(
        &rings,
        &view.world_to_pixel(),
        view.size.0,
        view.size.1,
    ))
}
