use super::{LayerFrame, LayerKind, MapSurface, ViewState};
use crate::geometry::Geometry;
use crate::{Error, Result};

use geo::Coord;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

const BACKGROUND: Rgba<u8> = Rgba([242, 239, 233, 255]);
const GRID: Rgba<u8> = Rgba([200, 200, 200, 255]);
const OVERLAY: Rgba<u8> = Rgba([220, 30, 30, 255]);

/// Map surface without a window: a plain background with a metric grid as the
/// basemap, and the given geometries drawn on an overlay.
#[derive(Clone, Debug)]
pub struct HeadlessSurface {
    view: ViewState,
    /// grid line spacing in display CRS units
    grid_spacing: f64,
    overlay: Vec<Geometry>,
    renders: usize,
}

impl HeadlessSurface {
    pub fn new(view: ViewState) -> Self {
        HeadlessSurface {
            view,
            grid_spacing: 1000.,
            overlay: Vec::new(),
            renders: 0,
        }
    }

    pub fn with_overlay(mut self, geometries: impl IntoIterator<Item = Geometry>) -> Self {
        self.overlay.extend(geometries);
        self
    }

    pub fn with_grid_spacing(mut self, grid_spacing: f64) -> Self {
        self.grid_spacing = grid_spacing;
        self
    }

    /// number of completed renders
    pub fn render_count(&self) -> usize {
        self.renders
    }

    fn render_basemap(&self) -> RgbaImage {
        let (width, height) = self.view.size;
        let extent = self.view.extent();
        let r = self.view.resolution;

        // a pixel holds a grid line when a multiple of the spacing falls in [start, start + r)
        let on_grid = |start: f64| {
            self.grid_spacing > 0. && (start / self.grid_spacing).ceil() * self.grid_spacing < start + r
        };
        let columns: Vec<bool> = (0..width)
            .map(|x| on_grid(extent.min_x + x as f64 * r))
            .collect();
        let rows: Vec<bool> = (0..height)
            .map(|y| on_grid(extent.max_y - (y + 1) as f64 * r))
            .collect();

        RgbaImage::from_fn(width, height, |x, y| {
            if columns[x as usize] || rows[y as usize] {
                GRID
            } else {
                BACKGROUND
            }
        })
    }

    fn render_overlay(&self) -> RgbaImage {
        let (width, height) = self.view.size;
        let mut image = RgbaImage::new(width, height);
        let t = self.view.world_to_pixel();
        let pixel = |c: &Coord| {
            let p = t.apply(*c);
            (p.x as f32, p.y as f32)
        };

        let draw_path = |image: &mut RgbaImage, coords: &[Coord]| {
            for pair in coords.windows(2) {
                draw_line_segment_mut(image, pixel(&pair[0]), pixel(&pair[1]), OVERLAY);
            }
        };

        for geometry in &self.overlay {
            match geometry {
                Geometry::Point(p) => {
                    let (x, y) = pixel(&p.0);
                    draw_filled_circle_mut(&mut image, (x as i32, y as i32), 3, OVERLAY);
                }
                Geometry::LineString(line) => draw_path(&mut image, &line.0),
                Geometry::Polygon(_) | Geometry::MultiPolygon(_) => {
                    for ring in geometry.outer_rings() {
                        draw_path(&mut image, &ring.0);
                    }
                }
            }
        }
        image
    }
}

impl MapSurface for HeadlessSurface {
    fn view(&self) -> ViewState {
        self.view
    }

    fn set_view(&mut self, view: ViewState) -> Result<()> {
        if !view.resolution.is_finite() || view.resolution <= 0. {
            return Err(Error::InvalidScale(view.resolution));
        }
        if view.size.0 == 0 || view.size.1 == 0 {
            return Err(Error::InvalidGeometry(format!(
                "surface size {}x{} has no pixels",
                view.size.0, view.size.1
            )));
        }
        self.view = view;
        Ok(())
    }

    fn render(&mut self) -> Result<Vec<LayerFrame>> {
        let frames = vec![
            LayerFrame::new("background", LayerKind::Basemap, self.render_basemap()),
            LayerFrame::new("features", LayerKind::Overlay, self.render_overlay()),
        ];
        self.renders += 1;
        log::debug!(
            "Headless surface rendered {}x{} at {:.4} units/px",
            self.view.size.0,
            self.view.size.1,
            self.view.resolution
        );
        Ok(frames)
    }
}
