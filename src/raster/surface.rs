use crate::geometry::Extent;
use crate::Result;

use geo::{AffineTransform, Coord};
use image::RgbaImage;

use std::ops::{Deref, DerefMut};

/// Size, resolution and center of a map surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    /// width and height in pixels
    pub size: (u32, u32),
    /// display CRS units per pixel
    pub resolution: f64,
    pub center: Coord,
}

impl ViewState {
    pub fn extent(&self) -> Extent {
        Extent::centered(
            self.center,
            self.size.0 as f64 * self.resolution,
            self.size.1 as f64 * self.resolution,
        )
    }

    /// display CRS to pixel coordinates, y axis pointing down
    pub fn world_to_pixel(&self) -> AffineTransform<f64> {
        let extent = self.extent();
        let r = self.resolution;
        AffineTransform::new(1. / r, 0., -extent.min_x / r, 0., -1. / r, extent.max_y / r)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    /// background imagery, subject to clipping
    Basemap,
    /// drawn or imported vectors
    Overlay,
}

/// The current content of one rendered layer
#[derive(Clone, Debug)]
pub struct LayerFrame {
    pub name: String,
    pub kind: LayerKind,
    pub image: RgbaImage,
    pub opacity: f32,
    /// maps pixels of `image` onto pixels of the surface
    pub transform: AffineTransform<f64>,
}

impl LayerFrame {
    pub fn new(name: impl Into<String>, kind: LayerKind, image: RgbaImage) -> Self {
        LayerFrame {
            name: name.into(),
            kind,
            image,
            opacity: 1.,
            transform: AffineTransform::identity(),
        }
    }
}

/// A map that can be resized and re-rendered on demand.
///
/// `render` only returns once every visible layer is fully drawn for the
/// current view, the returned frames are safe to capture.
pub trait MapSurface {
    fn view(&self) -> ViewState;

    fn set_view(&mut self, view: ViewState) -> Result<()>;

    fn render(&mut self) -> Result<Vec<LayerFrame>>;
}

/// Holds a surface at a temporary view, the previous view is put back on drop
pub struct ViewGuard<'a, S: MapSurface + ?Sized> {
    surface: &'a mut S,
    saved: ViewState,
}

impl<'a, S: MapSurface + ?Sized> ViewGuard<'a, S> {
    pub fn apply(surface: &'a mut S, view: ViewState) -> Result<Self> {
        let saved = surface.view();
        let guard = ViewGuard { surface, saved };
        guard.surface.set_view(view)?;
        Ok(guard)
    }

    pub fn saved(&self) -> ViewState {
        self.saved
    }
}

impl<S: MapSurface + ?Sized> Deref for ViewGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: MapSurface + ?Sized> DerefMut for ViewGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: MapSurface + ?Sized> Drop for ViewGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.surface.set_view(self.saved) {
            log::error!("Could not restore the map view: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct Recorder {
        view: ViewState,
        fail_render: bool,
    }

    impl MapSurface for Recorder {
        fn view(&self) -> ViewState {
            self.view
        }

        fn set_view(&mut self, view: ViewState) -> Result<()> {
            self.view = view;
            Ok(())
        }

        fn render(&mut self) -> Result<Vec<LayerFrame>> {
            if self.fail_render {
                return Err(Error::InvalidGeometry("render failed".to_string()));
            }
            Ok(vec![])
        }
    }

    fn interactive() -> ViewState {
        ViewState {
            size: (800, 600),
            resolution: 2.5,
            center: Coord { x: 10., y: 20. },
        }
    }

    #[test]
    fn test_world_to_pixel() {
        let view = ViewState {
            size: (100, 50),
            resolution: 10.,
            center: Coord { x: 500., y: 250. },
        };
        let t = view.world_to_pixel();

        assert_eq!(t.apply(Coord { x: 0., y: 500. }), Coord { x: 0., y: 0. });
        assert_eq!(t.apply(Coord { x: 1000., y: 0. }), Coord { x: 100., y: 50. });
    }

    #[test]
    fn test_guard_restores_on_every_path() {
        let mut surface = Recorder {
            view: interactive(),
            fail_render: true,
        };
        let export_view = ViewState {
            size: (4000, 3000),
            resolution: 0.5,
            center: Coord { x: 0., y: 0. },
        };

        let result = (|| {
            let mut guard = ViewGuard::apply(&mut surface, export_view)?;
            assert_eq!(guard.view(), export_view);
            guard.render()
        })();

        assert!(result.is_err());
        assert_eq!(surface.view, interactive());
    }
}
