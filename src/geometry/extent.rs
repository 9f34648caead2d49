use super::{Feature, Geometry};

use geo::Coord;

/// Axis aligned bounding box in the display CRS
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn from_coord(c: Coord) -> Extent {
        Extent {
            min_x: c.x,
            min_y: c.y,
            max_x: c.x,
            max_y: c.y,
        }
    }

    /// extent of the given size centered on `center`
    pub fn centered(center: Coord, width: f64, height: f64) -> Extent {
        Extent {
            min_x: center.x - width / 2.,
            min_y: center.y - height / 2.,
            max_x: center.x + width / 2.,
            max_y: center.y + height / 2.,
        }
    }

    pub fn expand(&mut self, c: Coord) {
        self.min_x = self.min_x.min(c.x);
        self.min_y = self.min_y.min(c.y);
        self.max_x = self.max_x.max(c.x);
        self.max_y = self.max_y.max(c.y);
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn contains(&self, other: &Extent) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Coord {
        Coord {
            x: (self.min_x + self.max_x) / 2.,
            y: (self.min_y + self.max_y) / 2.,
        }
    }

    pub fn top_left(&self) -> Coord {
        Coord {
            x: self.min_x,
            y: self.max_y,
        }
    }

    pub fn bottom_right(&self) -> Coord {
        Coord {
            x: self.max_x,
            y: self.min_y,
        }
    }
}

pub fn extent_of_geometry(geometry: &Geometry) -> Option<Extent> {
    let mut coords = geometry.extent_coords();
    let first = coords.next()?;

    Some(coords.fold(Extent::from_coord(first), |mut extent, c| {
        extent.expand(c);
        extent
    }))
}

/// Union of the extents of all features, `None` only for an empty input
pub fn extent_of<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Option<Extent> {
    features
        .into_iter()
        .filter_map(|f| extent_of_geometry(&f.geometry))
        .reduce(|acc, e| acc.union(&e))
}
