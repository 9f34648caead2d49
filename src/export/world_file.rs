use crate::geometry::Extent;

use geo::Coord;

use std::fmt;

/// ESRI style WKT written to the .prj of every export
pub const WGS84_PRJ: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
UNIT[\"Degree\",0.0174532925199433]]";

/// Six parameter affine transform from raster pixels to ground coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldFile {
    pub x_scale: f64,
    pub y_rotation: f64,
    pub x_rotation: f64,
    /// negative, row 0 is the northern edge
    pub y_scale: f64,
    /// center of the top left pixel
    pub origin_x: f64,
    pub origin_y: f64,
}

impl WorldFile {
    /// Georeferences a `width` x `height` raster whose outer edges are
    /// `top_left` and `bottom_right`
    pub fn from_corners(top_left: Coord, bottom_right: Coord, width: u32, height: u32) -> Self {
        let x_scale = (bottom_right.x - top_left.x) / width as f64;
        let y_scale = -(top_left.y - bottom_right.y) / height as f64;

        WorldFile {
            x_scale,
            y_rotation: 0.,
            x_rotation: 0.,
            y_scale,
            origin_x: top_left.x + x_scale / 2.,
            origin_y: top_left.y + y_scale / 2.,
        }
    }

    pub fn from_extent(extent: &Extent, width: u32, height: u32) -> Self {
        WorldFile::from_corners(extent.top_left(), extent.bottom_right(), width, height)
    }

    /// ground coordinate of the center of pixel (col, row)
    pub fn pixel_center(&self, col: u32, row: u32) -> Coord {
        Coord {
            x: self.origin_x + col as f64 * self.x_scale + row as f64 * self.x_rotation,
            y: self.origin_y + col as f64 * self.y_rotation + row as f64 * self.y_scale,
        }
    }
}

/// One value per line, fixed 12 decimals
impl fmt::Display for WorldFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in [
            self.x_scale,
            self.y_rotation,
            self.x_rotation,
            self.y_scale,
            self.origin_x,
            self.origin_y,
        ] {
            writeln!(f, "{value:.12}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_file_signs() {
        let extent = Extent {
            min_x: 500_000.,
            min_y: 300_000.,
            max_x: 501_000.,
            max_y: 301_000.,
        };
        let text = WorldFile::from_extent(&extent, 100, 100).to_string();
        let values: Vec<f64> = text.lines().map(|l| l.parse().unwrap()).collect();

        assert_eq!(values.len(), 6);
        assert!((values[0] - 10.).abs() < 0.01);
        assert_eq!(values[1], 0.);
        assert_eq!(values[2], 0.);
        assert!((values[3] + 10.).abs() < 0.01);
        assert!((values[4] - 500_005.).abs() < 1e-9);
        assert!((values[5] - 300_995.).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_precision_with_dot() {
        let world_file = WorldFile::from_corners(
            Coord { x: -7.6, y: 33.6 },
            Coord { x: -7.5, y: 33.5 },
            1000,
            1000,
        );
        let text = world_file.to_string();
        let first = text.lines().next().unwrap();

        assert_eq!(first, "0.000100000000");
        assert!(text.lines().all(|l| !l.contains(',')));
        assert!(text.lines().all(|l| l.split('.').nth(1).map(str::len) == Some(12)));

        let last = world_file.pixel_center(999, 999);
        assert!((last.x + 7.50005).abs() < 1e-9);
        assert!((last.y - 33.50005).abs() < 1e-9);
    }
}
