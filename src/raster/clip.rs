use geo::{AffineTransform, Coord, LineString};

/// Pixels of a raster that lie inside a set of polygon rings
#[derive(Clone, Debug, PartialEq)]
pub struct ClipMask {
    width: u32,
    height: u32,
    inside: Vec<bool>,
}

impl ClipMask {
    pub fn empty(width: u32, height: u32) -> Self {
        ClipMask {
            width,
            height,
            inside: vec![false; width as usize * height as usize],
        }
    }

    /// Union of the areas of `rings`, a pixel is inside when its center lies
    /// in at least one of them. `world_to_pixel` maps ring coordinates onto
    /// the raster.
    pub fn from_rings(
        rings: &[&LineString],
        world_to_pixel: &AffineTransform<f64>,
        width: u32,
        height: u32,
    ) -> Self {
        let mut mask = ClipMask::empty(width, height);
        for ring in rings {
            mask.fill_ring(ring, world_to_pixel);
        }
        mask
    }

    /// Even-odd scanline fill of a single ring, OR-ed into the mask
    fn fill_ring(&mut self, ring: &LineString, world_to_pixel: &AffineTransform<f64>) {
        let edges: Vec<(Coord, Coord)> = ring
            .lines()
            .map(|l| (world_to_pixel.apply(l.start), world_to_pixel.apply(l.end)))
            .filter(|(a, b)| a.y != b.y)
            .collect();

        let mut crossings = Vec::new();
        for y in 0..self.height {
            let cy = y as f64 + 0.5;

            crossings.clear();
            for (a, b) in &edges {
                let (lo, hi) = if a.y < b.y { (a, b) } else { (b, a) };
                // half open so a vertex on the scanline counts once
                if cy < lo.y || cy >= hi.y {
                    continue;
                }
                crossings.push(lo.x + (cy - lo.y) / (hi.y - lo.y) * (hi.x - lo.x));
            }
            crossings.sort_by(|a, b| a.total_cmp(b));

            for span in crossings.chunks_exact(2) {
                // pixel centers in [span[0], span[1])
                let first = (span[0] - 0.5).ceil().max(0.);
                let last = (span[1] - 0.5).ceil().min(self.width as f64);
                let mut x = first;
                while x < last {
                    self.set(x as u32, y);
                    x += 1.;
                }
            }
        }
    }

    pub fn set(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            self.inside[(y * self.width + x) as usize] = true;
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.inside[(y * self.width + x) as usize]
    }

    pub fn count(&self) -> usize {
        self.inside.iter().filter(|b| **b).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> LineString {
        let mut coords: Vec<Coord> = points.iter().map(|&(x, y)| Coord { x, y }).collect();
        coords.push(coords[0]);
        LineString::new(coords)
    }

    #[test]
    fn test_rectangle_covers_whole_pixels() {
        let r = ring(&[(2., 1.), (6., 1.), (6., 4.), (2., 4.)]);
        let mask = ClipMask::from_rings(&[&r], &AffineTransform::identity(), 8, 6);

        assert_eq!(mask.count(), 4 * 3);
        assert!(mask.contains(2, 1));
        assert!(mask.contains(5, 3));
        assert!(!mask.contains(6, 3));
        assert!(!mask.contains(1, 2));
    }

    #[test]
    fn test_triangle_and_world_transform() {
        // world triangle with a 10 unit resolution and y pointing up
        let r = ring(&[(0., 0.), (100., 0.), (0., 100.)]);
        let world_to_pixel = AffineTransform::new(0.1, 0., 0., 0., -0.1, 10.);
        let mask = ClipMask::from_rings(&[&r], &world_to_pixel, 10, 10);

        assert!(mask.contains(0, 9));
        assert!(mask.contains(8, 9));
        assert!(!mask.contains(9, 0));
        assert!(!mask.contains(5, 5));
        assert_eq!(mask.count(), 45);
    }

    #[test]
    fn test_disjoint_rings() {
        let a = ring(&[(0., 0.), (2., 0.), (2., 2.), (0., 2.)]);
        let b = ring(&[(4., 0.), (6., 0.), (6., 2.), (4., 2.)]);
        let mask = ClipMask::from_rings(&[&a, &b], &AffineTransform::identity(), 8, 2);

        assert_eq!(mask.count(), 8);
        assert!(!mask.contains(3, 1));
    }

    #[test]
    fn test_overlapping_rings_are_merged() {
        let a = ring(&[(0., 0.), (4., 0.), (4., 4.), (0., 4.)]);
        let b = ring(&[(2., 2.), (6., 2.), (6., 6.), (2., 6.)]);
        let mask = ClipMask::from_rings(&[&a, &b], &AffineTransform::identity(), 8, 8);

        // both squares hold 16 pixels, 4 of them shared
        assert_eq!(mask.count(), 28);
        assert!(mask.contains(3, 3));
        assert!(mask.contains(0, 0));
        assert!(mask.contains(5, 5));
        assert!(!mask.contains(5, 0));
    }
}
