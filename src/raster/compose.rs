use super::{ClipMask, LayerFrame, LayerKind};

use geo::Coord;
use image::{Rgba, RgbaImage};

/// Source-over blend of `src` with an extra opacity factor onto `dst`
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let sa = src[3] as f32 / 255. * opacity;
    if sa <= 0. {
        return;
    }
    let da = dst[3] as f32 / 255.;
    let out_a = sa + da * (1. - sa);

    for i in 0..3 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1. - sa)) / out_a;
        dst[i] = c.round().clamp(0., 255.) as u8;
    }
    dst[3] = (out_a * 255.).round().clamp(0., 255.) as u8;
}

/// Draws every layer onto a transparent `width` x `height` buffer, in order.
///
/// Each frame is sampled through the inverse of its own transform, so frames
/// captured in the middle of a zoom or pan still land where they are shown.
/// Pixels outside `clip` stay transparent.
pub fn composite(
    width: u32,
    height: u32,
    frames: &[LayerFrame],
    clip: Option<&ClipMask>,
    hide_overlays: bool,
) -> RgbaImage {
    let mut out = RgbaImage::new(width, height);

    for frame in frames {
        if hide_overlays && frame.kind == LayerKind::Overlay {
            log::debug!("Overlay {} left out of the export", frame.name);
            continue;
        }
        let opacity = frame.opacity.clamp(0., 1.);
        if opacity == 0. {
            continue;
        }
        let Some(inverse) = frame.transform.inverse() else {
            log::warn!("Layer {} has a degenerate transform, skipped", frame.name);
            continue;
        };
        let (fw, fh) = frame.image.dimensions();

        for (x, y, pixel) in out.enumerate_pixels_mut() {
            if clip.is_some_and(|mask| !mask.contains(x, y)) {
                continue;
            }
            let source = inverse.apply(Coord {
                x: x as f64 + 0.5,
                y: y as f64 + 0.5,
            });
            if source.x < 0. || source.y < 0. {
                continue;
            }
            let (sx, sy) = (source.x.floor() as u32, source.y.floor() as u32);
            if sx >= fw || sy >= fh {
                continue;
            }
            blend(pixel, *frame.image.get_pixel(sx, sy), opacity);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::AffineTransform;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn test_opacity_blend() {
        let frames = vec![
            LayerFrame::new("base", LayerKind::Basemap, solid(4, 4, [0, 0, 255, 255])),
            LayerFrame {
                opacity: 0.5,
                ..LayerFrame::new("red", LayerKind::Overlay, solid(4, 4, [255, 0, 0, 255]))
            },
        ];
        let out = composite(4, 4, &frames, None, false);

        let p = out.get_pixel(2, 2);
        assert_eq!(p[3], 255);
        assert!((p[0] as i32 - 128).abs() <= 1);
        assert!((p[2] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_frame_transform_is_respected() {
        // a 2x2 frame shown scaled up to cover 4x4 and shifted one pixel right
        let mut image = solid(2, 2, [0, 0, 0, 255]);
        image.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        let frame = LayerFrame {
            transform: AffineTransform::new(2., 0., 1., 0., 2., 0.),
            ..LayerFrame::new("scaled", LayerKind::Basemap, image)
        };
        let out = composite(6, 4, &[frame], None, false);

        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(3, 1), &Rgba([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(4, 1), &Rgba([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(3, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(5, 3)[3], 0);
    }

    #[test]
    fn test_hidden_overlays_and_clip() {
        let frames = vec![
            LayerFrame::new("base", LayerKind::Basemap, solid(4, 4, [10, 20, 30, 255])),
            LayerFrame::new("vectors", LayerKind::Overlay, solid(4, 4, [255, 0, 0, 255])),
        ];
        let mut mask = ClipMask::empty(4, 4);
        mask.set(0, 0);
        let out = composite(4, 4, &frames, Some(&mask), true);

        assert_eq!(out.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
        assert_eq!(out.get_pixel(1, 0)[3], 0);
    }
}
