use std::collections::VecDeque;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};

use super::crop::center_crop_to_square;

/// Alpha above which a border pixel counts as opaque.
pub const MASK_THRESHOLD: u8 = 18;
/// Pixels the corner mask is eroded by.
pub const MASK_SHRINK: u32 = 8;
/// Gaussian blur sigma applied to the mask edge.
pub const MASK_FEATHER: f32 = 0.8;

/// Mask of the area inside the border's outer edge.
///
/// Opaque border pixels plus the transparent hole they enclose are kept;
/// the result is eroded by `shrink` and blurred by `feather` so artwork
/// never shows past rounded corners.
pub fn corner_mask_from_border(
    border: &RgbaImage,
    threshold: u8,
    shrink: u32,
    feather: f32,
) -> GrayImage {
    let (w, h) = border.dimensions();
    let mut mask = GrayImage::from_fn(w, h, |x, y| {
        Luma([if border.get_pixel(x, y)[3] >= threshold { 255 } else { 0 }])
    });
    if w == 0 || h == 0 {
        return mask;
    }

    let (cx, cy) = (w / 2, h / 2);
    if mask.get_pixel(cx, cy)[0] == 0 {
        fill_hole(&mut mask, cx, cy);
    }
    if shrink > 0 {
        mask = min_filter(&mask, shrink);
    }
    if feather > 0.0 {
        mask = imageops::blur(&mask, feather);
    }
    mask
}

/// 4-connected flood fill of zero pixels starting at (x, y).
fn fill_hole(mask: &mut GrayImage, x: u32, y: u32) {
    let (w, h) = mask.dimensions();
    let mut queue = VecDeque::from([(x, y)]);
    mask.put_pixel(x, y, Luma([255]));
    while let Some((x, y)) = queue.pop_front() {
        let neighbours = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbours {
            if nx < w && ny < h && mask.get_pixel(nx, ny)[0] == 0 {
                mask.put_pixel(nx, ny, Luma([255]));
                queue.push_back((nx, ny));
            }
        }
    }
}

/// Square `2·radius+1` minimum filter, separable.
fn min_filter(mask: &GrayImage, radius: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    let horizontal = GrayImage::from_fn(w, h, |x, y| {
        let lo = x.saturating_sub(radius);
        let hi = (x + radius).min(w - 1);
        let v = (lo..=hi).map(|i| mask.get_pixel(i, y)[0]).min().unwrap_or(0);
        Luma([v])
    });
    GrayImage::from_fn(w, h, |x, y| {
        let lo = y.saturating_sub(radius);
        let hi = (y + radius).min(h - 1);
        let v = (lo..=hi)
            .map(|j| horizontal.get_pixel(x, j)[0])
            .min()
            .unwrap_or(0);
        Luma([v])
    })
}

/// Fit `base` into an `out_size` square, clip it to the border's shape and
/// draw the border on top.
pub fn compose_with_border(
    base: &RgbaImage,
    border: &RgbaImage,
    out_size: u32,
    centering: (f64, f64),
) -> RgbaImage {
    let mut canvas = center_crop_to_square(base, out_size, centering);
    let (size, _) = canvas.dimensions();

    let resized;
    let border = if border.dimensions() == (size, size) {
        border
    } else {
        resized = imageops::resize(border, size, size, FilterType::Lanczos3);
        &resized
    };

    let mask = corner_mask_from_border(border, MASK_THRESHOLD, MASK_SHRINK, MASK_FEATHER);
    for (x, y, px) in canvas.enumerate_pixels_mut() {
        let m = u32::from(mask.get_pixel(x, y)[0]);
        px[3] = ((u32::from(px[3]) * m + 127) / 255) as u8;
    }
    imageops::overlay(&mut canvas, border, 0, 0);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Opaque frame `band` px wide with clipped corners and a transparent
    /// hole.
    fn ring(size: u32, band: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            let d = x.min(y).min(size - 1 - x).min(size - 1 - y);
            let corner = (x < band && y < band) && (x + y) < band;
            if corner || d >= band {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn mask_covers_interior_hole_and_excludes_corners() {
        let border = ring(64, 6);
        let mask = corner_mask_from_border(&border, MASK_THRESHOLD, 0, 0.0);
        assert_eq!(mask.get_pixel(32, 32)[0], 255);
        assert_eq!(mask.get_pixel(3, 32)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn erosion_pulls_mask_away_from_corners() {
        let border = ring(64, 6);
        let sharp = corner_mask_from_border(&border, MASK_THRESHOLD, 0, 0.0);
        assert_eq!(sharp.get_pixel(3, 3)[0], 255);
        let eroded = corner_mask_from_border(&border, MASK_THRESHOLD, 2, 0.0);
        assert_eq!(eroded.get_pixel(3, 3)[0], 0);
        assert_eq!(eroded.get_pixel(32, 32)[0], 255);
    }

    #[test]
    fn composed_icon_has_border_on_top_and_clear_corners() {
        let base = RgbaImage::from_pixel(100, 80, Rgba([200, 10, 10, 255]));
        let border = ring(64, 6);
        let out = compose_with_border(&base, &border, 64, (0.5, 0.5));
        assert_eq!(out.dimensions(), (64, 64));
        let center = out.get_pixel(32, 32);
        assert!(center[0].abs_diff(200) <= 2 && center[1].abs_diff(10) <= 2);
        assert!(center[3] >= 250);
        assert_eq!(out.get_pixel(3, 32)[0], 255);
        assert_eq!(out.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn border_is_resized_to_output() {
        let base = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 255, 255]));
        let out = compose_with_border(&base, &ring(32, 3), 96, (0.5, 0.5));
        assert_eq!(out.dimensions(), (96, 96));
    }
}
