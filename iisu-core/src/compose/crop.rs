use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Crop the largest square at `centering` (fractions in 0..=1, clamped) and
/// resize it to `out_size`, the way `ImageOps.fit` does.
pub fn center_crop_to_square(
    img: &RgbaImage,
    out_size: u32,
    centering: (f64, f64),
) -> RgbaImage {
    let (w, h) = img.dimensions();
    let out_size = out_size.max(1);
    if w == 0 || h == 0 {
        return RgbaImage::new(out_size, out_size);
    }

    let side = w.min(h);
    let (cx, cy) = (centering.0.clamp(0.0, 1.0), centering.1.clamp(0.0, 1.0));
    let left = ((w - side) as f64 * cx).round() as u32;
    let top = ((h - side) as f64 * cy).round() as u32;

    let square = imageops::crop_imm(img, left, top, side, side).to_image();
    if side == out_size {
        square
    } else {
        imageops::resize(&square, out_size, out_size, FilterType::Lanczos3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn output_is_square_at_requested_size() {
        let img = RgbaImage::new(300, 200);
        let out = center_crop_to_square(&img, 128, (0.5, 0.5));
        assert_eq!(out.dimensions(), (128, 128));
    }

    #[test]
    fn centering_selects_crop_window() {
        // Left third red, right third blue on a 3:1 strip.
        let img = RgbaImage::from_fn(30, 10, |x, _| {
            if x < 10 {
                Rgba([255, 0, 0, 255])
            } else if x >= 20 {
                Rgba([0, 0, 255, 255])
            } else {
                Rgba([0, 255, 0, 255])
            }
        });
        let left = center_crop_to_square(&img, 10, (0.0, 0.5));
        assert_eq!(left.get_pixel(5, 5), &Rgba([255, 0, 0, 255]));
        let right = center_crop_to_square(&img, 10, (1.0, 0.5));
        assert_eq!(right.get_pixel(5, 5), &Rgba([0, 0, 255, 255]));
        let clamped = center_crop_to_square(&img, 10, (7.0, 0.5));
        assert_eq!(clamped.get_pixel(5, 5), &Rgba([0, 0, 255, 255]));
    }
}
