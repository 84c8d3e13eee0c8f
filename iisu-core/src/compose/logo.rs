use image::imageops;
use image::RgbaImage;

/// Tuning for transparent padding removal on logos.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoCropOptions {
    /// Alpha above which a pixel counts as content.
    pub alpha_threshold: u8,
    /// Pixels kept around the content box.
    pub padding: u32,
    /// Smallest box area, as a fraction of the image, worth cropping to.
    pub min_content_ratio: f64,
    /// A box wider and taller than this fraction is left uncropped.
    pub max_crop_ratio: f64,
}

impl Default for LogoCropOptions {
    fn default() -> Self {
        Self {
            alpha_threshold: 16,
            padding: 10,
            min_content_ratio: 0.15,
            max_crop_ratio: 0.85,
        }
    }
}

/// Padded bounding box `(x, y, w, h)` of visible content, or `None` when
/// a crop would either lose too much or gain too little.
pub fn logo_bbox(img: &RgbaImage, opts: &LogoCropOptions) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = img.dimensions();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in img.enumerate_pixels() {
        if px[3] > opts.alpha_threshold {
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    let (x0, y0, x1, y1) = bounds?;

    let left = x0.saturating_sub(opts.padding);
    let top = y0.saturating_sub(opts.padding);
    let right = (x1 + 1 + opts.padding).min(w);
    let bottom = (y1 + 1 + opts.padding).min(h);
    let (bw, bh) = (right - left, bottom - top);

    let area_ratio = f64::from(bw) * f64::from(bh) / (f64::from(w) * f64::from(h));
    if area_ratio < opts.min_content_ratio {
        return None;
    }
    let keeps_most = f64::from(bw) > f64::from(w) * opts.max_crop_ratio
        && f64::from(bh) > f64::from(h) * opts.max_crop_ratio;
    if keeps_most {
        return None;
    }
    Some((left, top, bw, bh))
}

/// Trim transparent padding around a logo; the image comes back unchanged
/// when the crop is rejected.
pub fn detect_and_crop_logo(img: &RgbaImage, opts: &LogoCropOptions) -> RgbaImage {
    match logo_bbox(img, opts) {
        Some((x, y, w, h)) => imageops::crop_imm(img, x, y, w, h).to_image(),
        None => img.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn with_content(w: u32, h: u32, rect: (u32, u32, u32, u32)) -> RgbaImage {
        let (rx, ry, rw, rh) = rect;
        RgbaImage::from_fn(w, h, |x, y| {
            if x >= rx && x < rx + rw && y >= ry && y < ry + rh {
                Rgba([10, 20, 30, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn crops_to_padded_content() {
        let img = with_content(200, 200, (50, 50, 60, 60));
        let out = detect_and_crop_logo(&img, &LogoCropOptions::default());
        assert_eq!(out.dimensions(), (80, 80));
    }

    #[test]
    fn tiny_content_is_left_alone() {
        let img = with_content(200, 200, (90, 90, 10, 10));
        let out = detect_and_crop_logo(&img, &LogoCropOptions::default());
        assert_eq!(out.dimensions(), (200, 200));
    }

    #[test]
    fn nearly_full_content_is_left_alone() {
        let img = with_content(100, 100, (2, 2, 96, 96));
        assert!(logo_bbox(&img, &LogoCropOptions::default()).is_none());
        assert!(logo_bbox(&RgbaImage::new(20, 20), &LogoCropOptions::default()).is_none());
    }
}
