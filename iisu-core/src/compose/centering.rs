use image::imageops::{self, FilterType};
use image::RgbaImage;

use super::crop::center_crop_to_square;

/// Working resolution for the centering search.
const SEARCH_SIZE: u32 = 256;
const NO_CONTENT_PENALTY: f64 = 10.0;

/// Tuning for the auto-centering crop search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteringOptions {
    /// Candidate crop positions per axis.
    pub steps: u32,
    /// How far, as a fraction, candidates reach either side of the middle.
    pub span: f64,
    /// Centroid deviation below which no search runs.
    pub tolerance: f64,
    /// Alpha above which a pixel counts as content.
    pub alpha_threshold: u8,
    /// Edge band, as a fraction of each side, ignored when measuring content.
    pub margin: f64,
}

impl Default for CenteringOptions {
    fn default() -> Self {
        Self {
            steps: 5,
            span: 0.22,
            tolerance: 0.06,
            alpha_threshold: 16,
            margin: 0.06,
        }
    }
}

/// Normalized content centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    /// Horizontal position, 0.0 to 1.0.
    pub x: f64,
    /// Vertical position, 0.0 to 1.0.
    pub y: f64,
    /// Number of content pixels measured.
    pub count: u64,
}

impl Centroid {
    /// Largest per-axis distance from the middle of the frame.
    pub fn deviation(&self) -> f64 {
        (self.x - 0.5).abs().max((self.y - 0.5).abs())
    }

    /// Whether either axis is further than `tolerance` from the middle.
    pub fn is_off_center(&self, tolerance: f64) -> bool {
        (self.x - 0.5).abs() > tolerance || (self.y - 0.5).abs() > tolerance
    }
}

/// Crop position chosen by [`best_centering`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteringResult {
    /// Crop position passed to the square crop, `(0.5, 0.5)` being the middle.
    pub centering: (f64, f64),
    /// Centroid of the image cropped at that position.
    pub centroid: Centroid,
}

/// Centroid of pixels with alpha above `alpha_threshold`, ignoring a
/// `margin` band around the edges. Coordinates are fractions of the full
/// image; an image with no such pixels reports the middle and a zero count.
pub fn content_centroid(img: &RgbaImage, alpha_threshold: u8, margin: f64) -> Centroid {
    let (w, h) = img.dimensions();
    let empty = Centroid {
        x: 0.5,
        y: 0.5,
        count: 0,
    };
    if w == 0 || h == 0 {
        return empty;
    }

    let mx = (f64::from(w) * margin.clamp(0.0, 0.49)).round() as u32;
    let my = (f64::from(h) * margin.clamp(0.0, 0.49)).round() as u32;
    let (mut sx, mut sy, mut n) = (0.0f64, 0.0f64, 0u64);
    for y in my..h - my {
        for x in mx..w - mx {
            if img.get_pixel(x, y)[3] > alpha_threshold {
                sx += f64::from(x);
                sy += f64::from(y);
                n += 1;
            }
        }
    }
    if n == 0 {
        return empty;
    }
    Centroid {
        x: sx / n as f64 / f64::from(w - 1).max(1.0),
        y: sy / n as f64 / f64::from(h - 1).max(1.0),
        count: n,
    }
}

fn offsets(steps: u32, span: f64) -> Vec<f64> {
    if steps <= 1 {
        return vec![0.5];
    }
    (0..steps)
        .map(|i| 0.5 - span + 2.0 * span * f64::from(i) / f64::from(steps - 1))
        .collect()
}

/// Grid-search the crop centering whose visible content sits closest to
/// the middle of the square.
pub fn best_centering(img: &RgbaImage, opts: &CenteringOptions) -> CenteringResult {
    let (w, h) = img.dimensions();
    let short = w.min(h);
    let work_img;
    let source = if short > SEARCH_SIZE {
        let scale = f64::from(SEARCH_SIZE) / f64::from(short);
        let nw = ((f64::from(w) * scale).round() as u32).max(1);
        let nh = ((f64::from(h) * scale).round() as u32).max(1);
        work_img = imageops::resize(img, nw, nh, FilterType::Triangle);
        &work_img
    } else {
        img
    };
    let size = source.width().min(source.height()).max(1);

    let span = opts.span.clamp(0.0, 0.49);
    let mut best: Option<(f64, CenteringResult)> = None;
    for cy in offsets(opts.steps, span) {
        for cx in offsets(opts.steps, span) {
            let crop = center_crop_to_square(source, size, (cx, cy));
            let centroid = content_centroid(&crop, opts.alpha_threshold, opts.margin);
            let mut score = (centroid.x - 0.5).powi(2) + (centroid.y - 0.5).powi(2);
            if centroid.count == 0 {
                score += NO_CONTENT_PENALTY;
            }
            if best.as_ref().is_none_or(|(s, _)| score < *s) {
                best = Some((
                    score,
                    CenteringResult {
                        centering: (cx, cy),
                        centroid,
                    },
                ));
            }
        }
    }

    best.map(|(_, r)| r).unwrap_or(CenteringResult {
        centering: (0.5, 0.5),
        centroid: content_centroid(img, opts.alpha_threshold, opts.margin),
    })
}
