//! Border compositing, auto-centering, logo trimming and export.
//!
//! Everything here is synchronous CPU work on `image` buffers; async callers
//! go through [`compose_icon_blocking`] / [`export::save_image_async`] so the
//! runtime threads stay free.

/// Border corner masks and framing
pub mod border;
/// Content centroid and crop position search
pub mod centering;
/// Square cropping
pub mod crop;
/// JPEG and PNG output
pub mod export;
/// Transparent padding removal for logos
pub mod logo;

use std::path::Path;

use image::{DynamicImage, RgbaImage};
use iisu_model::{ExportFormat, SourceTag};
use tracing::debug;

use crate::error::{ArtError, Result};

pub use border::{compose_with_border, corner_mask_from_border};
pub use centering::{
    CenteringOptions, CenteringResult, Centroid, best_centering, content_centroid,
};
pub use crop::center_crop_to_square;
pub use export::{
    DEFAULT_JPEG_QUALITY, flatten_on_white, save_image_async, save_image_for_export,
};
pub use logo::{LogoCropOptions, detect_and_crop_logo, logo_bbox};

/// When and how to auto-center artwork before framing.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoCenterSettings {
    /// Master switch.
    pub enabled: bool,
    /// Source tags the pass applies to.
    pub sources: Vec<String>,
    /// Search tuning.
    pub options: CenteringOptions,
}

impl Default for AutoCenterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sources: vec![SourceTag::LIBRETRO_BOXART.to_string()],
            options: CenteringOptions::default(),
        }
    }
}

/// When and how to trim logos found inside artwork.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoDetectSettings {
    /// Master switch.
    pub enabled: bool,
    /// Source tags the pass applies to.
    pub sources: Vec<String>,
    /// Crop tuning.
    pub options: LogoCropOptions,
}

impl Default for LogoDetectSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            sources: vec![
                SourceTag::LIBRETRO_BOXART.to_string(),
                SourceTag::STEAMGRIDDB_SQUARE.to_string(),
            ],
            options: LogoCropOptions::default(),
        }
    }
}

/// Everything [`compose_icon`] needs besides the images.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeSettings {
    /// Side of the square output, in pixels.
    pub out_size: u32,
    /// File format written.
    pub format: ExportFormat,
    /// JPEG quality, 1 to 100.
    pub jpeg_quality: u8,
    /// Auto-centering pass.
    pub auto_center: AutoCenterSettings,
    /// Logo trimming pass.
    pub logo_detect: LogoDetectSettings,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            out_size: 1024,
            format: ExportFormat::Jpeg,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            auto_center: AutoCenterSettings::default(),
            logo_detect: LogoDetectSettings::default(),
        }
    }
}

/// A composed icon plus what the centering pass observed.
#[derive(Debug, Clone)]
pub struct ComposedIcon {
    /// The framed icon.
    pub image: RgbaImage,
    /// Crop position used, `(0.5, 0.5)` when no search ran.
    pub centering: (f64, f64),
    /// Present only when auto-centering ran.
    pub centroid: Option<Centroid>,
    /// Whether the logo trim changed the artwork.
    pub logo_cropped: bool,
}

impl ComposedIcon {
    /// Whether the measured centroid is further than `tolerance` from the middle.
    pub fn is_off_center(&self, tolerance: f64) -> bool {
        self.centroid.is_some_and(|c| c.is_off_center(tolerance))
    }
}

/// Decode any format the `image` crate recognises.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Load a border PNG as RGBA.
pub fn load_border(path: &Path) -> Result<RgbaImage> {
    if !path.is_file() {
        return Err(ArtError::NotFound(format!("border {}", path.display())));
    }
    Ok(image::open(path)?.to_rgba8())
}

/// Decode artwork, optionally trim and re-center it, and frame it with
/// `border`.
pub fn compose_icon(
    bytes: &[u8],
    source: &SourceTag,
    border: &RgbaImage,
    settings: &ComposeSettings,
) -> Result<ComposedIcon> {
    let mut img = decode_image(bytes)?.to_rgba8();

    let mut logo_cropped = false;
    let ld = &settings.logo_detect;
    if ld.enabled && source.is_listed(&ld.sources) {
        let before = img.dimensions();
        img = detect_and_crop_logo(&img, &ld.options);
        logo_cropped = img.dimensions() != before;
        debug!("[compose] logo crop {:?} -> {:?}", before, img.dimensions());
    }

    let ac = &settings.auto_center;
    let (centering, centroid) = if ac.enabled && source.is_listed(&ac.sources) {
        let result = best_centering(&img, &ac.options);
        (result.centering, Some(result.centroid))
    } else {
        ((0.5, 0.5), None)
    };

    let image = compose_with_border(&img, border, settings.out_size, centering);
    Ok(ComposedIcon {
        image,
        centering,
        centroid,
        logo_cropped,
    })
}

/// [`compose_icon`] on the blocking pool.
pub async fn compose_icon_blocking(
    bytes: std::sync::Arc<[u8]>,
    source: SourceTag,
    border: std::sync::Arc<RgbaImage>,
    settings: ComposeSettings,
) -> Result<ComposedIcon> {
    tokio::task::spawn_blocking(move || compose_icon(&bytes, &source, &border, &settings))
        .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn compose_respects_source_gating() {
        let art = RgbaImage::from_pixel(120, 80, Rgba([5, 6, 7, 255]));
        let border = RgbaImage::new(64, 64);
        let settings = ComposeSettings {
            out_size: 64,
            ..Default::default()
        };

        let gated = compose_icon(
            &png_bytes(&art),
            &SourceTag::new(SourceTag::LIBRETRO_BOXART),
            &border,
            &settings,
        )
        .unwrap();
        assert!(gated.centroid.is_some());
        assert_eq!(gated.image.dimensions(), (64, 64));

        let plain = compose_icon(
            &png_bytes(&art),
            &SourceTag::new(SourceTag::STEAMGRIDDB_SQUARE),
            &border,
            &settings,
        )
        .unwrap();
        assert!(plain.centroid.is_none());
        assert_eq!(plain.centering, (0.5, 0.5));
        assert!(!plain.is_off_center(0.06));
    }

    #[test]
    fn undecodable_bytes_are_an_image_error() {
        let err = decode_image(b"not an image").unwrap_err();
        assert!(matches!(err, ArtError::Image(_)));
    }

    #[test]
    fn missing_border_is_not_found() {
        let err = load_border(Path::new("/definitely/missing/border.png")).unwrap_err();
        assert!(matches!(err, ArtError::NotFound(_)));
    }
}
