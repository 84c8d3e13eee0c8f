use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use iisu_model::ExportFormat;

use crate::error::Result;

/// Quality used when exporting JPEG output.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Alpha-blend onto opaque white.
pub fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u32::from(a);
        let mix = |c: u8| ((u32::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([mix(r), mix(g), mix(b)])
    })
}

/// Write `img` to `path`, creating parent directories. JPEG output is
/// flattened onto white; PNG keeps alpha.
pub fn save_image_for_export(
    img: &DynamicImage,
    path: &Path,
    format: ExportFormat,
    quality: u8,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    match format {
        ExportFormat::Jpeg => {
            let rgb = flatten_on_white(img);
            let mut out = BufWriter::new(File::create(path)?);
            let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)?;
        }
        ExportFormat::Png => {
            img.to_rgba8().save_with_format(path, ImageFormat::Png)?;
        }
    }
    Ok(())
}

/// [`save_image_for_export`] on the blocking pool.
pub async fn save_image_async(
    img: DynamicImage,
    path: PathBuf,
    format: ExportFormat,
    quality: u8,
) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || {
        save_image_for_export(&img, &path, format, quality).map(|()| path)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        assert_eq!(flatten_on_white(&img).get_pixel(0, 0).0, [255, 255, 255]);

        let opaque =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255])));
        assert_eq!(flatten_on_white(&opaque).get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn writes_jpeg_and_png_with_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([1, 2, 3, 128])));

        let jpg = dir.path().join("nes/zelda/icon.jpg");
        save_image_for_export(&img, &jpg, ExportFormat::Jpeg, 90).unwrap();
        let bytes = std::fs::read(&jpg).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));

        let png = dir.path().join("nes/zelda/icon.png");
        save_image_for_export(&img, &png, ExportFormat::Png, 90).unwrap();
        let decoded = image::open(&png).unwrap();
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0)[3], 128);
    }

    #[tokio::test]
    async fn async_save_runs_off_thread() {
        let dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        let path = save_image_async(img, dir.path().join("a/b.png"), ExportFormat::Png, 95)
            .await
            .unwrap();
        assert!(path.exists());
    }
}
