//! Image cleanup before OCR.
//!
//! Tesseract does noticeably better on phone photos and scans once color is
//! gone, speckle noise is smoothed out and the ink is pushed away from the
//! paper. The steps here are fixed; there is nothing to configure.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::filter::median_filter;

use crate::{
    async_utils::spawn_blocking_propagating_panics, errors::OcrError, prelude::*,
};

/// How much to stretch contrast around the mean luminance.
pub const CONTRAST_FACTOR: f32 = 2.0;

/// Radius of the median filter window. A radius of 1 is a 3x3 window.
const MEDIAN_RADIUS: u32 = 1;

/// Load an image from disk and preprocess it.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn preprocess_path(path: &Path) -> Result<GrayImage, OcrError> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(OcrError::MissingFile {
                path: path.to_owned(),
            });
        }
        Err(err) => return Err(err.into()),
    };
    spawn_blocking_propagating_panics(move || preprocess_bytes(&data)).await
}

/// Decode raw image bytes and preprocess them.
///
/// This is CPU-bound. From async code, call it through
/// [`spawn_blocking_propagating_panics`] or use [`preprocess_path`].
pub fn preprocess_bytes(data: &[u8]) -> Result<GrayImage, OcrError> {
    let image = image::load_from_memory(data)?;
    debug!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "Decoded image"
    );
    Ok(preprocess_image(&image))
}

/// Grayscale, denoise and boost contrast.
pub fn preprocess_image(image: &DynamicImage) -> GrayImage {
    let gray = to_luminance(image);
    let denoised = median_filter(&gray, MEDIAN_RADIUS, MEDIAN_RADIUS);
    enhance_contrast(&denoised, CONTRAST_FACTOR)
}

/// Convert to 8-bit luminance using ITU-R 601-2 weights.
///
/// [`DynamicImage::to_luma8`] uses Rec. 709 weights, which shifts the gray
/// levels of colored text slightly. Alpha is ignored.
fn to_luminance(image: &DynamicImage) -> GrayImage {
    if !image.color().has_color() {
        return image.to_luma8();
    }
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let l = (u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471
            + 0x8000)
            >> 16;
        Luma([l as u8])
    })
}

/// Scale every pixel's distance from the rounded mean luminance by `factor`.
pub fn enhance_contrast(image: &GrayImage, factor: f32) -> GrayImage {
    let pixel_count = u64::from(image.width()) * u64::from(image.height());
    if pixel_count == 0 {
        return image.clone();
    }
    let sum: u64 = image.pixels().map(|p| u64::from(p.0[0])).sum();
    let mean = (sum as f64 / pixel_count as f64 + 0.5).floor() as f32;

    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let value = mean + factor * (f32::from(pixel.0[0]) - mean);
        pixel.0[0] = (value as i32).clamp(0, 255) as u8;
    }
    out
}

/// Encode a preprocessed image as PNG, for handing to an external engine.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, OcrError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
