use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

use crate::core::errors::PipelineError;

/// Decode raster bytes (PNG, JPEG, ...) into an image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    image::load_from_memory(bytes).map_err(|source| PipelineError::Decode { source })
}

/// Normalize any decoded image to an owned 3-channel RGB canvas.
///
/// Palette and alpha images are flattened here so drawing never has to care
/// about the source pixel format.
pub fn normalize_rgb(img: &DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Asynchronously decode image bytes using spawn_blocking.
///
/// Decoding large pages is CPU-bound and would otherwise stall the runtime.
pub async fn decode_image_async(bytes: Arc<Vec<u8>>) -> Result<DynamicImage, PipelineError> {
    tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| PipelineError::TaskJoinFailed(e.to_string()))?
}

/// Encode an RGB canvas as JPEG with the given quality (1-100).
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, PipelineError> {
    let mut jpeg_bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_bytes, quality);
    DynamicImage::ImageRgb8(img.clone())
        .write_with_encoder(encoder)
        .map_err(|source| PipelineError::Encode { source })?;
    Ok(jpeg_bytes)
}

/// Asynchronously encode an RGB canvas as JPEG using spawn_blocking.
pub async fn encode_jpeg_async(img: RgbImage, quality: u8) -> Result<Vec<u8>, PipelineError> {
    tokio::task::spawn_blocking(move || encode_jpeg(&img, quality))
        .await
        .map_err(|e| PipelineError::TaskJoinFailed(e.to_string()))?
}

/// Encode an RGB canvas as PNG (lossless, used for the OCR upload).
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut png_bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(png_bytes)
}
