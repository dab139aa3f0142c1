//! Decode and cover-resize to a fixed-size RGB888 raster.

use image::imageops::FilterType;

/// Decode `raw` and resize it to exactly `width` x `height` with cover
/// semantics: the source is scaled to fill the target box while preserving
/// aspect ratio, and the overflow is cropped centered. The output raster is
/// always 3 channels, 8 bits each, no alpha, of length `width * height * 3`.
///
/// Fails when `raw` is not a decodable image.
pub fn transform(raw: &[u8], width: u32, height: u32) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(raw)?;
    let resized = img.resize_to_fill(width, height, FilterType::Lanczos3);
    Ok(resized.to_rgb8().into_raw())
}
