//! Raster decode and PNG encode.

use std::path::Path;

use base64::Engine;
use image::{ImageEncoder, ImageFormat, RgbaImage};

use crate::error::{Result, SassError};

/// Decode any supported raster into RGBA.
pub fn decode(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).map_err(|e| SassError::ImageDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(image.to_rgba8())
}

/// Write `image` as a PNG file.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| SassError::ImageExport {
            path: path.to_path_buf(),
            message: format!("Failed to write PNG: {}", e),
        })
}

/// Encode `image` as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut bytes);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| SassError::ImageExport {
            path: "<inline>".into(),
            message: format!("PNG encoding failed: {}", e),
        })?;
    Ok(bytes)
}

/// `url('data:image/png;base64,...')` for `image`.
pub fn data_uri(image: &RgbaImage) -> Result<String> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(encode_png(image)?);
    Ok(format!("url('data:image/png;base64,{}')", encoded))
}
