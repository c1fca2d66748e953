//! Image decoding helpers.
//!
//! Everything downstream works on 8-bit RGB, so all loaders convert on the way
//! in regardless of the stored format or alpha channel.

use crate::core::OCRError;
use image::{DynamicImage, RgbImage};

/// Converts a DynamicImage to an RgbImage, dropping any alpha channel.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Errors
///
/// Returns `OCRError::ImageLoad` if the file cannot be read or decoded.
pub fn load_image(path: &std::path::Path) -> Result<RgbImage, OCRError> {
    let img = image::open(path).map_err(OCRError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

/// Decodes an in-memory PNG or JPEG (or any format the `image` crate sniffs)
/// into an RgbImage.
///
/// # Errors
///
/// Returns `OCRError::InvalidInput` for an empty buffer and
/// `OCRError::ImageLoad` for bytes that do not decode.
pub fn load_image_from_memory(bytes: &[u8]) -> Result<RgbImage, OCRError> {
    if bytes.is_empty() {
        return Err(OCRError::invalid_input("image data is empty"));
    }
    let img = image::load_from_memory(bytes).map_err(OCRError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}
