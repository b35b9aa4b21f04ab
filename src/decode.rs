use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbImage;

use crate::error::ServiceError;

/// Decodes a base64 payload into a 3-channel RGB image.
///
/// Any format the `image` crate recognizes is accepted; paletted, grayscale
/// and alpha-channel inputs are flattened to RGB. No size limit or resizing
/// is applied here.
pub fn decode_image(encoded: &str) -> Result<RgbImage, ServiceError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| ServiceError::Decode(format!("invalid base64 payload: {e}")))?;

    let img = image::load_from_memory(&bytes)
        .map_err(|e| ServiceError::Decode(format!("unrecognized image data: {e}")))?;

    Ok(img.to_rgb8())
}
