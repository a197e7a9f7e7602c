//! Lossless PNG import and export.
//!
//! Only lossless formats can carry a payload; any decoder that rewrites
//! channel values (JPEG, premultiplied canvases) corrupts the stream.

use std::io::Cursor;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageReader};

use super::{GridError, PixelGrid};

/// Encode a grid as PNG bytes.
///
/// # Errors
///
/// Returns `GridError::EncodingFailed` if the encoder rejects the buffer.
pub fn encode_png(grid: &PixelGrid) -> Result<Vec<u8>, GridError> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);

    encoder
        .write_image(
            grid.pixels(),
            grid.width(),
            grid.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| GridError::EncodingFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}

/// Decode image bytes into a grid.
///
/// The format is detected from the data. Anything that is not a decodable
/// image yields `GridError::InvalidSource`.
pub fn decode_png(bytes: &[u8]) -> Result<PixelGrid, GridError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| GridError::InvalidSource(e.to_string()))?;

    let img = reader
        .decode()
        .map_err(|e| GridError::InvalidSource(e.to_string()))?;

    Ok(PixelGrid::from_rgba_image(img.into_rgba8()))
}
