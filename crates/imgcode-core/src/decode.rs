//! Decode orchestration: pixel grid in, payload out.
//!
//! The stored stream is handed to the token codec first and the bytes it
//! returns are unescaped into code units.

use thiserror::Error;
use tracing::{debug, warn};

use crate::codec::{CodecError, Registry, TokenCodec};
use crate::escape::{unescape, EscapeError};
use crate::grid::{PixelGrid, CHANNELS};
use crate::header::{ContainerHeader, HEADER_BYTES};
use crate::payload::Payload;

/// Errors that can occur while decoding a grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Corrupt header: declared length {length} outside 0..={max_length}")]
    CorruptHeader { length: i64, max_length: usize },

    #[error("Unknown codec index {index}")]
    UnknownCodec { index: u8 },

    #[error("Codec {index} cannot read version {stored} (supports up to {supported})")]
    IncompatibleVersion { index: u8, stored: u8, supported: u8 },

    #[error("Unsupported container format {stored}")]
    UnsupportedFormat { stored: u8 },

    #[error("Escape error: {0}")]
    Escape(#[from] EscapeError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Decoded payload is not valid UTF-16")]
    InvalidText,
}

/// Decode the payload stored in `grid`.
///
/// # Errors
///
/// - `DecodeError::CorruptHeader` / `UnsupportedFormat` for a bad header
/// - `DecodeError::UnknownCodec` if the tag names an unregistered codec
/// - `DecodeError::IncompatibleVersion` if the stored version is too new
/// - `DecodeError::Escape` / `DecodeError::Codec` for a damaged stream
pub fn decode(registry: &Registry, grid: &PixelGrid) -> Result<Payload, DecodeError> {
    decode_inner(registry, grid).inspect_err(|e| warn!(error = %e, "decode failed"))
}

/// Decode and convert to a `String`.
///
/// # Errors
///
/// Everything [`decode`] returns, plus `DecodeError::InvalidText` when the
/// payload holds unpaired surrogates.
pub fn decode_text(registry: &Registry, grid: &PixelGrid) -> Result<String, DecodeError> {
    decode(registry, grid)?
        .into_string()
        .map_err(|_| DecodeError::InvalidText)
}

fn decode_inner(registry: &Registry, grid: &PixelGrid) -> Result<Payload, DecodeError> {
    let header = ContainerHeader::read(grid.pixels())?;
    let codec = resolve_codec(registry, &header)?;
    let stream = read_stream(grid, &header);

    let units = unescape(&codec.decode(&stream)?)?;
    debug!(
        codec = codec.name(),
        bytes = stream.len(),
        units = units.len(),
        "decoded payload"
    );
    Ok(Payload::from_units(units))
}

/// Find the codec named by `header` and check it can read the stored version.
///
/// # Errors
///
/// Returns `DecodeError::UnknownCodec` or `DecodeError::IncompatibleVersion`.
pub fn resolve_codec<'r>(
    registry: &'r Registry,
    header: &ContainerHeader,
) -> Result<&'r dyn TokenCodec, DecodeError> {
    let codec = registry
        .get(header.codec_index)
        .ok_or(DecodeError::UnknownCodec {
            index: header.codec_index,
        })?;
    if !codec.is_compatible(header.codec_version) {
        return Err(DecodeError::IncompatibleVersion {
            index: header.codec_index,
            stored: header.codec_version,
            supported: codec.version(),
        });
    }
    Ok(codec)
}

/// Collect `header.length` stream bytes from the payload cells.
///
/// The header must have been read from `grid`, so the length is known to fit.
pub fn read_stream(grid: &PixelGrid, header: &ContainerHeader) -> Vec<u8> {
    let length = header.length as usize;
    let mut stream = Vec::with_capacity(length);
    for cell in grid.pixels()[HEADER_BYTES..].chunks_exact(CHANNELS) {
        let take = (length - stream.len()).min(3);
        if take == 0 {
            break;
        }
        stream.extend_from_slice(&cell[..take]);
    }
    stream
}
