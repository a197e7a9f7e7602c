//! Encode orchestration: payload in, pixel grid out.
//!
//! Pipeline: escape code units to bytes, optional minify pre-pass, token
//! codec over the escaped bytes, then pack 3 bytes per cell behind the
//! 2-cell header.

use thiserror::Error;
use tracing::{debug, warn};

use crate::codec::{Registry, TokenCodec, MINIFY_INDEX};
use crate::escape::escape;
use crate::grid::{cells_needed, layout, GridError, PixelGrid, CHANNELS};
use crate::header::{CodecTag, ContainerHeader, CHANNEL_SENTINEL, HEADER_BYTES};
use crate::options::EncodeOptions;
use crate::payload::Payload;

/// Largest stream the signed 32-bit header length can describe.
pub const MAX_STREAM_LEN: usize = i32::MAX as usize;

/// Errors that can occur while encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Unknown encoder: {0}")]
    UnknownCodec(String),

    #[error("Invalid encode options: {0}")]
    InvalidOptions(String),

    #[error("Codec '{name}' (index {index}, version {version}) does not fit a codec tag")]
    VersionOverflow {
        name: &'static str,
        index: u8,
        version: u8,
    },

    #[error("Stream of {0} bytes exceeds the header length field")]
    PayloadTooLarge(usize),

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Encode `payload` with the codec named in `options.encoder`.
///
/// # Errors
///
/// Returns `EncodeError::UnknownCodec` if no codec has that name, and
/// otherwise whatever [`encode_with`] returns.
pub fn encode(
    registry: &Registry,
    payload: &Payload,
    options: &EncodeOptions,
) -> Result<PixelGrid, EncodeError> {
    let codec = registry
        .by_name(&options.encoder)
        .ok_or_else(|| EncodeError::UnknownCodec(options.encoder.clone()))?;
    encode_with(registry, payload, codec.index(), options)
}

/// Encode a `&str` payload.
pub fn encode_text(
    registry: &Registry,
    text: &str,
    options: &EncodeOptions,
) -> Result<PixelGrid, EncodeError> {
    encode(registry, &Payload::from(text), options)
}

/// Encode `payload` with the codec at `codec_index`.
///
/// `options.encoder` is ignored; geometry, minify passes and limits apply.
///
/// # Errors
///
/// - `EncodeError::UnknownCodec` if the index (or the minifier, when minify
///   passes are enabled) is not registered
/// - `EncodeError::PayloadTooLarge` if the stored stream overflows the header
/// - `EncodeError::Grid` if the grid cannot be allocated
pub fn encode_with(
    registry: &Registry,
    payload: &Payload,
    codec_index: u8,
    options: &EncodeOptions,
) -> Result<PixelGrid, EncodeError> {
    let codec = registry
        .get(codec_index)
        .ok_or_else(|| EncodeError::UnknownCodec(format!("index {codec_index}")))?;
    let tag = codec_tag(codec)?;

    let stream = encode_stream(registry, payload.units(), codec, options)?;
    write_grid(&stream, tag, options).inspect_err(|e| warn!(error = %e, "encode failed"))
}

fn codec_tag(codec: &dyn TokenCodec) -> Result<CodecTag, EncodeError> {
    CodecTag::new(codec.index(), codec.version()).ok_or(EncodeError::VersionOverflow {
        name: codec.name(),
        index: codec.index(),
        version: codec.version(),
    })
}

fn encode_stream(
    registry: &Registry,
    units: &[u16],
    codec: &dyn TokenCodec,
    options: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let mut escaped = escape(units);
    if !options.minify.is_noop() && codec.index() != MINIFY_INDEX {
        let minifier = registry
            .get(MINIFY_INDEX)
            .ok_or_else(|| EncodeError::UnknownCodec("minify".to_string()))?;
        escaped = minifier.encode(&escaped, &options.minify);
    }

    let stream = codec.encode(&escaped, &options.minify);
    if stream.len() > MAX_STREAM_LEN {
        return Err(EncodeError::PayloadTooLarge(stream.len()));
    }
    debug!(
        codec = codec.name(),
        units = units.len(),
        escaped = escaped.len(),
        bytes = stream.len(),
        "encoded stream"
    );
    Ok(stream)
}

/// Lay out `stream` behind a header carrying `tag`.
fn write_grid(
    stream: &[u8],
    tag: CodecTag,
    options: &EncodeOptions,
) -> Result<PixelGrid, EncodeError> {
    let (width, height) = layout(cells_needed(stream.len()), options.geometry, &options.limits)?;
    let mut grid = PixelGrid::new(width, height, &options.limits)?;

    let header = ContainerHeader::new(stream.len() as u32, tag);
    let pixels = grid.pixels_mut();
    pixels[..HEADER_BYTES].copy_from_slice(&header.to_bytes());

    for (cell, chunk) in pixels[HEADER_BYTES..]
        .chunks_exact_mut(CHANNELS)
        .zip(stream.chunks(3))
    {
        cell[..chunk.len()].copy_from_slice(chunk);
        cell[3] = CHANNEL_SENTINEL;
    }

    debug!(width, height, length = stream.len(), "wrote grid");
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{NONE_INDEX, SHORTCODE_INDEX};
    use crate::grid::{Geometry, SurfaceLimits};
    use crate::options::MinifyOptions;

    fn registry() -> Registry {
        Registry::builtin().unwrap()
    }

    #[test]
    fn test_ten_chars_fit_three_by_three() {
        let grid = encode_text(&registry(), "0123456789", &EncodeOptions::default()).unwrap();
        assert_eq!((grid.width(), grid.height()), (3, 3));

        let header = ContainerHeader::read(grid.pixels()).unwrap();
        assert_eq!(header.length, 10);
        assert_eq!(header.codec_index, NONE_INDEX);
        assert_eq!(grid.cell(2), Some([b'0', b'1', b'2', 255]));
        assert_eq!(grid.cell(5), Some([b'9', 0, 0, 255]));
    }

    #[test]
    fn test_unused_cells_stay_zero() {
        let grid = encode_text(&registry(), "ab", &EncodeOptions::default()).unwrap();
        // 1 payload cell + 2 header cells, square layout gives 2x2
        assert_eq!(grid.cell(3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_sentinel_channels() {
        let text = "function f() { return 'ÿþ\u{1F600}'; }";
        for name in registry().names() {
            let grid = encode_text(&registry(), text, &EncodeOptions::new(name, Geometry::Line))
                .unwrap();
            let header = ContainerHeader::read(grid.pixels()).unwrap();
            let used = cells_needed(header.length as usize);
            for index in 0..used {
                assert_eq!(grid.cell(index).unwrap()[3], 255, "{name} cell {index}");
            }
        }
    }

    #[test]
    fn test_codec_tag_written() {
        let grid = encode_with(
            &registry(),
            &Payload::from("var i = 0"),
            SHORTCODE_INDEX,
            &EncodeOptions::default(),
        )
        .unwrap();
        assert_eq!(grid.pixels()[5], (6 << 4) | SHORTCODE_INDEX);
    }

    fn stored(grid: &PixelGrid) -> Vec<u8> {
        let header = ContainerHeader::read(grid.pixels()).unwrap();
        crate::decode::read_stream(grid, &header)
    }

    #[test]
    fn test_escape_runs_precede_codec() {
        // U+20AC escapes to FE AC 20; LZW then sees three plain bytes.
        let grid = encode_text(&registry(), "\u{20AC}", &EncodeOptions::default()).unwrap();
        assert_eq!(stored(&grid), vec![0xFE, 0xAC, 0x20]);
        let grid = encode_text(&registry(), "\u{20AC}", &EncodeOptions::new("lzw", Geometry::Square))
            .unwrap();
        assert_eq!(stored(&grid), vec![0xFE, 0xAC, 0x20]);
    }

    #[test]
    fn test_dictionary_marker_widths() {
        let grid = encode_text(&registry(), "var a", &EncodeOptions::new("shortcode", Geometry::Line))
            .unwrap();
        // bucket 1, entry 7 is "var "
        assert_eq!(stored(&grid), vec![0xFF, 1, 7, b'a']);
        assert_eq!(grid.cell(2), Some([0xFF, 1, 7, 255]));

        let grid = encode_text(&registry(), "var a", &EncodeOptions::new("shortcode8", Geometry::Line))
            .unwrap();
        assert_eq!(stored(&grid), vec![0xFF, 20, b'a']);
    }

    #[test]
    fn test_dictionary_codecs_shrink_source() {
        let source = "var a; var b; var c; this.x; this.y;";
        let length = |name: &str| {
            let grid = encode_text(&registry(), source, &EncodeOptions::new(name, Geometry::Line))
                .unwrap();
            ContainerHeader::read(grid.pixels()).unwrap().length
        };
        assert_eq!(length("none"), 36);
        assert_eq!(length("shortcode"), 29);
        assert_eq!(length("shortcode8"), 24);
    }

    #[test]
    fn test_unknown_encoder() {
        let result = encode_text(&registry(), "x", &EncodeOptions::new("zip", Geometry::Square));
        assert!(matches!(result, Err(EncodeError::UnknownCodec(name)) if name == "zip"));

        let result = encode_with(&registry(), &Payload::from("x"), 9, &EncodeOptions::default());
        assert!(matches!(result, Err(EncodeError::UnknownCodec(_))));
    }

    #[test]
    fn test_limits_not_truncated() {
        let mut options = EncodeOptions::new("none", Geometry::Line);
        options.limits = SurfaceLimits {
            max_dimension: 4,
            max_area: 16,
        };
        let result = encode_text(&registry(), &"x".repeat(30), &options);
        assert!(matches!(
            result,
            Err(EncodeError::Grid(GridError::SurfaceUnavailable { .. }))
        ));
    }

    #[test]
    fn test_minify_prepass_applies_to_other_codecs() {
        let mut options = EncodeOptions::new("none", Geometry::Square);
        options.minify = MinifyOptions {
            comments: Some(true),
            ..Default::default()
        };
        let grid = encode_text(&registry(), "a/* note */b", &options).unwrap();
        let header = ContainerHeader::read(grid.pixels()).unwrap();
        assert_eq!(header.codec_index, NONE_INDEX);
        assert!(header.length < "a/* note */b".len() as u32);
    }

    #[test]
    fn test_empty_payload() {
        let grid = encode_text(&registry(), "", &EncodeOptions::default()).unwrap();
        assert_eq!((grid.width(), grid.height()), (2, 2));
        assert_eq!(ContainerHeader::read(grid.pixels()).unwrap().length, 0);
    }
}
