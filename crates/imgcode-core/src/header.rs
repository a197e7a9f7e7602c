//! The 8-channel container header stored in the first two cells.
//!
//! ```text
//! channel: 0           1           2            3     4            5     6            7
//!          len[0:8]    len[8:16]   len[16:24]   255   len[24:32]   tag   format*10    255
//! ```
//!
//! The codec tag packs `(version << 4) | index`. The format byte carries the
//! container revision with one decimal digit; images written before the
//! format byte existed hold `255` there and are read as format 0.

use tracing::debug;

use crate::decode::DecodeError;

/// Cells occupied by the header.
pub const HEADER_CELLS: usize = 2;

/// Channel values occupied by the header.
pub const HEADER_BYTES: usize = HEADER_CELLS * 4;

/// Value written to every fourth channel.
pub const CHANNEL_SENTINEL: u8 = 255;

/// Current container format (1.0), stored as `version * 10`.
pub const FORMAT_VERSION: u8 = 10;

/// Format byte of images written before the format byte existed.
pub const LEGACY_FORMAT: u8 = 255;

/// A codec index and version packed into one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecTag {
    index: u8,
    version: u8,
}

impl CodecTag {
    /// Returns `None` if either field needs more than 4 bits.
    pub fn new(index: u8, version: u8) -> Option<Self> {
        (index < 16 && version < 16).then_some(Self { index, version })
    }

    pub fn pack(self) -> u8 {
        (self.version << 4) | self.index
    }

    pub fn unpack(byte: u8) -> Self {
        Self {
            index: byte & 0x0F,
            version: byte >> 4,
        }
    }

    pub fn index(self) -> u8 {
        self.index
    }

    pub fn version(self) -> u8 {
        self.version
    }
}

/// Decoded header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Byte length of the escaped stream.
    pub length: u32,
    /// Registry index of the token codec.
    pub codec_index: u8,
    /// Codec version the payload was written with.
    pub codec_version: u8,
    /// Container format, `version * 10`; `0` for legacy images.
    pub format_version: u8,
}

impl ContainerHeader {
    /// Header for a stream written with `tag` in the current format.
    pub fn new(length: u32, tag: CodecTag) -> Self {
        Self {
            length,
            codec_index: tag.index(),
            codec_version: tag.version(),
            format_version: FORMAT_VERSION,
        }
    }

    /// Serialise into the 8 header channels.
    ///
    /// Index and version are masked to 4 bits; build the header from a
    /// validated [`CodecTag`].
    pub fn to_bytes(&self) -> [u8; HEADER_BYTES] {
        let len = self.length.to_le_bytes();
        let tag = ((self.codec_version & 0x0F) << 4) | (self.codec_index & 0x0F);
        [
            len[0],
            len[1],
            len[2],
            CHANNEL_SENTINEL,
            len[3],
            tag,
            self.format_version,
            CHANNEL_SENTINEL,
        ]
    }

    /// Read the header from the start of a grid's RGBA buffer.
    ///
    /// `pixels` is the whole buffer: the declared length is checked against
    /// what the remaining cells can carry (3 of every 4 channels).
    ///
    /// # Errors
    ///
    /// - `DecodeError::InvalidSource` if the buffer is shorter than the header
    /// - `DecodeError::CorruptHeader` if the length is negative as a signed
    ///   32-bit value or larger than the grid can hold
    /// - `DecodeError::UnsupportedFormat` for a format newer than this build
    pub fn read(pixels: &[u8]) -> Result<Self, DecodeError> {
        let Some(b) = pixels.get(..HEADER_BYTES) else {
            return Err(DecodeError::InvalidSource(format!(
                "header needs {HEADER_BYTES} channels, got {}",
                pixels.len()
            )));
        };

        let signed = i32::from_le_bytes([b[0], b[1], b[2], b[4]]);
        let max_length = (pixels.len() - HEADER_BYTES) * 3 / 4;
        if signed < 0 || signed as usize > max_length {
            return Err(DecodeError::CorruptHeader {
                length: signed as i64,
                max_length,
            });
        }

        let format_version = match b[6] {
            LEGACY_FORMAT => 0,
            stored if stored > FORMAT_VERSION => {
                return Err(DecodeError::UnsupportedFormat { stored })
            }
            stored => stored,
        };

        let tag = CodecTag::unpack(b[5]);
        let header = Self {
            length: signed as u32,
            codec_index: tag.index(),
            codec_version: tag.version(),
            format_version,
        };
        debug!(?header, "read container header");
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_tag_packing() {
        let tag = CodecTag::new(2, 6).unwrap();
        assert_eq!(tag.pack(), 0x62);
        assert_eq!(CodecTag::unpack(0x62), tag);
        assert_eq!(CodecTag::unpack(0xF3).version(), 15);
        assert_eq!(CodecTag::unpack(0xF3).index(), 3);
    }

    #[test]
    fn test_codec_tag_bounds() {
        assert!(CodecTag::new(15, 15).is_some());
        assert!(CodecTag::new(16, 0).is_none());
        assert!(CodecTag::new(0, 16).is_none());
        assert!(CodecTag::new(2, 99).is_none());
    }

    #[test]
    fn test_header_layout() {
        let header = ContainerHeader::new(0x0403_0201, CodecTag::new(1, 1).unwrap());
        assert_eq!(header.to_bytes(), [0x01, 0x02, 0x03, 255, 0x04, 0x11, 10, 255]);
    }

    fn with_room(header: [u8; HEADER_BYTES], payload_cells: usize) -> Vec<u8> {
        let mut pixels = header.to_vec();
        pixels.resize(HEADER_BYTES + payload_cells * 4, 0);
        pixels
    }

    #[test]
    fn test_header_roundtrip() {
        let header = ContainerHeader::new(30, CodecTag::new(4, 1).unwrap());
        let pixels = with_room(header.to_bytes(), 10);
        assert_eq!(ContainerHeader::read(&pixels).unwrap(), header);
    }

    #[test]
    fn test_length_bound() {
        let header = ContainerHeader::new(31, CodecTag::new(0, 0).unwrap());
        let pixels = with_room(header.to_bytes(), 10);
        assert_eq!(
            ContainerHeader::read(&pixels),
            Err(DecodeError::CorruptHeader {
                length: 31,
                max_length: 30
            })
        );
    }

    #[test]
    fn test_negative_length_rejected() {
        let pixels = with_room([0, 0, 0, 255, 0x80, 0, 10, 255], 4);
        assert!(matches!(
            ContainerHeader::read(&pixels),
            Err(DecodeError::CorruptHeader { length, .. }) if length < 0
        ));
    }

    #[test]
    fn test_legacy_format() {
        let pixels = with_room([10, 0, 0, 255, 0, 0, 255, 255], 4);
        let header = ContainerHeader::read(&pixels).unwrap();
        assert_eq!(header.format_version, 0);
        assert_eq!(header.length, 10);
        assert_eq!(header.codec_index, 0);
    }

    #[test]
    fn test_future_format_rejected() {
        let pixels = with_room([10, 0, 0, 255, 0, 0, 20, 255], 4);
        assert!(matches!(
            ContainerHeader::read(&pixels),
            Err(DecodeError::UnsupportedFormat { stored: 20 })
        ));
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(
            ContainerHeader::read(&[0, 0, 0, 255]),
            Err(DecodeError::InvalidSource(_))
        ));
    }
}
