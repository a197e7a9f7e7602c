//! Token codecs: named, versioned transforms over the escaped byte stream.
//!
//! Source text is escaped first ([`crate::escape`]) and the selected codec
//! then rewrites the resulting bytes. In an escaped stream every `0xFE` opens
//! a three byte run and `0xFF` only ever appears inside such a run, so codecs
//! are free to use a bare `0xFF` as their own marker as long as they copy
//! escape runs through untouched. The registry assigns each codec a stable
//! 4-bit index that is written into the container header together with the
//! codec's 4-bit version.
//!
//! | Index | Name         | Transform                                  |
//! |-------|--------------|--------------------------------------------|
//! | 0     | `none`       | identity                                   |
//! | 1     | `lzw`        | LZW, codes `>= 0xFF` stored as `FF lo hi`  |
//! | 2     | `shortcode`  | grouped dictionary, 3-byte markers         |
//! | 3     | `minify`     | lossy whitespace/comment minification      |
//! | 4     | `shortcode8` | flat dictionary, 2-byte markers            |
//!
//! Indices are assigned once and never reused, so images written with an
//! older registry keep decoding.

mod dictionary;
mod identity;
mod lzw;
mod minify;
mod registry;

pub use dictionary::{DictionaryCodec, LITERAL_SLOT, MARKER};
pub use identity::IdentityCodec;
pub use lzw::LzwCodec;
pub use minify::{MinifyCodec, Minifier};
pub use registry::{Registry, RegistryBuilder, RegistryError};

use thiserror::Error;

use crate::options::MinifyOptions;

/// Stable index of the identity codec.
pub const NONE_INDEX: u8 = 0;
/// Stable index of the LZW codec.
pub const LZW_INDEX: u8 = 1;
/// Stable index of the grouped dictionary codec.
pub const SHORTCODE_INDEX: u8 = 2;
/// Stable index of the minifier.
pub const MINIFY_INDEX: u8 = 3;
/// Stable index of the flat dictionary codec.
pub const SHORTCODE8_INDEX: u8 = 4;

/// Errors raised while reversing a token codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A marker sequence ends before all of its bytes are present.
    #[error("Truncated marker at byte {offset}")]
    Truncated { offset: usize },

    /// A marker references a dictionary slot that does not exist.
    #[error("Unknown dictionary entry at byte {offset}")]
    UnknownEntry { offset: usize },

    /// The encoded data cannot have been produced by this codec.
    #[error("Malformed codec data: {0}")]
    Malformed(String),
}

/// A reversible (or one-directional) transform over escaped bytes.
pub trait TokenCodec: Send + Sync {
    /// Registry name, e.g. `"lzw"`.
    fn name(&self) -> &'static str;

    /// Stable registry index (0-15).
    fn index(&self) -> u8;

    /// Current revision of this codec (0-15).
    fn version(&self) -> u8;

    /// Whether data written by revision `stored_version` can be decoded.
    fn is_compatible(&self, stored_version: u8) -> bool {
        stored_version <= self.version()
    }

    /// Transform an escaped stream for storage.
    fn encode(&self, stream: &[u8], options: &MinifyOptions) -> Vec<u8>;

    /// Reverse [`TokenCodec::encode`], yielding the escaped stream again.
    fn decode(&self, stream: &[u8]) -> Result<Vec<u8>, CodecError>;
}

impl std::fmt::Debug for dyn TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("name", &self.name())
            .field("index", &self.index())
            .field("version", &self.version())
            .finish()
    }
}
