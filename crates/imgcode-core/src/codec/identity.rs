//! The `none` codec.

use super::{CodecError, TokenCodec, NONE_INDEX};
use crate::options::MinifyOptions;

/// Stores the escaped stream unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl TokenCodec for IdentityCodec {
    fn name(&self) -> &'static str {
        "none"
    }

    fn index(&self) -> u8 {
        NONE_INDEX
    }

    fn version(&self) -> u8 {
        0
    }

    fn is_compatible(&self, _stored_version: u8) -> bool {
        true
    }

    fn encode(&self, stream: &[u8], _options: &MinifyOptions) -> Vec<u8> {
        stream.to_vec()
    }

    fn decode(&self, stream: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(stream.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_roundtrip() {
        let stream = [0u8, 0x41, 0xFE, 0xFF, 0x00, 0xFF];
        let encoded = IdentityCodec.encode(&stream, &MinifyOptions::default());
        assert_eq!(encoded, stream);
        assert_eq!(IdentityCodec.decode(&encoded).unwrap(), stream);
    }

    #[test]
    fn test_identity_always_compatible() {
        assert!(IdentityCodec.is_compatible(0));
        assert!(IdentityCodec.is_compatible(15));
        assert!(IdentityCodec.is_compatible(99));
    }
}
