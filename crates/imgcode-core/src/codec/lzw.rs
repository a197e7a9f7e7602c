//! LZW compression over the escaped byte stream.
//!
//! The table starts with the 256 single-byte phrases and assigns new codes
//! from 256 upward, stopping once code `0xFFFF` is taken. Codes are packed
//! back into bytes:
//!
//! ```text
//! code < 0xFF    [code]
//! code >= 0xFF   [0xFF] [code & 0xFF] [code >> 8]
//! ```
//!
//! Version 0 images (the legacy unversioned container) use the same packing
//! without the table cap, so both revisions decode through one path.

use std::collections::HashMap;

use super::{CodecError, TokenCodec, LZW_INDEX};
use crate::options::MinifyOptions;

/// Highest code the table may assign.
const MAX_CODE: usize = 0xFFFF;

/// First code available for multi-byte phrases.
const FIRST_CODE: usize = 256;

/// Byte that introduces a packed wide code.
const WIDE_CODE: u8 = 0xFF;

/// The `lzw` codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct LzwCodec;

impl TokenCodec for LzwCodec {
    fn name(&self) -> &'static str {
        "lzw"
    }

    fn index(&self) -> u8 {
        LZW_INDEX
    }

    fn version(&self) -> u8 {
        1
    }

    fn encode(&self, stream: &[u8], _options: &MinifyOptions) -> Vec<u8> {
        pack(&compress(stream))
    }

    fn decode(&self, stream: &[u8]) -> Result<Vec<u8>, CodecError> {
        expand(&unpack(stream)?)
    }
}

/// Compress bytes into LZW codes.
fn compress(bytes: &[u8]) -> Vec<u16> {
    let Some((&first, rest)) = bytes.split_first() else {
        return Vec::new();
    };

    let mut table: HashMap<(u16, u8), u16> = HashMap::new();
    let mut next_code = FIRST_CODE;
    let mut codes = Vec::with_capacity(bytes.len() / 2 + 1);
    let mut phrase = first as u16;

    for &byte in rest {
        if let Some(&code) = table.get(&(phrase, byte)) {
            phrase = code;
            continue;
        }
        codes.push(phrase);
        if next_code <= MAX_CODE {
            table.insert((phrase, byte), next_code as u16);
            next_code += 1;
        }
        phrase = byte as u16;
    }
    codes.push(phrase);
    codes
}

/// Expand LZW codes back into bytes.
fn expand(codes: &[u16]) -> Result<Vec<u8>, CodecError> {
    let Some((&first, rest)) = codes.split_first() else {
        return Ok(Vec::new());
    };
    if first as usize >= FIRST_CODE {
        return Err(CodecError::Malformed(format!(
            "first LZW code {first} is not a literal"
        )));
    }

    let mut table: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
    let mut previous = vec![first as u8];
    let mut bytes = previous.clone();

    for (position, &code) in rest.iter().enumerate() {
        let code = code as usize;
        let phrase = if code < table.len() {
            table[code].clone()
        } else if code == table.len() {
            // Code defined by this very step: previous phrase + its own head.
            let mut phrase = previous.clone();
            phrase.push(previous[0]);
            phrase
        } else {
            return Err(CodecError::Malformed(format!(
                "LZW code {code} at position {} is not yet defined",
                position + 1
            )));
        };

        bytes.extend_from_slice(&phrase);
        if table.len() <= MAX_CODE {
            let mut entry = previous;
            entry.push(phrase[0]);
            table.push(entry);
        }
        previous = phrase;
    }

    Ok(bytes)
}

/// Pack codes into the stored byte layout.
fn pack(codes: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(codes.len() * 2);
    for &code in codes {
        if code < WIDE_CODE as u16 {
            out.push(code as u8);
        } else {
            out.extend_from_slice(&[WIDE_CODE, (code & 0xFF) as u8, (code >> 8) as u8]);
        }
    }
    out
}

/// Read codes back out of the stored byte layout.
fn unpack(stream: &[u8]) -> Result<Vec<u16>, CodecError> {
    let mut codes = Vec::with_capacity(stream.len());
    let mut i = 0;
    while i < stream.len() {
        if stream[i] != WIDE_CODE {
            codes.push(stream[i] as u16);
            i += 1;
            continue;
        }
        let [lo, hi] = stream
            .get(i + 1..i + 3)
            .and_then(|b| <[u8; 2]>::try_from(b).ok())
            .ok_or(CodecError::Truncated { offset: i })?;
        codes.push(lo as u16 | (hi as u16) << 8);
        i += 3;
    }
    Ok(codes)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: decode(encode(x)) == x for arbitrary bytes.
        #[test]
        fn prop_lzw_roundtrip(input in prop::collection::vec(any::<u8>(), 0..400)) {
            let encoded = LzwCodec.encode(&input, &MinifyOptions::default());
            prop_assert_eq!(LzwCodec.decode(&encoded).unwrap(), input);
        }

        /// Property: low-entropy input round-trips through many table entries.
        #[test]
        fn prop_lzw_small_alphabet(input in prop::collection::vec(0u8..4, 0..2000)) {
            let encoded = LzwCodec.encode(&input, &MinifyOptions::default());
            prop_assert_eq!(LzwCodec.decode(&encoded).unwrap(), input);
        }
    }
}
