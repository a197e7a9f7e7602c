//! Escape codec: maps 16-bit code units onto an 8-bit byte stream.
//!
//! Units below [`ESCAPE_SENTINEL`] are stored as a single byte. Everything
//! else becomes a three byte run:
//!
//! ```text
//! [0xFE] [unit & 0xFF] [unit >> 8]
//! ```
//!
//! The sentinel itself is escaped, so every `0xFE` in a well-formed stream
//! starts an escape run.

use thiserror::Error;

/// Byte that introduces an escape run.
pub const ESCAPE_SENTINEL: u8 = 0xFE;

/// Errors produced when reversing the escape transform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscapeError {
    /// A sentinel byte is not followed by two more bytes.
    #[error("Truncated escape sequence at byte {offset}")]
    Truncated { offset: usize },

    /// A sentinel byte encodes a unit that is never escaped.
    #[error("Non-canonical escape sequence at byte {offset} (unit {unit:#06x})")]
    NonCanonical { offset: usize, unit: u16 },
}

/// Number of bytes `escape` will produce for `units`.
pub fn escaped_len(units: &[u16]) -> usize {
    units
        .iter()
        .map(|&u| if u < ESCAPE_SENTINEL as u16 { 1 } else { 3 })
        .sum()
}

/// Escape code units into bytes.
pub fn escape(units: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(escaped_len(units));
    for &unit in units {
        if unit < ESCAPE_SENTINEL as u16 {
            out.push(unit as u8);
        } else {
            out.push(ESCAPE_SENTINEL);
            out.push((unit & 0xFF) as u8);
            out.push((unit >> 8) as u8);
        }
    }
    out
}

/// Reverse [`escape`].
///
/// # Errors
///
/// A sentinel that is not a genuine escape run (truncated, or encoding a unit
/// below the sentinel) is reported instead of being absorbed.
pub fn unescape(bytes: &[u8]) -> Result<Vec<u16>, EscapeError> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte != ESCAPE_SENTINEL {
            out.push(byte as u16);
            i += 1;
            continue;
        }
        if i + 2 >= bytes.len() {
            return Err(EscapeError::Truncated { offset: i });
        }
        let unit = bytes[i + 1] as u16 | ((bytes[i + 2] as u16) << 8);
        if unit < ESCAPE_SENTINEL as u16 {
            return Err(EscapeError::NonCanonical { offset: i, unit });
        }
        out.push(unit);
        i += 3;
    }
    Ok(out)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: unescape(escape(t)) == t for arbitrary code units.
        #[test]
        fn prop_escape_roundtrip(units in prop::collection::vec(any::<u16>(), 0..512)) {
            prop_assert_eq!(unescape(&escape(&units)).unwrap(), units);
        }

        /// Property: every sentinel byte in the output begins a three byte run.
        #[test]
        fn prop_sentinel_starts_run(units in prop::collection::vec(any::<u16>(), 0..256)) {
            let bytes = escape(&units);
            prop_assert_eq!(bytes.len(), escaped_len(&units));
            prop_assert!(unescape(&bytes).is_ok());
        }
    }
}
