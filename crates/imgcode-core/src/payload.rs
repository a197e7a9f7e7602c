//! Payload text as a sequence of 16-bit code units.
//!
//! Source text is carried as UTF-16 code units rather than `String` so that
//! every unit in `0..=0xFFFF` (including unpaired surrogates) survives a
//! round-trip through the container unchanged.

use std::string::FromUtf16Error;

/// An ordered sequence of 16-bit code units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Payload {
    units: Vec<u16>,
}

impl Payload {
    /// Create a payload from raw code units.
    pub fn from_units(units: Vec<u16>) -> Self {
        Self { units }
    }

    /// Borrow the code units.
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Consume the payload, returning its code units.
    pub fn into_units(self) -> Vec<u16> {
        self.units
    }

    /// Number of code units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Convert to a `String`, replacing unpaired surrogates with U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    /// Convert to a `String`, failing on unpaired surrogates.
    pub fn into_string(self) -> Result<String, FromUtf16Error> {
        String::from_utf16(&self.units)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self {
            units: text.encode_utf16().collect(),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::from(text.as_str())
    }
}

impl From<Vec<u16>> for Payload {
    fn from(units: Vec<u16>) -> Self {
        Self::from_units(units)
    }
}
