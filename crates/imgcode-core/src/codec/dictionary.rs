//! Dictionary substitution codecs.
//!
//! A dictionary codec replaces literal fragments of the escaped stream with
//! short markers. Two marker layouts exist:
//!
//! ```text
//! flat:    [0xFF] [entry]            up to 255 entries
//! grouped: [0xFF] [bucket] [entry]   up to 255 buckets of 256 entries
//! ```
//!
//! Escape runs (`0xFE lo hi`) are copied through whole and never take part in
//! a match, so the only `0xFF` bytes outside a run are markers. Slot `0xFF`
//! (entry for flat tables, bucket for grouped ones) is reserved: `[0xFF, 0xFF]`
//! stands for a bare `0xFF` byte, which escaped text never contains but the
//! codec still round-trips.
//!
//! Patterns are applied one at a time in registration order. A pattern never
//! matches across a marker produced by an earlier pattern, so overlapping
//! entries are always reversible; registering the longer of two overlapping
//! patterns first keeps the shorter one from shadowing it.

use super::{CodecError, RegistryError, TokenCodec};
use crate::escape::{escape, ESCAPE_SENTINEL};
use crate::options::MinifyOptions;

/// Byte that opens every marker.
pub const MARKER: u8 = 0xFF;

/// Slot value that follows [`MARKER`] to encode a bare `0xFF` byte.
pub const LITERAL_SLOT: u8 = 0xFF;

/// Maximum number of entries in a flat table, or buckets in a grouped one.
const MAX_SLOTS: usize = LITERAL_SLOT as usize;

/// Maximum number of entries in one bucket.
const MAX_BUCKET_ENTRIES: usize = 256;

/// Where an entry lives in the decode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Flat(u8),
    Grouped(u8, u8),
}

#[derive(Debug, Clone)]
struct Entry {
    pattern: Vec<Piece>,
    slot: Slot,
}

#[derive(Debug, Clone)]
enum Table {
    Flat(Vec<Vec<u8>>),
    Grouped(Vec<Vec<Vec<u8>>>),
}

/// Working representation during substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Byte(u8),
    /// An escape run; `len` is below 3 only for a run cut off by the end.
    Run { bytes: [u8; 3], len: u8 },
    Entry(usize),
}

/// A dictionary substitution codec with a fixed table.
#[derive(Debug, Clone)]
pub struct DictionaryCodec {
    name: &'static str,
    index: u8,
    version: u8,
    entries: Vec<Entry>,
    table: Table,
}

impl DictionaryCodec {
    /// Build a flat (2-byte marker) dictionary.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidDictionary` for more than 255 patterns
    /// or an empty pattern.
    pub fn flat(
        name: &'static str,
        index: u8,
        version: u8,
        patterns: &[&str],
    ) -> Result<Self, RegistryError> {
        if patterns.len() > MAX_SLOTS {
            return Err(RegistryError::InvalidDictionary {
                name,
                reason: format!("{} entries exceed the limit of {MAX_SLOTS}", patterns.len()),
            });
        }

        let mut entries = Vec::with_capacity(patterns.len());
        let mut table = Vec::with_capacity(patterns.len());
        for (i, pattern) in patterns.iter().enumerate() {
            let bytes = pattern_bytes(name, pattern)?;
            entries.push(Entry {
                pattern: pieces(&bytes),
                slot: Slot::Flat(i as u8),
            });
            table.push(bytes);
        }

        Ok(Self {
            name,
            index,
            version,
            entries,
            table: Table::Flat(table),
        })
    }

    /// Build a grouped (3-byte marker) dictionary.
    ///
    /// Buckets are applied in order, and patterns in order within a bucket.
    pub fn grouped(
        name: &'static str,
        index: u8,
        version: u8,
        buckets: &[&[&str]],
    ) -> Result<Self, RegistryError> {
        if buckets.len() > MAX_SLOTS {
            return Err(RegistryError::InvalidDictionary {
                name,
                reason: format!("{} buckets exceed the limit of {MAX_SLOTS}", buckets.len()),
            });
        }

        let mut entries = Vec::new();
        let mut table = Vec::with_capacity(buckets.len());
        for (b, bucket) in buckets.iter().enumerate() {
            if bucket.len() > MAX_BUCKET_ENTRIES {
                return Err(RegistryError::InvalidDictionary {
                    name,
                    reason: format!("bucket {b} has {} entries", bucket.len()),
                });
            }
            let mut decoded = Vec::with_capacity(bucket.len());
            for (e, pattern) in bucket.iter().enumerate() {
                let bytes = pattern_bytes(name, pattern)?;
                entries.push(Entry {
                    pattern: pieces(&bytes),
                    slot: Slot::Grouped(b as u8, e as u8),
                });
                decoded.push(bytes);
            }
            table.push(decoded);
        }

        Ok(Self {
            name,
            index,
            version,
            entries,
            table: Table::Grouped(table),
        })
    }

    /// Number of dictionary entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn substitute(&self, stream: &[u8]) -> Vec<Piece> {
        let mut pieces = pieces(stream);

        for (id, entry) in self.entries.iter().enumerate() {
            let pattern = &entry.pattern;
            if pattern.len() > pieces.len() {
                continue;
            }
            let mut out = Vec::with_capacity(pieces.len());
            let mut i = 0;
            while i < pieces.len() {
                if pieces[i..].starts_with(pattern) {
                    out.push(Piece::Entry(id));
                    i += pattern.len();
                } else {
                    out.push(pieces[i]);
                    i += 1;
                }
            }
            pieces = out;
        }

        pieces
    }

    fn lookup(&self, stream: &[u8], offset: usize) -> Result<(&[u8], usize), CodecError> {
        let truncated = CodecError::Truncated { offset };
        let unknown = CodecError::UnknownEntry { offset };
        let first = *stream.get(offset + 1).ok_or(truncated.clone())?;
        if first == LITERAL_SLOT {
            return Ok((&[MARKER], 2));
        }
        match &self.table {
            Table::Flat(table) => {
                let expansion = table.get(first as usize).ok_or(unknown)?;
                Ok((expansion, 2))
            }
            Table::Grouped(table) => {
                let entry = *stream.get(offset + 2).ok_or(truncated)?;
                let expansion = table
                    .get(first as usize)
                    .and_then(|b| b.get(entry as usize))
                    .ok_or(unknown)?;
                Ok((expansion, 3))
            }
        }
    }
}

impl TokenCodec for DictionaryCodec {
    fn name(&self) -> &'static str {
        self.name
    }

    fn index(&self) -> u8 {
        self.index
    }

    fn version(&self) -> u8 {
        self.version
    }

    fn encode(&self, stream: &[u8], _options: &MinifyOptions) -> Vec<u8> {
        let mut out = Vec::with_capacity(stream.len());
        for piece in self.substitute(stream) {
            match piece {
                Piece::Byte(MARKER) => out.extend_from_slice(&[MARKER, LITERAL_SLOT]),
                Piece::Byte(byte) => out.push(byte),
                Piece::Run { bytes, len } => out.extend_from_slice(&bytes[..len as usize]),
                Piece::Entry(id) => match self.entries[id].slot {
                    Slot::Flat(entry) => out.extend_from_slice(&[MARKER, entry]),
                    Slot::Grouped(bucket, entry) => {
                        out.extend_from_slice(&[MARKER, bucket, entry])
                    }
                },
            }
        }
        out
    }

    fn decode(&self, stream: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(stream.len() * 2);
        let mut i = 0;
        while i < stream.len() {
            match stream[i] {
                ESCAPE_SENTINEL => {
                    let end = (i + 3).min(stream.len());
                    out.extend_from_slice(&stream[i..end]);
                    i = end;
                }
                MARKER => {
                    let (expansion, consumed) = self.lookup(stream, i)?;
                    out.extend_from_slice(expansion);
                    i += consumed;
                }
                byte => {
                    out.push(byte);
                    i += 1;
                }
            }
        }
        Ok(out)
    }
}

fn pattern_bytes(name: &'static str, pattern: &str) -> Result<Vec<u8>, RegistryError> {
    if pattern.is_empty() {
        return Err(RegistryError::InvalidDictionary {
            name,
            reason: "empty pattern".to_string(),
        });
    }
    Ok(escape(&pattern.encode_utf16().collect::<Vec<u16>>()))
}

/// Split a stream into single bytes and whole escape runs.
fn pieces(stream: &[u8]) -> Vec<Piece> {
    let mut out = Vec::with_capacity(stream.len());
    let mut i = 0;
    while i < stream.len() {
        if stream[i] != ESCAPE_SENTINEL {
            out.push(Piece::Byte(stream[i]));
            i += 1;
            continue;
        }
        let end = (i + 3).min(stream.len());
        let mut bytes = [0u8; 3];
        bytes[..end - i].copy_from_slice(&stream[i..end]);
        out.push(Piece::Run {
            bytes,
            len: (end - i) as u8,
        });
        i = end;
    }
    out
}
