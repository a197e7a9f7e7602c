//! The token codec registry.
//!
//! The registry is built once, validated at construction time, and read-only
//! afterwards. It is `Send + Sync` and safe to share between threads without
//! locking.

use thiserror::Error;

use super::{
    DictionaryCodec, IdentityCodec, LzwCodec, MinifyCodec, TokenCodec, SHORTCODE8_INDEX,
    SHORTCODE_INDEX,
};
use crate::header::CodecTag;

/// Number of indices addressable by a codec tag.
pub const MAX_CODECS: usize = 16;

/// Grouped dictionary shipped as `shortcode`.
///
/// The first two buckets are what version 0 images index into and must stay
/// exactly as they are, including the repeated `"var i=0"` and the order that
/// lets it shadow the entries after it.
const SHORTCODE_BUCKETS: &[&[&str]] = &[
    &["for(var i = 0", "for(var i=0", ";i++)", "for(var k in ", ";i< ", ";i<"],
    &[
        "var i = 0;",
        "var i = 0, ",
        "var i = 0,",
        "var i=0",
        "var i=0;",
        "var i=0,",
        "var i=0",
        "var ",
    ],
    &[
        "console.log(",
        ".prototype.",
        "document.",
        "function(",
        "function ",
        "window.",
        ".length",
        "return ",
        "this.",
    ],
];

/// Flat dictionary shipped as `shortcode8`, longest pattern first.
const SHORTCODE8_PATTERNS: &[&str] = &[
    "document.getElementById(",
    "addEventListener(",
    "querySelector(",
    "console.log(",
    ".prototype.",
    "undefined",
    "continue;",
    "function(",
    "function ",
    "document.",
    "return ",
    "window.",
    ".length",
    "typeof ",
    "break;",
    "while(",
    "const ",
    "this.",
    "else ",
    "let ",
    "var ",
    "new ",
    "for(",
    "if(",
];

/// Errors raised while building a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The codec's index or version does not fit in a 4-bit tag field.
    #[error("Codec '{name}' has index {index} / version {version}; both must be below 16")]
    TagOverflow {
        name: &'static str,
        index: u8,
        version: u8,
    },

    /// Another codec already owns this index.
    #[error("Index {index} is already assigned to '{existing}', cannot register '{name}'")]
    IndexTaken {
        index: u8,
        existing: &'static str,
        name: &'static str,
    },

    /// Another codec already uses this name.
    #[error("A codec named '{0}' is already registered")]
    DuplicateName(&'static str),

    /// A dictionary table violates its size limits.
    #[error("Invalid dictionary for '{name}': {reason}")]
    InvalidDictionary { name: &'static str, reason: String },

    /// A minifier pattern failed to compile.
    #[error("Matcher compilation failed: {0}")]
    Matcher(#[from] regex::Error),
}

/// Builder collecting codecs before the registry is frozen.
#[derive(Debug)]
pub struct RegistryBuilder {
    slots: Vec<Option<Box<dyn TokenCodec>>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_CODECS).map(|_| None).collect(),
        }
    }

    /// Add a codec at its own index.
    ///
    /// # Errors
    ///
    /// Fails if the index or version does not fit a codec tag, or if the index
    /// or name is already taken.
    pub fn register(mut self, codec: impl TokenCodec + 'static) -> Result<Self, RegistryError> {
        let name = codec.name();
        let index = codec.index();
        if CodecTag::new(index, codec.version()).is_none() {
            return Err(RegistryError::TagOverflow {
                name,
                index,
                version: codec.version(),
            });
        }
        if let Some(existing) = &self.slots[index as usize] {
            return Err(RegistryError::IndexTaken {
                index,
                existing: existing.name(),
                name,
            });
        }
        if self.slots.iter().flatten().any(|c| c.name() == name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.slots[index as usize] = Some(Box::new(codec));
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry { slots: self.slots }
    }
}

/// Read-only mapping from stable index to codec.
#[derive(Debug)]
pub struct Registry {
    slots: Vec<Option<Box<dyn TokenCodec>>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The standard registry: `none`, `lzw`, `shortcode`, `minify`, `shortcode8`.
    pub fn builtin() -> Result<Self, RegistryError> {
        let registry = Self::builder()
            .register(IdentityCodec)?
            .register(LzwCodec)?
            .register(DictionaryCodec::grouped(
                "shortcode",
                SHORTCODE_INDEX,
                6,
                SHORTCODE_BUCKETS,
            )?)?
            .register(MinifyCodec::new()?)?
            .register(DictionaryCodec::flat(
                "shortcode8",
                SHORTCODE8_INDEX,
                1,
                SHORTCODE8_PATTERNS,
            )?)?
            .build();
        Ok(registry)
    }

    /// Look up a codec by index.
    pub fn get(&self, index: u8) -> Option<&dyn TokenCodec> {
        self.slots.get(index as usize)?.as_deref()
    }

    /// Look up a codec by name.
    pub fn by_name(&self, name: &str) -> Option<&dyn TokenCodec> {
        self.iter().find(|c| c.name() == name)
    }

    /// Registered codecs in index order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn TokenCodec> {
        self.slots.iter().flatten().map(|c| &**c)
    }

    /// `(index, name)` pairs in index order.
    pub fn entries(&self) -> Vec<(u8, &'static str)> {
        self.iter().map(|c| (c.index(), c.name())).collect()
    }

    /// Codec names in index order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, LZW_INDEX, MINIFY_INDEX, NONE_INDEX};
    use crate::options::MinifyOptions;

    struct Fixed {
        name: &'static str,
        index: u8,
        version: u8,
    }

    impl TokenCodec for Fixed {
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
            stream.to_vec()
        }
        fn decode(&self, stream: &[u8]) -> Result<Vec<u8>, CodecError> {
            Ok(stream.to_vec())
        }
    }

    #[test]
    fn test_builtin_index_order() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(
            registry.names(),
            vec!["none", "lzw", "shortcode", "minify", "shortcode8"]
        );
        assert_eq!(registry.get(NONE_INDEX).unwrap().name(), "none");
        assert_eq!(registry.get(LZW_INDEX).unwrap().name(), "lzw");
        assert_eq!(registry.get(SHORTCODE_INDEX).unwrap().version(), 6);
        assert_eq!(registry.get(MINIFY_INDEX).unwrap().name(), "minify");
        assert_eq!(registry.by_name("shortcode8").unwrap().index(), SHORTCODE8_INDEX);
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_shortcode_legacy_slots() {
        let registry = Registry::builtin().unwrap();
        let shortcode = registry.get(SHORTCODE_INDEX).unwrap();
        assert_eq!(shortcode.decode(&[0xFF, 0, 2]).unwrap(), b";i++)");
        assert_eq!(shortcode.decode(&[0xFF, 1, 1]).unwrap(), b"var i = 0, ");
        assert_eq!(shortcode.decode(&[0xFF, 1, 7]).unwrap(), b"var ");
    }

    #[test]
    fn test_every_codec_index_matches_slot() {
        let registry = Registry::builtin().unwrap();
        for (index, name) in registry.entries() {
            assert_eq!(registry.get(index).unwrap().name(), name);
        }
    }

    #[test]
    fn test_unknown_lookups() {
        let registry = Registry::builtin().unwrap();
        assert!(registry.get(9).is_none());
        assert!(registry.get(200).is_none());
        assert!(registry.by_name("gzip").is_none());
    }

    #[test]
    fn test_index_collision() {
        let result = Registry::builder()
            .register(IdentityCodec)
            .unwrap()
            .register(Fixed {
                name: "other",
                index: NONE_INDEX,
                version: 0,
            });
        assert!(matches!(result, Err(RegistryError::IndexTaken { index: 0, .. })));
    }

    #[test]
    fn test_duplicate_name() {
        let result = Registry::builder().register(IdentityCodec).unwrap().register(Fixed {
            name: "none",
            index: 7,
            version: 0,
        });
        assert!(matches!(result, Err(RegistryError::DuplicateName("none"))));
    }

    #[test]
    fn test_tag_overflow() {
        let result = Registry::builder().register(Fixed {
            name: "wide",
            index: 16,
            version: 0,
        });
        assert!(matches!(result, Err(RegistryError::TagOverflow { .. })));

        let result = Registry::builder().register(Fixed {
            name: "old",
            index: 5,
            version: 16,
        });
        assert!(matches!(result, Err(RegistryError::TagOverflow { .. })));
    }

    #[test]
    fn test_default_compatibility_rule() {
        let codec = Fixed {
            name: "x",
            index: 5,
            version: 6,
        };
        assert!(codec.is_compatible(0));
        assert!(codec.is_compatible(6));
        assert!(!codec.is_compatible(7));
        assert!(!codec.is_compatible(99));
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
