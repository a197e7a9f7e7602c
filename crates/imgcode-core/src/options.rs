//! Encoder configuration.
//!
//! Every recognised option is an explicit field with a documented default.
//! The structures derive `serde` so they can be loaded from JSON or passed
//! in from JavaScript.

use serde::{Deserialize, Serialize};

use crate::encode::EncodeError;
use crate::grid::{Geometry, SurfaceLimits};

/// Options for the minifier.
///
/// Each pass is `Option<bool>`: `Some(flag)` forces the pass on or off, `None`
/// defers to `all`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MinifyOptions {
    /// Enables every pass that is not set explicitly.
    pub all: bool,
    /// Strip `//` and `/* */` comments.
    pub comments: Option<bool>,
    /// Trim lines and drop blank lines.
    pub whitespace: Option<bool>,
    /// Collapse all whitespace runs and join lines.
    #[serde(rename = "unsafe")]
    pub unsafe_whitespace: Option<bool>,
    /// Rewrite hex, octal and binary integer literals as decimal.
    pub fold_literals: Option<bool>,
    /// Rewrite `true`/`false` as `!0`/`!1`.
    pub compact_booleans: Option<bool>,
    /// Evaluate parenthesised integer arithmetic.
    pub eval_constants: Option<bool>,
    /// Decode HTML character entities.
    pub decode_entities: Option<bool>,
}

impl MinifyOptions {
    /// Options with every pass enabled.
    pub fn everything() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    fn resolve(&self, flag: Option<bool>) -> bool {
        flag.unwrap_or(self.all)
    }

    pub fn comments(&self) -> bool {
        self.resolve(self.comments)
    }

    pub fn whitespace(&self) -> bool {
        self.resolve(self.whitespace)
    }

    pub fn unsafe_whitespace(&self) -> bool {
        self.resolve(self.unsafe_whitespace)
    }

    pub fn fold_literals(&self) -> bool {
        self.resolve(self.fold_literals)
    }

    pub fn compact_booleans(&self) -> bool {
        self.resolve(self.compact_booleans)
    }

    pub fn eval_constants(&self) -> bool {
        self.resolve(self.eval_constants)
    }

    pub fn decode_entities(&self) -> bool {
        self.resolve(self.decode_entities)
    }

    /// True when no pass would run.
    pub fn is_noop(&self) -> bool {
        !(self.comments()
            || self.whitespace()
            || self.unsafe_whitespace()
            || self.fold_literals()
            || self.compact_booleans()
            || self.eval_constants()
            || self.decode_entities())
    }
}

/// Options for [`crate::encode::encode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Grid sizing policy.
    pub geometry: Geometry,
    /// Registry name of the token codec.
    pub encoder: String,
    /// Minifier passes. Applied as a pre-pass before any other codec.
    pub minify: MinifyOptions,
    /// Raster surface limits.
    pub limits: SurfaceLimits,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            encoder: "none".to_string(),
            minify: MinifyOptions::default(),
            limits: SurfaceLimits::default(),
        }
    }
}

impl EncodeOptions {
    /// Options using `encoder` and `geometry`, defaults otherwise.
    pub fn new(encoder: &str, geometry: Geometry) -> Self {
        Self {
            geometry,
            encoder: encoder.to_string(),
            ..Self::default()
        }
    }

    /// Parse options from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError::InvalidOptions` for malformed JSON, unknown
    /// geometry names or wrongly typed values.
    pub fn from_json(json: &str) -> Result<Self, EncodeError> {
        serde_json::from_str(json).map_err(|e| EncodeError::InvalidOptions(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_defaults_are_off() {
        let opts = MinifyOptions::default();
        assert!(opts.is_noop());
        assert!(!opts.comments());
    }

    #[test]
    fn test_all_flag_fallback() {
        let mut opts = MinifyOptions::everything();
        assert!(opts.comments());
        assert!(opts.decode_entities());

        opts.compact_booleans = Some(false);
        assert!(!opts.compact_booleans());
        assert!(opts.fold_literals());
    }

    #[test]
    fn test_explicit_flag_without_all() {
        let opts = MinifyOptions {
            whitespace: Some(true),
            ..Default::default()
        };
        assert!(opts.whitespace());
        assert!(!opts.comments());
        assert!(!opts.is_noop());
    }

    #[test]
    fn test_encode_options_from_json() {
        let opts = EncodeOptions::from_json(
            r#"{"geometry":"vline","encoder":"lzw","minify":{"comments":true,"unsafe":false}}"#,
        )
        .unwrap();
        assert_eq!(opts.geometry, Geometry::VLine);
        assert_eq!(opts.encoder, "lzw");
        assert_eq!(opts.minify.comments, Some(true));
        assert_eq!(opts.minify.unsafe_whitespace, Some(false));
        assert_eq!(opts.limits, SurfaceLimits::default());
    }

    #[test]
    fn test_encode_options_json_defaults() {
        let opts = EncodeOptions::from_json("{}").unwrap();
        assert_eq!(opts, EncodeOptions::default());
    }

    #[test]
    fn test_hline_alias() {
        let opts = EncodeOptions::from_json(r#"{"geometry":"hline"}"#).unwrap();
        assert_eq!(opts.geometry, Geometry::Line);
    }

    #[test]
    fn test_malformed_options_rejected() {
        let result = EncodeOptions::from_json(r#"{"geometry":"diagonal"}"#);
        assert!(matches!(result, Err(EncodeError::InvalidOptions(_))));

        let result = EncodeOptions::from_json(r#"{"minify":{"comments":"yes"}}"#);
        assert!(matches!(result, Err(EncodeError::InvalidOptions(_))));
    }
}
