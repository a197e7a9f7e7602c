//! ImgCode WASM - WebAssembly bindings for ImgCode
//!
//! This crate exposes the imgcode-core codec to JavaScript/TypeScript.
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible wrapper for pixel grids
//! - `codec` - Encode, decode and run through a shared codec registry
//! - `png` - Lossless PNG container I/O
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsImgCode, encode_png } from '@imgcode/wasm';
//!
//! await init();
//!
//! const codec = new JsImgCode();
//! const grid = codec.encode('alert(1)', 'square', 'none');
//! const png = encode_png(grid);
//! ```

use wasm_bindgen::prelude::*;

mod codec;
mod png;
mod types;

pub use codec::JsImgCode;
pub use png::{decode_png, encode_png};
pub use types::JsPixelGrid;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Container format written by this build, as `major.minor`.
#[wasm_bindgen]
pub fn format_version() -> String {
    let stored = imgcode_core::FORMAT_VERSION;
    format!("{}.{}", stored / 10, stored % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_format_version() {
        assert_eq!(format_version(), "1.0");
    }
}
