//! Encode, decode and run bindings.
//!
//! # Example
//!
//! ```typescript
//! import { JsImgCode } from '@imgcode/wasm';
//!
//! const codec = new JsImgCode();
//! const grid = codec.encode(source, 'square', 'lzw', { comments: true });
//! const text = codec.decode(grid);
//! const result = codec.run(grid);
//! codec.free();
//! ```

use std::str::FromStr;

use imgcode_core::codec::Registry;
use imgcode_core::grid::{Geometry, PixelGrid};
use imgcode_core::run::{ExecutionFailure, Executor, RunError};
use imgcode_core::{decode_text, encode_text, EncodeError, EncodeOptions, MinifyOptions};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::types::JsPixelGrid;

/// A registered codec as seen from JavaScript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct EncoderInfo {
    name: &'static str,
    index: u8,
    version: u8,
}

/// Codec registry handle.
///
/// The registry (including its precompiled matchers) is built once in the
/// constructor; keep one instance around instead of creating one per call.
#[wasm_bindgen]
pub struct JsImgCode {
    registry: Registry,
}

#[wasm_bindgen]
impl JsImgCode {
    /// Build the standard codec registry.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<JsImgCode, JsValue> {
        let registry = Registry::builtin().map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(JsImgCode { registry })
    }

    /// Encode source text into a pixel grid.
    ///
    /// # Arguments
    /// * `code` - Source text
    /// * `mode` - `"square"`, `"line"`/`"hline"`, `"vline"` or `"optimal"`
    /// * `encoder` - Codec name from `get_encoders()`
    /// * `options` - Optional minify flags, e.g. `{ all: true, unsafe: false }`
    ///
    /// # Errors
    /// Returns an error for an unknown mode or encoder, malformed options, or
    /// a grid that exceeds the surface limits.
    pub fn encode(
        &self,
        code: &str,
        mode: &str,
        encoder: &str,
        options: JsValue,
    ) -> Result<JsPixelGrid, JsValue> {
        let minify = if options.is_undefined() || options.is_null() {
            MinifyOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?
        };
        self.encode_with(code, mode, encoder, minify)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Decode the text stored in a grid.
    pub fn decode(&self, grid: &JsPixelGrid) -> Result<String, JsValue> {
        let grid = grid.to_grid().map_err(|e| JsValue::from_str(&e.to_string()))?;
        decode_text(&self.registry, &grid).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Decode text from raw RGBA data, e.g. `ImageData.data`.
    pub fn decode_pixels(&self, pixels: Vec<u8>, width: u32, height: u32) -> Result<String, JsValue> {
        let grid =
            PixelGrid::from_rgba(width, height, pixels).map_err(|e| JsValue::from_str(&e.to_string()))?;
        decode_text(&self.registry, &grid).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Decode a grid and evaluate the recovered source.
    ///
    /// With `callback`, the source string is passed to it and its return
    /// value is returned. Without one, the source is compiled as a function
    /// body and called.
    ///
    /// # Errors
    /// Returns an error if decoding fails or the evaluation throws.
    pub fn run(&self, grid: &JsPixelGrid, callback: Option<js_sys::Function>) -> Result<JsValue, JsValue> {
        let grid = grid.to_grid().map_err(|e| JsValue::from_str(&e.to_string()))?;
        let executor = JsExecutor { callback };
        imgcode_core::run::run(&self.registry, &grid, &executor).map_err(|e| {
            if let RunError::Execution(failure) = &e {
                web_sys::console::error_1(&JsValue::from_str(&failure.message));
            }
            JsValue::from_str(&e.to_string())
        })
    }

    /// List registered codecs as `{ name, index, version }` objects.
    pub fn get_encoders(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.encoders()).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl JsImgCode {
    pub(crate) fn encode_with(
        &self,
        code: &str,
        mode: &str,
        encoder: &str,
        minify: MinifyOptions,
    ) -> Result<JsPixelGrid, EncodeError> {
        let geometry =
            Geometry::from_str(mode).map_err(|e| EncodeError::InvalidOptions(e.to_string()))?;
        let options = EncodeOptions {
            minify,
            ..EncodeOptions::new(encoder, geometry)
        };
        let grid = encode_text(&self.registry, code, &options)?;
        Ok(JsPixelGrid::from_grid(grid))
    }

    pub(crate) fn encoders(&self) -> Vec<EncoderInfo> {
        self.registry
            .iter()
            .map(|codec| EncoderInfo {
                name: codec.name(),
                index: codec.index(),
                version: codec.version(),
            })
            .collect()
    }
}

/// Evaluates source through a JavaScript function.
struct JsExecutor {
    callback: Option<js_sys::Function>,
}

impl Executor for JsExecutor {
    type Value = JsValue;

    fn execute(&self, source: &str) -> Result<JsValue, ExecutionFailure> {
        let result = match &self.callback {
            Some(callback) => callback.call1(&JsValue::NULL, &JsValue::from_str(source)),
            None => js_sys::Function::new_no_args(source).call0(&JsValue::NULL),
        };
        result.map_err(|e| {
            ExecutionFailure::new(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
        })
    }
}


/// WASM-specific tests that require JsValue.
///
/// Run with `wasm-pack test`.
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_encode_decode_roundtrip() {
        let codec = JsImgCode::new().unwrap();
        let grid = codec
            .encode("var i = 0;", "optimal", "shortcode", JsValue::UNDEFINED)
            .unwrap();
        assert_eq!(codec.decode(&grid).unwrap(), "var i = 0;");
    }

    #[wasm_bindgen_test]
    fn test_decode_pixels() {
        let codec = JsImgCode::new().unwrap();
        let grid = codec.encode("hello", "line", "none", JsValue::NULL).unwrap();
        let text = codec
            .decode_pixels(grid.pixels(), grid.width(), grid.height())
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[wasm_bindgen_test]
    fn test_encode_with_minify_options() {
        #[derive(Serialize)]
        struct Flags {
            comments: bool,
        }
        let codec = JsImgCode::new().unwrap();
        let options = serde_wasm_bindgen::to_value(&Flags { comments: true }).unwrap();
        let grid = codec.encode("a/* b */c", "square", "none", options).unwrap();
        assert_eq!(codec.decode(&grid).unwrap(), "a c");
    }

    #[wasm_bindgen_test]
    fn test_run_without_callback() {
        let codec = JsImgCode::new().unwrap();
        let grid = codec.encode("return 6 * 7;", "square", "lzw", JsValue::UNDEFINED).unwrap();
        assert_eq!(codec.run(&grid, None).unwrap().as_f64(), Some(42.0));
    }

    #[wasm_bindgen_test]
    fn test_run_with_callback() {
        let codec = JsImgCode::new().unwrap();
        let grid = codec.encode("abc", "square", "none", JsValue::UNDEFINED).unwrap();
        let callback = js_sys::Function::new_with_args("src", "return src.length;");
        assert_eq!(codec.run(&grid, Some(callback)).unwrap().as_f64(), Some(3.0));
    }

    #[wasm_bindgen_test]
    fn test_run_reports_thrown_error() {
        let codec = JsImgCode::new().unwrap();
        let grid = codec.encode("throw 'boom';", "square", "none", JsValue::UNDEFINED).unwrap();
        assert!(codec.run(&grid, None).is_err());
    }

    #[wasm_bindgen_test]
    fn test_get_encoders() {
        let codec = JsImgCode::new().unwrap();
        let encoders = codec.get_encoders().unwrap();
        assert!(js_sys::Array::is_array(&encoders));
        assert_eq!(js_sys::Array::from(&encoders).length(), 5);
    }
}
