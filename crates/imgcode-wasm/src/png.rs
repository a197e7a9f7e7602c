//! PNG container bindings.
//!
//! Grids must be stored losslessly; PNG is the only format offered.

use crate::types::JsPixelGrid;
use imgcode_core::grid;
use wasm_bindgen::prelude::*;

/// Encode a grid as PNG bytes.
///
/// # Errors
/// Returns an error if the grid's buffer does not match its dimensions or
/// PNG encoding fails.
#[wasm_bindgen]
pub fn encode_png(grid: &JsPixelGrid) -> Result<Vec<u8>, JsValue> {
    encode_png_bytes(grid).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Decode PNG bytes into a grid.
///
/// # Errors
/// Returns an error if the bytes are not a readable image.
#[wasm_bindgen]
pub fn decode_png(bytes: &[u8]) -> Result<JsPixelGrid, JsValue> {
    grid::decode_png(bytes)
        .map(JsPixelGrid::from_grid)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn encode_png_bytes(js: &JsPixelGrid) -> Result<Vec<u8>, grid::GridError> {
    grid::encode_png(&js.to_grid()?)
}
