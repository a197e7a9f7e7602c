//! WASM-compatible wrapper types for pixel grids.

use imgcode_core::grid::{GridError, PixelGrid};
use wasm_bindgen::prelude::*;

/// An RGBA pixel grid wrapper for JavaScript.
///
/// Pixel data lives in WASM memory. `pixels()` copies it into a JavaScript
/// `Uint8Array`, which can be fed straight into `new ImageData(...)`.
#[wasm_bindgen]
pub struct JsPixelGrid {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsPixelGrid {
    /// Create a grid from dimensions and RGBA pixel data.
    ///
    /// # Arguments
    /// * `width` - Grid width in cells
    /// * `height` - Grid height in cells
    /// * `pixels` - RGBA data (4 bytes per cell, row-major order)
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> JsPixelGrid {
        JsPixelGrid {
            width,
            height,
            pixels,
        }
    }

    /// Get the grid width in cells
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the grid height in cells
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the number of bytes in the pixel buffer (width * height * 4)
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// Returns RGBA pixel data as Uint8Array (a copy).
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }

    /// Explicitly free WASM memory.
    pub fn free(self) {}
}

impl JsPixelGrid {
    pub(crate) fn from_grid(grid: PixelGrid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            pixels: grid.into_raw(),
        }
    }

    /// Convert to a core grid, checking the buffer length. Clones the pixels.
    pub(crate) fn to_grid(&self) -> Result<PixelGrid, GridError> {
        PixelGrid::from_rgba(self.width, self.height, self.pixels.clone())
    }
}
