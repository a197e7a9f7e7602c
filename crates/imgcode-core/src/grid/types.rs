//! Core grid types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Channels per cell (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Errors raised when allocating or importing a grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// No raster surface can be provided at this size.
    #[error("Surface unavailable for {width}x{height}: {reason}")]
    SurfaceUnavailable {
        width: u64,
        height: u64,
        reason: String,
    },

    /// The supplied data is not a usable image.
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Writing the grid as an image failed.
    #[error("Image encoding failed: {0}")]
    EncodingFailed(String),
}

/// Platform limits on raster surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SurfaceLimits {
    /// Maximum width or height in pixels.
    pub max_dimension: u32,
    /// Maximum number of pixels.
    pub max_area: u64,
}

impl Default for SurfaceLimits {
    fn default() -> Self {
        Self {
            max_dimension: 32_767,
            max_area: 268_435_456,
        }
    }
}

impl SurfaceLimits {
    /// Check that a `width × height` surface can be provided.
    pub fn check(&self, width: u64, height: u64) -> Result<(), GridError> {
        let unavailable = |reason: String| GridError::SurfaceUnavailable {
            width,
            height,
            reason,
        };
        if width == 0 || height == 0 {
            return Err(unavailable("zero-sized surface".to_string()));
        }
        let max = self.max_dimension as u64;
        if width > max || height > max {
            return Err(unavailable(format!("dimension exceeds {max}")));
        }
        if width * height > self.max_area {
            return Err(unavailable(format!("area exceeds {}", self.max_area)));
        }
        Ok(())
    }
}

/// A `width × height` RGBA buffer in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelGrid {
    /// Allocate a zeroed grid.
    ///
    /// # Errors
    ///
    /// Returns `GridError::SurfaceUnavailable` when the size breaks `limits`
    /// or the buffer cannot be allocated.
    pub fn new(width: u32, height: u32, limits: &SurfaceLimits) -> Result<Self, GridError> {
        limits.check(width as u64, height as u64)?;
        let len = width as usize * height as usize * CHANNELS;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| GridError::SurfaceUnavailable {
                width: width as u64,
                height: height as u64,
                reason: e.to_string(),
            })?;
        data.resize(len, 0);

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap an existing RGBA buffer.
    ///
    /// # Errors
    ///
    /// Returns `GridError::InvalidSource` when the buffer length is not
    /// `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, GridError> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(GridError::InvalidSource(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a grid from an `image::RgbaImage`.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    /// Convert to an `image::RgbaImage`.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA channel data.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Number of cells (pixels).
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Total channel bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Channels of cell `index`, counted in row-major order.
    pub fn cell(&self, index: usize) -> Option<[u8; 4]> {
        let start = index.checked_mul(CHANNELS)?;
        let cell = self.data.get(start..start.checked_add(CHANNELS)?)?;
        Some([cell[0], cell[1], cell[2], cell[3]])
    }
}
