//! The RGBA pixel grid that stores an encoded payload.
//!
//! This module provides:
//! - [`PixelGrid`], a fallibly allocated `width × height` RGBA buffer
//! - Grid sizing policies ([`Geometry`]) and [`layout`]
//! - Lossless PNG import/export through the `image` crate
//!
//! # Cell Layout
//!
//! ```text
//! cell 0:    [len & 0xFF] [len >> 8] [len >> 16] [255]
//! cell 1:    [len >> 24] [codec tag] [format * 10] [255]
//! cell 2..N: [byte] [byte] [byte] [255]
//! ```
//!
//! The fourth channel is always 255. Consumers that premultiply alpha would
//! otherwise rewrite the colour channels.

mod layout;
mod png;
mod types;

pub use layout::{cells_needed, layout, Geometry, ParseGeometryError, LINE_LIMIT};
pub use png::{decode_png, encode_png};
pub use types::{GridError, PixelGrid, SurfaceLimits, CHANNELS};
