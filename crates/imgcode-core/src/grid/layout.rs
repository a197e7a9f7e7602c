//! Grid sizing policies.
//!
//! Every policy takes the number of cells a payload needs (header included)
//! and returns `(width, height)` with `width * height >= cells`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{GridError, SurfaceLimits};
use crate::header::HEADER_CELLS;

/// Ceiling on the long edge of single-line layouts.
///
/// Some rendering backends misbehave on wider surfaces.
pub const LINE_LIMIT: usize = 2048;

/// Grid sizing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    /// `ceil(sqrt(cells))` on both edges. Least aspect-ratio distortion.
    #[default]
    Square,
    /// Rows of at most [`LINE_LIMIT`] cells.
    #[serde(alias = "hline")]
    Line,
    /// Columns of at most [`LINE_LIMIT`] cells.
    VLine,
    /// A divisor pair of `cells`, for a bounding box with no padding.
    Optimal,
}

impl Geometry {
    pub fn as_str(self) -> &'static str {
        match self {
            Geometry::Square => "square",
            Geometry::Line => "line",
            Geometry::VLine => "vline",
            Geometry::Optimal => "optimal",
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised geometry name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown geometry '{0}' (expected square, line, hline, vline or optimal)")]
pub struct ParseGeometryError(pub String);

impl FromStr for Geometry {
    type Err = ParseGeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "square" => Ok(Geometry::Square),
            "line" | "hline" => Ok(Geometry::Line),
            "vline" => Ok(Geometry::VLine),
            "optimal" => Ok(Geometry::Optimal),
            other => Err(ParseGeometryError(other.to_string())),
        }
    }
}

/// Cells needed for a stream of `stream_len` bytes: 3 bytes per cell plus
/// the header.
pub fn cells_needed(stream_len: usize) -> usize {
    stream_len.div_ceil(3) + HEADER_CELLS
}

/// Pick grid dimensions for `cells` cells.
///
/// # Errors
///
/// Returns `GridError::SurfaceUnavailable` if the chosen size breaks `limits`.
/// The layout is never truncated to fit.
pub fn layout(
    cells: usize,
    geometry: Geometry,
    limits: &SurfaceLimits,
) -> Result<(u32, u32), GridError> {
    let cells = cells.max(1);
    let (width, height) = match geometry {
        Geometry::Square => {
            let side = ceil_sqrt(cells);
            (side, side)
        }
        Geometry::Line => {
            let width = cells.min(LINE_LIMIT);
            (width, cells.div_ceil(width))
        }
        Geometry::VLine => {
            let height = cells.min(LINE_LIMIT);
            (cells.div_ceil(height), height)
        }
        Geometry::Optimal => optimal(cells),
    };

    debug!(cells, %geometry, width, height, "grid layout");
    limits.check(width as u64, height as u64)?;
    Ok((width as u32, height as u32))
}

/// Divisor-based sizing.
///
/// Collects the divisors of `cells` up to `cells / 2` and takes the middle
/// one as the width. This is a near-square guess, not a search for the
/// closest pair. With a single divisor (1 or a prime) it falls back to
/// [`Geometry::Square`].
///
/// With exactly two divisors (`cells = 2 * p`, `p` prime) the middle one is
/// 2, so the result is `2 x p`. For large `p` that exceeds
/// `SurfaceLimits::max_dimension` and layout fails even though a square grid
/// would fit; pick [`Geometry::Square`] for such payloads.
fn optimal(cells: usize) -> (usize, usize) {
    let divisors: Vec<usize> = (1..=cells / 2).filter(|d| cells % d == 0).collect();
    if divisors.len() < 2 {
        let side = ceil_sqrt(cells);
        return (side, side);
    }
    let width = divisors[divisors.len() / 2];
    let height = cells / width;
    if width > height {
        (height, width)
    } else {
        (width, height)
    }
}

fn ceil_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root < n {
        root += 1;
    }
    while root > 0 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root
}
