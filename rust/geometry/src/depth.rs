// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Robust depth sampling
//!
//! A single depth pixel is unreliable: sensors produce speckle noise, holes
//! (NaN) on reflective surfaces, and values that bleed across depth edges.
//! The sampler reads a 3x3 window and returns the median of the valid values.

use crate::frame::{DepthBuffer, DepthFrame};
use smallvec::SmallVec;

/// Closest distance the depth sensor reports reliably (meters)
pub const DEFAULT_MIN_DEPTH: f32 = 0.1;
/// Farthest distance the depth sensor reports reliably (meters)
pub const DEFAULT_MAX_DEPTH: f32 = 5.0;

/// Half-size of the sampling window (1 => 3x3)
const WINDOW_RADIUS: i64 = 1;

/// Accepted depth interval, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthRange {
    pub min: f32,
    pub max: f32,
}

impl Default for DepthRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_DEPTH,
            max: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DepthRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, depth: f32) -> bool {
        depth.is_finite() && depth >= self.min && depth <= self.max
    }
}

/// Median-of-window depth sampler
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthSampler {
    range: DepthRange,
}

impl DepthSampler {
    pub fn new(range: DepthRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> DepthRange {
        self.range
    }

    /// Depth at pixel `(x, y)` of the buffer.
    ///
    /// Window samples past the buffer edge are clamped to the nearest edge
    /// pixel, so border locations still get nine samples. Returns `None` when
    /// no sample is finite and inside the accepted range; callers treat that
    /// as a cue to fall back, not as an error.
    pub fn sample(&self, buffer: &DepthBuffer, x: f64, y: f64) -> Option<f32> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        let max_col = buffer.width() as i64 - 1;
        let max_row = buffer.height() as i64 - 1;
        let center_col = x.floor() as i64;
        let center_row = y.floor() as i64;

        let mut samples: SmallVec<[f32; 9]> = SmallVec::new();
        for dy in -WINDOW_RADIUS..=WINDOW_RADIUS {
            for dx in -WINDOW_RADIUS..=WINDOW_RADIUS {
                let col = (center_col + dx).clamp(0, max_col) as u32;
                let row = (center_row + dy).clamp(0, max_row) as u32;

                if let Some(depth) = buffer.read(col, row) {
                    if self.range.contains(depth) {
                        samples.push(depth);
                    }
                }
            }
        }

        median(&mut samples)
    }

    /// Depth under an image-space pixel of a depth-capable frame
    pub fn sample_image_point(&self, frame: &DepthFrame, px: f64, py: f64) -> Option<f32> {
        let (buffer, _) = frame.depth_parts()?;
        let (dx, dy) = frame.image_to_depth(buffer, px, py)?;
        self.sample(buffer, dx, dy)
    }
}

/// Median of the values; mean of the middle pair for even counts
fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}
