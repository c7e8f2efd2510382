// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Real-world damage size from a bounding box
//!
//! Inverts the pinhole relation `pixels = focal_length * size / depth`:
//!
//! ```text
//! real_width  = depth * pixel_width  / fx
//! real_height = depth * pixel_height / fy
//! ```

use crate::depth::DepthSampler;
use crate::frame::DepthFrame;
use damage_locator_core::{BoundingBox, Measurement, MeasurementSource};

/// Fixed confidence for sizes derived from surface extents
pub const SURFACE_SIZE_CONFIDENCE: f64 = 0.7;

/// Measured size of a damage instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealDimensions {
    /// Meters
    pub width: f64,
    /// Meters
    pub height: f64,
    /// Square meters
    pub area: f64,
    /// Distance from the camera in meters; 0 when unknown
    pub depth: f64,
    /// Measurement confidence in `[0, 1]`
    pub confidence: f64,
}

impl RealDimensions {
    /// Convert into the damage record's measurement
    pub fn to_measurement(&self, source: MeasurementSource) -> Measurement {
        Measurement {
            width: self.width,
            height: self.height,
            area: self.area,
            distance: (self.depth > 0.0).then_some(self.depth),
            confidence: self.confidence,
            source,
        }
    }
}

/// Confidence of a depth-based measurement.
///
/// Far subjects and very small or very large boxes are penalized
/// multiplicatively:
///
/// | condition | factor |
/// |---|---|
/// | depth > 3 m | 0.8 |
/// | 2 m < depth <= 3 m | 0.9 |
/// | box fraction < 0.01 | 0.7 |
/// | 0.01 <= box fraction < 0.05 | 0.85 |
/// | box fraction > 0.5 | 0.8 |
pub fn measurement_confidence(depth: f64, bbox_fraction: f64) -> f64 {
    let mut confidence = 1.0;

    if depth > 3.0 {
        confidence *= 0.8;
    } else if depth > 2.0 {
        confidence *= 0.9;
    }

    if bbox_fraction < 0.01 {
        confidence *= 0.7;
    } else if bbox_fraction < 0.05 {
        confidence *= 0.85;
    }

    if bbox_fraction > 0.5 {
        confidence *= 0.8;
    }

    f64::clamp(confidence, 0.0, 1.0)
}

/// Converts bounding boxes into physical dimensions
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeCalculator {
    sampler: DepthSampler,
}

impl SizeCalculator {
    pub fn new(sampler: DepthSampler) -> Self {
        Self { sampler }
    }

    /// Size from the frame's depth data and intrinsics.
    ///
    /// `None` when the frame is depth-free, the focal length is not
    /// positive, or no valid depth lies under the box center.
    pub fn calculate_size(&self, bbox: &BoundingBox, frame: &DepthFrame) -> Option<RealDimensions> {
        let (_, intrinsics) = frame.depth_parts()?;
        if !intrinsics.has_valid_focal_length() {
            return None;
        }

        let pixels = bbox.to_pixels(frame.image_width, frame.image_height);
        let (center_x, center_y) = pixels.center();
        let depth = self.sampler.sample_image_point(frame, center_x, center_y)? as f64;

        let width = depth * pixels.width / intrinsics.fx;
        let height = depth * pixels.height / intrinsics.fy;

        Some(RealDimensions {
            width,
            height,
            area: width * height,
            depth,
            confidence: measurement_confidence(depth, bbox.area()),
        })
    }

    /// Size as a fraction of the matched surface's physical extents.
    ///
    /// Only meaningful when the photo has no depth buffer; the camera
    /// distance is unknown and reported as 0.
    pub fn calculate_size_from_surface(
        &self,
        bbox: &BoundingBox,
        surface_width: f64,
        surface_height: f64,
    ) -> Option<RealDimensions> {
        if !(surface_width.is_finite() && surface_height.is_finite())
            || surface_width <= 0.0
            || surface_height <= 0.0
        {
            return None;
        }

        let width = bbox.width * surface_width;
        let height = bbox.height * surface_height;
        Some(RealDimensions {
            width,
            height,
            area: width * height,
            depth: 0.0,
            confidence: SURFACE_SIZE_CONFIDENCE,
        })
    }
}
