// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalized image-space bounding boxes
//!
//! All coordinates are fractions of the photo's pixel dimensions with the
//! origin at the top-left corner. A box is only meaningful relative to the
//! photo it was detected in.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Normalized rectangle `{x, y, width, height}` in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Bounding box expressed in pixels of a concrete image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    /// Center of the rectangle in pixel coordinates
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clamp the box into the unit square.
    ///
    /// Boxes that spill past the right or bottom edge are shrunk so that
    /// `x + width <= 1` and `y + height <= 1`. Non-finite input is an error,
    /// and so is a box that has no area left after clamping.
    pub fn clamped(&self) -> Result<Self> {
        if ![self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(Error::InvalidBoundingBox(format!(
                "non-finite component in {:?}",
                self
            )));
        }

        let x = self.x.clamp(0.0, 1.0);
        let y = self.y.clamp(0.0, 1.0);
        let width = self.width.clamp(0.0, 1.0 - x);
        let height = self.height.clamp(0.0, 1.0 - y);

        if width <= 0.0 || height <= 0.0 {
            return Err(Error::InvalidBoundingBox(format!(
                "box {:?} has no area inside the image",
                self
            )));
        }

        Ok(Self::new(x, y, width, height))
    }

    /// Fraction of the image covered by the box
    #[inline]
    pub fn area(&self) -> f64 {
        (self.width * self.height).max(0.0)
    }

    /// Normalized center point
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Convert to pixel space of an image with the given dimensions
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> PixelRect {
        let w = image_width as f64;
        let h = image_height as f64;
        PixelRect {
            x: self.x * w,
            y: self.y * h,
            width: self.width * w,
            height: self.height * h,
        }
    }

    /// Area of the overlap between two boxes (0 when disjoint)
    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);

        if right <= left || bottom <= top {
            return 0.0;
        }
        (right - left) * (bottom - top)
    }

    /// Intersection over union
    ///
    /// Zero when the boxes do not overlap or either has no area.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let area_a = self.area();
        let area_b = other.area();
        if area_a <= 0.0 || area_b <= 0.0 {
            return 0.0;
        }

        let intersection = self.intersection_area(other);
        if intersection <= 0.0 {
            return 0.0;
        }

        let union = area_a + area_b - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_iou_identity() {
        let b = BoundingBox::new(0.3, 0.3, 0.1, 0.1);
        assert_relative_eq!(b.iou(&b), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = BoundingBox::new(0.0, 0.0, 0.2, 0.2);
        let b = BoundingBox::new(0.5, 0.5, 0.2, 0.2);
        assert_eq!(a.iou(&b), 0.0);

        // Touching edges share no area
        let c = BoundingBox::new(0.2, 0.0, 0.2, 0.2);
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn test_iou_symmetric() {
        let a = BoundingBox::new(0.1, 0.1, 0.4, 0.3);
        let b = BoundingBox::new(0.3, 0.2, 0.3, 0.5);
        assert_relative_eq!(a.iou(&b), b.iou(&a), epsilon = 1e-12);

        // 0.2 x 0.2 overlap = 0.04; union = 0.12 + 0.15 - 0.04
        assert_relative_eq!(a.iou(&b), 0.04 / 0.23, epsilon = 1e-12);
    }

    #[test]
    fn test_iou_zero_area() {
        let a = BoundingBox::new(0.1, 0.1, 0.0, 0.3);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_clamp_overflowing_box() {
        let b = BoundingBox::new(0.8, 0.9, 0.5, 0.3).clamped().unwrap();
        assert_relative_eq!(b.x + b.width, 1.0, epsilon = 1e-12);
        assert_relative_eq!(b.y + b.height, 1.0, epsilon = 1e-12);
        assert_relative_eq!(b.width, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_clamp_rejects_degenerate() {
        assert!(BoundingBox::new(1.0, 0.5, 0.2, 0.2).clamped().is_err());
        assert!(BoundingBox::new(f64::NAN, 0.5, 0.2, 0.2).clamped().is_err());
        assert!(BoundingBox::new(-0.2, 0.1, 0.5, 0.2).clamped().is_ok());
    }

    #[test]
    fn test_to_pixels() {
        let b = BoundingBox::new(0.25, 0.5, 0.5, 0.25);
        let px = b.to_pixels(1920, 1440);
        assert_eq!(px.x, 480.0);
        assert_eq!(px.y, 720.0);
        assert_eq!(px.width, 960.0);
        assert_eq!(px.height, 360.0);
        assert_eq!(px.center(), (960.0, 900.0));
    }
}
