// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Captured photo frames with optional depth data
//!
//! A frame is depth-capable only when it carries both a depth buffer and
//! camera intrinsics. The two cases drive different placement and sizing
//! algorithms, so they are kept apart as [`DepthCapability`] variants.

use crate::error::{Error, Result};
use crate::transform;
use nalgebra::{Matrix3, Matrix4};

/// Pinhole camera intrinsics in pixels of the color image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Read intrinsics from a 3x3 camera matrix
    ///
    /// ```text
    /// | fx  0  cx |
    /// |  0 fy  cy |
    /// |  0  0   1 |
    /// ```
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Self {
        Self {
            fx: matrix[(0, 0)],
            fy: matrix[(1, 1)],
            cx: matrix[(0, 2)],
            cy: matrix[(1, 2)],
        }
    }

    /// Focal lengths must be finite and positive for any projection
    #[inline]
    pub fn has_valid_focal_length(&self) -> bool {
        self.fx.is_finite() && self.fy.is_finite() && self.fx > 0.0 && self.fy > 0.0
    }
}

/// Raw depth raster: little-endian f32 meters, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    row_stride: usize,
}

impl DepthBuffer {
    /// Wrap raw sensor bytes.
    ///
    /// `row_stride` is the number of bytes between the starts of two rows and
    /// may include padding.
    pub fn new(data: Vec<u8>, width: u32, height: u32, row_stride: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDepthBuffer(format!(
                "empty dimensions {}x{}",
                width, height
            )));
        }

        let min_stride = width as usize * 4;
        if row_stride < min_stride {
            return Err(Error::InvalidDepthBuffer(format!(
                "row stride {} is smaller than {} bytes per row",
                row_stride, min_stride
            )));
        }

        let required = row_stride * (height as usize - 1) + min_stride;
        if data.len() < required {
            return Err(Error::InvalidDepthBuffer(format!(
                "{} bytes supplied, {} required for {}x{}",
                data.len(),
                required,
                width,
                height
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            row_stride,
        })
    }

    /// Pack tightly laid out depth values
    pub fn from_f32(values: &[f32], width: u32, height: u32) -> Result<Self> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::new(data, width, height, width as usize * 4)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Raw value at `(col, row)`; `None` if the bytes are not in the buffer
    #[inline]
    pub fn read(&self, col: u32, row: u32) -> Option<f32> {
        let offset = row as usize * self.row_stride + col as usize * 4;
        let bytes = self.data.get(offset..offset + 4)?;
        Some(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Whether a frame can be measured with depth
#[derive(Debug, Clone, PartialEq)]
pub enum DepthCapability {
    DepthCapable {
        buffer: DepthBuffer,
        intrinsics: CameraIntrinsics,
    },
    DepthFree,
}

/// One captured photo with its depth data and camera pose
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    /// Color image width in pixels
    pub image_width: u32,
    /// Color image height in pixels
    pub image_height: u32,
    pub depth: DepthCapability,
    /// Camera-to-world transform in the capture session's frame
    pub pose: Matrix4<f64>,
}

impl DepthFrame {
    /// Assemble a frame from optional parts.
    ///
    /// Intrinsics without a depth buffer (or the reverse) leave the frame
    /// depth-free.
    pub fn new(
        image_width: u32,
        image_height: u32,
        buffer: Option<DepthBuffer>,
        intrinsics: Option<CameraIntrinsics>,
        pose: Matrix4<f64>,
    ) -> Self {
        let depth = match (buffer, intrinsics) {
            (Some(buffer), Some(intrinsics)) => DepthCapability::DepthCapable { buffer, intrinsics },
            _ => DepthCapability::DepthFree,
        };

        Self {
            image_width,
            image_height,
            depth,
            pose,
        }
    }

    /// Frame without depth data
    pub fn depth_free(image_width: u32, image_height: u32, pose: Matrix4<f64>) -> Self {
        Self::new(image_width, image_height, None, None, pose)
    }

    /// Depth buffer and intrinsics when the frame is depth-capable
    #[inline]
    pub fn depth_parts(&self) -> Option<(&DepthBuffer, &CameraIntrinsics)> {
        match &self.depth {
            DepthCapability::DepthCapable { buffer, intrinsics } => Some((buffer, intrinsics)),
            DepthCapability::DepthFree => None,
        }
    }

    #[inline]
    pub fn is_depth_capable(&self) -> bool {
        matches!(self.depth, DepthCapability::DepthCapable { .. })
    }

    /// Camera pose, unless it contains non-finite values
    #[inline]
    pub fn usable_pose(&self) -> Option<&Matrix4<f64>> {
        transform::is_finite(&self.pose).then_some(&self.pose)
    }

    /// Map an image pixel into depth-buffer pixel space.
    ///
    /// Each axis is scaled independently since the depth raster need not
    /// share the color image's aspect ratio.
    pub fn image_to_depth(&self, buffer: &DepthBuffer, px: f64, py: f64) -> Option<(f64, f64)> {
        if self.image_width == 0 || self.image_height == 0 {
            return None;
        }
        let sx = buffer.width() as f64 / self.image_width as f64;
        let sy = buffer.height() as f64 / self.image_height as f64;
        Some((px * sx, py * sy))
    }
}
