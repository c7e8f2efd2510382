// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Damage Locator Geometry
//!
//! Pinhole-camera measurement and surface placement of damage detections
//! using nalgebra for transformations.

pub mod depth;
pub mod error;
pub mod frame;
pub mod matcher;
pub mod position;
pub mod room;
pub mod size;
pub mod transform;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

pub use depth::{DepthRange, DepthSampler, DEFAULT_MAX_DEPTH, DEFAULT_MIN_DEPTH};
pub use error::{Error, Result};
pub use frame::{CameraIntrinsics, DepthBuffer, DepthCapability, DepthFrame};
pub use matcher::{SurfaceAnchor, SurfaceMatcher, WallCursor, WallHit};
pub use position::{CoordinateFrame, DamageWorldPosition, PositionCalculator};
pub use room::{RoomModel, SurfaceRecord};
pub use size::{measurement_confidence, RealDimensions, SizeCalculator};
