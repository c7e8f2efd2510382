// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 3D world positions for damage markers
//!
//! Two strategies exist and they answer in different coordinate frames:
//!
//! - **Depth-based unprojection** uses the photo's own depth sample, intrinsics
//!   and pose. The pose comes from the depth-capture session, whose tracking
//!   origin is unrelated to the room scan, so the result is only valid
//!   relative to other points of the same session.
//! - **Surface-anchored placement** uses the matched room surface and is
//!   expressed in the room scan's frame, the one the exported room model uses.
//!
//! Every [`DamageWorldPosition`] records its frame so renderers never mix them.

use crate::depth::DepthSampler;
use crate::frame::DepthFrame;
use crate::matcher::{SurfaceAnchor, SurfaceMatcher};
use crate::room::RoomModel;
use crate::size::measurement_confidence;
use crate::transform;
use damage_locator_core::DetectedDamage;
use nalgebra::{Point3, Vector3};

/// Offset of surface markers along the normal so they render just off the surface
pub const SURFACE_STANDOFF: f64 = 0.05;
/// Placement confidence when the camera ray selected the surface
pub const CAMERA_MATCH_CONFIDENCE: f64 = 0.85;
/// Placement confidence for nearest-wall, round-robin and category placement
pub const FALLBACK_MATCH_CONFIDENCE: f64 = 0.7;

/// Coordinate frame of a world position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateFrame {
    /// Room-scan world frame; safe to combine with the room model
    RoomScan,
    /// Depth-capture session frame; approximate and local to that session
    CaptureSession,
}

/// World-space marker for one damage
#[derive(Debug, Clone, PartialEq)]
pub struct DamageWorldPosition {
    pub damage_id: String,
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
    pub confidence: f64,
    pub frame: CoordinateFrame,
}

impl SurfaceAnchor {
    /// Marker position just in front of the surface center
    pub fn marker_position(&self) -> Point3<f64> {
        self.center + self.normal * SURFACE_STANDOFF
    }

    /// Placement confidence implied by how the surface was chosen
    pub fn confidence(&self) -> f64 {
        if self.method.is_camera_matched() {
            CAMERA_MATCH_CONFIDENCE
        } else {
            FALLBACK_MATCH_CONFIDENCE
        }
    }
}

/// Computes damage positions against one room
#[derive(Debug, Clone, Copy)]
pub struct PositionCalculator<'a> {
    matcher: SurfaceMatcher<'a>,
    sampler: DepthSampler,
}

impl<'a> PositionCalculator<'a> {
    pub fn new(room: &'a RoomModel, sampler: DepthSampler) -> Self {
        Self {
            matcher: SurfaceMatcher::new(room),
            sampler,
        }
    }

    /// Unproject the bounding box center with the photo's depth.
    ///
    /// `None` when the damage has no box, the frame is depth-free, the focal
    /// length is invalid, or no usable depth lies under the box center.
    pub fn depth_based(
        &self,
        damage: &DetectedDamage,
        frame: &DepthFrame,
    ) -> Option<DamageWorldPosition> {
        let bbox = damage.bounding_box.as_ref()?;
        let (_, intrinsics) = frame.depth_parts()?;
        if !intrinsics.has_valid_focal_length() {
            return None;
        }
        let pose = frame.usable_pose()?;

        let pixels = bbox.to_pixels(frame.image_width, frame.image_height);
        let (pixel_x, pixel_y) = pixels.center();
        let depth = self.sampler.sample_image_point(frame, pixel_x, pixel_y)? as f64;

        let camera_point = Point3::new(
            (pixel_x - intrinsics.cx) * depth / intrinsics.fx,
            (pixel_y - intrinsics.cy) * depth / intrinsics.fy,
            depth,
        );
        let position = transform::transform_point(pose, &camera_point)?;

        Some(DamageWorldPosition {
            damage_id: damage.id.clone(),
            position,
            normal: transform::axis(pose, 2),
            confidence: measurement_confidence(depth, bbox.area()),
            frame: CoordinateFrame::CaptureSession,
        })
    }

    /// Place the marker on the surface recorded for the damage
    pub fn surface_anchored(&self, damage: &DetectedDamage) -> Option<DamageWorldPosition> {
        let anchor = self.matcher.anchor_for(damage)?;
        Some(DamageWorldPosition {
            damage_id: damage.id.clone(),
            position: anchor.marker_position(),
            normal: anchor.normal,
            confidence: anchor.confidence(),
            frame: CoordinateFrame::RoomScan,
        })
    }

    /// Depth-based position when possible, surface-anchored otherwise
    pub fn best_position(
        &self,
        damage: &DetectedDamage,
        frames: &[DepthFrame],
    ) -> Option<DamageWorldPosition> {
        frames
            .get(damage.photo_index)
            .and_then(|frame| self.depth_based(damage, frame))
            .or_else(|| self.surface_anchored(damage))
    }

    /// Positions for every damage that can be placed.
    ///
    /// With a frame given, only that strategy is used; without one each
    /// damage gets its best available position.
    pub fn positions(
        &self,
        damages: &[DetectedDamage],
        frames: &[DepthFrame],
        frame: Option<CoordinateFrame>,
    ) -> Vec<DamageWorldPosition> {
        damages
            .iter()
            .filter_map(|damage| match frame {
                Some(CoordinateFrame::RoomScan) => self.surface_anchored(damage),
                Some(CoordinateFrame::CaptureSession) => frames
                    .get(damage.photo_index)
                    .and_then(|f| self.depth_based(damage, f)),
                None => self.best_position(damage, frames),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{CameraIntrinsics, DepthBuffer};
    use crate::room::SurfaceRecord;
    use crate::transform::{placement_matrix, WORLD_UP};
    use approx::assert_relative_eq;
    use damage_locator_core::{
        BoundingBox, DamageType, PlacementMethod, Severity, SurfaceCategory,
    };
    use nalgebra::Matrix4;

    fn room() -> RoomModel {
        let t = placement_matrix(Point3::new(0.0, 1.25, -2.0), Vector3::z(), Vector3::x()).unwrap();
        RoomModel::new(
            vec![SurfaceRecord::new("north", SurfaceCategory::Wall, t, 4.0, 2.5)],
            2.5,
        )
        .unwrap()
    }

    fn damage(bbox: Option<BoundingBox>, placement: Option<PlacementMethod>) -> DetectedDamage {
        DetectedDamage {
            id: "dmg".into(),
            damage_type: DamageType::Crack,
            severity: Severity::Low,
            description: String::new(),
            surface: SurfaceCategory::Wall,
            surface_id: Some("north".into()),
            surface_label: Some("Wall A".into()),
            placement,
            confidence: 0.9,
            bounding_box: bbox,
            recommendation: None,
            photo_index: 0,
            measurement: None,
        }
    }

    fn depth_frame(depth: f32, pose: Matrix4<f64>) -> DepthFrame {
        let buffer = DepthBuffer::from_f32(&vec![depth; 32 * 24], 32, 24).unwrap();
        DepthFrame::new(
            640,
            480,
            Some(buffer),
            Some(CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0)),
            pose,
        )
    }

    #[test]
    fn test_depth_based_unprojection() {
        let room = room();
        let calc = PositionCalculator::new(&room, DepthSampler::default());
        let pose = Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0));
        let frame = depth_frame(2.0, pose);

        // Box centered on pixel (420, 240): 100px right of the principal point
        let bbox = BoundingBox::new(400.0 / 640.0, 220.0 / 480.0, 40.0 / 640.0, 40.0 / 480.0);
        let pos = calc.depth_based(&damage(Some(bbox), None), &frame).unwrap();

        assert_eq!(pos.frame, CoordinateFrame::CaptureSession);
        assert_relative_eq!(pos.position.x, 1.0 + 100.0 * 2.0 / 500.0, epsilon = 1e-6);
        assert_relative_eq!(pos.position.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(pos.position.z, 2.0, epsilon = 1e-6);
        // 40x40 px box covers ~0.5% of the image
        assert_relative_eq!(pos.confidence, 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_surface_anchored_standoff() {
        let room = room();
        let calc = PositionCalculator::new(&room, DepthSampler::default());

        let pos = calc
            .surface_anchored(&damage(None, Some(PlacementMethod::CameraRay)))
            .unwrap();
        assert_eq!(pos.frame, CoordinateFrame::RoomScan);
        assert_relative_eq!(pos.position, Point3::new(0.0, 1.25, -1.95), epsilon = 1e-12);
        assert_relative_eq!(pos.confidence, CAMERA_MATCH_CONFIDENCE);

        let pos = calc
            .surface_anchored(&damage(None, Some(PlacementMethod::RoundRobin)))
            .unwrap();
        assert_relative_eq!(pos.confidence, FALLBACK_MATCH_CONFIDENCE);
    }

    #[test]
    fn test_best_position_falls_back_to_surface() {
        let room = room();
        let calc = PositionCalculator::new(&room, DepthSampler::default());
        let frames = vec![depth_frame(f32::NAN, Matrix4::identity())];
        let bbox = BoundingBox::new(0.4, 0.4, 0.2, 0.2);

        let pos = calc
            .best_position(&damage(Some(bbox), Some(PlacementMethod::NearestWall)), &frames)
            .unwrap();
        assert_eq!(pos.frame, CoordinateFrame::RoomScan);
    }

    #[test]
    fn test_positions_respect_requested_frame() {
        let room = room();
        let calc = PositionCalculator::new(&room, DepthSampler::default());
        let camera = placement_matrix(
            Point3::new(0.0, 1.5, 0.0),
            Vector3::z(),
            WORLD_UP.cross(&Vector3::z()),
        )
        .unwrap();
        let frames = vec![depth_frame(1.5, camera)];
        let damages = vec![
            damage(Some(BoundingBox::new(0.4, 0.4, 0.2, 0.2)), Some(PlacementMethod::CameraRay)),
            damage(None, Some(PlacementMethod::CameraRay)),
        ];

        let session = calc.positions(&damages, &frames, Some(CoordinateFrame::CaptureSession));
        assert_eq!(session.len(), 1);

        let scan = calc.positions(&damages, &frames, Some(CoordinateFrame::RoomScan));
        assert_eq!(scan.len(), 2);
        assert!(scan.iter().all(|p| p.frame == CoordinateFrame::RoomScan));

        let best = calc.positions(&damages, &frames, None);
        assert_eq!(best[0].frame, CoordinateFrame::CaptureSession);
        assert_eq!(best[1].frame, CoordinateFrame::RoomScan);
    }
}
