// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detections in, measured and placed damage records out.
//!
//! Three stages per batch:
//!
//! 1. **Validation**: drop detections that cannot be tied to a photo or
//!    carry a non-finite confidence; clamp confidences and boxes.
//! 2. **Surface matching** (sequential): choose the surface each damage sits
//!    on. Wall round-robin advances a run-owned cursor, so this stage keeps
//!    input order.
//! 3. **Measurement** (parallel): physical size from depth, or from the
//!    matched surface's extents for photos without depth, then severity.

use crate::config::AnalysisConfig;
use damage_locator_core::{
    BoundingBox, DamageDetection, DamageType, DetectedDamage, Measurement, MeasurementSource,
    Severity, SurfaceCategory,
};
use damage_locator_geometry::{
    DepthFrame, DepthSampler, RoomModel, SizeCalculator, SurfaceAnchor, SurfaceMatcher,
    WallCursor,
};
use rayon::prelude::*;
use uuid::Uuid;

/// Damage waiting for the measurement pass
struct PendingDamage {
    damage: DetectedDamage,
    surface_extents: Option<(f64, f64)>,
    model_severity: Option<Severity>,
}

/// Turns vision output for one room into damage records
pub struct DetectionPipeline<'a> {
    room: &'a RoomModel,
    frames: &'a [DepthFrame],
    matcher: SurfaceMatcher<'a>,
    sizer: SizeCalculator,
    min_confidence: f64,
}

impl<'a> DetectionPipeline<'a> {
    pub fn new(room: &'a RoomModel, frames: &'a [DepthFrame], config: &AnalysisConfig) -> Self {
        Self {
            room,
            frames,
            matcher: SurfaceMatcher::new(room),
            sizer: SizeCalculator::new(DepthSampler::new(config.depth_range())),
            min_confidence: config.min_confidence,
        }
    }

    pub fn room(&self) -> &RoomModel {
        self.room
    }

    /// Clean up one detection, or `None` when it must be dropped.
    ///
    /// A box that is unusable after clamping is removed; the detection keeps
    /// its qualitative information.
    pub fn validate(&self, mut detection: DamageDetection) -> Option<DamageDetection> {
        if !detection.confidence.is_finite() {
            tracing::debug!(
                photo_index = detection.photo_index,
                "Dropping detection with non-finite confidence"
            );
            return None;
        }
        if detection.photo_index >= self.frames.len() {
            tracing::debug!(
                photo_index = detection.photo_index,
                frames = self.frames.len(),
                "Dropping detection with no matching frame"
            );
            return None;
        }

        detection.confidence = detection.confidence.clamp(0.0, 1.0);
        if detection.confidence < self.min_confidence {
            return None;
        }

        detection.bounding_box = detection
            .bounding_box
            .and_then(|bbox| match bbox.clamped() {
                Ok(clamped) => Some(clamped),
                Err(err) => {
                    tracing::debug!(
                        photo_index = detection.photo_index,
                        error = %err,
                        "Discarding unusable bounding box"
                    );
                    None
                }
            });

        Some(detection)
    }

    /// Run a batch of detections through all stages, in input order
    pub fn process(
        &self,
        detections: Vec<DamageDetection>,
        cursor: &mut WallCursor,
    ) -> Vec<DetectedDamage> {
        let input_count = detections.len();

        let pending: Vec<PendingDamage> = detections
            .into_iter()
            .filter_map(|detection| self.validate(detection))
            .map(|detection| self.place(detection, cursor))
            .collect();

        let placed = pending.len();
        let damages: Vec<DetectedDamage> = pending
            .into_par_iter()
            .map(|pending| self.measure(pending))
            .collect();

        tracing::debug!(
            input = input_count,
            kept = placed,
            measured = damages.iter().filter(|d| d.measurement.is_some()).count(),
            walls_round_robin = cursor.issued(),
            "Detection batch processed"
        );

        damages
    }

    /// Surface matching and record creation
    fn place(&self, detection: DamageDetection, cursor: &mut WallCursor) -> PendingDamage {
        let category = detection
            .surface
            .as_deref()
            .and_then(SurfaceCategory::parse)
            .unwrap_or(SurfaceCategory::Wall);
        let pose = self
            .frames
            .get(detection.photo_index)
            .and_then(DepthFrame::usable_pose);

        let anchor: Option<SurfaceAnchor> = self.matcher.match_surface(category, pose, cursor);
        let model_severity = detection.severity.as_deref().and_then(Severity::parse);

        let damage = DetectedDamage {
            id: Uuid::new_v4().to_string(),
            damage_type: DamageType::parse(&detection.damage_type),
            severity: Severity::Low,
            description: detection.description,
            surface: category,
            surface_id: anchor.as_ref().and_then(|a| a.surface_id.clone()),
            surface_label: anchor.as_ref().and_then(|a| a.label.clone()),
            placement: anchor.as_ref().map(|a| a.method),
            confidence: detection.confidence,
            bounding_box: detection.bounding_box,
            recommendation: detection.recommendation,
            photo_index: detection.photo_index,
            measurement: None,
        };

        PendingDamage {
            damage,
            surface_extents: anchor.and_then(|a| a.extents),
            model_severity,
        }
    }

    fn measure(&self, pending: PendingDamage) -> DetectedDamage {
        let PendingDamage {
            mut damage,
            surface_extents,
            model_severity,
        } = pending;

        if let (Some(bbox), Some(frame)) = (&damage.bounding_box, self.frames.get(damage.photo_index)) {
            damage.measurement = self.measurement_for(bbox, frame, surface_extents);
        }

        damage.severity = model_severity.unwrap_or_else(|| {
            Severity::infer(&damage.damage_type, damage.confidence, damage.area())
        });
        damage
    }

    fn measurement_for(
        &self,
        bbox: &BoundingBox,
        frame: &DepthFrame,
        surface_extents: Option<(f64, f64)>,
    ) -> Option<Measurement> {
        if frame.is_depth_capable() {
            return self
                .sizer
                .calculate_size(bbox, frame)
                .map(|dims| dims.to_measurement(MeasurementSource::Depth));
        }

        let (width, height) = surface_extents?;
        self.sizer
            .calculate_size_from_surface(bbox, width, height)
            .map(|dims| dims.to_measurement(MeasurementSource::SurfaceExtents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use damage_locator_core::PlacementMethod;
    use damage_locator_geometry::transform::{placement_matrix, WORLD_UP};
    use damage_locator_geometry::{
        CameraIntrinsics, DepthBuffer, Matrix4, Point3, SurfaceRecord, Vector3,
    };

    fn room() -> RoomModel {
        let wall = |id: &str, center: Point3<f64>, normal: Vector3<f64>| {
            let t = placement_matrix(center, normal, WORLD_UP.cross(&normal)).unwrap();
            SurfaceRecord::new(id, SurfaceCategory::Wall, t, 4.0, 2.5)
        };
        RoomModel::new(
            vec![
                wall("north", Point3::new(0.0, 1.25, -2.0), Vector3::z()),
                wall("east", Point3::new(2.0, 1.25, 0.0), -Vector3::x()),
            ],
            2.5,
        )
        .unwrap()
    }

    fn detection(photo_index: usize, confidence: f64) -> DamageDetection {
        DamageDetection {
            damage_type: "crack".into(),
            description: "hairline crack".into(),
            confidence,
            bounding_box: Some(BoundingBox::new(0.4, 0.4, 0.1, 0.1)),
            recommendation: None,
            severity: None,
            surface: None,
            photo_index,
        }
    }

    fn depth_frame() -> DepthFrame {
        let buffer = DepthBuffer::from_f32(&vec![1.5; 64 * 48], 64, 48).unwrap();
        DepthFrame::new(
            640,
            480,
            Some(buffer),
            Some(CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0)),
            Matrix4::identity(),
        )
    }

    #[test]
    fn test_validation_rules() {
        let room = room();
        let frames = vec![depth_frame()];
        let config = AnalysisConfig {
            min_confidence: 0.3,
            ..AnalysisConfig::default()
        };
        let pipeline = DetectionPipeline::new(&room, &frames, &config);

        assert!(pipeline.validate(detection(0, f64::NAN)).is_none());
        assert!(pipeline.validate(detection(1, 0.9)).is_none());
        assert!(pipeline.validate(detection(0, 0.2)).is_none());
        assert_eq!(pipeline.validate(detection(0, 1.4)).unwrap().confidence, 1.0);

        let mut spilling = detection(0, 0.9);
        spilling.bounding_box = Some(BoundingBox::new(0.9, 0.9, 0.3, 0.3));
        let bbox = pipeline.validate(spilling).unwrap().bounding_box.unwrap();
        assert_relative_eq!(bbox.x + bbox.width, 1.0, epsilon = 1e-12);

        let mut broken = detection(0, 0.9);
        broken.bounding_box = Some(BoundingBox::new(f64::NAN, 0.1, 0.1, 0.1));
        let kept = pipeline.validate(broken).unwrap();
        assert!(kept.bounding_box.is_none());
        assert_eq!(kept.description, "hairline crack");
    }

    #[test]
    fn test_depth_measurement() {
        let room = room();
        let frames = vec![depth_frame()];
        let pipeline = DetectionPipeline::new(&room, &frames, &AnalysisConfig::default());
        let mut cursor = WallCursor::new();

        let damages = pipeline.process(vec![detection(0, 0.8)], &mut cursor);
        let measurement = damages[0].measurement.unwrap();
        assert_eq!(measurement.source, MeasurementSource::Depth);
        // 64 px at 1.5 m with fx = 500
        assert_relative_eq!(measurement.width, 1.5 * 64.0 / 500.0, epsilon = 1e-6);
        assert_eq!(measurement.distance, Some(1.5));
    }

    #[test]
    fn test_depth_free_uses_surface_extents() {
        let room = room();
        let frames = vec![DepthFrame::depth_free(640, 480, Matrix4::from_element(f64::NAN))];
        let pipeline = DetectionPipeline::new(&room, &frames, &AnalysisConfig::default());
        let mut cursor = WallCursor::new();

        let damages = pipeline.process(vec![detection(0, 0.8), detection(0, 0.8)], &mut cursor);
        assert_eq!(damages[0].placement, Some(PlacementMethod::RoundRobin));
        assert_eq!(damages[0].surface_label.as_deref(), Some("Wall A"));
        assert_eq!(damages[1].surface_label.as_deref(), Some("Wall B"));

        let measurement = damages[0].measurement.unwrap();
        assert_eq!(measurement.source, MeasurementSource::SurfaceExtents);
        assert_relative_eq!(measurement.width, 0.4, epsilon = 1e-12);
        assert_relative_eq!(measurement.height, 0.25, epsilon = 1e-12);
        assert_eq!(measurement.distance, None);
    }

    #[test]
    fn test_severity_from_model_or_inferred() {
        let room = room();
        let frames = vec![depth_frame()];
        let pipeline = DetectionPipeline::new(&room, &frames, &AnalysisConfig::default());
        let mut cursor = WallCursor::new();

        let mut stated = detection(0, 0.9);
        stated.severity = Some("Critical".into());
        let mut mold = detection(0, 0.9);
        mold.damage_type = "Mould".into();

        let damages = pipeline.process(vec![stated, mold], &mut cursor);
        assert_eq!(damages[0].severity, Severity::Critical);
        assert_eq!(damages[1].damage_type, DamageType::Mold);
        assert_eq!(damages[1].severity, Severity::High);
    }

    #[test]
    fn test_unknown_surface_defaults_to_wall() {
        let room = room();
        let frames = vec![depth_frame()];
        let pipeline = DetectionPipeline::new(&room, &frames, &AnalysisConfig::default());
        let mut cursor = WallCursor::new();

        let mut floor = detection(0, 0.9);
        floor.surface = Some("floor".into());
        let mut unknown = detection(0, 0.9);
        unknown.surface = Some("skylight".into());

        let damages = pipeline.process(vec![floor, unknown], &mut cursor);
        assert_eq!(damages[0].surface, SurfaceCategory::Floor);
        assert!(damages[0].surface_id.is_none());
        assert_eq!(damages[1].surface, SurfaceCategory::Wall);
        assert!(damages[1].surface_id.is_some());
    }
}
