// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analysis runs against a scripted vision client.

use damage_locator_core::{BoundingBox, DamageDetection, SurfaceCategory};
use damage_locator_geometry::transform::{placement_matrix, WORLD_UP};
use damage_locator_geometry::{DepthFrame, Matrix4, Point3, RoomModel, SurfaceRecord, Vector3};
use damage_locator_processing::{
    AnalysisConfig, AnalysisOrchestrator, CancellationFlag, PrecomputedVision, ProcessingError,
    VisionClient, VisionError,
};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

fn room() -> RoomModel {
    let wall = |id: &str, center: Point3<f64>, normal: Vector3<f64>| {
        let t = placement_matrix(center, normal, WORLD_UP.cross(&normal)).unwrap();
        SurfaceRecord::new(id, SurfaceCategory::Wall, t, 4.0, 2.5)
    };
    RoomModel::new(
        vec![
            wall("north", Point3::new(0.0, 1.25, -2.0), Vector3::z()),
            wall("east", Point3::new(2.0, 1.25, 0.0), -Vector3::x()),
            wall("south", Point3::new(0.0, 1.25, 2.0), -Vector3::z()),
        ],
        2.5,
    )
    .unwrap()
}

fn frames(count: usize) -> Vec<DepthFrame> {
    (0..count)
        .map(|_| DepthFrame::depth_free(1920, 1440, Matrix4::from_element(f64::NAN)))
        .collect()
}

fn detection(damage_type: &str, x: f64) -> DamageDetection {
    DamageDetection {
        damage_type: damage_type.into(),
        description: String::new(),
        confidence: 0.8,
        bounding_box: Some(BoundingBox::new(x, 0.2, 0.1, 0.1)),
        recommendation: Some("Patch and repaint".into()),
        severity: None,
        surface: Some("wall".into()),
        // Deliberately wrong: the orchestrator stamps the real index
        photo_index: 99,
    }
}

fn no_delay() -> AnalysisConfig {
    AnalysisConfig {
        inter_call_delay_ms: 0,
        ..AnalysisConfig::default()
    }
}

/// Records call order and fails on selected photos
struct ScriptedVision {
    failing: Vec<usize>,
    calls: Mutex<Vec<(usize, Instant)>>,
    cancel_after: Option<(usize, CancellationFlag)>,
}

impl ScriptedVision {
    fn new(failing: Vec<usize>) -> Self {
        Self {
            failing,
            calls: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }

    fn called(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|(i, _)| *i).collect()
    }
}

impl VisionClient for &ScriptedVision {
    async fn analyze_photo(&self, photo_index: usize) -> Result<Vec<DamageDetection>, VisionError> {
        self.calls.lock().unwrap().push((photo_index, Instant::now()));
        if let Some((index, flag)) = &self.cancel_after {
            if *index == photo_index {
                flag.cancel();
            }
        }
        if self.failing.contains(&photo_index) {
            return Err(VisionError::Transport("connection reset".into()));
        }
        let damage_type = ["crack", "stain", "hole", "dent"][photo_index % 4];
        Ok(vec![detection(damage_type, 0.1 + 0.2 * (photo_index % 4) as f64)])
    }
}

#[tokio::test]
async fn test_no_photos_is_an_error() {
    let orchestrator = AnalysisOrchestrator::new(PrecomputedVision::default(), no_delay());
    let result = orchestrator.run(&room(), &[]).await;
    assert_eq!(result, Err(ProcessingError::NoPhotos));
}

#[tokio::test]
async fn test_all_photos_failing_is_an_error() {
    let vision = ScriptedVision::new(vec![0, 1, 2]);
    let orchestrator = AnalysisOrchestrator::new(&vision, no_delay());

    match orchestrator.run(&room(), &frames(3)).await {
        Err(ProcessingError::AllPhotosFailed { failures }) => {
            assert_eq!(failures.len(), 3);
            assert_eq!(failures[1].photo_index, 1);
            assert!(failures[1].message.contains("connection reset"));
        }
        other => panic!("expected AllPhotosFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_partial_failure_keeps_successful_photos() {
    let vision = ScriptedVision::new(vec![1]);
    let orchestrator = AnalysisOrchestrator::new(&vision, no_delay());

    let report = orchestrator.run(&room(), &frames(3)).await.unwrap();
    assert_eq!(report.photo_count, 3);
    assert_eq!(report.photos_analyzed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].photo_index, 1);

    let photos: Vec<usize> = report.damages.iter().map(|d| d.photo_index).collect();
    assert_eq!(photos, [0, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_photos_called_in_order_with_delay() {
    let vision = ScriptedVision::new(vec![]);
    let orchestrator = AnalysisOrchestrator::new(&vision, AnalysisConfig::default());

    let report = orchestrator.run(&room(), &frames(4)).await.unwrap();
    assert_eq!(vision.called(), [0, 1, 2, 3]);

    let calls = vision.calls.lock().unwrap();
    for pair in calls.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(500));
    }

    // No pose: walls handed out round-robin across photos
    let labels: Vec<&str> = report
        .damages
        .iter()
        .filter_map(|d| d.surface_label.as_deref())
        .collect();
    assert_eq!(labels, ["Wall A", "Wall B", "Wall C", "Wall A"]);
}

#[tokio::test]
async fn test_cancellation_discards_run() {
    let flag = CancellationFlag::new();
    let mut vision = ScriptedVision::new(vec![]);
    vision.cancel_after = Some((1, flag.clone()));
    let orchestrator = AnalysisOrchestrator::new(&vision, no_delay()).with_cancellation(flag);

    let result = orchestrator.run(&room(), &frames(4)).await;
    assert_eq!(result, Err(ProcessingError::Cancelled));
    assert_eq!(vision.called(), [0, 1]);
}

#[tokio::test]
async fn test_repeated_observations_are_merged() {
    let box_detection = |confidence: f64| DamageDetection {
        confidence,
        ..detection("water damage", 0.4)
    };
    let vision = PrecomputedVision::from_detections(vec![
        vec![box_detection(0.5)],
        vec![box_detection(0.9)],
    ]);
    let orchestrator = AnalysisOrchestrator::new(vision, no_delay());

    let report = orchestrator.run(&room(), &frames(2)).await.unwrap();
    assert_eq!(report.detections_before_dedup, 2);
    assert_eq!(report.damages.len(), 1);
    assert_eq!(report.damages[0].photo_index, 1);
    assert_eq!(report.damages[0].confidence, 0.9);
}

#[tokio::test]
async fn test_assemble_on_blocking_pool_matches_run() {
    let vision = ScriptedVision::new(vec![2]);
    let orchestrator = AnalysisOrchestrator::new(&vision, no_delay());
    let inline = orchestrator.run(&room(), &frames(4)).await.unwrap();

    let results = orchestrator.collect(4).await.unwrap();
    assert_eq!(results.detections().len(), 3);
    assert_eq!(results.failures()[0].photo_index, 2);

    let config = orchestrator.config().clone();
    let (room, frames) = (room(), frames(4));
    let offloaded = tokio::task::spawn_blocking(move || results.assemble(&room, &frames, &config))
        .await
        .unwrap();

    let summary = |report: &damage_locator_processing::AnalysisReport| {
        report
            .damages
            .iter()
            .map(|d| (d.photo_index, d.damage_type.clone(), d.surface_label.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(summary(&offloaded), summary(&inline));
    assert_eq!(offloaded.photos_analyzed, 3);
    assert_eq!(offloaded.failures, inline.failures);
}

#[tokio::test]
async fn test_collect_rejects_empty_and_failed_runs() {
    let vision = ScriptedVision::new(vec![0, 1]);
    let orchestrator = AnalysisOrchestrator::new(&vision, no_delay());
    assert!(matches!(
        orchestrator.collect(0).await,
        Err(ProcessingError::NoPhotos)
    ));
    assert!(matches!(
        orchestrator.collect(2).await,
        Err(ProcessingError::AllPhotosFailed { .. })
    ));
}
