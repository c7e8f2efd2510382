// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One analysis run: vision calls, pipeline, deduplication.

use crate::config::AnalysisConfig;
use crate::dedup::Deduplicator;
use crate::error::{ProcessingError, Result};
use crate::pipeline::DetectionPipeline;
use crate::vision::{PhotoFailure, VisionClient};
use damage_locator_core::{DamageDetection, DetectedDamage};
use damage_locator_geometry::{DepthFrame, RoomModel, WallCursor};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancel switch for a running analysis
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Deduplicated damages in order of first sighting
    pub damages: Vec<DetectedDamage>,
    /// Photos whose vision call failed
    pub failures: Vec<PhotoFailure>,
    pub photo_count: usize,
    pub photos_analyzed: usize,
    /// Damage records before merging repeated observations
    pub detections_before_dedup: usize,
    pub processing_time_ms: u64,
}

impl AnalysisReport {
    pub fn damage(&self, id: &str) -> Option<&DetectedDamage> {
        self.damages.iter().find(|d| d.id == id)
    }

    pub fn damage_mut(&mut self, id: &str) -> Option<&mut DetectedDamage> {
        self.damages.iter_mut().find(|d| d.id == id)
    }
}

/// Sequences vision calls over a room's photos and assembles the damage list
pub struct AnalysisOrchestrator<V> {
    vision: V,
    config: AnalysisConfig,
    cancellation: CancellationFlag,
}

impl<V: VisionClient> AnalysisOrchestrator<V> {
    pub fn new(vision: V, config: AnalysisConfig) -> Self {
        Self {
            vision,
            config,
            cancellation: CancellationFlag::new(),
        }
    }

    /// Use an externally owned cancel switch
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze every photo of a room.
    ///
    /// Photos are sent to the vision model one at a time in index order with
    /// the configured delay between calls. Failed photos are recorded and
    /// skipped. The run fails when there are no photos, when every photo
    /// failed, or when it is cancelled; cancelling discards all results.
    ///
    /// Matching, measurement and merging run inline on the calling task.
    /// Callers on a shared runtime should use [`collect`](Self::collect) and
    /// move [`VisionResults::assemble`] onto the blocking pool instead.
    pub async fn run(&self, room: &RoomModel, frames: &[DepthFrame]) -> Result<AnalysisReport> {
        tracing::info!(
            photos = frames.len(),
            surfaces = room.surfaces().len(),
            walls = room.wall_count(),
            "Starting damage analysis"
        );
        let results = self.collect(frames.len()).await?;
        Ok(results.assemble(room, frames, &self.config))
    }

    /// Vision calls for `photo_count` photos, without any geometry work
    pub async fn collect(&self, photo_count: usize) -> Result<VisionResults> {
        let started = Instant::now();
        if photo_count == 0 {
            return Err(ProcessingError::NoPhotos);
        }

        let delay = Duration::from_millis(self.config.inter_call_delay_ms);
        let mut detections: Vec<DamageDetection> = Vec::new();
        let mut failures: Vec<PhotoFailure> = Vec::new();

        for photo_index in 0..photo_count {
            if photo_index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.cancellation.is_cancelled() {
                tracing::info!(photo_index, "Analysis cancelled");
                return Err(ProcessingError::Cancelled);
            }

            match self.vision.analyze_photo(photo_index).await {
                Ok(found) => {
                    tracing::debug!(photo_index, detections = found.len(), "Photo analyzed");
                    detections.extend(found.into_iter().map(|mut detection| {
                        detection.photo_index = photo_index;
                        detection
                    }));
                }
                Err(err) => {
                    tracing::warn!(photo_index, error = %err, "Photo analysis failed");
                    failures.push(PhotoFailure::new(photo_index, &err));
                }
            }
        }

        if self.cancellation.is_cancelled() {
            return Err(ProcessingError::Cancelled);
        }

        if failures.len() == photo_count {
            return Err(ProcessingError::AllPhotosFailed { failures });
        }

        Ok(VisionResults {
            detections,
            failures,
            photo_count,
            started,
        })
    }
}

/// Output of the vision phase of a run, ready for geometry
#[derive(Debug, Clone)]
pub struct VisionResults {
    detections: Vec<DamageDetection>,
    failures: Vec<PhotoFailure>,
    photo_count: usize,
    started: Instant,
}

impl VisionResults {
    /// Detections stamped with their photo index, in photo order
    pub fn detections(&self) -> &[DamageDetection] {
        &self.detections
    }

    pub fn failures(&self) -> &[PhotoFailure] {
        &self.failures
    }

    /// Surface matching, measurement and merging.
    ///
    /// CPU-bound; the measurement pass fans out over rayon.
    pub fn assemble(
        self,
        room: &RoomModel,
        frames: &[DepthFrame],
        config: &AnalysisConfig,
    ) -> AnalysisReport {
        let VisionResults {
            detections,
            failures,
            photo_count,
            started,
        } = self;

        let mut cursor = WallCursor::new();
        let pipeline = DetectionPipeline::new(room, frames, config);
        let damages = pipeline.process(detections, &mut cursor);
        let detections_before_dedup = damages.len();

        let damages = Deduplicator::new(config.dedup).deduplicate(damages);

        let photos_analyzed = photo_count - failures.len();
        let processing_time_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            photos_analyzed,
            failed = failures.len(),
            before_dedup = detections_before_dedup,
            damages = damages.len(),
            processing_time_ms,
            "Damage analysis complete"
        );

        AnalysisReport {
            damages,
            failures,
            photo_count,
            photos_analyzed,
            detections_before_dedup,
            processing_time_ms,
        }
    }
}
