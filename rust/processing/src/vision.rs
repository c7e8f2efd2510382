// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary to the external vision model.

use damage_locator_core::DamageDetection;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Failure of one vision call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisionError {
    #[error("No photo at index {0}")]
    MissingPhoto(usize),

    #[error("Vision request failed: {0}")]
    Transport(String),

    #[error("Vision service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid vision response: {0}")]
    InvalidResponse(String),
}

/// A photo whose vision call failed, as recorded in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoFailure {
    pub photo_index: usize,
    pub message: String,
}

impl PhotoFailure {
    pub fn new(photo_index: usize, error: &VisionError) -> Self {
        Self {
            photo_index,
            message: error.to_string(),
        }
    }
}

/// One call per photo, returning the damage the model found in it.
///
/// Implementations need not fill in `photo_index` on the returned
/// detections; the orchestrator stamps it.
pub trait VisionClient {
    fn analyze_photo(
        &self,
        photo_index: usize,
    ) -> impl Future<Output = Result<Vec<DamageDetection>, VisionError>> + Send;
}

/// Vision results supplied up front, one entry per photo.
///
/// Used when detections were produced elsewhere (the client already called
/// the model) and for replaying recorded runs.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedVision {
    results: Vec<Result<Vec<DamageDetection>, VisionError>>,
}

impl PrecomputedVision {
    pub fn new(results: Vec<Result<Vec<DamageDetection>, VisionError>>) -> Self {
        Self { results }
    }

    /// Every photo succeeds with the given detections
    pub fn from_detections(per_photo: Vec<Vec<DamageDetection>>) -> Self {
        Self::new(per_photo.into_iter().map(Ok).collect())
    }

    pub fn photo_count(&self) -> usize {
        self.results.len()
    }
}

impl VisionClient for PrecomputedVision {
    async fn analyze_photo(&self, photo_index: usize) -> Result<Vec<DamageDetection>, VisionError> {
        self.results
            .get(photo_index)
            .cloned()
            .unwrap_or(Err(VisionError::MissingPhoto(photo_index)))
    }
}
