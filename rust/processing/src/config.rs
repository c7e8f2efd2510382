// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunables for an analysis run.

use damage_locator_geometry::{DepthRange, DEFAULT_MAX_DEPTH, DEFAULT_MIN_DEPTH};
use serde::{Deserialize, Serialize};

/// Delay between successive vision calls (rate limiting)
pub const DEFAULT_INTER_CALL_DELAY_MS: u64 = 500;

/// Thresholds for merging repeated observations of one damage.
///
/// The relative-area threshold is a loose heuristic: two damages of the
/// same type whose areas differ by less than 100 % of the larger one are
/// treated as the same physical defect when no spatial signal exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Bounding box overlap above which two detections are the same damage
    pub iou_threshold: f64,
    /// `|a - b| / max(a, b)` below which same-type areas match
    pub max_relative_area_difference: f64,
    /// Confidence gain required to replace a stored observation
    pub confidence_margin: f64,
    /// A new observation closer than this fraction of the stored distance replaces it
    pub closer_distance_ratio: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            max_relative_area_difference: 1.0,
            confidence_margin: 0.1,
            closer_distance_ratio: 0.8,
        }
    }
}

/// Depth window limits in meters, serializable form of [`DepthRange`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthLimits {
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Default for DepthLimits {
    fn default() -> Self {
        Self {
            min_depth: DEFAULT_MIN_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl From<DepthLimits> for DepthRange {
    fn from(limits: DepthLimits) -> Self {
        DepthRange::new(limits.min_depth, limits.max_depth)
    }
}

/// Configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Milliseconds to wait between vision calls
    pub inter_call_delay_ms: u64,
    pub depth: DepthLimits,
    /// Detections below this confidence are dropped
    pub min_confidence: f64,
    pub dedup: DedupConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            inter_call_delay_ms: DEFAULT_INTER_CALL_DELAY_MS,
            depth: DepthLimits::default(),
            min_confidence: 0.0,
            dedup: DedupConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn depth_range(&self) -> DepthRange {
        self.depth.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"inter_call_delay_ms": 0, "dedup": {"iou_threshold": 0.5}}"#)
                .unwrap();
        assert_eq!(config.inter_call_delay_ms, 0);
        assert_eq!(config.dedup.iou_threshold, 0.5);
        assert_eq!(config.dedup.closer_distance_ratio, 0.8);
        assert_eq!(config.depth, DepthLimits::default());
    }
}
