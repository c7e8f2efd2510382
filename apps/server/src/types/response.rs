// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response types for the API.

use super::AnalyzeRequest;
use damage_locator_geometry::{CoordinateFrame, DamageWorldPosition};
use damage_locator_processing::AnalysisReport;
use serde::{Deserialize, Serialize};

/// Analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Cache key for this result (SHA256 of the request body).
    pub cache_key: String,
    pub report: AnalysisReport,
    /// Whether result was from cache.
    pub from_cache: bool,
}

/// What the cache keeps per analysis: the report plus the inputs needed to
/// recompute positions later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub request: AnalyzeRequest,
    pub report: AnalysisReport,
}

/// Marker positions for 3D annotation.
#[derive(Debug, Clone, Serialize)]
pub struct PositionsResponse {
    pub cache_key: String,
    pub positions: Vec<PositionData>,
}

/// One damage marker.
#[derive(Debug, Clone, Serialize)]
pub struct PositionData {
    pub damage_id: String,
    pub position: [f64; 3],
    pub normal: [f64; 3],
    pub confidence: f64,
    /// "room_scan" or "capture_session".
    pub frame: &'static str,
}

impl From<DamageWorldPosition> for PositionData {
    fn from(p: DamageWorldPosition) -> Self {
        Self {
            damage_id: p.damage_id,
            position: [p.position.x, p.position.y, p.position.z],
            normal: [p.normal.x, p.normal.y, p.normal.z],
            confidence: p.confidence,
            frame: frame_name(p.frame),
        }
    }
}

fn frame_name(frame: CoordinateFrame) -> &'static str {
    match frame {
        CoordinateFrame::RoomScan => "room_scan",
        CoordinateFrame::CaptureSession => "capture_session",
    }
}

pub fn parse_frame(value: &str) -> Option<CoordinateFrame> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "room_scan" | "room" => Some(CoordinateFrame::RoomScan),
        "capture_session" | "session" => Some(CoordinateFrame::CaptureSession),
        _ => None,
    }
}
