// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request types for the API.

use damage_locator_core::DamageDetection;
use damage_locator_processing::{DedupConfig, DepthLimits};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Scanned room geometry.
    pub room: RoomPayload,
    /// Photos in capture order; the index is the correlation key.
    pub photos: Vec<PhotoPayload>,
    /// Per-request overrides of the analysis defaults.
    #[serde(default)]
    pub options: AnalysisOptions,
}

/// Room scan output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPayload {
    pub surfaces: Vec<SurfacePayload>,
    /// Floor-to-ceiling height in meters.
    pub ceiling_height: f64,
}

/// One planar surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfacePayload {
    pub id: String,
    /// "wall", "floor", "ceiling", "door" or "window".
    pub category: String,
    /// 4x4 local-to-world transform, column-major.
    pub transform: Vec<f64>,
    pub width: f64,
    pub height: f64,
}

/// One captured photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoPayload {
    pub image_width: u32,
    pub image_height: u32,
    /// 4x4 camera-to-world pose, column-major. Missing means unknown.
    #[serde(default)]
    pub pose: Option<Vec<f64>>,
    /// 3x3 intrinsics matrix, row-major rows.
    #[serde(default)]
    pub intrinsics: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    pub depth: Option<DepthPayload>,
    /// Base64 encoded photo for the vision model.
    #[serde(default)]
    pub image: Option<String>,
    /// Detections already produced by the client; skips the vision call.
    #[serde(default)]
    pub detections: Option<Vec<DamageDetection>>,
}

/// Raw depth raster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthPayload {
    pub width: u32,
    pub height: u32,
    /// Bytes per row; defaults to a tightly packed raster.
    #[serde(default)]
    pub row_stride: Option<usize>,
    /// Base64 little-endian f32 meters.
    pub data: String,
}

/// Optional analysis overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisOptions {
    #[serde(default)]
    pub min_confidence: Option<f64>,
    #[serde(default)]
    pub depth: Option<DepthLimits>,
    #[serde(default)]
    pub dedup: Option<DedupConfig>,
    /// Skip cache lookup if true.
    #[serde(default)]
    pub skip_cache: bool,
}

/// Coordinate frame selector for the positions endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionsQuery {
    /// "room_scan", "capture_session", or absent for the best available.
    #[serde(default)]
    pub frame: Option<String>,
}

/// Body of the manual measurement override.
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementUpdate {
    /// Meters
    pub width: f64,
    /// Meters
    pub height: f64,
}
