// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analysis endpoints.

use crate::error::ApiError;
use crate::services::{analysis_config, build_session, DiskCache, RequestVision};
use crate::types::{
    parse_frame, AnalyzeRequest, AnalyzeResponse, MeasurementUpdate, PositionData,
    PositionsQuery, PositionsResponse, StoredAnalysis,
};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use damage_locator_core::DetectedDamage;
use damage_locator_geometry::{DepthSampler, PositionCalculator};
use damage_locator_processing::AnalysisOrchestrator;

async fn load(state: &AppState, key: &str) -> Result<StoredAnalysis, ApiError> {
    match state.cache.get::<StoredAnalysis>(key).await? {
        Some(stored) => Ok(stored),
        None => {
            tracing::debug!(key = %key, "Cache MISS");
            Err(ApiError::NotFound(format!("Analysis not found: {}", key)))
        }
    }
}

/// POST /api/v1/analyze - Run a full analysis.
pub async fn analyze(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    if body.len() > state.config.max_request_size_mb * 1024 * 1024 {
        return Err(ApiError::RequestTooLarge {
            max_mb: state.config.max_request_size_mb,
        });
    }

    let request: AnalyzeRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed analyze request: {}", e)))?;

    let cache_key = DiskCache::generate_key(&body);

    if !request.options.skip_cache {
        if let Some(cached) = state.cache.get::<StoredAnalysis>(&cache_key).await? {
            tracing::info!(cache_key = %cache_key, "Cache HIT");
            return Ok(Json(AnalyzeResponse {
                cache_key,
                report: cached.report,
                from_cache: true,
            }));
        }
    }

    tracing::info!(
        cache_key = %cache_key,
        photos = request.photos.len(),
        surfaces = request.room.surfaces.len(),
        "Cache MISS - analyzing"
    );

    let vision = RequestVision::new(&request.photos, state.vision.clone());
    if vision.needs_remote() && state.vision.is_none() {
        return Err(ApiError::VisionUnavailable(
            "photos without inline detections need VISION_API_URL".into(),
        ));
    }

    // Decode depth buffers on the blocking pool
    let request = std::sync::Arc::new(request);
    let session_request = request.clone();
    let (room, frames) =
        tokio::task::spawn_blocking(move || build_session(&session_request)).await??;

    let config = analysis_config(
        state.config.analysis_defaults(),
        &request.options,
        &request.photos,
    );
    let orchestrator = AnalysisOrchestrator::new(vision, config);
    let results = orchestrator.collect(frames.len()).await?;
    let config = orchestrator.config().clone();

    // Matching, measurement and merging on the blocking pool
    let report = tokio::task::spawn_blocking(move || results.assemble(&room, &frames, &config))
        .await?;

    let stored = StoredAnalysis {
        request: std::sync::Arc::unwrap_or_clone(request),
        report,
    };
    let response = AnalyzeResponse {
        cache_key: cache_key.clone(),
        report: stored.report.clone(),
        from_cache: false,
    };

    // Cache result (background)
    let cache = state.cache.clone();
    tokio::spawn(async move {
        if let Err(e) = cache.set(&cache_key, &stored).await {
            tracing::error!(error = %e, "Failed to cache analysis");
        }
    });

    Ok(Json(response))
}

/// GET /api/v1/analysis/:key - Retrieve a cached analysis.
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let stored = load(&state, &key).await?;
    tracing::info!(key = %key, "Cache HIT");
    Ok(Json(AnalyzeResponse {
        cache_key: key,
        report: stored.report,
        from_cache: true,
    }))
}

/// GET /api/v1/analysis/:key/positions - Marker positions for the 3D view.
pub async fn get_positions(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PositionsQuery>,
) -> Result<Json<PositionsResponse>, ApiError> {
    let frame = query
        .frame
        .as_deref()
        .map(|value| {
            parse_frame(value)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown coordinate frame {:?}", value)))
        })
        .transpose()?;

    let stored = load(&state, &key).await?;

    let positions = tokio::task::spawn_blocking(move || -> Result<Vec<PositionData>, ApiError> {
        let (room, frames) = build_session(&stored.request)?;
        let limits = stored.request.options.depth.unwrap_or_default();
        let calculator = PositionCalculator::new(&room, DepthSampler::new(limits.into()));
        Ok(calculator
            .positions(&stored.report.damages, &frames, frame)
            .into_iter()
            .map(PositionData::from)
            .collect())
    })
    .await??;

    tracing::debug!(key = %key, positions = positions.len(), "Positions computed");
    Ok(Json(PositionsResponse {
        cache_key: key,
        positions,
    }))
}

/// PUT /api/v1/analysis/:key/damages/:id/measurement - Manual size override.
pub async fn update_measurement(
    State(state): State<AppState>,
    Path((key, damage_id)): Path<(String, String)>,
    Json(update): Json<MeasurementUpdate>,
) -> Result<Json<DetectedDamage>, ApiError> {
    let mut stored = load(&state, &key).await?;

    let damage = stored
        .report
        .damage_mut(&damage_id)
        .ok_or_else(|| ApiError::NotFound(format!("Damage not found: {}", damage_id)))?;
    damage.apply_manual_measurement(update.width, update.height)?;
    let updated = damage.clone();

    state.cache.set(&key, &stored).await?;
    tracing::info!(key = %key, damage_id = %damage_id, "Manual measurement applied");

    Ok(Json(updated))
}
