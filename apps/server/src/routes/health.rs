// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Health check endpoint.

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    /// Whether photos without inline detections can be analyzed.
    pub vision_configured: bool,
}

/// API information response.
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

/// Endpoint information.
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// GET /api/v1/health - Health check endpoint.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "damage-locator-server",
        vision_configured: state.vision.is_some(),
    })
}

/// GET / - API information endpoint.
pub async fn info() -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        service: "damage-locator-server",
        version: env!("CARGO_PKG_VERSION"),
        description: "Room damage measurement and placement",
        endpoints: vec![
            EndpointInfo {
                method: "GET",
                path: "/api/v1/health",
                description: "Health check endpoint",
            },
            EndpointInfo {
                method: "POST",
                path: "/api/v1/analyze",
                description: "Analyze photos of a scanned room",
            },
            EndpointInfo {
                method: "GET",
                path: "/api/v1/analysis/:key",
                description: "Retrieve a cached analysis",
            },
            EndpointInfo {
                method: "GET",
                path: "/api/v1/analysis/:key/positions",
                description: "Damage marker positions (?frame=room_scan|capture_session)",
            },
            EndpointInfo {
                method: "PUT",
                path: "/api/v1/analysis/:key/damages/:id/measurement",
                description: "Override a damage's measured size",
            },
        ],
    })
}
