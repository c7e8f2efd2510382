// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration loaded from environment variables.

use damage_locator_processing::{AnalysisConfig, DEFAULT_INTER_CALL_DELAY_MS};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Directory for cache storage.
    pub cache_dir: String,
    /// Maximum request body size in MB.
    pub max_request_size_mb: usize,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Number of worker threads for parallel measurement.
    pub worker_threads: usize,
    /// Vision model endpoint; without it only inline detections are accepted.
    pub vision_api_url: Option<String>,
    /// Bearer token for the vision model endpoint.
    pub vision_api_key: Option<String>,
    /// Delay between vision calls in milliseconds.
    pub vision_request_delay_ms: u64,
    /// Detections below this confidence are dropped.
    pub min_detection_confidence: f64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .unwrap_or(8080),
            cache_dir: std::env::var("CACHE_DIR").unwrap_or_else(|_| {
                if std::path::Path::new("/.dockerenv").exists() {
                    "/app/cache".into()
                } else {
                    std::env::current_dir()
                        .ok()
                        .and_then(|dir| dir.join(".cache").to_str().map(|s| s.to_string()))
                        .unwrap_or_else(|| "./.cache".into())
                }
            }),
            max_request_size_mb: std::env::var("MAX_REQUEST_SIZE_MB")
                .unwrap_or_else(|_| "200".into())
                .parse()
                .unwrap_or(200),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "600".into())
                .parse()
                .unwrap_or(600),
            worker_threads: std::env::var("WORKER_THREADS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()
                .unwrap_or_else(|_| num_cpus::get()),
            vision_api_url: std::env::var("VISION_API_URL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            vision_api_key: std::env::var("VISION_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            vision_request_delay_ms: std::env::var("VISION_REQUEST_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_INTER_CALL_DELAY_MS),
            min_detection_confidence: std::env::var("MIN_DETECTION_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0),
        }
    }

    /// Analysis defaults derived from the server settings.
    pub fn analysis_defaults(&self) -> AnalysisConfig {
        AnalysisConfig {
            inter_call_delay_ms: self.vision_request_delay_ms,
            min_confidence: self.min_detection_confidence,
            ..AnalysisConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
