// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Damage Locator Processing
//!
//! Runs vision output for one room through validation, surface matching,
//! measurement and deduplication.
//!
//! ```rust,ignore
//! use damage_locator_processing::{AnalysisConfig, AnalysisOrchestrator, PrecomputedVision};
//!
//! let vision = PrecomputedVision::from_detections(per_photo_detections);
//! let orchestrator = AnalysisOrchestrator::new(vision, AnalysisConfig::default());
//! let report = orchestrator.run(&room, &frames).await?;
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod vision;

pub use config::{AnalysisConfig, DedupConfig, DepthLimits, DEFAULT_INTER_CALL_DELAY_MS};
pub use dedup::{deduplicate, Deduplicator};
pub use error::{ProcessingError, Result};
pub use orchestrator::{AnalysisOrchestrator, AnalysisReport, CancellationFlag, VisionResults};
pub use pipeline::DetectionPipeline;
pub use vision::{PhotoFailure, PrecomputedVision, VisionClient, VisionError};
