// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Damage Locator Core
//!
//! Shared records for locating and measuring room damage found by an
//! external vision model.
//!
//! ## Overview
//!
//! - **Bounding boxes**: normalized image-space rectangles with clamping and
//!   intersection-over-union
//! - **Detections**: raw per-photo findings as reported by the vision model
//! - **Damage records**: the validated, measured entities handed to export
//!   and UI layers
//! - **Surfaces**: surface categories, placement methods and the
//!   "Wall A" / "Wall B" label table
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use damage_locator_core::{BoundingBox, DamageType};
//!
//! let a = BoundingBox::new(0.30, 0.30, 0.10, 0.10);
//! let b = BoundingBox::new(0.32, 0.31, 0.10, 0.10);
//! assert!(a.iou(&b) > 0.3);
//!
//! assert_eq!(DamageType::parse("Water Damage"), DamageType::WaterDamage);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for all records

pub mod bbox;
pub mod damage;
pub mod error;
pub mod surface;

pub use bbox::{BoundingBox, PixelRect};
pub use damage::{
    DamageDetection, DamageType, DetectedDamage, Measurement, MeasurementSource, Severity,
};
pub use error::{Error, Result};
pub use surface::{PlacementMethod, SurfaceCategory, SurfaceNames, CEILING_LABEL};
