// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Damage detections (vision model input) and damage records (output)

use crate::bbox::BoundingBox;
use crate::error::{Error, Result};
use crate::surface::{PlacementMethod, SurfaceCategory};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of damage reported by the vision model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub enum DamageType {
    Crack,
    WaterDamage,
    Stain,
    Hole,
    Mold,
    PeelingPaint,
    Dent,
    Scratch,
    /// Anything the model reports outside the known set, text preserved
    Other(String),
}

impl DamageType {
    /// Parse a model-provided type string.
    ///
    /// Case, spaces and dashes are ignored, so "Water Damage",
    /// "water-damage" and "water_damage" all map to the same variant.
    pub fn parse(value: &str) -> Self {
        let normalized: String = value
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "crack" | "cracks" | "cracking" => Self::Crack,
            "water_damage" | "water" | "leak" | "water_stain" => Self::WaterDamage,
            "stain" | "discoloration" => Self::Stain,
            "hole" | "holes" | "puncture" => Self::Hole,
            "mold" | "mould" | "mildew" => Self::Mold,
            "peeling_paint" | "peeling" | "paint_peeling" => Self::PeelingPaint,
            "dent" => Self::Dent,
            "scratch" | "scratches" | "scuff" => Self::Scratch,
            "" => Self::Other("other".to_string()),
            _ => Self::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Crack => "crack",
            Self::WaterDamage => "water_damage",
            Self::Stain => "stain",
            Self::Hole => "hole",
            Self::Mold => "mold",
            Self::PeelingPaint => "peeling_paint",
            Self::Dent => "dent",
            Self::Scratch => "scratch",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DamageType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<DamageType> for String {
    fn from(value: DamageType) -> Self {
        value.as_str().to_string()
    }
}

/// Damage severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" => Some(Self::Low),
            "moderate" | "medium" => Some(Self::Moderate),
            "high" | "major" | "severe" => Some(Self::High),
            "critical" | "urgent" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Severity estimate for detections that carry no severity of their own.
    ///
    /// Starts from a per-type baseline and escalates one step for a damaged
    /// area of 0.25 m² or more and another for 1 m² or more. Low-confidence
    /// detections never exceed `Moderate`.
    pub fn infer(damage_type: &DamageType, confidence: f64, area: Option<f64>) -> Self {
        let mut severity = match damage_type {
            DamageType::WaterDamage | DamageType::Mold => Self::High,
            DamageType::Hole | DamageType::Crack => Self::Moderate,
            DamageType::Stain
            | DamageType::PeelingPaint
            | DamageType::Dent
            | DamageType::Scratch
            | DamageType::Other(_) => Self::Low,
        };

        if let Some(area) = area {
            if area >= 0.25 {
                severity = severity.escalate();
            }
            if area >= 1.0 {
                severity = severity.escalate();
            }
        }

        if confidence < 0.5 {
            severity = severity.min(Self::Moderate);
        }
        severity
    }

    fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Moderate,
            Self::Moderate => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }
}

/// One raw finding from the vision model for one photo
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DamageDetection {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub damage_type: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    pub confidence: f64,
    #[cfg_attr(feature = "serde", serde(default, rename = "boundingBox", alias = "bounding_box"))]
    pub bounding_box: Option<BoundingBox>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub recommendation: Option<String>,
    /// Severity as worded by the model, if it gave one
    #[cfg_attr(feature = "serde", serde(default))]
    pub severity: Option<String>,
    /// Surface the model thinks the damage is on ("wall", "floor", ...)
    #[cfg_attr(feature = "serde", serde(default))]
    pub surface: Option<String>,
    /// Index of the source photo; assigned by the orchestrator
    #[cfg_attr(feature = "serde", serde(default))]
    pub photo_index: usize,
}

/// Where a measurement came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MeasurementSource {
    /// Pinhole projection with a sampled depth value
    Depth,
    /// Bounding box fraction of the matched surface's extents
    SurfaceExtents,
    /// Entered by the user
    Manual,
}

/// Real-world size of a damage instance
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    /// Width in meters
    pub width: f64,
    /// Height in meters
    pub height: f64,
    /// Area in square meters
    pub area: f64,
    /// Distance from the camera in meters, when known
    pub distance: Option<f64>,
    /// Measurement confidence in `[0, 1]`
    pub confidence: f64,
    pub source: MeasurementSource,
}

/// A damage instance of record
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectedDamage {
    pub id: String,
    pub damage_type: DamageType,
    pub severity: Severity,
    pub description: String,
    pub surface: SurfaceCategory,
    /// Identifier of the matched room surface
    pub surface_id: Option<String>,
    /// Display label of the matched surface ("Wall A", "Floor", ...)
    pub surface_label: Option<String>,
    pub placement: Option<PlacementMethod>,
    pub confidence: f64,
    pub bounding_box: Option<BoundingBox>,
    pub recommendation: Option<String>,
    pub photo_index: usize,
    pub measurement: Option<Measurement>,
}

impl DetectedDamage {
    /// Real-world area, if the damage was measured
    #[inline]
    pub fn area(&self) -> Option<f64> {
        self.measurement.map(|m| m.area)
    }

    /// Distance from the camera, if known
    #[inline]
    pub fn distance(&self) -> Option<f64> {
        self.measurement.and_then(|m| m.distance)
    }

    /// Replace width, height and area with user-entered values.
    ///
    /// The camera distance of an earlier measurement is kept.
    pub fn apply_manual_measurement(&mut self, width: f64, height: f64) -> Result<()> {
        if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
            return Err(Error::InvalidMeasurement(format!(
                "width and height must be positive, got {} x {}",
                width, height
            )));
        }

        self.measurement = Some(Measurement {
            width,
            height,
            area: width * height,
            distance: self.distance(),
            confidence: 1.0,
            source: MeasurementSource::Manual,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_damage() -> DetectedDamage {
        DetectedDamage {
            id: "d-1".into(),
            damage_type: DamageType::Crack,
            severity: Severity::Moderate,
            description: "Hairline crack".into(),
            surface: SurfaceCategory::Wall,
            surface_id: Some("w1".into()),
            surface_label: Some("Wall A".into()),
            placement: Some(PlacementMethod::CameraRay),
            confidence: 0.8,
            bounding_box: Some(BoundingBox::new(0.1, 0.1, 0.2, 0.2)),
            recommendation: None,
            photo_index: 0,
            measurement: Some(Measurement {
                width: 0.3,
                height: 0.1,
                area: 0.03,
                distance: Some(1.4),
                confidence: 0.9,
                source: MeasurementSource::Depth,
            }),
        }
    }

    #[test]
    fn test_parse_damage_type() {
        assert_eq!(DamageType::parse("Water Damage"), DamageType::WaterDamage);
        assert_eq!(DamageType::parse("water-damage"), DamageType::WaterDamage);
        assert_eq!(DamageType::parse("MOULD"), DamageType::Mold);
        assert_eq!(
            DamageType::parse("Rust Spot"),
            DamageType::Other("rust_spot".into())
        );
        assert_eq!(DamageType::parse("other").as_str(), "other");
    }

    #[test]
    fn test_severity_inference() {
        assert_eq!(Severity::infer(&DamageType::Stain, 0.9, None), Severity::Low);
        assert_eq!(
            Severity::infer(&DamageType::Crack, 0.9, Some(0.3)),
            Severity::High
        );
        assert_eq!(
            Severity::infer(&DamageType::Mold, 0.9, Some(1.5)),
            Severity::Critical
        );
        assert_eq!(
            Severity::infer(&DamageType::WaterDamage, 0.3, Some(2.0)),
            Severity::Moderate
        );
    }

    #[test]
    fn test_manual_measurement_override() {
        let mut damage = sample_damage();
        damage.apply_manual_measurement(0.5, 0.2).unwrap();

        let m = damage.measurement.unwrap();
        assert_eq!(m.source, MeasurementSource::Manual);
        assert!((m.area - 0.1).abs() < 1e-12);
        assert_eq!(m.distance, Some(1.4));
        assert_eq!(damage.damage_type, DamageType::Crack);
    }

    #[test]
    fn test_manual_measurement_rejects_invalid() {
        let mut damage = sample_damage();
        let before = damage.measurement;
        assert!(damage.apply_manual_measurement(-1.0, 0.2).is_err());
        assert!(damage.apply_manual_measurement(0.5, f64::INFINITY).is_err());
        assert_eq!(damage.measurement, before);
    }
}
