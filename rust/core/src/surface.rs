// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface categories and human-readable surface labels

use rustc_hash::FxHashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Category of a planar surface produced by the room scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SurfaceCategory {
    Wall,
    Floor,
    Ceiling,
    Door,
    Window,
}

impl SurfaceCategory {
    /// Parse the loose category names emitted by scanners and vision models
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wall" | "walls" => Some(Self::Wall),
            "floor" | "ground" | "flooring" => Some(Self::Floor),
            "ceiling" | "roof" => Some(Self::Ceiling),
            "door" | "doorway" | "opening" => Some(Self::Door),
            "window" | "windows" => Some(Self::Window),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Floor => "floor",
            Self::Ceiling => "ceiling",
            Self::Door => "door",
            Self::Window => "window",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::Wall => "Wall",
            Self::Floor => "Floor",
            Self::Ceiling => "Ceiling",
            Self::Door => "Door",
            Self::Window => "Window",
        }
    }
}

impl fmt::Display for SurfaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the surface of a damage was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlacementMethod {
    /// Camera viewing ray hit the wall inside its physical bounds
    CameraRay,
    /// Ray missed every wall; closest wall center to the camera
    NearestWall,
    /// No usable camera pose; walls handed out in cyclic order
    RoundRobin,
    /// First surface of the requested category
    FirstOfCategory,
    /// Floor transform lifted by the room's ceiling height
    CeilingOffset,
}

impl PlacementMethod {
    /// True when the choice is backed by the camera geometry
    pub fn is_camera_matched(&self) -> bool {
        matches!(self, Self::CameraRay)
    }
}

/// Label used for a ceiling synthesized from the floor
pub const CEILING_LABEL: &str = "Ceiling";

/// Lookup table from surface identifier to display label.
///
/// Walls are lettered in scan order ("Wall A", "Wall B", ..., "Wall AA").
/// Other categories use their plain name when the room has exactly one,
/// and are numbered otherwise ("Door 1", "Door 2").
#[derive(Debug, Clone, Default)]
pub struct SurfaceNames {
    labels: FxHashMap<String, String>,
}

impl SurfaceNames {
    /// Build the table from `(identifier, category)` pairs in scan order
    pub fn build<'a, I>(surfaces: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, SurfaceCategory)>,
    {
        let surfaces: Vec<(&str, SurfaceCategory)> = surfaces.into_iter().collect();

        let mut totals: FxHashMap<SurfaceCategory, usize> = FxHashMap::default();
        for (_, category) in &surfaces {
            *totals.entry(*category).or_insert(0) += 1;
        }

        let mut seen: FxHashMap<SurfaceCategory, usize> = FxHashMap::default();
        let mut labels = FxHashMap::default();

        for (id, category) in surfaces {
            let ordinal = seen.entry(category).or_insert(0);
            let label = match category {
                SurfaceCategory::Wall => format!("Wall {}", letter_code(*ordinal)),
                other if totals.get(&other).copied().unwrap_or(0) > 1 => {
                    format!("{} {}", other.display_name(), *ordinal + 1)
                }
                other => other.display_name().to_string(),
            };
            *ordinal += 1;
            labels.entry(id.to_string()).or_insert(label);
        }

        Self { labels }
    }

    /// Label for a surface identifier
    pub fn label(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Spreadsheet-style column letters: 0 -> A, 25 -> Z, 26 -> AA
fn letter_code(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}
