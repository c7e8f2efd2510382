// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room model produced by the room-scanning subsystem

use crate::error::{Error, Result};
use crate::transform;
use damage_locator_core::{SurfaceCategory, SurfaceNames};
use nalgebra::{Matrix4, Point3, Vector3};
use rustc_hash::FxHashMap;

/// One planar surface of the scanned room
///
/// The transform maps surface-local coordinates to the room-scan world
/// frame: its translation is the surface center and its local Z axis is the
/// surface normal. `width` and `height` are the extents along local X and Y.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRecord {
    pub id: String,
    pub category: SurfaceCategory,
    pub transform: Matrix4<f64>,
    pub width: f64,
    pub height: f64,
}

impl SurfaceRecord {
    pub fn new(
        id: impl Into<String>,
        category: SurfaceCategory,
        transform: Matrix4<f64>,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            transform,
            width,
            height,
        }
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        transform::translation(&self.transform)
    }

    /// Unit normal (local Z)
    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        transform::axis(&self.transform, 2)
    }

    /// Unit in-plane horizontal axis (local X)
    #[inline]
    pub fn x_axis(&self) -> Vector3<f64> {
        transform::axis(&self.transform, 0)
    }

    /// Unit in-plane vertical axis (local Y)
    #[inline]
    pub fn y_axis(&self) -> Vector3<f64> {
        transform::axis(&self.transform, 1)
    }

    /// Whether the physical extents are known
    #[inline]
    pub fn has_extents(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Ordered surfaces of one room plus its ceiling height.
///
/// Built once per room and shared read-only by every analysis run; the
/// surface label table is computed at construction.
#[derive(Debug, Clone)]
pub struct RoomModel {
    surfaces: Vec<SurfaceRecord>,
    ceiling_height: f64,
    by_id: FxHashMap<String, usize>,
    names: SurfaceNames,
}

impl RoomModel {
    pub fn new(surfaces: Vec<SurfaceRecord>, ceiling_height: f64) -> Result<Self> {
        let mut by_id = FxHashMap::default();
        for (index, surface) in surfaces.iter().enumerate() {
            if !transform::is_finite(&surface.transform) {
                return Err(Error::InvalidSurface(format!(
                    "surface {} has a non-finite transform",
                    surface.id
                )));
            }
            if by_id.insert(surface.id.clone(), index).is_some() {
                return Err(Error::InvalidSurface(format!(
                    "duplicate surface id {}",
                    surface.id
                )));
            }
        }

        let names = SurfaceNames::build(surfaces.iter().map(|s| (s.id.as_str(), s.category)));

        Ok(Self {
            surfaces,
            ceiling_height,
            by_id,
            names,
        })
    }

    /// Room with no scanned surfaces
    pub fn empty() -> Self {
        Self {
            surfaces: Vec::new(),
            ceiling_height: 0.0,
            by_id: FxHashMap::default(),
            names: SurfaceNames::default(),
        }
    }

    #[inline]
    pub fn surfaces(&self) -> &[SurfaceRecord] {
        &self.surfaces
    }

    /// Measured floor-to-ceiling height in meters
    #[inline]
    pub fn ceiling_height(&self) -> f64 {
        self.ceiling_height
    }

    /// Look up a surface by identifier
    pub fn surface(&self, id: &str) -> Option<&SurfaceRecord> {
        self.by_id.get(id).map(|&index| &self.surfaces[index])
    }

    /// All walls in scan order
    pub fn walls(&self) -> impl Iterator<Item = &SurfaceRecord> {
        self.of_category(SurfaceCategory::Wall)
    }

    pub fn wall_count(&self) -> usize {
        self.walls().count()
    }

    pub fn of_category(&self, category: SurfaceCategory) -> impl Iterator<Item = &SurfaceRecord> {
        self.surfaces.iter().filter(move |s| s.category == category)
    }

    /// First surface of a category in scan order
    pub fn first_of(&self, category: SurfaceCategory) -> Option<&SurfaceRecord> {
        self.of_category(category).next()
    }

    /// Display label for a surface identifier ("Wall A", "Floor", ...)
    pub fn label(&self, id: &str) -> Option<&str> {
        self.names.label(id)
    }

    pub fn names(&self) -> &SurfaceNames {
        &self.names
    }
}
