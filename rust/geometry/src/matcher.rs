// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface matching: which room surface a detection belongs to
//!
//! Walls are chosen by casting the camera's viewing ray against every wall
//! plane and keeping the nearest hit that lands inside the wall's physical
//! extents. When the ray misses every wall the closest wall center wins, and
//! when there is no usable camera pose at all walls are handed out in cyclic
//! order through a [`WallCursor`] owned by the analysis run.

use crate::room::{RoomModel, SurfaceRecord};
use crate::transform::{self, WORLD_UP};
use damage_locator_core::{DetectedDamage, PlacementMethod, SurfaceCategory, CEILING_LABEL};
use nalgebra::{Matrix4, Point3, Vector3};
use smallvec::SmallVec;

/// Nearest accepted ray parameter (meters along the viewing ray)
pub const RAY_MIN_T: f64 = 0.1;
/// Farthest accepted ray parameter (meters along the viewing ray)
pub const RAY_MAX_T: f64 = 10.0;
/// Below this |forward · normal| the ray counts as parallel to the plane
pub const PARALLEL_EPSILON: f64 = 1e-6;

/// Round-robin wall assignment state for one analysis run
#[derive(Debug, Clone, Default)]
pub struct WallCursor {
    next: usize,
}

impl WallCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the next wall among `wall_count` walls
    pub fn next_wall(&mut self, wall_count: usize) -> Option<usize> {
        if wall_count == 0 {
            return None;
        }
        let index = self.next % wall_count;
        self.next += 1;
        Some(index)
    }

    /// Number of assignments handed out so far
    pub fn issued(&self) -> usize {
        self.next
    }
}

/// Intersection of the camera ray with one wall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    /// Index into the room's surface list
    pub surface_index: usize,
    /// Distance along the (unit) viewing ray
    pub t: f64,
    /// Hit point in the wall's local X/Y coordinates
    pub local: (f64, f64),
}

/// The surface a damage is attached to
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceAnchor {
    /// `None` for a ceiling synthesized from the floor
    pub surface_id: Option<String>,
    pub label: Option<String>,
    pub category: SurfaceCategory,
    pub center: Point3<f64>,
    /// Unit normal facing into the room
    pub normal: Vector3<f64>,
    /// Physical (width, height), when known
    pub extents: Option<(f64, f64)>,
    pub method: PlacementMethod,
}

impl SurfaceAnchor {
    fn from_record(room: &RoomModel, record: &SurfaceRecord, method: PlacementMethod) -> Self {
        Self {
            surface_id: Some(record.id.clone()),
            label: room.label(&record.id).map(str::to_string),
            category: record.category,
            center: record.center(),
            normal: record.normal(),
            extents: record.has_extents().then_some((record.width, record.height)),
            method,
        }
    }
}

/// Matches detections to the surfaces of one room
#[derive(Debug, Clone, Copy)]
pub struct SurfaceMatcher<'a> {
    room: &'a RoomModel,
}

impl<'a> SurfaceMatcher<'a> {
    pub fn new(room: &'a RoomModel) -> Self {
        Self { room }
    }

    /// Cast the camera's viewing ray against every wall.
    ///
    /// The camera sits at the pose translation and looks down its local -Z
    /// axis. Hits behind the camera, closer than [`RAY_MIN_T`], farther than
    /// [`RAY_MAX_T`], or outside the wall's half-extents are rejected; the
    /// nearest survivor is returned.
    pub fn cast_ray(&self, pose: &Matrix4<f64>) -> Option<WallHit> {
        let camera = transform::translation(pose);
        let forward = -transform::axis(pose, 2);

        let mut hits: SmallVec<[WallHit; 8]> = SmallVec::new();
        for (surface_index, wall) in self.room.surfaces().iter().enumerate() {
            if wall.category != SurfaceCategory::Wall {
                continue;
            }

            let normal = wall.normal();
            let denominator = forward.dot(&normal);
            if denominator.abs() < PARALLEL_EPSILON {
                continue;
            }

            let t = (wall.center() - camera).dot(&normal) / denominator;
            if !(t > RAY_MIN_T && t < RAY_MAX_T) {
                continue;
            }

            let offset = (camera + forward * t) - wall.center();
            let local_x = offset.dot(&wall.x_axis());
            let local_y = offset.dot(&wall.y_axis());
            if local_x.abs() > wall.width / 2.0 || local_y.abs() > wall.height / 2.0 {
                continue;
            }

            hits.push(WallHit {
                surface_index,
                t,
                local: (local_x, local_y),
            });
        }

        hits.into_iter().min_by(|a, b| a.t.total_cmp(&b.t))
    }

    /// Wall whose center is closest to `point`
    pub fn nearest_wall(&self, point: &Point3<f64>) -> Option<&'a SurfaceRecord> {
        self.room
            .walls()
            .min_by(|a, b| {
                let da = (a.center() - point).norm_squared();
                let db = (b.center() - point).norm_squared();
                da.total_cmp(&db)
            })
    }

    /// Choose a wall for a detection seen from `pose`
    pub fn match_wall(
        &self,
        pose: Option<&Matrix4<f64>>,
        cursor: &mut WallCursor,
    ) -> Option<SurfaceAnchor> {
        if let Some(pose) = pose {
            if let Some(hit) = self.cast_ray(pose) {
                let record = &self.room.surfaces()[hit.surface_index];
                return Some(SurfaceAnchor::from_record(
                    self.room,
                    record,
                    PlacementMethod::CameraRay,
                ));
            }

            let camera = transform::translation(pose);
            if let Some(record) = self.nearest_wall(&camera) {
                return Some(SurfaceAnchor::from_record(
                    self.room,
                    record,
                    PlacementMethod::NearestWall,
                ));
            }
            return None;
        }

        let position = cursor.next_wall(self.room.wall_count())?;
        let record = self.room.walls().nth(position)?;
        Some(SurfaceAnchor::from_record(
            self.room,
            record,
            PlacementMethod::RoundRobin,
        ))
    }

    /// Choose a surface of the given category
    pub fn match_surface(
        &self,
        category: SurfaceCategory,
        pose: Option<&Matrix4<f64>>,
        cursor: &mut WallCursor,
    ) -> Option<SurfaceAnchor> {
        match category {
            SurfaceCategory::Wall => self.match_wall(pose, cursor),
            SurfaceCategory::Ceiling => self.ceiling_anchor(),
            SurfaceCategory::Floor | SurfaceCategory::Door | SurfaceCategory::Window => self
                .room
                .first_of(category)
                .map(|record| {
                    SurfaceAnchor::from_record(self.room, record, PlacementMethod::FirstOfCategory)
                }),
        }
    }

    /// Ceiling placement: the floor lifted by the room's ceiling height with
    /// its normal flipped to face down into the room. Rooms without a floor
    /// (or without a ceiling height) fall back to a scanned ceiling record.
    pub fn ceiling_anchor(&self) -> Option<SurfaceAnchor> {
        let height = self.room.ceiling_height();
        if let Some(floor) = self.room.first_of(SurfaceCategory::Floor) {
            if height.is_finite() && height > 0.0 {
                return Some(SurfaceAnchor {
                    surface_id: None,
                    label: Some(CEILING_LABEL.to_string()),
                    category: SurfaceCategory::Ceiling,
                    center: floor.center() + WORLD_UP * height,
                    normal: -floor.normal(),
                    extents: floor.has_extents().then_some((floor.width, floor.height)),
                    method: PlacementMethod::CeilingOffset,
                });
            }
        }

        self.room
            .first_of(SurfaceCategory::Ceiling)
            .map(|record| {
                SurfaceAnchor::from_record(self.room, record, PlacementMethod::FirstOfCategory)
            })
    }

    /// Rebuild the anchor recorded on a damage during analysis
    pub fn anchor_for(&self, damage: &DetectedDamage) -> Option<SurfaceAnchor> {
        if damage.placement == Some(PlacementMethod::CeilingOffset) {
            return self.ceiling_anchor();
        }

        let id = damage.surface_id.as_deref()?;
        let record = self.room.surface(id)?;
        let method = damage.placement.unwrap_or(PlacementMethod::FirstOfCategory);
        Some(SurfaceAnchor::from_record(self.room, record, method))
    }
}
