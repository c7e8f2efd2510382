// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared transform utilities for camera poses and surface placements
//!
//! Both camera poses and surface transforms are 4x4 local-to-world matrices
//! whose columns hold the world-space directions of the local axes and whose
//! last column holds the origin.

use crate::error::{Error, Result};
use nalgebra::{Matrix4, Point3, Vector3};

/// World up axis shared by the room scan and the capture session
pub const WORLD_UP: Vector3<f64> = Vector3::new(0.0, 1.0, 0.0);

/// Build a local-to-world matrix from an origin and two axis hints
///
/// The Z axis is taken as given; the X hint is projected onto the plane
/// perpendicular to Z. Y completes a right-handed frame (Y = Z × X).
pub fn placement_matrix(
    location: Point3<f64>,
    z_axis: Vector3<f64>,
    x_axis: Vector3<f64>,
) -> Result<Matrix4<f64>> {
    if z_axis.norm() < 1e-9 {
        return Err(Error::InvalidTransform("zero-length Z axis".to_string()));
    }

    let z_axis_final = z_axis.normalize();
    let x_hint = if x_axis.norm() > 1e-9 {
        x_axis.normalize()
    } else {
        Vector3::new(1.0, 0.0, 0.0)
    };

    // Ensure X is orthogonal to Z (project X onto plane perpendicular to Z)
    let x_axis_orthogonal = x_hint - z_axis_final * x_hint.dot(&z_axis_final);
    let x_axis_final = if x_axis_orthogonal.norm() > 1e-6 {
        x_axis_orthogonal.normalize()
    } else if z_axis_final.y.abs() < 0.9 {
        // X and Z are parallel - pick a horizontal direction
        WORLD_UP.cross(&z_axis_final).normalize()
    } else {
        Vector3::new(1.0, 0.0, 0.0).cross(&z_axis_final).normalize()
    };

    let y_axis = z_axis_final.cross(&x_axis_final).normalize();

    let mut transform = Matrix4::identity();
    transform[(0, 0)] = x_axis_final.x;
    transform[(1, 0)] = x_axis_final.y;
    transform[(2, 0)] = x_axis_final.z;
    transform[(0, 1)] = y_axis.x;
    transform[(1, 1)] = y_axis.y;
    transform[(2, 1)] = y_axis.z;
    transform[(0, 2)] = z_axis_final.x;
    transform[(1, 2)] = z_axis_final.y;
    transform[(2, 2)] = z_axis_final.z;
    transform[(0, 3)] = location.x;
    transform[(1, 3)] = location.y;
    transform[(2, 3)] = location.z;

    Ok(transform)
}

/// Build a matrix from 16 column-major values (ARKit / simd layout)
pub fn matrix_from_column_major(values: &[f64]) -> Result<Matrix4<f64>> {
    if values.len() != 16 {
        return Err(Error::InvalidTransform(format!(
            "expected 16 matrix values, got {}",
            values.len()
        )));
    }
    Ok(Matrix4::from_column_slice(values))
}

/// Origin of the local frame in world space
#[inline]
pub fn translation(transform: &Matrix4<f64>) -> Point3<f64> {
    Point3::new(transform[(0, 3)], transform[(1, 3)], transform[(2, 3)])
}

/// Local axis `index` (0 = X, 1 = Y, 2 = Z) in world space, normalized
#[inline]
pub fn axis(transform: &Matrix4<f64>, index: usize) -> Vector3<f64> {
    let v = Vector3::new(
        transform[(0, index)],
        transform[(1, index)],
        transform[(2, index)],
    );
    let norm = v.norm();
    if norm > 1e-12 {
        v / norm
    } else {
        v
    }
}

/// Apply a local-to-world transform to a point
pub fn transform_point(transform: &Matrix4<f64>, point: &Point3<f64>) -> Option<Point3<f64>> {
    let world = transform * point.to_homogeneous();
    Point3::from_homogeneous(world)
}

/// True when every element of the matrix is finite
#[inline]
pub fn is_finite(transform: &Matrix4<f64>) -> bool {
    transform.iter().all(|v| v.is_finite())
}
