// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use nalgebra::{Rotation3, Unit, Vector3};

pub use self::unit::LengthUnit;

mod unit;

/// Maximum deviation from unit length accepted for axis and direction vectors.
pub const UNIT_TOLERANCE: f32 = 1e-4;

pub trait EulerAngles {
    /// Create a rotation matrix from a roll angle.
    fn from_roll(roll: f32) -> Self;
    /// Create a rotation matrix from a pitch angle.
    fn from_pitch(pitch: f32) -> Self;
    /// Create a rotation matrix from a yaw angle.
    fn from_yaw(yaw: f32) -> Self;
}

impl EulerAngles for Rotation3<f32> {
    #[inline]
    fn from_roll(roll: f32) -> Self {
        Rotation3::from_axis_angle(&Vector3::x_axis(), roll)
    }

    #[inline]
    fn from_pitch(pitch: f32) -> Self {
        Rotation3::from_axis_angle(&Vector3::y_axis(), pitch)
    }

    #[inline]
    fn from_yaw(yaw: f32) -> Self {
        Rotation3::from_axis_angle(&Vector3::z_axis(), yaw)
    }
}

/// Rotation of `theta` radians around `axis`.
///
/// The matrix is built with Rodrigues' formula. The result is orthonormal
/// with determinant 1 and leaves `axis` in place.
#[inline]
pub fn axis_angle(axis: &Unit<Vector3<f32>>, theta: f32) -> Rotation3<f32> {
    Rotation3::from_axis_angle(axis, theta)
}

/// Composed rotation `Rx(rx) * Ry(ry) * Rz(rz)`.
///
/// Only used to orient auxiliary geometry such as the arc motion path.
pub fn compose_xyz(rx: f32, ry: f32, rz: f32) -> Rotation3<f32> {
    Rotation3::from_roll(rx) * Rotation3::from_pitch(ry) * Rotation3::from_yaw(rz)
}

/// Accept `vector` as a unit vector if it is finite and of unit length.
pub fn unit_vector(vector: Vector3<f32>) -> Option<Unit<Vector3<f32>>> {
    if vector.iter().all(|c| c.is_finite()) && (vector.norm() - 1.0).abs() <= UNIT_TOLERANCE {
        Some(Unit::new_normalize(vector))
    } else {
        None
    }
}
