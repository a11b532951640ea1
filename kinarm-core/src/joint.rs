// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use std::cell::Cell;

use nalgebra::{Rotation3, Unit, Vector3};

use crate::error::{Error, ErrorKind, Result};
use crate::math;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointKind {
    /// Rotates around the longitudinal direction of the chain.
    Twisting,
    /// Hinge perpendicular to the longitudinal direction of the chain.
    Rotational,
    /// Caller supplied axis and direction.
    Custom,
}

impl JointKind {
    /// Rotation axis and offset direction of the preset kinds.
    fn preset(&self) -> Option<(Unit<Vector3<f32>>, Unit<Vector3<f32>>)> {
        match self {
            JointKind::Twisting => Some((Vector3::y_axis(), Vector3::y_axis())),
            JointKind::Rotational => Some((Vector3::x_axis(), Vector3::y_axis())),
            JointKind::Custom => None,
        }
    }
}

impl std::fmt::Display for JointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JointKind::Twisting => write!(f, "twisting"),
            JointKind::Rotational => write!(f, "rotational"),
            JointKind::Custom => write!(f, "custom"),
        }
    }
}

/// One angular degree of freedom with a fixed offset to the next joint.
///
/// Every angle write goes through [`Joint::set_angle`], which clamps the value
/// into the configured bounds. No unclamped angle is ever observable.
#[derive(Clone, Debug)]
pub struct Joint {
    name: String,
    kind: JointKind,
    angle: f32,
    axis: Unit<Vector3<f32>>,
    length: f32,
    direction: Unit<Vector3<f32>>,
    angle_min: Option<f32>,
    angle_max: Option<f32>,
    rotation: Cell<Option<Rotation3<f32>>>,
}

impl Joint {
    /// Construct a new joint.
    ///
    /// Fails if `axis` or `direction` is not a finite unit vector, if `length`
    /// is negative or not finite, or if the bounds are malformed.
    pub fn new(
        angle: f32,
        axis: Vector3<f32>,
        length: f32,
        direction: Vector3<f32>,
        angle_min: Option<f32>,
        angle_max: Option<f32>,
    ) -> Result<Self> {
        let axis = math::unit_vector(axis).ok_or(Error::new(ErrorKind::InvalidAxis))?;
        let direction =
            math::unit_vector(direction).ok_or(Error::new(ErrorKind::InvalidDirection))?;

        Self::build(
            JointKind::Custom,
            angle,
            axis,
            length,
            direction,
            angle_min,
            angle_max,
        )
    }

    /// Construct a twisting joint, rotating around the chain direction.
    pub fn twisting(
        angle: f32,
        length: f32,
        angle_min: Option<f32>,
        angle_max: Option<f32>,
    ) -> Result<Self> {
        Self::preset(JointKind::Twisting, angle, length, angle_min, angle_max)
    }

    /// Construct a rotational (hinge) joint.
    pub fn rotational(
        angle: f32,
        length: f32,
        angle_min: Option<f32>,
        angle_max: Option<f32>,
    ) -> Result<Self> {
        Self::preset(JointKind::Rotational, angle, length, angle_min, angle_max)
    }

    fn preset(
        kind: JointKind,
        angle: f32,
        length: f32,
        angle_min: Option<f32>,
        angle_max: Option<f32>,
    ) -> Result<Self> {
        let (axis, direction) = kind
            .preset()
            .ok_or(Error::new(ErrorKind::MissingField("axis")))?;

        Self::build(kind, angle, axis, length, direction, angle_min, angle_max)
    }

    fn build(
        kind: JointKind,
        angle: f32,
        axis: Unit<Vector3<f32>>,
        length: f32,
        direction: Unit<Vector3<f32>>,
        angle_min: Option<f32>,
        angle_max: Option<f32>,
    ) -> Result<Self> {
        if !length.is_finite() || length < 0.0 {
            return Err(Error::new(ErrorKind::InvalidLength));
        }

        if angle_min.is_some_and(|min| !min.is_finite())
            || angle_max.is_some_and(|max| !max.is_finite())
        {
            return Err(Error::new(ErrorKind::InvalidBounds));
        }
        if let (Some(min), Some(max)) = (angle_min, angle_max) {
            if min > max {
                return Err(Error::new(ErrorKind::InvalidBounds));
            }
        }

        if !angle.is_finite() {
            return Err(Error::new(ErrorKind::InvalidAngle));
        }

        let mut joint = Self {
            name: String::new(),
            kind,
            angle: 0.0,
            axis,
            length,
            direction,
            angle_min,
            angle_max,
            rotation: Cell::new(None),
        };
        joint.set_angle(angle);

        Ok(joint)
    }

    /// Set the display name of the joint.
    pub fn with_name(mut self, name: impl ToString) -> Self {
        self.name = name.to_string();
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> JointKind {
        self.kind
    }

    /// Current angle in radians.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    #[inline]
    pub fn axis(&self) -> &Unit<Vector3<f32>> {
        &self.axis
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    #[inline]
    pub fn direction(&self) -> &Unit<Vector3<f32>> {
        &self.direction
    }

    #[inline]
    pub fn bounds(&self) -> (Option<f32>, Option<f32>) {
        (self.angle_min, self.angle_max)
    }

    /// Clamp `theta` into the joint bounds. Each bound applies on its own.
    pub fn bound(&self, theta: f32) -> f32 {
        let theta = match self.angle_min {
            Some(min) if theta < min => min,
            _ => theta,
        };

        match self.angle_max {
            Some(max) if theta > max => max,
            _ => theta,
        }
    }

    /// Write a new angle and return the stored value.
    ///
    /// The value is clamped into the bounds and the rotation cache is
    /// invalidated. Non-finite values are rejected and the current angle
    /// is kept.
    pub fn set_angle(&mut self, theta: f32) -> f32 {
        if !theta.is_finite() {
            log::warn!("Rejected non-finite angle for joint '{}'", self.name);
            return self.angle;
        }

        self.angle = self.bound(theta);
        self.rotation.set(None);
        self.angle
    }

    /// Set the angle back to zero.
    #[inline]
    pub fn reset(&mut self) {
        self.set_angle(0.0);
    }

    /// Offset from this joint to the next one, in the local frame.
    #[inline]
    pub fn local_offset(&self) -> Vector3<f32> {
        self.direction.into_inner() * self.length
    }

    /// Rotation of the joint for the current angle.
    ///
    /// The rotation is memoized until the next angle write.
    pub fn local_rotation(&self) -> Rotation3<f32> {
        if let Some(rotation) = self.rotation.get() {
            return rotation;
        }

        let rotation = math::axis_angle(&self.axis, self.angle);
        self.rotation.set(Some(rotation));
        rotation
    }

    /// Whether the memoized rotation is valid for the current angle.
    #[inline]
    pub fn has_cached_rotation(&self) -> bool {
        self.rotation.get().is_some()
    }
}

impl std::fmt::Display for Joint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = if self.name.is_empty() {
            self.kind.to_string()
        } else {
            self.name.clone()
        };

        write!(
            f,
            "{}={:.2}rad/{:5.2}°",
            name,
            self.angle,
            self.angle.to_degrees()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-5;

    #[test]
    fn test_new_validates_vectors() {
        let joint = Joint::new(0.0, Vector3::x(), 10.0, Vector3::y(), None, None);
        assert!(joint.is_ok());

        let error = Joint::new(0.0, Vector3::new(1.0, 1.0, 0.0), 10.0, Vector3::y(), None, None)
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidAxis);
        assert!(error.is_configuration());

        let error =
            Joint::new(0.0, Vector3::x(), 10.0, Vector3::zeros(), None, None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidDirection);

        let error = Joint::new(
            0.0,
            Vector3::new(f32::NAN, 0.0, 0.0),
            10.0,
            Vector3::y(),
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidAxis);
    }

    #[test]
    fn test_new_validates_scalars() {
        let error = Joint::rotational(0.0, -1.0, None, None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidLength);

        let error = Joint::rotational(0.0, f32::INFINITY, None, None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidLength);

        let error = Joint::rotational(0.0, 1.0, Some(1.0), Some(-1.0)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidBounds);

        let error = Joint::rotational(0.0, 1.0, Some(f32::NAN), None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidBounds);

        let error = Joint::twisting(f32::NAN, 1.0, None, None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidAngle);
    }

    #[test]
    fn test_presets() {
        let joint = Joint::twisting(0.0, 0.0, None, None).unwrap();
        assert_eq!(joint.kind(), JointKind::Twisting);
        assert_eq!(joint.axis().into_inner(), Vector3::y());
        assert_eq!(joint.direction().into_inner(), Vector3::y());

        let joint = Joint::rotational(0.0, 34.0, None, None).unwrap();
        assert_eq!(joint.kind(), JointKind::Rotational);
        assert_eq!(joint.axis().into_inner(), Vector3::x());
        assert_eq!(joint.local_offset(), Vector3::new(0.0, 34.0, 0.0));
    }

    #[test]
    fn test_initial_angle_clamped() {
        let joint = Joint::rotational(2.0, 1.0, Some(-1.0), Some(1.0)).unwrap();
        assert_eq!(joint.angle(), 1.0);
    }

    #[test]
    fn test_clamped_writes() {
        let mut joint = Joint::rotational(
            0.0,
            30.5,
            Some(-90_f32.to_radians()),
            Some(90_f32.to_radians()),
        )
        .unwrap();

        for theta in [0.3, 5.0, -5.0, 1.5, -1.58, 100.0, -0.2] {
            joint.set_angle(theta);
            assert!(joint.angle() >= -90_f32.to_radians());
            assert!(joint.angle() <= 90_f32.to_radians());
        }

        assert_eq!(joint.set_angle(3.0), 90_f32.to_radians());
        assert_eq!(joint.set_angle(-3.0), -90_f32.to_radians());
    }

    #[test]
    fn test_half_bounded() {
        let mut joint = Joint::rotational(0.0, 1.0, Some(-0.5), None).unwrap();
        assert_eq!(joint.set_angle(-2.0), -0.5);
        assert_eq!(joint.set_angle(42.0), 42.0);

        let mut joint = Joint::rotational(0.0, 1.0, None, Some(0.5)).unwrap();
        assert_eq!(joint.set_angle(-42.0), -42.0);
        assert_eq!(joint.set_angle(2.0), 0.5);
    }

    #[test]
    fn test_unbounded_accepts_finite() {
        let mut joint = Joint::twisting(0.0, 0.0, None, None).unwrap();
        assert_eq!(joint.set_angle(1234.5), 1234.5);
        assert_eq!(joint.set_angle(-1e6), -1e6);
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut joint = Joint::twisting(0.25, 0.0, None, None).unwrap();
        assert_eq!(joint.set_angle(f32::NAN), 0.25);
        assert_eq!(joint.set_angle(f32::INFINITY), 0.25);
        assert_eq!(joint.angle(), 0.25);
    }

    #[test]
    fn test_rotation_cache() {
        let mut joint = Joint::rotational(0.0, 1.0, None, None).unwrap();
        assert!(!joint.has_cached_rotation());

        let rotation = joint.local_rotation();
        assert!(joint.has_cached_rotation());
        assert_eq!(rotation, Rotation3::identity());

        joint.set_angle(std::f32::consts::FRAC_PI_2);
        assert!(!joint.has_cached_rotation());

        let rotated = joint.local_rotation() * Vector3::y();
        assert!((rotated - Vector3::z()).norm() < TOLERANCE);
        assert!(joint.has_cached_rotation());

        joint.reset();
        assert!(!joint.has_cached_rotation());
        assert_eq!(joint.angle(), 0.0);
    }

    #[test]
    fn test_display() {
        let joint = Joint::rotational(0.0, 1.0, None, None)
            .unwrap()
            .with_name("elbow");
        assert_eq!(joint.name(), "elbow");
        assert!(joint.to_string().starts_with("elbow=0.00rad"));

        let joint = Joint::twisting(0.0, 1.0, None, None).unwrap();
        assert!(joint.to_string().starts_with("twisting="));
    }
}
