// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use std::f32::consts::TAU;

use nalgebra::{Point3, Rotation3, Vector3};

use crate::consts::*;
use crate::math;

/// Target path along a circular arc.
///
/// The path sweeps back and forth between the start and end angle in the
/// plane given by the orientation, around the center point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcMotion {
    center: Point3<f32>,
    orientation: Rotation3<f32>,
    radius: f32,
    start: f32,
    end: f32,
    prescalar: f32,
}

impl Default for ArcMotion {
    fn default() -> Self {
        let [roll, pitch, yaw] = ARC_ORIENTATION;

        Self::new(
            Point3::from(ARC_CENTER),
            (roll.to_radians(), pitch.to_radians(), yaw.to_radians()),
            ARC_RADIUS,
        )
        .with_sweep(ARC_START.to_radians(), ARC_END.to_radians())
        .with_prescalar(ARC_PRESCALAR)
    }
}

impl ArcMotion {
    /// Construct a full circle around `center`.
    ///
    /// The plane is oriented by `Rx * Ry * Rz` of the given angles.
    pub fn new(center: Point3<f32>, orientation: (f32, f32, f32), radius: f32) -> Self {
        Self {
            center,
            orientation: math::compose_xyz(orientation.0, orientation.1, orientation.2),
            radius,
            start: 0.0,
            end: TAU,
            prescalar: ARC_PRESCALAR,
        }
    }

    /// Limit the arc to the angles between `start` and `end`.
    pub fn with_sweep(mut self, start: f32, end: f32) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Set the number of seconds per full turn.
    pub fn with_prescalar(mut self, prescalar: f32) -> Self {
        self.prescalar = prescalar;
        self
    }

    #[inline]
    pub fn center(&self) -> &Point3<f32> {
        &self.center
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn sweep(&self) -> (f32, f32) {
        (self.start, self.end)
    }

    /// Seconds needed to travel from start to end.
    pub fn leg_duration(&self) -> f32 {
        self.prescalar / TAU * (self.end - self.start).abs()
    }

    /// Angle on the arc at `t` seconds.
    ///
    /// The angle moves from start to end and back again.
    pub fn angle_at(&self, t: f32) -> f32 {
        let leg = self.leg_duration();
        if leg <= f32::EPSILON {
            return self.start;
        }

        let phase = (t / leg).rem_euclid(2.0);
        let fraction = if phase <= 1.0 { phase } else { 2.0 - phase };

        self.start + (self.end - self.start) * fraction
    }

    /// Point on the arc at `t` seconds.
    pub fn point_at(&self, t: f32) -> Point3<f32> {
        let angle = self.angle_at(t);
        let local = Vector3::new(
            angle.cos() * self.radius,
            angle.sin() * self.radius,
            0.0,
        );

        self.center + self.orientation * local
    }
}
