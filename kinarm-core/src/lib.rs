// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

//! Kinematic model of a small serial arm.
//!
//! A [`Chain`] is an ordered sequence of [`Joint`]s from the fixed base to the
//! free effector. [`ForwardKinematics`] composes the joint transforms into the
//! effector position, and [`InverseKinematics`] searches for joint angles that
//! move the effector onto a target by perturbing one joint at a time.
//!
//! The crate is single threaded and synchronous. A solve runs to completion
//! and mutates the chain in place; callers owning the chain serialize access.

pub mod algorithm;
pub mod chain;
pub mod error;
pub mod joint;
pub mod math;
pub mod motion;

pub use nalgebra;

pub use self::algorithm::{
    Adjustment, ForwardKinematics, InverseKinematics, PlateauPolicy, Solution, Step, Termination,
};
pub use self::chain::{Chain, Link};
pub use self::error::{Error, ErrorKind, Result};
pub use self::joint::{Joint, JointKind};
pub use self::math::LengthUnit;
pub use self::motion::ArcMotion;

/// Reference arm and solver defaults.
pub mod consts {
    /// Length of the twisting base joint in millimeters.
    pub const REFERENCE_BASE_LENGTH: f32 = 0.0;
    /// Symmetric angle limit of the base joint in degrees.
    pub const REFERENCE_BASE_LIMIT: f32 = 180.0;
    /// Length of the middle rotational joint in millimeters.
    pub const REFERENCE_MIDDLE_LENGTH: f32 = 30.5;
    /// Symmetric angle limit of the middle joint in degrees.
    pub const REFERENCE_MIDDLE_LIMIT: f32 = 90.0;
    /// Length of the top rotational joint in millimeters.
    pub const REFERENCE_TOP_LENGTH: f32 = 34.0;
    /// Symmetric angle limit of the top joint in degrees.
    pub const REFERENCE_TOP_LIMIT: f32 = 120.0;

    /// Target the arm is solved for at startup, in millimeters.
    pub const DEFAULT_TARGET: [f32; 3] = [0.0, 40.0, 0.0];

    /// Maximum number of solver sweeps.
    pub const DEFAULT_MAX_ITERATIONS: usize = 100;
    /// Residual distance at which the solver stops.
    pub const DEFAULT_EPSILON: f32 = 0.1;
    /// Initial angular step of the solver in radians.
    pub const DEFAULT_ETA: f32 = 0.1;

    /// Arc path center in millimeters.
    pub const ARC_CENTER: [f32; 3] = [25.0, 25.0, 25.0];
    /// Arc plane orientation (roll, pitch, yaw) in degrees.
    pub const ARC_ORIENTATION: [f32; 3] = [-45.0, 0.0, 0.0];
    /// Arc radius in millimeters.
    pub const ARC_RADIUS: f32 = 12.0;
    /// Arc start angle in degrees.
    pub const ARC_START: f32 = 0.0;
    /// Arc end angle in degrees.
    pub const ARC_END: f32 = 360.0;
    /// Seconds per full turn of the arc.
    pub const ARC_PRESCALAR: f32 = 10.0;
}
