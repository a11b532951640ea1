// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use kinarm_core::consts::*;
use kinarm_core::nalgebra::{Point3, Vector3};
use kinarm_core::{
    ArcMotion, Chain, ErrorKind, InverseKinematics, Joint, JointKind, LengthUnit, PlateauPolicy,
};

use crate::pilot::DEFAULT_LARGE_ERROR_THRESHOLD;
use crate::stepper::{StepperProfile, REFERENCE_PROFILES};

/// Read a TOML configuration file.
pub fn from_file<T: serde::de::DeserializeOwned>(
    path: impl AsRef<std::path::Path>,
) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path.as_ref())?;

    Ok(toml::from_str(&contents)?)
}

#[derive(Clone, Debug, serde_derive::Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum number of sweeps per solve.
    pub max_iterations: usize,
    /// Residual in millimeters at which a solve is done.
    pub epsilon: f32,
    /// Initial angular step in radians.
    pub eta: f32,
    /// Handling of joints that cannot improve.
    pub plateau: PlateauPolicy,
    /// Residual in millimeters above which the pilot warns.
    pub large_error_threshold: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
            eta: DEFAULT_ETA,
            plateau: PlateauPolicy::default(),
            large_error_threshold: DEFAULT_LARGE_ERROR_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug, serde_derive::Deserialize, PartialEq)]
pub struct JointConfig {
    /// Joint name.
    #[serde(default)]
    pub name: String,
    /// Joint kind.
    pub kind: JointKind,
    /// Initial angle in degrees.
    #[serde(default)]
    pub angle: f32,
    /// Link length in the configured unit.
    pub length: f32,
    /// Rotation axis, required for custom joints.
    pub axis: Option<[f32; 3]>,
    /// Offset direction, required for custom joints.
    pub direction: Option<[f32; 3]>,
    /// Lower angle bound in degrees.
    pub angle_min: Option<f32>,
    /// Upper angle bound in degrees.
    pub angle_max: Option<f32>,
}

impl JointConfig {
    fn reference(name: &str, kind: JointKind, length: f32, limit: f32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            angle: 0.0,
            length,
            axis: None,
            direction: None,
            angle_min: Some(-limit),
            angle_max: Some(limit),
        }
    }

    /// Construct the joint, normalizing lengths and converting degrees.
    pub fn build(&self, unit: LengthUnit) -> kinarm_core::Result<Joint> {
        let angle = self.angle.to_radians();
        let length = unit.normalize(self.length);
        let angle_min = self.angle_min.map(f32::to_radians);
        let angle_max = self.angle_max.map(f32::to_radians);

        let joint = match self.kind {
            JointKind::Twisting => Joint::twisting(angle, length, angle_min, angle_max)?,
            JointKind::Rotational => Joint::rotational(angle, length, angle_min, angle_max)?,
            JointKind::Custom => {
                let axis = self.axis.ok_or(ErrorKind::MissingField("axis"))?;
                let direction = self.direction.ok_or(ErrorKind::MissingField("direction"))?;

                Joint::new(
                    angle,
                    Vector3::from(axis),
                    length,
                    Vector3::from(direction),
                    angle_min,
                    angle_max,
                )?
            }
        };

        if self.kind != JointKind::Custom && (self.axis.is_some() || self.direction.is_some()) {
            log::warn!(
                "Ignoring axis and direction of {} joint '{}'",
                self.kind,
                self.name
            );
        }

        Ok(joint.with_name(&self.name))
    }
}

#[derive(Clone, Copy, Debug, serde_derive::Deserialize, PartialEq, Eq)]
pub struct StepperConfig {
    /// Pulses per full joint revolution.
    pub pulses_per_revolution: i32,
}

#[derive(Clone, Debug, serde_derive::Deserialize, PartialEq)]
#[serde(default)]
pub struct ArcConfig {
    /// Center in the configured unit.
    pub center: [f32; 3],
    /// Plane orientation (roll, pitch, yaw) in degrees.
    pub orientation: [f32; 3],
    /// Radius in the configured unit.
    pub radius: f32,
    /// Start angle in degrees.
    pub start: f32,
    /// End angle in degrees.
    pub end: f32,
    /// Seconds per full turn.
    pub prescalar: f32,
}

impl Default for ArcConfig {
    fn default() -> Self {
        Self {
            center: ARC_CENTER,
            orientation: ARC_ORIENTATION,
            radius: ARC_RADIUS,
            start: ARC_START,
            end: ARC_END,
            prescalar: ARC_PRESCALAR,
        }
    }
}

fn default_target() -> [f32; 3] {
    DEFAULT_TARGET
}

#[derive(Clone, Debug, serde_derive::Deserialize, PartialEq)]
pub struct Config {
    /// Length unit of all lengths in this configuration.
    #[serde(default)]
    pub unit: LengthUnit,
    /// Solver configuration.
    #[serde(default)]
    pub solver: SolverConfig,
    /// Initial target in the configured unit.
    #[serde(default = "default_target")]
    pub target: [f32; 3],
    /// Joints, base first.
    #[serde(rename = "joint")]
    pub joints: Vec<JointConfig>,
    /// Stepper drives, base first.
    #[serde(rename = "stepper", default)]
    pub steppers: Vec<StepperConfig>,
    /// Arc motion path.
    #[serde(default)]
    pub arc: ArcConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unit: LengthUnit::Millimeter,
            solver: SolverConfig::default(),
            target: DEFAULT_TARGET,
            joints: vec![
                JointConfig::reference(
                    "base",
                    JointKind::Twisting,
                    REFERENCE_BASE_LENGTH,
                    REFERENCE_BASE_LIMIT,
                ),
                JointConfig::reference(
                    "middle",
                    JointKind::Rotational,
                    REFERENCE_MIDDLE_LENGTH,
                    REFERENCE_MIDDLE_LIMIT,
                ),
                JointConfig::reference(
                    "top",
                    JointKind::Rotational,
                    REFERENCE_TOP_LENGTH,
                    REFERENCE_TOP_LIMIT,
                ),
            ],
            steppers: REFERENCE_PROFILES
                .iter()
                .map(|profile| StepperConfig {
                    pulses_per_revolution: profile.pulses_per_revolution,
                })
                .collect(),
            arc: ArcConfig::default(),
        }
    }
}

impl Config {
    /// Build the chain described by the joint sections.
    pub fn chain(&self) -> kinarm_core::Result<Chain> {
        let joints = self
            .joints
            .iter()
            .enumerate()
            .map(|(index, joint)| joint.build(self.unit).map_err(|e| e.at(index)))
            .collect::<kinarm_core::Result<Vec<_>>>()?;

        Chain::new(joints)
    }

    pub fn solver(&self) -> InverseKinematics {
        InverseKinematics::new(
            self.solver.max_iterations,
            self.solver.epsilon,
            self.solver.eta,
        )
        .with_plateau(self.solver.plateau)
    }

    /// Convert a point in the configured unit to millimeters.
    pub fn point(&self, point: [f32; 3]) -> Point3<f32> {
        Point3::from(point.map(|value| self.unit.normalize(value)))
    }

    /// Initial target in millimeters.
    pub fn target(&self) -> Point3<f32> {
        self.point(self.target)
    }

    pub fn stepper_profiles(&self) -> Vec<StepperProfile> {
        self.steppers
            .iter()
            .map(|stepper| StepperProfile::new(stepper.pulses_per_revolution))
            .collect()
    }

    pub fn arc(&self) -> ArcMotion {
        let [roll, pitch, yaw] = self.arc.orientation;

        ArcMotion::new(
            self.point(self.arc.center),
            (roll.to_radians(), pitch.to_radians(), yaw.to_radians()),
            self.unit.normalize(self.arc.radius),
        )
        .with_sweep(self.arc.start.to_radians(), self.arc.end.to_radians())
        .with_prescalar(self.arc.prescalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../contrib/kinarm.toml");

    #[test]
    fn test_sample_matches_reference() {
        let config: Config = toml::from_str(SAMPLE).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_chain() {
        let config = Config::default();
        let chain = config.chain().unwrap();

        assert_eq!(chain.len(), 3);
        assert!((chain.reach() - 64.5).abs() < 1e-5);
        assert_eq!(chain.joint(1).unwrap().name(), "middle");
        assert_eq!(
            chain.joint(1).unwrap().bounds(),
            (Some(-90_f32.to_radians()), Some(90_f32.to_radians()))
        );
        assert_eq!(config.target(), Point3::new(0.0, 40.0, 0.0));
        assert_eq!(config.solver(), InverseKinematics::default());
        assert_eq!(
            config.solver.large_error_threshold,
            DEFAULT_LARGE_ERROR_THRESHOLD
        );
        assert_eq!(config.stepper_profiles(), REFERENCE_PROFILES.to_vec());
        assert_eq!(config.arc(), ArcMotion::default());
    }

    #[test]
    fn test_minimal_config() {
        let config: Config = toml::from_str(
            r#"
            [[joint]]
            kind = "rotational"
            length = 10.0
            "#,
        )
        .unwrap();

        assert_eq!(config.unit, LengthUnit::Millimeter);
        assert_eq!(config.solver, SolverConfig::default());
        assert_eq!(config.target, DEFAULT_TARGET);
        assert!(config.steppers.is_empty());

        let chain = config.chain().unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.joint(0).unwrap().bounds(), (None, None));
    }

    #[test]
    fn test_unit_and_degrees() {
        let config: Config = toml::from_str(
            r#"
            unit = "cm"
            target = [0.0, 4.0, 0.0]

            [solver]
            plateau = "hold"
            epsilon = 0.5

            [[joint]]
            name = "arm"
            kind = "rotational"
            angle = 45.0
            length = 3.05
            angle_min = -30.0
            angle_max = 30.0
            "#,
        )
        .unwrap();

        assert_eq!(config.solver.plateau, PlateauPolicy::Hold);
        assert_eq!(config.solver.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.solver().epsilon(), 0.5);
        assert!((config.target() - Point3::new(0.0, 40.0, 0.0)).norm() < 1e-4);

        let chain = config.chain().unwrap();
        let joint = chain.joint(0).unwrap();
        assert!((joint.length() - 30.5).abs() < 1e-4);
        assert!((joint.angle() - 30_f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_custom_joint() {
        let config: Config = toml::from_str(
            r#"
            [[joint]]
            kind = "twisting"
            length = 0.0

            [[joint]]
            kind = "custom"
            length = 20.0
            axis = [0.0, 0.0, 1.0]
            direction = [1.0, 0.0, 0.0]
            "#,
        )
        .unwrap();

        let chain = config.chain().unwrap();
        assert_eq!(chain.joint(1).unwrap().kind(), JointKind::Custom);
        assert!((chain.effector_position() - Point3::new(20.0, 0.0, 0.0)).norm() < 1e-4);
    }

    #[test]
    fn test_custom_joint_missing_axis() {
        let config: Config = toml::from_str(
            r#"
            [[joint]]
            kind = "twisting"
            length = 0.0

            [[joint]]
            kind = "custom"
            length = 20.0
            direction = [1.0, 0.0, 0.0]
            "#,
        )
        .unwrap();

        let error = config.chain().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MissingField("axis"));
        assert_eq!(error.joint, Some(1));
        assert!(error.is_configuration());
    }

    #[test]
    fn test_invalid_joint() {
        let config: Config = toml::from_str(
            r#"
            [[joint]]
            kind = "custom"
            length = 20.0
            axis = [0.0, 0.0, 2.0]
            direction = [1.0, 0.0, 0.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.chain().unwrap_err().kind(), ErrorKind::InvalidAxis);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(toml::from_str::<Config>("unit = \"mm\"").is_err());
        assert!(toml::from_str::<Config>(
            r#"
            unit = "ft"

            [[joint]]
            kind = "rotational"
            length = 1.0
            "#
        )
        .is_err());
        assert!(toml::from_str::<Config>(
            r#"
            [[joint]]
            kind = "prismatic"
            length = 1.0
            "#
        )
        .is_err());
    }

    #[test]
    fn test_empty_chain() {
        let config = Config {
            joints: vec![],
            ..Config::default()
        };

        assert_eq!(config.chain().unwrap_err().kind(), ErrorKind::EmptyChain);
    }
}
