// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use nalgebra::{Point3, Vector3};

use crate::chain::Chain;

/// Forward kinematics over a chain.
///
/// Starting at a joint and walking towards the base, each joint adds its
/// local offset to the running position and then rotates it. What remains
/// at the base is the world position relative to the base origin.
pub struct ForwardKinematics<'a> {
    chain: &'a Chain,
}

impl<'a> ForwardKinematics<'a> {
    pub fn new(chain: &'a Chain) -> Self {
        Self { chain }
    }

    /// World position of the effector.
    pub fn solve(&self) -> Point3<f32> {
        Point3::from(self.compose(self.chain.joints()))
    }

    /// World position of the end of the joint at `index`.
    pub fn solve_to(&self, index: usize) -> Option<Point3<f32>> {
        let joints = self.chain.joints().get(..=index)?;

        Some(Point3::from(self.compose(joints)))
    }

    /// Base origin followed by the end point of every joint, base first.
    pub fn joint_points(&self) -> Vec<Point3<f32>> {
        let mut points: Vec<Vector3<f32>> = Vec::with_capacity(self.chain.len() + 1);

        for joint in self.chain.iter().rev() {
            let rotation = joint.local_rotation();
            let offset = joint.local_offset();

            for point in points.iter_mut() {
                *point = rotation * (*point + offset);
            }
            points.push(rotation * offset);
        }
        points.push(Vector3::zeros());

        points.into_iter().rev().map(Point3::from).collect()
    }

    fn compose(&self, joints: &[crate::joint::Joint]) -> Vector3<f32> {
        joints.iter().rev().fold(Vector3::zeros(), |position, joint| {
            joint.local_rotation() * (position + joint.local_offset())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::Joint;

    const TOLERANCE: f32 = 1e-4;

    #[test]
    fn test_zero_angles() {
        let chain = Chain::reference().unwrap();

        let point = ForwardKinematics::new(&chain).solve();

        assert!((point - Point3::new(0.0, 64.5, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn test_straight_stack() {
        let chain = Chain::new(vec![
            Joint::rotational(0.0, 1.5, None, None).unwrap(),
            Joint::new(0.0, Vector3::z(), 2.0, Vector3::x(), None, None).unwrap(),
            Joint::twisting(0.0, 4.0, None, None).unwrap(),
        ])
        .unwrap();

        let point = ForwardKinematics::new(&chain).solve();

        assert!((point - Point3::new(2.0, 5.5, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn test_hinge_quarter_turn() {
        let mut chain = Chain::reference().unwrap();

        chain
            .set_angles(&[0.0, std::f32::consts::FRAC_PI_2, 0.0])
            .unwrap();
        let point = ForwardKinematics::new(&chain).solve();
        assert!((point - Point3::new(0.0, 0.0, 64.5)).norm() < TOLERANCE);

        chain
            .set_angles(&[0.0, 0.0, std::f32::consts::FRAC_PI_2])
            .unwrap();
        let point = ForwardKinematics::new(&chain).solve();
        assert!((point - Point3::new(0.0, 30.5, 34.0)).norm() < TOLERANCE);
    }

    #[test]
    fn test_twist_rotates_plane() {
        let mut chain = Chain::reference().unwrap();

        chain
            .set_angles(&[
                std::f32::consts::FRAC_PI_2,
                0.0,
                std::f32::consts::FRAC_PI_2,
            ])
            .unwrap();
        let point = ForwardKinematics::new(&chain).solve();

        assert!((point - Point3::new(34.0, 30.5, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn test_solve_to() {
        let mut chain = Chain::reference().unwrap();
        chain.set_angles(&[0.4, -0.3, 1.1]).unwrap();

        let fk = ForwardKinematics::new(&chain);

        assert!((fk.solve_to(0).unwrap() - Point3::origin()).norm() < TOLERANCE);
        assert!((fk.solve_to(1).unwrap().coords.norm() - 30.5).abs() < TOLERANCE);
        assert!((fk.solve_to(2).unwrap() - fk.solve()).norm() < TOLERANCE);
        assert!(fk.solve_to(3).is_none());
    }

    #[test]
    fn test_joint_points() {
        let mut chain = Chain::reference().unwrap();
        chain.set_angles(&[0.4, -0.3, 1.1]).unwrap();

        let fk = ForwardKinematics::new(&chain);
        let points = fk.joint_points();

        assert_eq!(points.len(), chain.len() + 1);
        assert_eq!(points[0], Point3::origin());
        for (index, point) in points.iter().skip(1).enumerate() {
            assert!((point - fk.solve_to(index).unwrap()).norm() < TOLERANCE);
        }

        for (index, joint) in chain.iter().enumerate() {
            let segment = (points[index + 1] - points[index]).norm();
            assert!((segment - joint.length()).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_uses_rotation_cache() {
        let mut chain = Chain::reference().unwrap();
        chain.set_angle(1, 0.5).unwrap();
        assert!(!chain.joint(1).unwrap().has_cached_rotation());

        let first = chain.effector_position();
        assert!(chain.iter().all(|joint| joint.has_cached_rotation()));

        let second = chain.effector_position();
        assert_eq!(first, second);
    }
}
