// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use nalgebra::Point3;

use crate::algorithm::ForwardKinematics;
use crate::error::{Error, ErrorKind, Result};
use crate::joint::Joint;

/// Adjacency of a single joint in the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    /// Position of the joint.
    pub index: usize,
    /// Neighbour towards the base.
    pub prev: Option<usize>,
    /// Neighbour towards the effector.
    pub next: Option<usize>,
}

/// Ordered sequence of joints from the base (index 0) to the effector.
///
/// Adjacency is implicit in the order of the joints. Moving towards the
/// effector increments the index, moving towards the base decrements it.
#[derive(Clone, Debug)]
pub struct Chain {
    joints: Vec<Joint>,
}

impl Chain {
    /// Construct a chain from joints ordered base first.
    pub fn new(joints: Vec<Joint>) -> Result<Self> {
        if joints.is_empty() {
            return Err(Error::new(ErrorKind::EmptyChain));
        }

        Ok(Self { joints })
    }

    /// The reference three joint arm.
    ///
    /// A twisting base without offset, followed by two rotational joints
    /// of 30.5mm and 34.0mm along the same direction.
    pub fn reference() -> Result<Self> {
        use crate::consts::*;

        Self::new(vec![
            Joint::twisting(
                0.0,
                REFERENCE_BASE_LENGTH,
                Some(-REFERENCE_BASE_LIMIT.to_radians()),
                Some(REFERENCE_BASE_LIMIT.to_radians()),
            )?
            .with_name("base"),
            Joint::rotational(
                0.0,
                REFERENCE_MIDDLE_LENGTH,
                Some(-REFERENCE_MIDDLE_LIMIT.to_radians()),
                Some(REFERENCE_MIDDLE_LIMIT.to_radians()),
            )?
            .with_name("middle"),
            Joint::rotational(
                0.0,
                REFERENCE_TOP_LENGTH,
                Some(-REFERENCE_TOP_LIMIT.to_radians()),
                Some(REFERENCE_TOP_LIMIT.to_radians()),
            )?
            .with_name("top"),
        ])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Index of the fixed end.
    #[inline]
    pub fn base(&self) -> usize {
        0
    }

    /// Index of the free end.
    #[inline]
    pub fn effector(&self) -> usize {
        self.joints.len() - 1
    }

    /// Neighbour of `index` towards the effector.
    pub fn next(&self, index: usize) -> Option<usize> {
        (index + 1 < self.joints.len()).then_some(index + 1)
    }

    /// Neighbour of `index` towards the base.
    pub fn prev(&self, index: usize) -> Option<usize> {
        (index > 0 && index < self.joints.len()).then(|| index - 1)
    }

    /// Adjacency table of the chain, base first.
    pub fn links(&self) -> Vec<Link> {
        (0..self.joints.len())
            .map(|index| Link {
                index,
                prev: self.prev(index),
                next: self.next(index),
            })
            .collect()
    }

    #[inline]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Joint> {
        self.joints.iter()
    }

    #[inline]
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub(crate) fn joint_mut(&mut self, index: usize) -> &mut Joint {
        &mut self.joints[index]
    }

    /// Joint angles in base to effector order.
    pub fn angles(&self) -> Vec<f32> {
        self.joints.iter().map(Joint::angle).collect()
    }

    /// Write the angle of a single joint and return the stored value.
    pub fn set_angle(&mut self, index: usize, theta: f32) -> Result<f32> {
        self.joints
            .get_mut(index)
            .map(|joint| joint.set_angle(theta))
            .ok_or(Error::new(ErrorKind::NoSuchJoint(index)))
    }

    /// Write all joint angles in base to effector order.
    pub fn set_angles(&mut self, angles: &[f32]) -> Result<()> {
        if angles.len() != self.joints.len() {
            return Err(Error::new(ErrorKind::JointCountMismatch {
                expected: self.joints.len(),
                actual: angles.len(),
            }));
        }

        for (joint, theta) in self.joints.iter_mut().zip(angles) {
            joint.set_angle(*theta);
        }

        Ok(())
    }

    /// Zero every joint angle. The topology is untouched.
    pub fn reset(&mut self) {
        for joint in &mut self.joints {
            joint.reset();
        }
    }

    /// Sum of all link lengths.
    pub fn reach(&self) -> f32 {
        self.joints.iter().map(Joint::length).sum()
    }

    /// World position of the effector.
    #[inline]
    pub fn effector_position(&self) -> Point3<f32> {
        ForwardKinematics::new(self).solve()
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Joint;
    type IntoIter = std::slice::Iter<'a, Joint>;

    fn into_iter(self) -> Self::IntoIter {
        self.joints.iter()
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for joint in &self.joints {
            write!(f, "{} ", joint)?;
        }

        let point = self.effector_position();

        write!(
            f,
            "Effector [{:.2}, {:.2}, {:.2}]",
            point.x, point.y, point.z
        )
    }
}
