// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use std::io::Write;

use kinarm_core::nalgebra::Point3;
use kinarm_core::{Chain, InverseKinematics, Solution};

use crate::stepper::StepperLink;

/// Residual in millimeters above which a solve is reported as a large error.
pub const DEFAULT_LARGE_ERROR_THRESHOLD: f32 = 1.0;

/// Owner of the arm state.
///
/// The pilot holds the chain, the solver and the current target. Each tick
/// the target may be updated and solved, after which the joint angles are
/// forwarded to the stepper link if one is attached.
pub struct Pilot<W: Write> {
    chain: Chain,
    solver: InverseKinematics,
    target: Point3<f32>,
    large_error_threshold: f32,
    large_error: bool,
    large_error_events: usize,
    link: Option<StepperLink<W>>,
}

impl<W: Write> Pilot<W> {
    pub fn new(chain: Chain, solver: InverseKinematics, target: Point3<f32>) -> Self {
        Self {
            chain,
            solver,
            target,
            large_error_threshold: DEFAULT_LARGE_ERROR_THRESHOLD,
            large_error: false,
            large_error_events: 0,
            link: None,
        }
    }

    pub fn with_large_error_threshold(mut self, threshold: f32) -> Self {
        self.large_error_threshold = threshold;
        self
    }

    /// Attach the stepper command link.
    pub fn with_link(mut self, link: StepperLink<W>) -> Self {
        self.link = Some(link);
        self
    }

    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    #[inline]
    pub fn target(&self) -> &Point3<f32> {
        &self.target
    }

    #[inline]
    pub fn link(&self) -> Option<&StepperLink<W>> {
        self.link.as_ref()
    }

    /// Whether the last solve ended above the large error threshold.
    #[inline]
    pub fn is_large_error(&self) -> bool {
        self.large_error
    }

    /// Number of times the error rose above the large error threshold.
    #[inline]
    pub fn large_error_events(&self) -> usize {
        self.large_error_events
    }

    pub fn update_target(&mut self, target: Point3<f32>) {
        log::trace!(
            "Target [{:.2}, {:.2}, {:.2}]",
            target.x,
            target.y,
            target.z
        );

        self.target = target;
    }

    /// Solve for the current target and forward the result.
    pub fn solve_target(&mut self) -> anyhow::Result<Solution> {
        let start = std::time::Instant::now();

        let solution = self.solver.solve(&mut self.chain, &self.target);

        log::info!(
            "Target [{:.2}, {:.2}, {:.2}] {} in {:.3}ms",
            self.target.x,
            self.target.y,
            self.target.z,
            solution,
            start.elapsed().as_secs_f64() * 1_000.0
        );

        let large_error =
            solution.error.is_nan() || solution.error > self.large_error_threshold;
        if large_error && !self.large_error {
            self.large_error_events += 1;
            log::warn!(
                "Large error: effector is {:.2}mm off target",
                solution.error
            );
        }
        self.large_error = large_error;

        self.forward()?;

        Ok(solution)
    }

    /// Return the chain to its zero pose and forward it.
    pub fn reset(&mut self) -> anyhow::Result<()> {
        log::debug!("Reset chain");

        self.chain.reset();
        self.large_error = false;

        self.forward()
    }

    fn forward(&mut self) -> anyhow::Result<()> {
        if let Some(link) = self.link.as_mut() {
            link.write_chain(&self.chain)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stepper::REFERENCE_PROFILES;

    fn pilot() -> Pilot<Vec<u8>> {
        Pilot::new(
            Chain::reference().unwrap(),
            InverseKinematics::default(),
            Point3::new(0.0, 40.0, 0.0),
        )
        .with_link(StepperLink::new(Vec::new(), REFERENCE_PROFILES.to_vec()))
    }

    fn output(pilot: &Pilot<Vec<u8>>) -> String {
        String::from_utf8(pilot.link().unwrap().get_ref().clone()).unwrap()
    }

    #[test]
    fn test_solve_default_target() {
        let mut pilot = pilot();

        let solution = pilot.solve_target().unwrap();

        assert!(solution.is_converged());
        assert!(!pilot.is_large_error());
        assert!((pilot.chain().effector_position() - pilot.target()).norm() < 0.1);
        assert_eq!(output(&pilot).lines().count(), 3);
    }

    #[test]
    fn test_follow_targets() {
        let mut pilot = pilot();

        for target in [
            Point3::new(0.0, 40.0, 0.0),
            Point3::new(10.0, 40.0, -20.0),
            Point3::new(0.0, 40.0, 0.0),
        ] {
            pilot.update_target(target);
            assert_eq!(*pilot.target(), target);

            let solution = pilot.solve_target().unwrap();
            assert!(solution.is_converged());
            assert!(!pilot.is_large_error());
        }

        assert_eq!(output(&pilot).lines().count(), 9);
    }

    #[test]
    fn test_large_error() {
        let mut pilot = pilot();

        pilot.update_target(Point3::new(0.0, 200.0, 0.0));
        let solution = pilot.solve_target().unwrap();
        assert!(!solution.is_converged());
        assert!(pilot.is_large_error());

        pilot.solve_target().unwrap();
        assert!(pilot.is_large_error());

        pilot.reset().unwrap();
        assert!(!pilot.is_large_error());
    }

    #[test]
    fn test_large_error_rising_edge() {
        let mut pilot = pilot();
        assert_eq!(pilot.large_error_events(), 0);

        pilot.update_target(Point3::new(0.0, 200.0, 0.0));
        pilot.solve_target().unwrap();
        pilot.solve_target().unwrap();
        pilot.solve_target().unwrap();
        assert_eq!(pilot.large_error_events(), 1);

        pilot.reset().unwrap();
        pilot.update_target(Point3::new(0.0, 40.0, 0.0));
        assert!(pilot.solve_target().unwrap().is_converged());
        assert!(!pilot.is_large_error());
        assert_eq!(pilot.large_error_events(), 1);

        pilot.update_target(Point3::new(0.0, 200.0, 0.0));
        pilot.solve_target().unwrap();
        assert!(pilot.is_large_error());
        assert_eq!(pilot.large_error_events(), 2);
    }

    #[test]
    fn test_threshold() {
        let mut pilot = pilot().with_large_error_threshold(200.0);

        pilot.update_target(Point3::new(0.0, 200.0, 0.0));
        pilot.solve_target().unwrap();

        assert!(!pilot.is_large_error());
    }

    #[test]
    fn test_reset() {
        let mut pilot = pilot();

        pilot.solve_target().unwrap();
        pilot.reset().unwrap();

        assert_eq!(pilot.chain().angles(), vec![0.0, 0.0, 0.0]);
        assert!(output(&pilot).ends_with("0,0\n1,0\n2,0\n"));
    }

    #[test]
    fn test_without_link() {
        let mut pilot: Pilot<std::io::Sink> = Pilot::new(
            Chain::reference().unwrap(),
            InverseKinematics::default(),
            Point3::new(0.0, 40.0, 0.0),
        );

        assert!(pilot.solve_target().unwrap().is_converged());
        assert!(pilot.link().is_none());
    }
}
