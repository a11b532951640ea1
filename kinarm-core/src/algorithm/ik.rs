// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use nalgebra::Point3;

use super::ForwardKinematics;
use crate::chain::Chain;
use crate::consts::{DEFAULT_EPSILON, DEFAULT_ETA, DEFAULT_MAX_ITERATIONS};

/// The angular step shrinks to the residual divided by this value.
const ETA_ERROR_DIVISOR: f32 = 100.0;

/// Distance between the effector and `target`.
///
/// Distances beyond the `f32` range saturate at `f32::MAX`.
#[inline]
fn residual(chain: &Chain, target: &Point3<f32>) -> f32 {
    let effector = ForwardKinematics::new(chain).solve();

    let distance = (target - effector).norm();
    if distance.is_finite() {
        return distance;
    }

    let distance = (target.coords.cast::<f64>() - effector.coords.cast::<f64>()).norm();
    distance.min(f32::MAX as f64) as f32
}

/// Handling of a joint for which neither step improves the residual.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlateauPolicy {
    /// Keep the joint, but track the mean of both trial residuals as the
    /// current error and count the sweep as moved. The inflated error also
    /// widens the next step, which lets the solver leave singular poses such
    /// as the fully stretched arm.
    #[default]
    Average,
    /// Keep the joint and the tracked error. A sweep only counts as moved when
    /// a joint angle actually changed, so a stuck solve ends as stalled.
    Hold,
}

/// Why the solver returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Termination {
    /// The residual dropped below epsilon.
    Converged,
    /// A full sweep left every joint in place.
    Stalled,
    /// The sweep budget ran out.
    Exhausted,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Converged => write!(f, "converged"),
            Termination::Stalled => write!(f, "stalled"),
            Termination::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Outcome of a solve.
///
/// The solver never fails. A residual at or above epsilon is a partial
/// solve and it is up to the caller to decide what that means.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Solution {
    /// Tracked error at return. This is the residual distance between
    /// effector and target, except under [`PlateauPolicy::Average`] where a
    /// held joint replaces it with the mean of both trial residuals.
    pub error: f32,
    /// Reason the solver returned.
    pub termination: Termination,
    /// Number of sweeps started.
    pub sweeps: usize,
    /// Number of forward kinematics evaluations.
    pub evaluations: usize,
}

impl Solution {
    #[inline]
    pub fn is_converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} with error {:.4} after {} sweeps ({} evaluations)",
            self.termination, self.error, self.sweeps, self.evaluations
        )
    }
}

/// Decision taken for a joint within a sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjustment {
    /// Committed `angle + eta`.
    Increment,
    /// Committed `angle - eta`.
    Decrement,
    /// Both steps were worse, the joint kept its angle.
    Hold,
}

/// Record of a single joint decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub sweep: usize,
    pub joint: usize,
    pub adjustment: Adjustment,
    /// Tracked error before the decision.
    pub previous_error: f32,
    /// Tracked error after the decision.
    pub error: f32,
    pub angle_before: f32,
    pub angle_after: f32,
}

/// Iterative coordinate search over the joint angles.
///
/// Each sweep visits the joints from base to effector. Every joint is tried
/// at `angle + eta` and `angle - eta` and the better of the two is kept,
/// with forward kinematics as the error oracle. After each joint the step
/// shrinks to the residual over a hundred. This is a hill climb: it may
/// settle in a local minimum and will not reach unreachable targets, but the
/// cost is bounded by `max_iterations * joints * 2` evaluations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InverseKinematics {
    max_iterations: usize,
    epsilon: f32,
    eta: f32,
    plateau: PlateauPolicy,
}

impl Default for InverseKinematics {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
            eta: DEFAULT_ETA,
            plateau: PlateauPolicy::default(),
        }
    }
}

impl InverseKinematics {
    pub fn new(max_iterations: usize, epsilon: f32, eta: f32) -> Self {
        Self {
            max_iterations,
            epsilon,
            eta,
            plateau: PlateauPolicy::default(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_eta(mut self, eta: f32) -> Self {
        self.eta = eta;
        self
    }

    pub fn with_plateau(mut self, plateau: PlateauPolicy) -> Self {
        self.plateau = plateau;
        self
    }

    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    #[inline]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    #[inline]
    pub fn eta(&self) -> f32 {
        self.eta
    }

    #[inline]
    pub fn plateau(&self) -> PlateauPolicy {
        self.plateau
    }

    /// Upper bound of forward kinematics evaluations for a chain of
    /// `joint_count` joints, including the initial residual.
    pub fn max_evaluations(&self, joint_count: usize) -> usize {
        self.max_iterations * joint_count * 2 + 1
    }

    /// Move the effector of `chain` towards `target`.
    ///
    /// The joint angles are updated in place.
    pub fn solve(&self, chain: &mut Chain, target: &Point3<f32>) -> Solution {
        self.solve_observed(chain, target, |_| {})
    }

    /// Same as [`InverseKinematics::solve`], reporting every joint decision
    /// to `observer`.
    pub fn solve_observed<F>(
        &self,
        chain: &mut Chain,
        target: &Point3<f32>,
        mut observer: F,
    ) -> Solution
    where
        F: FnMut(&Step),
    {
        if !target.coords.iter().all(|c| c.is_finite()) {
            log::warn!("Refusing to solve for non-finite target");

            return Solution {
                error: f32::INFINITY,
                termination: Termination::Exhausted,
                sweeps: 0,
                evaluations: 0,
            };
        }

        let mut evaluations = 1;
        let mut error = residual(chain, target);
        let mut eta = self.eta;

        if error < self.epsilon {
            log::debug!("Target already within epsilon: {:.4}", error);

            return Solution {
                error,
                termination: Termination::Converged,
                sweeps: 0,
                evaluations,
            };
        }

        for sweep in 0..self.max_iterations {
            let mut moved = false;

            for index in 0..chain.len() {
                let original = chain.joints()[index].angle();

                chain.joint_mut(index).set_angle(original + eta);
                let error_plus = residual(chain, target);

                chain.joint_mut(index).set_angle(original - eta);
                let error_minus = residual(chain, target);

                evaluations += 2;

                let previous_error = error;

                let adjustment = if error_plus > error && error_minus > error {
                    Adjustment::Hold
                } else if error_plus < error_minus {
                    Adjustment::Increment
                } else {
                    Adjustment::Decrement
                };

                let angle = match adjustment {
                    Adjustment::Hold => {
                        if self.plateau == PlateauPolicy::Average {
                            error = error_plus / 2.0 + error_minus / 2.0;
                            moved = true;
                        }

                        chain.joint_mut(index).set_angle(original)
                    }
                    Adjustment::Increment => {
                        error = error_plus;
                        chain.joint_mut(index).set_angle(original + eta)
                    }
                    Adjustment::Decrement => {
                        error = error_minus;
                        chain.joint_mut(index).set_angle(original - eta)
                    }
                };

                if adjustment != Adjustment::Hold {
                    moved |= match self.plateau {
                        PlateauPolicy::Average => true,
                        PlateauPolicy::Hold => angle != original,
                    };
                }

                observer(&Step {
                    sweep,
                    joint: index,
                    adjustment,
                    previous_error,
                    error,
                    angle_before: original,
                    angle_after: angle,
                });

                if error < self.epsilon {
                    log::debug!(
                        "Converged in sweep {} at joint {} with error {:.4}",
                        sweep,
                        index,
                        error
                    );

                    return Solution {
                        error,
                        termination: Termination::Converged,
                        sweeps: sweep + 1,
                        evaluations,
                    };
                }

                eta = error / ETA_ERROR_DIVISOR;
            }

            log::trace!("Sweep {} error {:.4} eta {:.5}", sweep, error, eta);

            if !moved {
                log::debug!("Stalled in sweep {} with error {:.4}", sweep, error);

                return Solution {
                    error,
                    termination: Termination::Stalled,
                    sweeps: sweep + 1,
                    evaluations,
                };
            }
        }

        log::debug!(
            "Exhausted {} sweeps with error {:.4}",
            self.max_iterations,
            error
        );

        Solution {
            error,
            termination: Termination::Exhausted,
            sweeps: self.max_iterations,
            evaluations,
        }
    }
}
