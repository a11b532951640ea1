// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use std::io::Write;

use kinarm_core::Chain;

/// Stepper motor drive configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepperProfile {
    /// Pulses per full revolution of the joint. Negative values reverse the
    /// motor direction.
    pub pulses_per_revolution: i32,
}

impl StepperProfile {
    pub const fn new(pulses_per_revolution: i32) -> Self {
        Self {
            pulses_per_revolution,
        }
    }

    /// Absolute pulse position for a joint angle in radians.
    pub fn pulses(&self, theta: f32) -> i32 {
        (theta / std::f32::consts::TAU * self.pulses_per_revolution as f32).trunc() as i32
    }
}

/// Drive profiles of the reference arm, base first.
pub const REFERENCE_PROFILES: [StepperProfile; 3] = [
    StepperProfile::new(200 * 1600),
    StepperProfile::new(-200 * 1600),
    StepperProfile::new(200 * 400),
];

/// Line based command link to the stepper controller.
///
/// Every command is a single line `motor,pulses`.
pub struct StepperLink<W: Write> {
    inner: W,
    profiles: Vec<StepperProfile>,
}

impl<W: Write> StepperLink<W> {
    pub fn new(inner: W, profiles: Vec<StepperProfile>) -> Self {
        Self { inner, profiles }
    }

    /// Move a single motor to an absolute angle.
    pub fn move_motor(&mut self, motor: usize, theta: f32) -> anyhow::Result<()> {
        let profile = self
            .profiles
            .get(motor)
            .ok_or_else(|| anyhow::anyhow!("no stepper profile for motor {}", motor))?;

        let pulses = profile.pulses(theta);

        log::trace!("Motor {} to {} pulses", motor, pulses);

        writeln!(self.inner, "{},{}", motor, pulses)?;

        Ok(())
    }

    /// Send the angle of every joint in the chain, base first.
    pub fn write_chain(&mut self, chain: &Chain) -> anyhow::Result<()> {
        if chain.len() > self.profiles.len() {
            anyhow::bail!(
                "chain has {} joints but only {} stepper profiles",
                chain.len(),
                self.profiles.len()
            );
        }

        for (motor, joint) in chain.iter().enumerate() {
            self.move_motor(motor, joint.angle())?;
        }

        self.inner.flush()?;

        Ok(())
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}
