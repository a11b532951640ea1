// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use crate::error::{Error, ErrorKind};

/// Length unit of a chain description.
///
/// All lengths are normalized to millimeters, the canonical unit of the chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LengthUnit {
    #[serde(rename = "um")]
    Micrometer,
    #[default]
    #[serde(rename = "mm")]
    Millimeter,
    #[serde(rename = "cm")]
    Centimeter,
    #[serde(rename = "m")]
    Meter,
}

impl LengthUnit {
    /// Factor from this unit to millimeters.
    pub fn multiplier(&self) -> f32 {
        match self {
            LengthUnit::Micrometer => 1.0 / 1000.0,
            LengthUnit::Millimeter => 1.0,
            LengthUnit::Centimeter => 10.0,
            LengthUnit::Meter => 1000.0,
        }
    }

    /// Convert a value in this unit to millimeters.
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        value * self.multiplier()
    }
}

impl std::str::FromStr for LengthUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "um" => Ok(LengthUnit::Micrometer),
            "mm" => Ok(LengthUnit::Millimeter),
            "cm" => Ok(LengthUnit::Centimeter),
            "m" => Ok(LengthUnit::Meter),
            _ => Err(Error::new(ErrorKind::UnknownUnit)),
        }
    }
}

impl std::fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LengthUnit::Micrometer => "um",
            LengthUnit::Millimeter => "mm",
            LengthUnit::Centimeter => "cm",
            LengthUnit::Meter => "m",
        };

        write!(f, "{}", name)
    }
}
