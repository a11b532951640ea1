// Copyright (C) 2024 Laixer Equipment B.V.
// All rights reserved.
//
// This software may be modified and distributed under the terms
// of the included license.  See the LICENSE file for details.

use std::error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The rotation axis is not a finite 3-component unit vector.
    InvalidAxis,

    /// The offset direction is not a finite 3-component unit vector.
    InvalidDirection,

    /// The link length is negative or not finite.
    InvalidLength,

    /// An angle bound is not finite, or the lower bound exceeds the upper bound.
    InvalidBounds,

    /// The angle is not finite.
    InvalidAngle,

    /// A field required for this joint kind was not provided.
    MissingField(&'static str),

    /// The length unit is not one of `um`, `mm`, `cm` or `m`.
    UnknownUnit,

    /// The chain has no joints.
    EmptyChain,

    /// There is no joint at the given index.
    NoSuchJoint(usize),

    /// The number of angles does not match the number of joints.
    JointCountMismatch { expected: usize, actual: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    /// Position of the offending joint in the chain, if known.
    pub joint: Option<usize>,
    /// Error kind.
    pub kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { joint: None, kind }
    }

    /// Attach the chain position of the joint this error belongs to.
    pub fn at(self, index: usize) -> Self {
        Self {
            joint: Some(index),
            kind: self.kind,
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether the error stems from a malformed chain description.
    ///
    /// Configuration errors are raised at construction time and are never
    /// deferred to the solver.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self.kind,
            ErrorKind::NoSuchJoint(_) | ErrorKind::JointCountMismatch { .. }
        )
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        if let Some(index) = self.joint {
            write!(f, "joint {}: ", index)?;
        }

        match &self.kind {
            ErrorKind::InvalidAxis => write!(f, "rotation axis must be a finite unit vector"),
            ErrorKind::InvalidDirection => {
                write!(f, "offset direction must be a finite unit vector")
            }
            ErrorKind::InvalidLength => write!(f, "link length must be finite and non-negative"),
            ErrorKind::InvalidBounds => write!(f, "invalid angle bounds"),
            ErrorKind::InvalidAngle => write!(f, "angle must be finite"),
            ErrorKind::MissingField(field) => write!(f, "missing field '{}'", field),
            ErrorKind::UnknownUnit => write!(f, "unknown length unit"),
            ErrorKind::EmptyChain => write!(f, "chain must contain at least one joint"),
            ErrorKind::NoSuchJoint(index) => write!(f, "no joint at index {}", index),
            ErrorKind::JointCountMismatch { expected, actual } => write!(
                f,
                "expected {} angles, got {}",
                expected, actual
            ),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}
