//! Various error types
//!

use std::fmt::{self, Display, Formatter};

use crate::layer::NeuraLayerKind;

pub type NeuraResult<T> = Result<T, NeuraErr>;

#[derive(Clone, Debug, PartialEq)]
pub enum NeuraErr {
    /// An array or a parameter container does not have the shape the operation requires.
    DimensionsMismatch(NeuraDimensionsMismatch),

    /// Two layers or parameter containers belong to different architectures.
    IncompatibleArchitecture {
        expected: NeuraLayerKind,
        got: NeuraLayerKind,
    },

    /// The operation is not defined for the current configuration or state.
    InvalidOperation(&'static str),

    /// An array variant that the operation has no branch for.
    UnsupportedArray(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeuraDimensionsMismatch {
    pub what: &'static str,
    pub existing: (usize, usize),
    pub new: (usize, usize),
}

impl NeuraErr {
    pub(crate) fn mismatch(what: &'static str, existing: (usize, usize), new: (usize, usize)) -> Self {
        Self::DimensionsMismatch(NeuraDimensionsMismatch {
            what,
            existing,
            new,
        })
    }
}

impl Display for NeuraErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionsMismatch(NeuraDimensionsMismatch { what, existing, new }) => write!(
                f,
                "dimensions mismatch for {what}: expected {}x{}, got {}x{}",
                existing.0, existing.1, new.0, new.1
            ),
            Self::IncompatibleArchitecture { expected, got } => {
                write!(f, "incompatible architecture: expected {expected:?}, got {got:?}")
            }
            Self::InvalidOperation(msg) => write!(f, "invalid operation: {msg}"),
            Self::UnsupportedArray(msg) => write!(f, "unsupported array: {msg}"),
        }
    }
}

impl std::error::Error for NeuraErr {}
