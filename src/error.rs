//! ═══════════════════════════════════════════════════════════════════════════════
//! ERROR — Unified Error Type for CCM
//! ═══════════════════════════════════════════════════════════════════════════════
//! Fatal input errors surface at session creation. Per-size and per-point
//! failures are recovered by the sweep and reported inside the result.
//! ═══════════════════════════════════════════════════════════════════════════════

use thiserror::Error;

/// The unified error type for the CCM crate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CcmError {
    /// Series too short for the requested embedding
    #[error("insufficient data: series has {len} points, embedding needs at least {required}")]
    InsufficientData { len: usize, required: usize },

    /// The two series differ in length
    #[error("length mismatch: x has {x_len} points, y has {y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },

    /// Library size is zero or larger than the manifold
    #[error("invalid library size {size}: must be in 1..={available}")]
    InvalidLibrarySize { size: usize, available: usize },

    /// An anchor could not find E+1 neighbors inside its library.
    /// Recovered locally: the point is excluded from its sample.
    #[error("anchor {anchor} has {candidates} neighbor candidates, needs {required}")]
    InsufficientNeighbors {
        anchor: usize,
        candidates: usize,
        required: usize,
    },

    /// A series contains NaN or infinity
    #[error("series {series} has a non-finite value at index {index}")]
    NonFiniteValue { series: char, index: usize },

    /// None of the requested library sizes could be run
    #[error("no valid library sizes remain after validation")]
    EmptySweep,

    /// Parameter out of range (E, tau, sample count, threshold)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be loaded or extracted
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<figment::Error> for CcmError {
    fn from(err: figment::Error) -> Self {
        CcmError::Config(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type CcmResult<T> = Result<T, CcmError>;

impl CcmError {
    /// Errors that abort the whole session, as opposed to the ones the
    /// sweep recovers from (a skipped size, an excluded point).
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            CcmError::InvalidLibrarySize { .. } | CcmError::InsufficientNeighbors { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = CcmError::LengthMismatch { x_len: 10, y_len: 12 };
        assert_eq!(err.to_string(), "length mismatch: x has 10 points, y has 12");

        let err = CcmError::InsufficientData { len: 3, required: 5 };
        assert!(err.to_string().contains("at least 5"));
    }

    #[test]
    fn test_fatality() {
        assert!(CcmError::EmptySweep.is_fatal());
        assert!(CcmError::LengthMismatch { x_len: 1, y_len: 2 }.is_fatal());
        assert!(!CcmError::InvalidLibrarySize { size: 0, available: 4 }.is_fatal());
        assert!(!CcmError::InsufficientNeighbors {
            anchor: 3,
            candidates: 2,
            required: 4
        }
        .is_fatal());
    }
}
