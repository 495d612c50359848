use thiserror::Error;

use crate::map::UnitId;

/// Fatal errors raised by the districting pipeline.
///
/// An infeasible or unbounded model is *not* an error; see [`crate::SolveStatus`].
#[derive(Debug, Error)]
pub enum DistrictError {
    /// Malformed or incomplete input records. Fix or re-fetch the input and retry.
    #[error("data error: {0}")]
    Data(String),

    /// The MILP backend is missing or crashed.
    #[error("solver unavailable: {0}")]
    SolverUnavailable(String),

    /// The solver reported a solution that fails the exactly-one-district check.
    #[error("inconsistent solution for unit {unit}: {detail}")]
    InconsistentSolution { unit: UnitId, detail: String },
}

impl DistrictError {
    #[inline] pub(crate) fn data(msg: impl Into<String>) -> Self { Self::Data(msg.into()) }
}

pub type Result<T, E = DistrictError> = std::result::Result<T, E>;

/// Return early with a [`DistrictError::Data`] unless the condition holds.
macro_rules! ensure_data {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::DistrictError::Data(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_data;
