//! Error types for the particle-dynamics core.

use thiserror::Error;

/// Errors raised while configuring or stepping particle dynamics.
///
/// None of these are retried internally. A failed step leaves the decision
/// (abort, shrink `dt` and redo the step) to the time-stepping driver.
#[derive(Debug, Error)]
pub enum SphError {
    /// Invalid construction parameter (smoothing length, dimension, material).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Raw neighbor data violates the relation invariants.
    #[error("inconsistent neighbor data for particle {index_i}: {reason}")]
    NeighborDataInconsistency { index_i: usize, reason: String },

    /// Degenerate deformation state met during stress evaluation.
    #[error("singular deformation gradient at particle {index} (det = {det})")]
    ConstitutiveSingularity { index: usize, det: f64 },

    /// Named particle variable has not been registered.
    #[error("unknown particle variable: {0}")]
    UnknownVariable(String),

    /// Named particle variable exists with another element type.
    #[error("particle variable {name} is not of type {expected}")]
    VariableTypeMismatch { name: String, expected: &'static str },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SphResult<T> = Result<T, SphError>;
