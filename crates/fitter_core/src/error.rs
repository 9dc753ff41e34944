//! Error types for structured error handling.
//!
//! This module provides `SolverError`, covering malformed input, invalid
//! options, numerical failure of the damped normal equations, cancellation
//! and requests for solver variants that have not been built.
//!
//! Running out of iterations is *not* an error: it is reported through
//! [`SolverStatus::MaximumIterationsReached`](crate::solvers::SolverStatus).

use crate::solvers::SolverKind;
use thiserror::Error;

/// Errors raised by a fitting run.
///
/// # Variants
/// - `EmptyParameters`: Initial parameter vector has length zero
/// - `EmptyObservations`: Objective provider returned no residuals
/// - `DimensionMismatch`: Provider or option shapes disagree with the parameter count
/// - `InvalidOptions`: Solver options failed validation
/// - `InvalidConfig`: Algorithm configuration failed validation
/// - `NotPositiveDefinite`: Cholesky factorisation of the damped Hessian failed
/// - `Cancelled`: The run was cancelled through its token
/// - `Unimplemented`: The requested solver variant does not exist
///
/// # Examples
/// ```
/// use fitter_core::SolverError;
///
/// let err = SolverError::NotPositiveDefinite { iteration: 3, lambda: 1e-3 };
/// assert!(err.is_numerical());
/// assert!(format!("{}", err).contains("iteration 3"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Initial parameter vector is empty.
    #[error("Empty parameter vector")]
    EmptyParameters,

    /// Objective provider returned an empty residual vector.
    #[error("Empty residual vector")]
    EmptyObservations,

    /// Shape of a provider output or option vector is inconsistent.
    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Which quantity had the wrong shape
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// Solver options are invalid.
    #[error("Invalid solver options: {0}")]
    InvalidOptions(String),

    /// Algorithm configuration is invalid.
    #[error("Invalid solver configuration: {0}")]
    InvalidConfig(String),

    /// Damped Hessian is not positive definite.
    #[error("Damped Hessian not positive definite at iteration {iteration} (lambda = {lambda})")]
    NotPositiveDefinite {
        /// Iteration count at the failure
        iteration: usize,
        /// Damping factor in use
        lambda: f64,
    },

    /// Fitting was cancelled.
    #[error("Fitting cancelled after {iterations} iterations")]
    Cancelled {
        /// Iterations completed before cancellation
        iterations: usize,
    },

    /// Solver variant has no implementation.
    #[error("Solver {0} is not implemented")]
    Unimplemented(SolverKind),
}

impl SolverError {
    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(what: &'static str, expected: usize, got: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            got,
        }
    }

    /// Create an invalid options error.
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions(message.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Check if this is a numerical failure (as opposed to bad input).
    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::NotPositiveDefinite { .. })
    }

    /// Check if the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Check if this is a precondition violation on the inputs.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyParameters
                | Self::EmptyObservations
                | Self::DimensionMismatch { .. }
                | Self::InvalidOptions(_)
                | Self::InvalidConfig(_)
        )
    }
}
