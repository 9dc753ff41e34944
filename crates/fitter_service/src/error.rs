//! Service error types.

use fitter_core::SolverError;
use fitter_models::ModelError;
use thiserror::Error;

/// Errors returned by the re-fitting service.
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// The solver rejected the run or failed numerically.
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// The collection or parameters are inconsistent.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Some instrument is missing a bid or ask, or the collection is empty.
    #[error("Collection has no fittable values")]
    NoFittableValues,

    /// The worker task has exited.
    #[error("Fitting worker has stopped")]
    WorkerStopped,

    /// The blocking fit task panicked or was aborted.
    #[error("Fitting task failed: {0}")]
    TaskFailed(String),
}

impl ServiceError {
    /// True if the fit was skipped because quotes are incomplete.
    pub fn is_no_fittable_values(&self) -> bool {
        matches!(self, Self::NoFittableValues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_error_is_transparent() {
        let err: ServiceError = SolverError::EmptyParameters.into();
        assert_eq!(format!("{}", err), "Empty parameter vector");
    }

    #[test]
    fn test_model_error_conversion() {
        let err: ServiceError = ModelError::UnknownInstrument("X".to_string()).into();
        assert!(matches!(err, ServiceError::Model(_)));
        assert!(!err.is_no_fittable_values());
    }
}
