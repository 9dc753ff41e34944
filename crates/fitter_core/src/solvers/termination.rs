//! Termination test shared by every solver variant.
//!
//! The checks run in a fixed priority order:
//!
//! 1. `|ValueNew - ValueCurrent| <= MinimumDeltaValue`
//! 2. `||ParametersNew - ParametersCurrent||₂ <= MinimumDeltaParameters`
//! 3. `len(IterationResults) >= MaximumIterations`
//!
//! When several hold on the same iteration, the first one wins.

use super::options::SolverOptions;
use super::result::SolverResult;
use super::status::SolverStatus;

/// Evaluate the termination test without touching the result.
///
/// Returns the status the run would stop with, or `None` to continue.
///
/// # Example
///
/// ```
/// use fitter_core::solvers::{check_termination, SolverOptions, SolverResult, SolverStatus};
/// use nalgebra::DVector;
///
/// let mut result = SolverResult::new();
/// result.parameters_current = DVector::from_vec(vec![1.0]);
/// result.parameters_new = DVector::from_vec(vec![1.0]);
/// result.value_current = 0.5;
/// result.value_new = 0.5;
///
/// // Both deltas are zero: the value check has priority.
/// assert_eq!(
///     check_termination(&result, &SolverOptions::default()),
///     Some(SolverStatus::MinimumDeltaValueConverged)
/// );
/// ```
pub fn check_termination(result: &SolverResult, options: &SolverOptions) -> Option<SolverStatus> {
    if result.value_delta() <= options.minimum_delta_value {
        return Some(SolverStatus::MinimumDeltaValueConverged);
    }
    if result.parameter_change_norm() <= options.minimum_delta_parameters {
        return Some(SolverStatus::MinimumDeltaParametersConverged);
    }
    if result.iterations() >= options.maximum_iterations {
        return Some(SolverStatus::MaximumIterationsReached);
    }
    None
}

/// Evaluate the termination test and record the status on the true path.
pub fn should_terminate(result: &mut SolverResult, options: &SolverOptions) -> bool {
    match check_termination(result, options) {
        Some(status) => {
            result.status = status;
            true
        }
        None => false,
    }
}
