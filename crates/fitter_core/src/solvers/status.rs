//! Termination status of a fitting run.

use std::fmt;

/// Why a fitting run stopped.
///
/// `NotConverged` is the state of a fresh result; every completed
/// `estimate` call replaces it with exactly one of the other variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverStatus {
    /// No terminating condition has been met yet.
    #[default]
    NotConverged,
    /// `|ValueNew - ValueCurrent| <= MinimumDeltaValue`.
    MinimumDeltaValueConverged,
    /// `||ParametersNew - ParametersCurrent||₂ <= MinimumDeltaParameters`.
    MinimumDeltaParametersConverged,
    /// The iteration history reached `MaximumIterations`.
    MaximumIterationsReached,
}

impl SolverStatus {
    /// True for the two delta-convergence outcomes.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            SolverStatus::MinimumDeltaValueConverged | SolverStatus::MinimumDeltaParametersConverged
        )
    }

    /// True once any terminating condition has been recorded.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SolverStatus::NotConverged)
    }

    /// Return the status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverStatus::NotConverged => "NotConverged",
            SolverStatus::MinimumDeltaValueConverged => "MinimumDeltaValueConverged",
            SolverStatus::MinimumDeltaParametersConverged => "MinimumDeltaParametersConverged",
            SolverStatus::MaximumIterationsReached => "MaximumIterationsReached",
        }
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
