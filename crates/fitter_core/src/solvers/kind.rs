//! Solver family: the capability trait and the closed set of variants.

use super::levenberg_marquardt::LevenbergMarquardt;
use super::options::SolverOptions;
use super::result::SolverResult;
use crate::error::SolverError;
use crate::objective::ObjectiveProvider;
use nalgebra::DVector;
use std::fmt;
use std::str::FromStr;

/// Algorithm variants known to the fitter.
///
/// Only [`SolverKind::LevenbergMarquardt`] has an implementation; the others
/// are recognised by name so configuration can refer to them, and fail with
/// [`SolverError::Unimplemented`] when asked to estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SolverKind {
    /// Normal equations without damping.
    Normal,
    /// QR-based least squares.
    Qr,
    /// SVD-based least squares.
    Svd,
    /// Gradient descent.
    SteepestDescent,
    /// Undamped Gauss-Newton.
    GaussNewton,
    /// Damped Gauss-Newton with Marquardt scaling.
    #[default]
    LevenbergMarquardt,
}

impl SolverKind {
    /// All variants in declaration order.
    pub const ALL: [SolverKind; 6] = [
        SolverKind::Normal,
        SolverKind::Qr,
        SolverKind::Svd,
        SolverKind::SteepestDescent,
        SolverKind::GaussNewton,
        SolverKind::LevenbergMarquardt,
    ];

    /// Kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Normal => "normal",
            SolverKind::Qr => "qr",
            SolverKind::Svd => "svd",
            SolverKind::SteepestDescent => "steepest-descent",
            SolverKind::GaussNewton => "gauss-newton",
            SolverKind::LevenbergMarquardt => "levenberg-marquardt",
        }
    }

    /// True when estimating with this kind does something.
    pub fn is_implemented(&self) -> bool {
        matches!(self, SolverKind::LevenbergMarquardt)
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_lowercase().replace('_', "-");
        SolverKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalised)
            .ok_or_else(|| format!("unknown solver kind: {}", s))
    }
}

/// Capability shared by every solver variant.
///
/// `estimate` mutates the caller-owned `result` in place and sets its status
/// exactly once. Termination is decided by
/// [`should_terminate`](super::should_terminate).
pub trait Solver {
    /// Which variant this is.
    fn kind(&self) -> SolverKind;

    /// Fit `initial` against `provider`, writing the run into `result`.
    ///
    /// # Errors
    ///
    /// Invalid input fails before the provider is called. Numerical failure
    /// and cancellation leave `result` holding the last accepted state.
    fn estimate<P: ObjectiveProvider + ?Sized>(
        &self,
        provider: &P,
        initial: &DVector<f64>,
        options: &SolverOptions,
        result: &mut SolverResult,
    ) -> Result<(), SolverError>;
}

/// A solver selected at runtime.
///
/// # Example
///
/// ```
/// use fitter_core::solvers::{FittingSolver, Solver, SolverKind, SolverOptions, SolverResult};
/// use fitter_core::objective::FiniteDifferenceProvider;
/// use fitter_core::SolverError;
/// use nalgebra::DVector;
///
/// let provider = FiniteDifferenceProvider::new(|p: &DVector<f64>| p.clone());
/// let solver = FittingSolver::from_kind(SolverKind::Qr);
/// let mut result = SolverResult::new();
///
/// let err = solver
///     .estimate(&provider, &DVector::zeros(1), &SolverOptions::default(), &mut result)
///     .unwrap_err();
/// assert_eq!(err, SolverError::Unimplemented(SolverKind::Qr));
/// ```
#[derive(Debug, Clone)]
pub enum FittingSolver {
    /// See [`SolverKind::Normal`].
    Normal,
    /// See [`SolverKind::Qr`].
    Qr,
    /// See [`SolverKind::Svd`].
    Svd,
    /// See [`SolverKind::SteepestDescent`].
    SteepestDescent,
    /// See [`SolverKind::GaussNewton`].
    GaussNewton,
    /// The implemented damped Gauss-Newton solver.
    LevenbergMarquardt(LevenbergMarquardt),
}

impl FittingSolver {
    /// Variant for `kind`, with the default configuration where one exists.
    pub fn from_kind(kind: SolverKind) -> Self {
        match kind {
            SolverKind::Normal => FittingSolver::Normal,
            SolverKind::Qr => FittingSolver::Qr,
            SolverKind::Svd => FittingSolver::Svd,
            SolverKind::SteepestDescent => FittingSolver::SteepestDescent,
            SolverKind::GaussNewton => FittingSolver::GaussNewton,
            SolverKind::LevenbergMarquardt => {
                FittingSolver::LevenbergMarquardt(LevenbergMarquardt::with_defaults())
            }
        }
    }
}

impl Default for FittingSolver {
    fn default() -> Self {
        FittingSolver::LevenbergMarquardt(LevenbergMarquardt::with_defaults())
    }
}

impl From<LevenbergMarquardt> for FittingSolver {
    fn from(solver: LevenbergMarquardt) -> Self {
        FittingSolver::LevenbergMarquardt(solver)
    }
}

impl Solver for FittingSolver {
    fn kind(&self) -> SolverKind {
        match self {
            FittingSolver::Normal => SolverKind::Normal,
            FittingSolver::Qr => SolverKind::Qr,
            FittingSolver::Svd => SolverKind::Svd,
            FittingSolver::SteepestDescent => SolverKind::SteepestDescent,
            FittingSolver::GaussNewton => SolverKind::GaussNewton,
            FittingSolver::LevenbergMarquardt(_) => SolverKind::LevenbergMarquardt,
        }
    }

    fn estimate<P: ObjectiveProvider + ?Sized>(
        &self,
        provider: &P,
        initial: &DVector<f64>,
        options: &SolverOptions,
        result: &mut SolverResult,
    ) -> Result<(), SolverError> {
        match self {
            FittingSolver::LevenbergMarquardt(solver) => {
                solver.estimate(provider, initial, options, result)
            }
            other => Err(SolverError::Unimplemented(other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::FiniteDifferenceProvider;

    // ========================================
    // SolverKind Tests
    // ========================================

    #[test]
    fn test_kind_display_and_parse() {
        for kind in SolverKind::ALL {
            assert_eq!(kind.to_string().parse::<SolverKind>(), Ok(kind));
        }
        assert_eq!("Levenberg_Marquardt".parse(), Ok(SolverKind::LevenbergMarquardt));
        assert_eq!("  SVD ".parse(), Ok(SolverKind::Svd));
        assert!("simplex".parse::<SolverKind>().is_err());
    }

    #[test]
    fn test_only_lm_is_implemented() {
        let implemented: Vec<_> = SolverKind::ALL
            .iter()
            .filter(|kind| kind.is_implemented())
            .collect();
        assert_eq!(implemented, vec![&SolverKind::LevenbergMarquardt]);
        assert_eq!(SolverKind::default(), SolverKind::LevenbergMarquardt);
    }

    // ========================================
    // FittingSolver Tests
    // ========================================

    #[test]
    fn test_from_kind_round_trips_kind() {
        for kind in SolverKind::ALL {
            assert_eq!(FittingSolver::from_kind(kind).kind(), kind);
        }
    }

    #[test]
    fn test_unimplemented_leaves_result_untouched() {
        let provider = FiniteDifferenceProvider::new(|p: &DVector<f64>| p.clone());
        let mut result = SolverResult::new();

        for kind in SolverKind::ALL.into_iter().filter(|k| !k.is_implemented()) {
            let err = FittingSolver::from_kind(kind)
                .estimate(
                    &provider,
                    &DVector::from_element(2, 1.0),
                    &SolverOptions::default(),
                    &mut result,
                )
                .unwrap_err();
            assert_eq!(err, SolverError::Unimplemented(kind));
            assert_eq!(result, SolverResult::default());
        }
    }

    #[test]
    fn test_dispatch_to_levenberg_marquardt() {
        let provider =
            FiniteDifferenceProvider::new(|p: &DVector<f64>| DVector::from_vec(vec![p[0] - 4.0]));
        let mut result = SolverResult::new();

        FittingSolver::default()
            .estimate(
                &provider,
                &DVector::zeros(1),
                &SolverOptions::default(),
                &mut result,
            )
            .unwrap();
        assert!(result.status.is_terminal());
        assert!((result.parameters_current[0] - 4.0).abs() < 1e-3);
    }
}
