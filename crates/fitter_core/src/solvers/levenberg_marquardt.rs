//! Levenberg-Marquardt nonlinear least-squares solver.
//!
//! # Algorithm
//!
//! Each iteration solves the damped normal equations with Marquardt's
//! diagonal scaling:
//!
//! ```text
//! H = JᵀJ
//! D = diag(H)
//! (H + λD) δ = Jᵀr
//! p_new = p - δ
//! ```
//!
//! where `J = ∂r/∂p` is supplied by the objective provider. A candidate that
//! lowers the objective is accepted and `λ` shrinks by `lambda_factor`;
//! otherwise the candidate is rejected and `λ` grows by the same factor.
//!
//! The damped system is factorised with Cholesky. A factorisation failure is
//! reported as [`SolverError::NotPositiveDefinite`] and is not retried.
//!
//! # Example
//!
//! ```
//! use fitter_core::objective::FiniteDifferenceProvider;
//! use fitter_core::solvers::{LevenbergMarquardt, Solver, SolverOptions, SolverResult};
//! use nalgebra::DVector;
//!
//! // Fit y = a * exp(-b * x) to exact data generated with a = 2, b = 0.5
//! let xs = [0.0, 0.5, 1.0, 1.5, 2.0, 3.0];
//! let provider = FiniteDifferenceProvider::new(move |p: &DVector<f64>| {
//!     DVector::from_iterator(
//!         xs.len(),
//!         xs.iter().map(|&x| p[0] * (-p[1] * x).exp() - 2.0 * (-0.5 * x).exp()),
//!     )
//! });
//!
//! let mut result = SolverResult::new();
//! LevenbergMarquardt::with_defaults()
//!     .estimate(
//!         &provider,
//!         &DVector::from_vec(vec![1.0, 1.0]),
//!         &SolverOptions::high_precision(),
//!         &mut result,
//!     )
//!     .unwrap();
//!
//! assert!((result.parameters_current[0] - 2.0).abs() < 1e-4);
//! assert!((result.parameters_current[1] - 0.5).abs() < 1e-4);
//! ```

use super::kind::{Solver, SolverKind};
use super::options::SolverOptions;
use super::profile::PhaseTimer;
use super::result::SolverResult;
use super::status::SolverStatus;
use super::termination::should_terminate;
use crate::cancel::CancellationToken;
use crate::error::SolverError;
use crate::objective::ObjectiveProvider;
use chrono::Local;
use nalgebra::{Cholesky, DMatrix, DVector};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Names of the timed phases, in the order they first appear in a profile.
pub mod phase {
    /// Whole iteration.
    pub const ITERATION: &str = "iteration";
    /// Provider Jacobian evaluation.
    pub const JACOBIAN: &str = "jacobian";
    /// Provider residual evaluation.
    pub const RESIDUAL: &str = "residual";
    /// `JᵀJ`.
    pub const HESSIAN: &str = "hessian";
    /// `diag(JᵀJ)`.
    pub const DIAGONAL: &str = "diagonal";
    /// `λD`.
    pub const SCALED_DIAGONAL: &str = "scaled_diagonal";
    /// `H + λD`.
    pub const HESSIAN_ADD_SCALED_DIAGONAL: &str = "hessian_add_scaled_diagonal";
    /// Cholesky factorisation.
    pub const CHOLESKY: &str = "cholesky";
    /// Back-substitution for the step.
    pub const STEP: &str = "step";
    /// `p - δ`.
    pub const SUBTRACT: &str = "subtract";
    /// Provider objective evaluation at the candidate.
    pub const OBJECTIVE_VALUE: &str = "objective_value";

    /// All phases in profile order.
    pub const ALL: [&str; 11] = [
        ITERATION,
        JACOBIAN,
        RESIDUAL,
        HESSIAN,
        DIAGONAL,
        SCALED_DIAGONAL,
        HESSIAN_ADD_SCALED_DIAGONAL,
        CHOLESKY,
        STEP,
        SUBTRACT,
        OBJECTIVE_VALUE,
    ];
}

/// Configuration for the Levenberg-Marquardt solver.
///
/// # Fields
///
/// * `lambda_initial` - Damping factor at the start of a run
/// * `lambda_factor` - Multiplier applied on rejection, divisor on acceptance
/// * `debug_calculations` - Emit `trace`-level dumps of the matrices
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LMConfig {
    /// Initial damping factor.
    pub lambda_initial: f64,
    /// Damping growth/shrink factor.
    pub lambda_factor: f64,
    /// Dump intermediate matrices at `trace` level.
    pub debug_calculations: bool,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            lambda_initial: 1e-3,
            lambda_factor: 10.0,
            debug_calculations: false,
        }
    }
}

impl LMConfig {
    /// Create a configuration with the given damping schedule.
    pub fn new(lambda_initial: f64, lambda_factor: f64) -> Self {
        Self {
            lambda_initial,
            lambda_factor,
            ..Default::default()
        }
    }

    /// Enable or disable matrix dumps.
    pub fn with_debug_calculations(mut self, enabled: bool) -> Self {
        self.debug_calculations = enabled;
        self
    }

    /// Validate the damping schedule.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` unless `lambda_initial > 0` and `lambda_factor > 1`,
    /// both finite.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(self.lambda_initial > 0.0 && self.lambda_initial.is_finite()) {
            return Err(SolverError::invalid_config(format!(
                "lambda_initial must be finite and positive, got {}",
                self.lambda_initial
            )));
        }
        if !(self.lambda_factor > 1.0 && self.lambda_factor.is_finite()) {
            return Err(SolverError::invalid_config(format!(
                "lambda_factor must be finite and greater than 1, got {}",
                self.lambda_factor
            )));
        }
        Ok(())
    }
}

/// Levenberg-Marquardt solver with Marquardt diagonal scaling.
///
/// The solver holds only its configuration and an optional cancellation
/// token; all run state lives in the caller's [`SolverResult`].
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LMConfig,
    cancellation: Option<CancellationToken>,
}

impl LevenbergMarquardt {
    /// Create a solver with the given configuration.
    pub fn new(config: LMConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Create a solver with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(LMConfig::default())
    }

    /// Check `token` at the top of every iteration.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }

    fn iterate<P: ObjectiveProvider + ?Sized>(
        &self,
        provider: &P,
        initial: &DVector<f64>,
        options: &SolverOptions,
        result: &mut SolverResult,
        timer: &mut PhaseTimer,
    ) -> Result<(), SolverError> {
        let n = initial.len();
        let factor = self.config.lambda_factor;
        let mut lambda = self.config.lambda_initial;

        result.status = SolverStatus::NotConverged;
        result.parameters_current = initial.clone();
        result.parameters_new = DVector::zeros(n);
        result.value_current = provider.objective_value(&result.parameters_current);
        let seed_value = result.value_current;
        result.save_iteration(&[seed_value, lambda]);

        loop {
            if self.is_cancelled() {
                warn!(iterations = result.iterations(), "Fitting cancelled");
                return Err(SolverError::Cancelled {
                    iterations: result.iterations(),
                });
            }

            timer.start(phase::ITERATION);

            let current = &result.parameters_current;
            let jacobian = timer.time(phase::JACOBIAN, || provider.jacobian(current));
            let residual = timer.time(phase::RESIDUAL, || provider.residual(current));

            if residual.is_empty() {
                return Err(SolverError::EmptyObservations);
            }
            if jacobian.nrows() != residual.len() {
                return Err(SolverError::dimension_mismatch(
                    "jacobian rows",
                    residual.len(),
                    jacobian.nrows(),
                ));
            }
            if jacobian.ncols() != n {
                return Err(SolverError::dimension_mismatch(
                    "jacobian columns",
                    n,
                    jacobian.ncols(),
                ));
            }

            let hessian = timer.time(phase::HESSIAN, || jacobian.tr_mul(&jacobian));
            let diagonal = timer.time(phase::DIAGONAL, || {
                DMatrix::from_diagonal(&hessian.diagonal())
            });
            let scaled_diagonal = timer.time(phase::SCALED_DIAGONAL, || &diagonal * lambda);
            let damped = timer.time(phase::HESSIAN_ADD_SCALED_DIAGONAL, || {
                &hessian + &scaled_diagonal
            });

            let cholesky = timer
                .time(phase::CHOLESKY, || Cholesky::new(damped))
                .ok_or(SolverError::NotPositiveDefinite {
                    iteration: result.iterations(),
                    lambda,
                })?;
            let step = timer.time(phase::STEP, || cholesky.solve(&jacobian.tr_mul(&residual)));
            let candidate = timer.time(phase::SUBTRACT, || current - &step);

            if self.config.debug_calculations {
                trace!(%jacobian, "Jacobian");
                trace!(%residual, "Residual");
                trace!(%hessian, "Hessian");
                trace!(%step, "Step");
                trace!(%candidate, "Candidate parameters");
            }

            result.parameters_new = candidate;
            if options.constrain {
                result.constrain(options.lower_bounds.as_ref(), options.upper_bounds.as_ref());
            }

            let candidate = &result.parameters_new;
            let value_new = timer.time(phase::OBJECTIVE_VALUE, || provider.objective_value(candidate));
            result.value_new = value_new;

            timer.stop(phase::ITERATION);

            if should_terminate(result, options) {
                break;
            }

            result.save_iteration(&[value_new, lambda]);

            if result.value_change() {
                debug!(
                    iteration = result.iterations(),
                    value_current = result.value_current,
                    value_new,
                    lambda,
                    "Step accepted"
                );
                result.update_parameters();
                lambda /= factor;
            } else {
                debug!(
                    iteration = result.iterations(),
                    value_current = result.value_current,
                    value_new,
                    lambda,
                    "Step rejected"
                );
                lambda *= factor;
            }
        }

        Ok(())
    }
}

impl Solver for LevenbergMarquardt {
    fn kind(&self) -> SolverKind {
        SolverKind::LevenbergMarquardt
    }

    fn estimate<P: ObjectiveProvider + ?Sized>(
        &self,
        provider: &P,
        initial: &DVector<f64>,
        options: &SolverOptions,
        result: &mut SolverResult,
    ) -> Result<(), SolverError> {
        self.config.validate()?;
        if initial.is_empty() {
            return Err(SolverError::EmptyParameters);
        }
        options.validate(initial.len())?;

        let clock = Instant::now();
        result.start = Some(Local::now());

        let mut timer = PhaseTimer::new();
        let outcome = self.iterate(provider, initial, options, result, &mut timer);

        result.stop = Some(Local::now());
        result.fitting_time = clock.elapsed();
        result.calculation_profile = timer.into_profile();

        match &outcome {
            Ok(()) => info!(
                status = %result.status,
                iterations = result.iterations(),
                value = result.value_current,
                elapsed_ms = result.fitting_time.as_millis() as u64,
                "Fitting finished"
            ),
            Err(err) => warn!(
                iterations = result.iterations(),
                error = %err,
                "Fitting failed"
            ),
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::FiniteDifferenceProvider;
    use approx::assert_relative_eq;

    fn quadratic() -> FiniteDifferenceProvider<impl Fn(&DVector<f64>) -> DVector<f64>> {
        FiniteDifferenceProvider::new(|p: &DVector<f64>| {
            DVector::from_vec(vec![p[0] - 2.0, p[1] - 3.0])
        })
    }

    struct FixedShape {
        rows: usize,
        cols: usize,
        residuals: usize,
    }

    impl ObjectiveProvider for FixedShape {
        fn objective_value(&self, _parameters: &DVector<f64>) -> f64 {
            1.0
        }

        fn jacobian(&self, _parameters: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_element(self.rows, self.cols, 1.0)
        }

        fn residual(&self, _parameters: &DVector<f64>) -> DVector<f64> {
            DVector::from_element(self.residuals, 1.0)
        }
    }

    // ========================================
    // LMConfig Tests
    // ========================================

    #[test]
    fn test_lm_config_default() {
        let config = LMConfig::default();
        assert_eq!(config.lambda_initial, 1e-3);
        assert_eq!(config.lambda_factor, 10.0);
        assert!(!config.debug_calculations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lm_config_validate() {
        assert!(LMConfig::new(0.0, 10.0).validate().is_err());
        assert!(LMConfig::new(1e-3, 1.0).validate().is_err());
        assert!(LMConfig::new(f64::NAN, 10.0).validate().is_err());
        assert!(LMConfig::new(1.0, 2.0).validate().is_ok());
    }

    // ========================================
    // Convergence Tests
    // ========================================

    #[test]
    fn test_lm_simple_quadratic() {
        let solver = LevenbergMarquardt::with_defaults();
        let mut result = SolverResult::new();

        solver
            .estimate(
                &quadratic(),
                &DVector::zeros(2),
                &SolverOptions::default(),
                &mut result,
            )
            .unwrap();

        assert!(result.status.is_converged());
        assert_relative_eq!(result.parameters_current[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(result.parameters_current[1], 3.0, epsilon = 1e-4);
        assert!(result.value_current < 1e-8);
    }

    #[test]
    fn test_lm_rosenbrock() {
        // r = [1 - x, 10(y - x²)]; minimum at (1, 1)
        let provider = FiniteDifferenceProvider::new(|p: &DVector<f64>| {
            DVector::from_vec(vec![1.0 - p[0], 10.0 * (p[1] - p[0] * p[0])])
        });
        let mut result = SolverResult::new();

        LevenbergMarquardt::with_defaults()
            .estimate(
                &provider,
                &DVector::from_vec(vec![-1.2, 1.0]),
                &SolverOptions::high_precision(),
                &mut result,
            )
            .unwrap();

        assert_relative_eq!(result.parameters_current[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(result.parameters_current[1], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_lm_already_at_optimum() {
        let mut result = SolverResult::new();
        LevenbergMarquardt::with_defaults()
            .estimate(
                &quadratic(),
                &DVector::from_vec(vec![2.0, 3.0]),
                &SolverOptions::default(),
                &mut result,
            )
            .unwrap();

        assert_eq!(result.status, SolverStatus::MinimumDeltaValueConverged);
        assert_eq!(result.iterations(), 1);
    }

    #[test]
    fn test_lm_records_timing_and_profile() {
        let mut result = SolverResult::new();
        LevenbergMarquardt::new(LMConfig::default().with_debug_calculations(true))
            .estimate(
                &quadratic(),
                &DVector::zeros(2),
                &SolverOptions::default(),
                &mut result,
            )
            .unwrap();

        assert!(result.start.is_some());
        assert!(result.stop.is_some());
        assert!(result.start <= result.stop);

        let names: Vec<&str> = result.calculation_profile.iter().map(|(n, _)| n).collect();
        assert_eq!(names, phase::ALL.to_vec());
    }

    #[test]
    fn test_lm_history_entries_carry_value_and_lambda() {
        let mut result = SolverResult::new();
        LevenbergMarquardt::with_defaults()
            .estimate(
                &quadratic(),
                &DVector::zeros(2),
                &SolverOptions::default(),
                &mut result,
            )
            .unwrap();

        let seed = result.iteration_results.get(0).unwrap();
        assert_eq!(seed.len(), 4);
        assert_eq!(seed[0], 0.0);
        assert_eq!(seed[1], 0.0);
        assert_relative_eq!(seed[2], 6.5, epsilon = 1e-12);
        assert_eq!(seed[3], 1e-3);
    }

    // ========================================
    // Error Tests
    // ========================================

    #[test]
    fn test_lm_empty_params() {
        let mut result = SolverResult::new();
        let err = LevenbergMarquardt::with_defaults()
            .estimate(
                &quadratic(),
                &DVector::zeros(0),
                &SolverOptions::default(),
                &mut result,
            )
            .unwrap_err();
        assert_eq!(err, SolverError::EmptyParameters);
        assert!(result.start.is_none());
    }

    #[test]
    fn test_lm_empty_residuals() {
        let provider = FixedShape {
            rows: 0,
            cols: 2,
            residuals: 0,
        };
        let mut result = SolverResult::new();
        let err = LevenbergMarquardt::with_defaults()
            .estimate(
                &provider,
                &DVector::zeros(2),
                &SolverOptions::default(),
                &mut result,
            )
            .unwrap_err();
        assert_eq!(err, SolverError::EmptyObservations);
    }

    #[test]
    fn test_lm_jacobian_shape_mismatch() {
        let provider = FixedShape {
            rows: 3,
            cols: 1,
            residuals: 3,
        };
        let mut result = SolverResult::new();
        let err = LevenbergMarquardt::with_defaults()
            .estimate(
                &provider,
                &DVector::zeros(2),
                &SolverOptions::default(),
                &mut result,
            )
            .unwrap_err();
        assert_eq!(err, SolverError::dimension_mismatch("jacobian columns", 2, 1));
        assert!(result.stop.is_some());
    }

    #[test]
    fn test_lm_invalid_options_rejected_before_run() {
        let mut result = SolverResult::new();
        let options = SolverOptions::default().with_bounds(DVector::zeros(3), DVector::zeros(3));
        let err = LevenbergMarquardt::with_defaults()
            .estimate(&quadratic(), &DVector::zeros(2), &options, &mut result)
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(result.iterations(), 0);
    }

    #[test]
    fn test_lm_not_positive_definite() {
        // Second parameter never enters the residual: its Hessian column is zero.
        let provider = FiniteDifferenceProvider::new(|p: &DVector<f64>| {
            DVector::from_vec(vec![p[0] - 1.0])
        });
        let mut result = SolverResult::new();
        let err = LevenbergMarquardt::with_defaults()
            .estimate(
                &provider,
                &DVector::zeros(2),
                &SolverOptions::default(),
                &mut result,
            )
            .unwrap_err();

        assert!(err.is_numerical());
        assert_eq!(result.parameters_current, DVector::zeros(2));
        assert_eq!(result.iterations(), 1);
    }

    // ========================================
    // Cancellation Tests
    // ========================================

    #[test]
    fn test_lm_cancelled_before_first_iteration() {
        let token = CancellationToken::new();
        token.cancel();

        let mut result = SolverResult::new();
        let err = LevenbergMarquardt::with_defaults()
            .with_cancellation(token)
            .estimate(
                &quadratic(),
                &DVector::from_vec(vec![1.0, 1.0]),
                &SolverOptions::default(),
                &mut result,
            )
            .unwrap_err();

        assert_eq!(err, SolverError::Cancelled { iterations: 1 });
        assert_eq!(result.parameters_current.as_slice(), &[1.0, 1.0]);
        assert_eq!(result.status, SolverStatus::NotConverged);
        assert!(result.stop.is_some());
    }
}
