//! Least-squares solvers and the fitting-state record they mutate.
//!
//! ## Components
//!
//! - [`SolverOptions`]: convergence thresholds and box constraints, immutable per run
//! - [`SolverResult`]: the caller-owned fitting state, with its
//!   [`IterationHistory`] and [`CalculationProfile`]
//! - [`check_termination`] / [`should_terminate`]: the termination test shared
//!   by every variant
//! - [`Solver`]: the estimate capability; [`FittingSolver`] selects a variant
//!   by [`SolverKind`] at runtime
//! - [`LevenbergMarquardt`]: the implemented variant, configured by [`LMConfig`]
//!
//! ## Example
//!
//! ```
//! use fitter_core::objective::FiniteDifferenceProvider;
//! use fitter_core::solvers::{FittingSolver, Solver, SolverKind, SolverOptions, SolverResult};
//! use nalgebra::DVector;
//!
//! let provider = FiniteDifferenceProvider::new(|p: &DVector<f64>| {
//!     DVector::from_vec(vec![p[0] - 1.0, 2.0 * (p[1] + 1.0)])
//! });
//!
//! let solver: FittingSolver = "levenberg-marquardt".parse::<SolverKind>()
//!     .map(FittingSolver::from_kind)
//!     .unwrap();
//! let mut result = SolverResult::new();
//! solver
//!     .estimate(&provider, &DVector::zeros(2), &SolverOptions::default(), &mut result)
//!     .unwrap();
//!
//! assert!((result.parameters_current[1] + 1.0).abs() < 1e-4);
//! println!("{}", result);
//! ```

mod history;
mod kind;
mod levenberg_marquardt;
mod options;
mod profile;
mod result;
mod status;
mod termination;

pub use history::IterationHistory;
pub use kind::{FittingSolver, Solver, SolverKind};
pub use levenberg_marquardt::{phase, LMConfig, LevenbergMarquardt};
pub use options::SolverOptions;
pub use profile::{CalculationProfile, PhaseTimer};
pub use result::SolverResult;
pub use status::SolverStatus;
pub use termination::{check_termination, should_terminate};
