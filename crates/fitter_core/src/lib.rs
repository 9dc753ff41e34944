//! # fitter_core: Least-Squares Fitting Kernel
//!
//! ## Layer 1 (Foundation) Role
//!
//! fitter_core is the bottom layer of the fitter workspace, providing:
//! - The objective-provider contract (`objective`)
//! - Solver options, the mutable fitting-state record and its diagnostics (`solvers`)
//! - The shared termination test and the Levenberg-Marquardt algorithm (`solvers`)
//! - Cooperative cancellation of long fits (`cancel`)
//! - Error types: `SolverError` (`error`)
//!
//! ## Dependencies
//!
//! - nalgebra: dense vectors, matrices and Cholesky factorisation
//! - chrono: wall-clock start/stop stamps on the fitting state
//! - thiserror: structured errors
//! - tracing: iteration logging
//! - serde: snapshot serialisation (optional, `serde` feature)
//!
//! ## Usage Example
//!
//! ```rust
//! use fitter_core::objective::FiniteDifferenceProvider;
//! use fitter_core::solvers::{LevenbergMarquardt, Solver, SolverOptions, SolverResult, SolverStatus};
//! use nalgebra::DVector;
//!
//! // Minimise (p0 - 2)^2 + (p1 - 3)^2
//! let provider = FiniteDifferenceProvider::new(|p: &DVector<f64>| {
//!     DVector::from_vec(vec![p[0] - 2.0, p[1] - 3.0])
//! });
//!
//! let options = SolverOptions::default();
//! let mut result = SolverResult::new();
//! let solver = LevenbergMarquardt::with_defaults();
//! solver
//!     .estimate(&provider, &DVector::zeros(2), &options, &mut result)
//!     .unwrap();
//!
//! assert!(result.status.is_converged());
//! assert!((result.parameters_current[0] - 2.0).abs() < 1e-4);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation of options, status and fitting results

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod cancel;
pub mod error;
pub mod objective;
pub mod solvers;

pub use cancel::CancellationToken;
pub use error::SolverError;
pub use objective::ObjectiveProvider;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancel::CancellationToken;
    pub use crate::error::SolverError;
    pub use crate::objective::*;
    pub use crate::solvers::*;
}
