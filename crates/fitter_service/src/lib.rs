//! # fitter_service: Continuous Re-Fitting
//!
//! ## Layer 3 (Service) Role
//!
//! A single worker task owns the fittable collection and the current fitting
//! parameters. Every change arrives as a [`FitEvent`] on one channel, so
//! solver runs are serialised by construction and the live fitting state is
//! never shared. Each successful fit is published as an immutable
//! `Arc<SolverResult>` snapshot that any number of readers can hold.
//!
//! ## Example
//!
//! ```
//! use fitter_core::solvers::{LMConfig, SolverOptions};
//! use fitter_models::{FittableCollection, FixedRateBond, NodeYieldCurve};
//! use fitter_service::{FitterService, ServiceConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let curve = NodeYieldCurve::new(vec![2.0]).unwrap();
//! let initial = curve.flat_yields(0.05);
//! let service = FitterService::spawn(
//!     FittableCollection::new(curve),
//!     initial,
//!     SolverOptions::default(),
//!     ServiceConfig::default().with_solver(LMConfig::new(1e-3, 10.0)),
//! )
//! .unwrap();
//!
//! let handle = service.handle();
//! handle
//!     .add_instrument(FixedRateBond::new("2Y", 2.0, 0.04, 2).unwrap())
//!     .unwrap();
//! handle.update_price("2Y", 99.9, 100.1).unwrap();
//!
//! let result = handle.fit().await.unwrap();
//! assert!(result.status.is_terminal());
//! assert!(handle.latest().is_some());
//!
//! service.shutdown().await.unwrap();
//! # }
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod event;
pub mod service;

pub use error::ServiceError;
pub use event::FitEvent;
pub use service::{FitterHandle, FitterService, ServiceConfig};
