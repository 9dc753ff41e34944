//! # Fitter Models (L2: Objective Providers)
//!
//! Concrete objective providers for yield-curve fitting.
//!
//! This crate provides:
//! - A node yield curve whose node yields are the fitted parameters
//! - Fixed-rate bonds priced off that curve, with analytic gradients
//! - The fittable instrument collection that turns a set of quoted bonds
//!   into residuals and a Jacobian for the solver
//!
//! ## Example
//!
//! ```
//! use fitter_core::solvers::{LevenbergMarquardt, Solver, SolverOptions, SolverResult};
//! use fitter_models::{FittableCollection, FixedRateBond, NodeYieldCurve};
//!
//! let curve = NodeYieldCurve::new(vec![1.0, 5.0]).unwrap();
//! let mut collection = FittableCollection::new(curve.clone());
//!
//! // Quote each bond at the price implied by a 3% flat curve.
//! let flat = curve.flat_yields(0.03);
//! for (key, maturity) in [("1Y", 1.0), ("3Y", 3.0), ("5Y", 5.0)] {
//!     let bond = FixedRateBond::new(key, maturity, 0.03, 1).unwrap();
//!     let price = bond.clean_price(&curve, &flat);
//!     collection.add(bond.with_prices(price - 0.05, price + 0.05));
//! }
//!
//! let mut result = SolverResult::new();
//! LevenbergMarquardt::with_defaults()
//!     .estimate(&collection, &curve.flat_yields(0.05), &SolverOptions::default(), &mut result)
//!     .unwrap();
//!
//! assert!((result.parameters_current[0] - 0.03).abs() < 1e-4);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod bond;
pub mod collection;
pub mod curve;
pub mod error;

pub use bond::{CashFlow, FixedRateBond};
pub use collection::{FittableCollection, PricingRow};
pub use curve::NodeYieldCurve;
pub use error::ModelError;
