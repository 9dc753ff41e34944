//! Events consumed by the fitting worker.

use crate::error::ServiceError;
use fitter_core::solvers::SolverResult;
use fitter_models::FixedRateBond;
use nalgebra::DVector;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Reply channel for an explicit fit request.
pub type FitResponder = oneshot::Sender<Result<Arc<SolverResult>, ServiceError>>;

/// A change to the fitting inputs, or a request to the worker.
#[derive(Debug)]
pub enum FitEvent {
    /// Add an instrument to the collection.
    AddInstrument(FixedRateBond),
    /// Remove the instrument with this key.
    RemoveInstrument(String),
    /// Update one or both quotes of an instrument.
    Price {
        /// Instrument key
        key: String,
        /// New bid, if changed
        bid: Option<f64>,
        /// New ask, if changed
        ask: Option<f64>,
    },
    /// Replace the starting parameters for the next fit.
    FittingParameters(DVector<f64>),
    /// Fit now and reply with the outcome.
    Fit(FitResponder),
    /// Stop the worker; the sender is signalled once it has exited its loop.
    Shutdown(oneshot::Sender<()>),
}

impl FitEvent {
    /// True for events that change the fitting inputs.
    pub fn changes_inputs(&self) -> bool {
        !matches!(self, FitEvent::Fit(_) | FitEvent::Shutdown(_))
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            FitEvent::AddInstrument(_) => "add_instrument",
            FitEvent::RemoveInstrument(_) => "remove_instrument",
            FitEvent::Price { .. } => "price",
            FitEvent::FittingParameters(_) => "fitting_parameters",
            FitEvent::Fit(_) => "fit",
            FitEvent::Shutdown(_) => "shutdown",
        }
    }
}
