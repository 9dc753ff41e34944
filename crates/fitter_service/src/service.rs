//! The fitting worker and its handle.

use crate::error::ServiceError;
use crate::event::FitEvent;
use fitter_core::solvers::{LMConfig, LevenbergMarquardt, Solver, SolverOptions, SolverResult};
use fitter_core::CancellationToken;
use fitter_models::{FittableCollection, FixedRateBond};
use nalgebra::DVector;
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Latest published fit, if any.
pub type Snapshot = Option<Arc<SolverResult>>;

/// Worker configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Damping schedule of the Levenberg-Marquardt solver.
    pub solver: LMConfig,
    /// Refit automatically after input changes. Bursts of changes queued
    /// together trigger a single refit.
    pub refit_on_update: bool,
}

impl ServiceConfig {
    /// Sets the solver configuration.
    pub fn with_solver(mut self, solver: LMConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Enables or disables automatic refits.
    pub fn with_refit_on_update(mut self, enabled: bool) -> Self {
        self.refit_on_update = enabled;
        self
    }
}

/// Cloneable handle for sending events to the worker and reading its results.
#[derive(Debug, Clone)]
pub struct FitterHandle {
    events: mpsc::UnboundedSender<FitEvent>,
    results: watch::Receiver<Snapshot>,
    cancellation: CancellationToken,
}

impl FitterHandle {
    fn send(&self, event: FitEvent) -> Result<(), ServiceError> {
        self.events
            .send(event)
            .map_err(|_| ServiceError::WorkerStopped)
    }

    /// Queue an instrument for addition.
    pub fn add_instrument(&self, bond: FixedRateBond) -> Result<(), ServiceError> {
        self.send(FitEvent::AddInstrument(bond))
    }

    /// Queue removal of the instrument under `key`.
    pub fn remove_instrument(&self, key: impl Into<String>) -> Result<(), ServiceError> {
        self.send(FitEvent::RemoveInstrument(key.into()))
    }

    /// Queue a two-sided quote update.
    pub fn update_price(&self, key: impl Into<String>, bid: f64, ask: f64) -> Result<(), ServiceError> {
        self.send(FitEvent::Price {
            key: key.into(),
            bid: Some(bid),
            ask: Some(ask),
        })
    }

    /// Queue a bid update.
    pub fn update_bid(&self, key: impl Into<String>, bid: f64) -> Result<(), ServiceError> {
        self.send(FitEvent::Price {
            key: key.into(),
            bid: Some(bid),
            ask: None,
        })
    }

    /// Queue an ask update.
    pub fn update_ask(&self, key: impl Into<String>, ask: f64) -> Result<(), ServiceError> {
        self.send(FitEvent::Price {
            key: key.into(),
            bid: None,
            ask: Some(ask),
        })
    }

    /// Queue new starting parameters.
    pub fn set_parameters(&self, parameters: DVector<f64>) -> Result<(), ServiceError> {
        self.send(FitEvent::FittingParameters(parameters))
    }

    /// Fit after every previously queued event has been applied.
    pub async fn fit(&self) -> Result<Arc<SolverResult>, ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.send(FitEvent::Fit(tx))?;
        rx.await.map_err(|_| ServiceError::WorkerStopped)?
    }

    /// Receiver notified on every published fit.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.results.clone()
    }

    /// Most recently published fit.
    pub fn latest(&self) -> Snapshot {
        self.results.borrow().clone()
    }

    /// Cancel any running fit and stop the worker.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.cancellation.cancel();
        let (tx, rx) = oneshot::channel();
        self.send(FitEvent::Shutdown(tx))?;
        rx.await.map_err(|_| ServiceError::WorkerStopped)
    }
}

/// The running re-fitting service.
#[derive(Debug)]
pub struct FitterService {
    handle: FitterHandle,
    worker: JoinHandle<()>,
}

impl FitterService {
    /// Start the worker on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if `initial_parameters` does not match the collection's curve,
    /// or if `options` or the solver configuration are invalid.
    pub fn spawn(
        collection: FittableCollection,
        initial_parameters: DVector<f64>,
        options: SolverOptions,
        config: ServiceConfig,
    ) -> Result<Self, ServiceError> {
        collection.check_parameters(&initial_parameters)?;
        options.validate(initial_parameters.len())?;
        config.solver.validate()?;

        let cancellation = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = watch::channel(None);

        let worker = Worker {
            collection,
            parameters: initial_parameters,
            options,
            solver: LevenbergMarquardt::new(config.solver).with_cancellation(cancellation.clone()),
            publisher: results_tx,
            refit_on_update: config.refit_on_update,
        };

        info!(
            instruments = worker.collection.len(),
            nodes = worker.parameters.len(),
            refit_on_update = worker.refit_on_update,
            "Starting fitter worker"
        );

        Ok(Self {
            handle: FitterHandle {
                events: events_tx,
                results: results_rx,
                cancellation,
            },
            worker: tokio::spawn(worker.run(events_rx)),
        })
    }

    /// A new handle to the worker.
    pub fn handle(&self) -> FitterHandle {
        self.handle.clone()
    }

    /// Stop the worker and wait for its task to finish.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        self.handle.shutdown().await?;
        self.worker
            .await
            .map_err(|e| ServiceError::TaskFailed(e.to_string()))
    }
}

/// Owner of the fitting inputs; lives inside the worker task.
struct Worker {
    collection: FittableCollection,
    parameters: DVector<f64>,
    options: SolverOptions,
    solver: LevenbergMarquardt,
    publisher: watch::Sender<Snapshot>,
    refit_on_update: bool,
}

impl Worker {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<FitEvent>) {
        let mut refit_pending = false;

        loop {
            let event = if refit_pending {
                match events.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) => {
                        refit_pending = false;
                        self.refit().await;
                        continue;
                    }
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match events.recv().await {
                    Some(event) => event,
                    None => break,
                }
            };

            debug!(event = event.name(), "Fitter event");
            if event.changes_inputs() {
                self.apply(event);
                refit_pending |= self.refit_on_update;
                continue;
            }

            match event {
                FitEvent::Fit(responder) => {
                    refit_pending = false;
                    let outcome = self.fit().await;
                    if responder.send(outcome).is_err() {
                        debug!("Fit requester went away");
                    }
                }
                FitEvent::Shutdown(ack) => {
                    info!("Fitter worker stopping");
                    let _ = ack.send(());
                    return;
                }
                _ => {}
            }
        }

        info!("Fitter worker stopped: all handles dropped");
    }

    fn apply(&mut self, event: FitEvent) {
        match event {
            FitEvent::AddInstrument(bond) => {
                self.collection.add(bond);
            }
            FitEvent::RemoveInstrument(key) => {
                self.collection.remove(&key);
            }
            FitEvent::Price { key, bid, ask } => {
                let updated = match (bid, ask) {
                    (Some(bid), Some(ask)) => self.collection.update_bid_ask(&key, bid, ask),
                    (Some(bid), None) => self.collection.update_bid(&key, bid),
                    (None, Some(ask)) => self.collection.update_ask(&key, ask),
                    (None, None) => Ok(()),
                };
                if let Err(err) = updated {
                    warn!(error = %err, "Ignoring price update");
                }
            }
            FitEvent::FittingParameters(parameters) => {
                self.parameters = parameters;
            }
            FitEvent::Fit(_) | FitEvent::Shutdown(_) => {}
        }
    }

    async fn refit(&mut self) {
        match self.fit().await {
            Ok(_) => {}
            Err(ServiceError::NoFittableValues) => debug!("Skipping refit: no fittable values"),
            Err(err) => warn!(error = %err, "Refit failed"),
        }
    }

    /// Run one estimate off the async runtime and publish the outcome.
    ///
    /// A successful fit warm-starts the next one from its accepted parameters.
    /// On failure the previously published snapshot is left in place.
    async fn fit(&mut self) -> Result<Arc<SolverResult>, ServiceError> {
        if !self.collection.has_fittable_values() {
            return Err(ServiceError::NoFittableValues);
        }
        self.collection.check_parameters(&self.parameters)?;

        let collection = self.collection.clone();
        let initial = self.parameters.clone();
        let options = self.options.clone();
        let solver = self.solver.clone();

        let (outcome, result) = tokio::task::spawn_blocking(move || {
            let mut result = SolverResult::new();
            let outcome = solver.estimate(&collection, &initial, &options, &mut result);
            (outcome, result)
        })
        .await
        .map_err(|e| ServiceError::TaskFailed(e.to_string()))?;

        if let Err(err) = outcome {
            warn!(error = %err, iterations = result.iterations(), "Fit failed");
            return Err(err.into());
        }

        self.parameters.copy_from(&result.parameters_current);
        let snapshot = Arc::new(result);
        self.publisher.send_replace(Some(Arc::clone(&snapshot)));

        info!(
            status = %snapshot.status,
            iterations = snapshot.iterations(),
            value = snapshot.value_current,
            "Published fit"
        );
        Ok(snapshot)
    }
}
