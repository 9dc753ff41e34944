//! Mutable fitting state.
//!
//! [`SolverResult`] is owned by the caller and mutated in place by
//! `estimate`. It carries the accepted and candidate parameter vectors, their
//! objective values, the iteration history, the per-phase profile, the
//! termination status and the wall-clock bookkeeping of the run.
//!
//! Publishing a result to other threads goes through
//! [`snapshot`](SolverResult::snapshot); the live value is never shared.

use super::history::IterationHistory;
use super::profile::CalculationProfile;
use super::status::SolverStatus;
use chrono::{DateTime, Local};
use nalgebra::DVector;
use std::fmt;
use std::time::Duration;

/// State of a fitting run.
///
/// # Invariants
///
/// - During a run `parameters_current.len() == parameters_new.len() == n`.
/// - `iteration_results` grows by one per completed iteration and only
///   shrinks through [`clear`](Self::clear).
/// - `status` is set exactly once per `estimate` call.
///
/// # Example
///
/// ```
/// use fitter_core::solvers::SolverResult;
/// use nalgebra::DVector;
///
/// let mut result = SolverResult::new();
/// result.parameters_current = DVector::from_vec(vec![1.0, 1.0]);
/// result.parameters_new = DVector::from_vec(vec![0.5, 0.5]);
/// result.value_current = 2.0;
/// result.value_new = 1.0;
///
/// assert!(result.value_change());
/// result.update_parameters();
/// assert_eq!(result.value_current, 1.0);
/// assert_eq!(result.parameters_current[0], 0.5);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverResult {
    /// Last accepted parameter estimate.
    pub parameters_current: DVector<f64>,

    /// Most recently computed candidate (may have been rejected).
    pub parameters_new: DVector<f64>,

    /// Objective value at `parameters_current`.
    pub value_current: f64,

    /// Objective value at `parameters_new`.
    pub value_new: f64,

    /// One entry per completed iteration: accepted parameters plus auxiliary scalars.
    pub iteration_results: IterationHistory,

    /// Cumulative time per computation phase.
    pub calculation_profile: CalculationProfile,

    /// Why the run stopped.
    pub status: SolverStatus,

    /// Wall-clock start of the run.
    pub start: Option<DateTime<Local>>,

    /// Wall-clock end of the run.
    pub stop: Option<DateTime<Local>>,

    /// Elapsed time of the run.
    pub fitting_time: Duration,
}

impl SolverResult {
    /// Create an empty fitting state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the empty state so the result can be reused for another run.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Deep copy for publication to other readers.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Number of recorded iterations.
    pub fn iterations(&self) -> usize {
        self.iteration_results.len()
    }

    /// Append `parameters_current` followed by `aux` to the history.
    pub fn save_iteration(&mut self, aux: &[f64]) {
        self.iteration_results.push(&self.parameters_current, aux);
    }

    /// True when the candidate improves on the accepted objective value.
    pub fn value_change(&self) -> bool {
        self.value_new < self.value_current
    }

    /// Absolute change in objective value between candidate and accepted state.
    pub fn value_delta(&self) -> f64 {
        (self.value_new - self.value_current).abs()
    }

    /// Euclidean norm of `parameters_new - parameters_current`.
    pub fn parameter_change_norm(&self) -> f64 {
        (&self.parameters_new - &self.parameters_current).norm()
    }

    /// Accept the candidate.
    pub fn update_parameters(&mut self) {
        self.value_current = self.value_new;
        self.parameters_current.copy_from(&self.parameters_new);
    }

    /// Clamp each component of the candidate into its bounds.
    ///
    /// Either side may be absent. A component at or below its lower bound is
    /// set to the lower bound; at or above its upper bound, to the upper bound.
    pub fn constrain(&mut self, lower: Option<&DVector<f64>>, upper: Option<&DVector<f64>>) {
        for i in 0..self.parameters_new.len() {
            if let Some(lower) = lower {
                if self.parameters_new[i] <= lower[i] {
                    self.parameters_new[i] = lower[i];
                }
            }
            if let Some(upper) = upper {
                if self.parameters_new[i] >= upper[i] {
                    self.parameters_new[i] = upper[i];
                }
            }
        }
    }

    /// Human-readable dump of the run.
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

fn format_vector(v: &DVector<f64>) -> String {
    let cells: Vec<String> = v.iter().map(|x| format!("{:.10}", x)).collect();
    format!("[{}]", cells.join(", "))
}

fn format_clock(stamp: &Option<DateTime<Local>>) -> String {
    stamp
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for SolverResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let iterations = self.iterations();
        writeln!(f, "Status = {}", self.status)?;
        writeln!(f, "Iterations = {}", iterations)?;
        writeln!(f, "Start = {}", format_clock(&self.start))?;
        writeln!(f, "Stop = {}", format_clock(&self.stop))?;
        writeln!(f, "FittingTime = {}ms", self.fitting_time.as_millis())?;
        for (phase, elapsed) in self.calculation_profile.iter() {
            let total_ms = elapsed.as_secs_f64() * 1e3;
            let per_iteration_ms = total_ms / iterations.max(1) as f64;
            writeln!(
                f,
                "    {} = {:.3}ms / {:.3}ms",
                phase, total_ms, per_iteration_ms
            )?;
        }
        writeln!(f, "ValueNew = {}", self.value_new)?;
        writeln!(f, "ValueCurrent = {}", self.value_current)?;
        writeln!(f, "ParametersNew = {}", format_vector(&self.parameters_new))?;
        writeln!(
            f,
            "ParametersCurrent = {}",
            format_vector(&self.parameters_current)
        )
    }
}
