//! Convergence options for a fitting run.

use crate::error::SolverError;
use nalgebra::DVector;

/// Convergence thresholds and bound constraints.
///
/// Immutable for the duration of an `estimate` call. The thresholds feed the
/// shared termination test; the bounds are only consulted when `constrain`
/// is set.
///
/// # Default Values
///
/// | Field | Default |
/// |-------|---------|
/// | `minimum_delta_value` | 1e-6 |
/// | `minimum_delta_parameters` | 1e-6 |
/// | `maximum_iterations` | 5000 |
/// | `constrain` | false |
///
/// # Example
///
/// ```
/// use fitter_core::solvers::SolverOptions;
/// use nalgebra::DVector;
///
/// let options = SolverOptions::default()
///     .with_maximum_iterations(200)
///     .with_bounds(DVector::from_element(2, 0.0), DVector::from_element(2, 1.0));
///
/// assert!(options.constrain);
/// assert!(options.validate(2).is_ok());
/// assert!(options.validate(3).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverOptions {
    /// Stop when the objective changes by no more than this.
    pub minimum_delta_value: f64,

    /// Stop when the Euclidean norm of the parameter change is no more than this.
    pub minimum_delta_parameters: f64,

    /// Stop once the iteration history holds this many entries.
    pub maximum_iterations: usize,

    /// Clamp each candidate into `[lower_bounds, upper_bounds]`.
    pub constrain: bool,

    /// Per-parameter lower bounds; `None` leaves the lower side open.
    pub lower_bounds: Option<DVector<f64>>,

    /// Per-parameter upper bounds; `None` leaves the upper side open.
    pub upper_bounds: Option<DVector<f64>>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            minimum_delta_value: 1e-6,
            minimum_delta_parameters: 1e-6,
            maximum_iterations: 5000,
            constrain: false,
            lower_bounds: None,
            upper_bounds: None,
        }
    }
}

impl SolverOptions {
    /// Create options with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with tight thresholds for near-exact fits.
    pub fn high_precision() -> Self {
        Self {
            minimum_delta_value: 1e-14,
            minimum_delta_parameters: 1e-12,
            ..Default::default()
        }
    }

    /// Sets the objective-change threshold.
    pub fn with_minimum_delta_value(mut self, threshold: f64) -> Self {
        self.minimum_delta_value = threshold;
        self
    }

    /// Sets the parameter-change threshold.
    pub fn with_minimum_delta_parameters(mut self, threshold: f64) -> Self {
        self.minimum_delta_parameters = threshold;
        self
    }

    /// Sets the iteration budget.
    pub fn with_maximum_iterations(mut self, maximum_iterations: usize) -> Self {
        self.maximum_iterations = maximum_iterations;
        self
    }

    /// Sets both bound vectors and enables clamping.
    pub fn with_bounds(mut self, lower: DVector<f64>, upper: DVector<f64>) -> Self {
        self.lower_bounds = Some(lower);
        self.upper_bounds = Some(upper);
        self.constrain = true;
        self
    }

    /// Sets the lower bounds only and enables clamping.
    pub fn with_lower_bounds(mut self, lower: DVector<f64>) -> Self {
        self.lower_bounds = Some(lower);
        self.constrain = true;
        self
    }

    /// Sets the upper bounds only and enables clamping.
    pub fn with_upper_bounds(mut self, upper: DVector<f64>) -> Self {
        self.upper_bounds = Some(upper);
        self.constrain = true;
        self
    }

    /// Validates the options against a parameter count `n`.
    ///
    /// # Errors
    ///
    /// - `InvalidOptions` for negative or non-finite thresholds, a zero
    ///   iteration budget, or crossed bounds
    /// - `DimensionMismatch` when a bound vector does not have length `n`
    pub fn validate(&self, n: usize) -> Result<(), SolverError> {
        if !(self.minimum_delta_value >= 0.0 && self.minimum_delta_value.is_finite()) {
            return Err(SolverError::invalid_options(format!(
                "minimum_delta_value must be finite and non-negative, got {}",
                self.minimum_delta_value
            )));
        }
        if !(self.minimum_delta_parameters >= 0.0 && self.minimum_delta_parameters.is_finite()) {
            return Err(SolverError::invalid_options(format!(
                "minimum_delta_parameters must be finite and non-negative, got {}",
                self.minimum_delta_parameters
            )));
        }
        if self.maximum_iterations == 0 {
            return Err(SolverError::invalid_options("maximum_iterations must be > 0"));
        }

        if !self.constrain {
            return Ok(());
        }

        if let Some(lower) = &self.lower_bounds {
            if lower.len() != n {
                return Err(SolverError::dimension_mismatch("lower bounds", n, lower.len()));
            }
        }
        if let Some(upper) = &self.upper_bounds {
            if upper.len() != n {
                return Err(SolverError::dimension_mismatch("upper bounds", n, upper.len()));
            }
        }
        if let (Some(lower), Some(upper)) = (&self.lower_bounds, &self.upper_bounds) {
            if let Some(i) = (0..n).find(|&i| lower[i] > upper[i]) {
                return Err(SolverError::invalid_options(format!(
                    "lower bound {} exceeds upper bound {} at index {}",
                    lower[i], upper[i], i
                )));
            }
        }

        Ok(())
    }
}
