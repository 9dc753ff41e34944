//! Objective provider contract.
//!
//! The solver never evaluates prices itself: everything it knows about the
//! problem comes through [`ObjectiveProvider`]. A provider is a pure function
//! of the parameter vector returning
//!
//! - the scalar cost, conventionally `0.5 * Σ rᵢ²`,
//! - the residual vector `r(p)`, one entry per observation,
//! - the Jacobian `J = ∂r/∂p` with shape `observations × n`.
//!
//! Because `J` is the derivative of `r` (not of `-r`), the Gauss-Newton step
//! is `p - (JᵗJ)⁻¹ Jᵗ r`.

use nalgebra::{DMatrix, DVector};

/// Source of objective value, residuals and Jacobian for a fitting run.
///
/// Implementations must be deterministic: the solver may evaluate the same
/// parameter vector more than once and relies on getting the same answer.
pub trait ObjectiveProvider {
    /// Total cost at `parameters`.
    fn objective_value(&self, parameters: &DVector<f64>) -> f64;

    /// Jacobian of the residuals at `parameters` (observations × n).
    fn jacobian(&self, parameters: &DVector<f64>) -> DMatrix<f64>;

    /// Signed residual per observation at `parameters`.
    fn residual(&self, parameters: &DVector<f64>) -> DVector<f64>;
}

impl<T: ObjectiveProvider + ?Sized> ObjectiveProvider for &T {
    fn objective_value(&self, parameters: &DVector<f64>) -> f64 {
        (**self).objective_value(parameters)
    }

    fn jacobian(&self, parameters: &DVector<f64>) -> DMatrix<f64> {
        (**self).jacobian(parameters)
    }

    fn residual(&self, parameters: &DVector<f64>) -> DVector<f64> {
        (**self).residual(parameters)
    }
}

/// Half the sum of squared residuals.
#[inline]
pub fn half_sum_of_squares(residual: &DVector<f64>) -> f64 {
    0.5 * residual.norm_squared()
}

/// Objective provider built from a residual closure.
///
/// The Jacobian is approximated with forward differences using the step
/// `h = sqrt(ε) * max(|pⱼ|, 1)`, and the cost is `0.5 * ||r||²`.
///
/// # Example
///
/// ```
/// use fitter_core::objective::{FiniteDifferenceProvider, ObjectiveProvider};
/// use nalgebra::DVector;
///
/// let provider = FiniteDifferenceProvider::new(|p: &DVector<f64>| {
///     DVector::from_vec(vec![2.0 * p[0] + 3.0 * p[1]])
/// });
///
/// let j = provider.jacobian(&DVector::from_vec(vec![1.0, 1.0]));
/// assert!((j[(0, 0)] - 2.0).abs() < 1e-6);
/// assert!((j[(0, 1)] - 3.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct FiniteDifferenceProvider<F> {
    residuals: F,
}

impl<F> FiniteDifferenceProvider<F>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    /// Wrap a residual function.
    pub fn new(residuals: F) -> Self {
        Self { residuals }
    }
}

impl<F> ObjectiveProvider for FiniteDifferenceProvider<F>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    fn objective_value(&self, parameters: &DVector<f64>) -> f64 {
        half_sum_of_squares(&(self.residuals)(parameters))
    }

    fn jacobian(&self, parameters: &DVector<f64>) -> DMatrix<f64> {
        let r0 = (self.residuals)(parameters);
        let eps = f64::EPSILON.sqrt();
        let mut jacobian = DMatrix::zeros(r0.len(), parameters.len());

        for j in 0..parameters.len() {
            let h = eps * parameters[j].abs().max(1.0);
            let mut bumped = parameters.clone();
            bumped[j] += h;
            let r_plus = (self.residuals)(&bumped);
            jacobian.set_column(j, &((r_plus - &r0) / h));
        }

        jacobian
    }

    fn residual(&self, parameters: &DVector<f64>) -> DVector<f64> {
        (self.residuals)(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // Finite Difference Tests
    // ========================================

    #[test]
    fn test_jacobian_linear() {
        let provider = FiniteDifferenceProvider::new(|p: &DVector<f64>| {
            DVector::from_vec(vec![2.0 * p[0] + 3.0 * p[1], p[0] - p[1]])
        });

        let j = provider.jacobian(&DVector::from_vec(vec![1.0, 1.0]));
        assert_eq!(j.shape(), (2, 2));
        assert_relative_eq!(j[(0, 0)], 2.0, epsilon = 1e-6);
        assert_relative_eq!(j[(0, 1)], 3.0, epsilon = 1e-6);
        assert_relative_eq!(j[(1, 0)], 1.0, epsilon = 1e-6);
        assert_relative_eq!(j[(1, 1)], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_jacobian_quadratic() {
        let provider =
            FiniteDifferenceProvider::new(|p: &DVector<f64>| DVector::from_vec(vec![p[0] * p[0]]));

        let j = provider.jacobian(&DVector::from_vec(vec![3.0]));
        assert_relative_eq!(j[(0, 0)], 6.0, epsilon = 1e-4);
    }

    #[test]
    fn test_objective_is_half_sum_of_squares() {
        let provider = FiniteDifferenceProvider::new(|p: &DVector<f64>| {
            DVector::from_vec(vec![p[0] - 1.0, p[1] - 2.0])
        });

        let value = provider.objective_value(&DVector::from_vec(vec![0.0, 0.0]));
        assert_relative_eq!(value, 2.5);
    }

    #[test]
    fn test_provider_by_reference() {
        let provider =
            FiniteDifferenceProvider::new(|p: &DVector<f64>| DVector::from_vec(vec![p[0]]));
        let borrowed: &dyn ObjectiveProvider = &provider;

        let p = DVector::from_vec(vec![4.0]);
        assert_relative_eq!((&borrowed).objective_value(&p), 8.0);
        assert_eq!((&borrowed).residual(&p).len(), 1);
    }

    #[test]
    fn test_half_sum_of_squares() {
        let r = DVector::from_vec(vec![3.0, 4.0]);
        assert_relative_eq!(half_sum_of_squares(&r), 12.5);
    }
}
