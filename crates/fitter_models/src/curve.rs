//! Node yield curve.
//!
//! The curve is defined by its pillar times only; the yields at those
//! pillars are the fitted parameter vector and are passed in on every query.
//! Zero rates are interpolated linearly between nodes and held flat outside
//! the pillar range, and discount factors are `exp(-z(t)·t)`.

use crate::error::ModelError;
use nalgebra::DVector;

/// Yield curve with linear zero-rate interpolation between pillar nodes.
///
/// # Example
///
/// ```
/// use fitter_models::NodeYieldCurve;
/// use nalgebra::DVector;
///
/// let curve = NodeYieldCurve::new(vec![1.0, 2.0]).unwrap();
/// let yields = DVector::from_vec(vec![0.02, 0.04]);
///
/// assert!((curve.zero_rate(&yields, 1.5) - 0.03).abs() < 1e-12);
/// assert!((curve.zero_rate(&yields, 10.0) - 0.04).abs() < 1e-12);
/// assert!((curve.discount_factor(&yields, 2.0) - (-0.08f64).exp()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeYieldCurve {
    pillars: Vec<f64>,
}

impl NodeYieldCurve {
    /// Build a curve from pillar times in years.
    ///
    /// # Errors
    ///
    /// - `InsufficientPillars` when `pillars` is empty
    /// - `InvalidPillar` when a pillar is non-positive, non-finite or not
    ///   strictly greater than its predecessor
    pub fn new(pillars: Vec<f64>) -> Result<Self, ModelError> {
        if pillars.is_empty() {
            return Err(ModelError::InsufficientPillars { got: 0, need: 1 });
        }
        for (index, &t) in pillars.iter().enumerate() {
            let ordered = index == 0 || t > pillars[index - 1];
            if !(t > 0.0 && t.is_finite() && ordered) {
                return Err(ModelError::InvalidPillar { index, t });
            }
        }
        Ok(Self { pillars })
    }

    /// Pillar times in years.
    #[inline]
    pub fn pillars(&self) -> &[f64] {
        &self.pillars
    }

    /// Number of nodes (and of fitted parameters).
    #[inline]
    pub fn len(&self) -> usize {
        self.pillars.len()
    }

    /// Always false; a curve has at least one node.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pillars.is_empty()
    }

    /// Parameter vector with every node at `rate`.
    pub fn flat_yields(&self, rate: f64) -> DVector<f64> {
        DVector::from_element(self.len(), rate)
    }

    /// Check that `yields` has one entry per node.
    pub fn check_yields(&self, yields: &DVector<f64>) -> Result<(), ModelError> {
        if yields.len() != self.len() {
            return Err(ModelError::ParameterLengthMismatch {
                expected: self.len(),
                got: yields.len(),
            });
        }
        Ok(())
    }

    /// Interpolation weights at `t` as `((lower, w_lower), (upper, w_upper))`.
    ///
    /// The zero rate is `w_lower·y[lower] + w_upper·y[upper]`. Outside the
    /// pillar range both indices point at the boundary node.
    pub fn weights(&self, t: f64) -> ((usize, f64), (usize, f64)) {
        let last = self.len() - 1;
        if t <= self.pillars[0] {
            return ((0, 1.0), (0, 0.0));
        }
        if t >= self.pillars[last] {
            return ((last, 1.0), (last, 0.0));
        }

        // First pillar strictly greater than t; guaranteed in 1..=last here.
        let upper = self.pillars.partition_point(|&p| p <= t);
        let lower = upper - 1;
        let span = self.pillars[upper] - self.pillars[lower];
        let w_upper = (t - self.pillars[lower]) / span;
        ((lower, 1.0 - w_upper), (upper, w_upper))
    }

    /// Continuously compounded zero rate at `t`.
    ///
    /// `yields` must have one entry per node.
    pub fn zero_rate(&self, yields: &DVector<f64>, t: f64) -> f64 {
        let ((lower, w_lower), (upper, w_upper)) = self.weights(t);
        w_lower * yields[lower] + w_upper * yields[upper]
    }

    /// Discount factor `exp(-z(t)·t)` at `t`.
    pub fn discount_factor(&self, yields: &DVector<f64>, t: f64) -> f64 {
        (-self.zero_rate(yields, t) * t).exp()
    }
}
