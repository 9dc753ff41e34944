//! Fixed-rate bonds priced off a [`NodeYieldCurve`].
//!
//! Cash flows are generated backwards from maturity at `1/frequency` year
//! spacing; a frequency of zero gives a zero-coupon bond. Prices are quoted
//! clean per `face`, and the market quote used for fitting is the bid/ask mid.

use crate::curve::NodeYieldCurve;
use crate::error::ModelError;
use nalgebra::DVector;

/// Cash flows closer to today than this are treated as already paid.
const SETTLED_EPSILON: f64 = 1e-9;

/// Coupon frequencies accepted by [`FixedRateBond::new`].
pub const SUPPORTED_FREQUENCIES: [u32; 5] = [0, 1, 2, 4, 12];

/// A single payment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CashFlow {
    /// Payment time in years.
    pub time: f64,
    /// Payment amount.
    pub amount: f64,
}

/// Bullet bond paying a fixed coupon.
///
/// Bid and ask start unset; the bond has fittable values only once both are
/// quoted.
///
/// # Example
///
/// ```
/// use fitter_models::{FixedRateBond, NodeYieldCurve};
///
/// let curve = NodeYieldCurve::new(vec![1.0, 10.0]).unwrap();
/// let bond = FixedRateBond::new("UST 4% 2Y", 2.0, 0.04, 2)
///     .unwrap()
///     .with_prices(99.5, 99.7);
///
/// assert_eq!(bond.cash_flows().len(), 4);
/// assert!((bond.mid().unwrap() - 99.6).abs() < 1e-12);
///
/// // Priced at its own coupon rate on a flat curve, the bond is near par.
/// let price = bond.clean_price(&curve, &curve.flat_yields(0.04));
/// assert!((price - 100.0).abs() < 0.1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedRateBond {
    key: String,
    maturity: f64,
    coupon_rate: f64,
    frequency: u32,
    face: f64,
    weight: f64,
    bid: Option<f64>,
    ask: Option<f64>,
}

impl FixedRateBond {
    /// Create a bond with face 100 and unit fitting weight.
    ///
    /// # Arguments
    ///
    /// * `key` - Unique instrument key
    /// * `maturity` - Time to maturity in years
    /// * `coupon_rate` - Annual coupon as a decimal (0.04 for 4%)
    /// * `frequency` - Coupons per year, one of [`SUPPORTED_FREQUENCIES`]
    ///
    /// # Errors
    ///
    /// `InvalidInstrument` if any term fails [`validate`](Self::validate).
    pub fn new(
        key: impl Into<String>,
        maturity: f64,
        coupon_rate: f64,
        frequency: u32,
    ) -> Result<Self, ModelError> {
        let bond = Self {
            key: key.into(),
            maturity,
            coupon_rate,
            frequency,
            face: 100.0,
            weight: 1.0,
            bid: None,
            ask: None,
        };
        bond.validate()?;
        Ok(bond)
    }

    /// Sets the face amount.
    pub fn with_face(mut self, face: f64) -> Self {
        self.face = face;
        self
    }

    /// Sets the residual weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Sets both quotes.
    pub fn with_prices(mut self, bid: f64, ask: f64) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    /// Validate the bond terms.
    pub fn validate(&self) -> Result<(), ModelError> {
        let fail = |reason: String| Err(ModelError::invalid_instrument(&self.key, reason));

        if self.key.trim().is_empty() {
            return fail("key must not be empty".to_string());
        }
        if !(self.maturity > 0.0 && self.maturity.is_finite()) {
            return fail(format!("maturity must be positive, got {}", self.maturity));
        }
        if !(self.coupon_rate >= 0.0 && self.coupon_rate.is_finite()) {
            return fail(format!(
                "coupon rate must be non-negative, got {}",
                self.coupon_rate
            ));
        }
        if !SUPPORTED_FREQUENCIES.contains(&self.frequency) {
            return fail(format!("unsupported coupon frequency {}", self.frequency));
        }
        if !(self.face > 0.0 && self.face.is_finite()) {
            return fail(format!("face must be positive, got {}", self.face));
        }
        if !(self.weight > 0.0 && self.weight.is_finite()) {
            return fail(format!("weight must be positive, got {}", self.weight));
        }
        Ok(())
    }

    /// Instrument key.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Time to maturity in years.
    #[inline]
    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    /// Annual coupon rate.
    #[inline]
    pub fn coupon_rate(&self) -> f64 {
        self.coupon_rate
    }

    /// Coupons per year.
    #[inline]
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Residual weight.
    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Bid quote.
    #[inline]
    pub fn bid(&self) -> Option<f64> {
        self.bid
    }

    /// Ask quote.
    #[inline]
    pub fn ask(&self) -> Option<f64> {
        self.ask
    }

    /// Update the bid quote.
    pub fn set_bid(&mut self, bid: f64) {
        self.bid = Some(bid);
    }

    /// Update the ask quote.
    pub fn set_ask(&mut self, ask: f64) {
        self.ask = Some(ask);
    }

    /// True once both sides are quoted.
    pub fn has_fittable_values(&self) -> bool {
        self.bid.is_some() && self.ask.is_some()
    }

    /// Mid quote, if both sides are present.
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(0.5 * (bid + ask)),
            _ => None,
        }
    }

    /// Ask minus bid, if both sides are present.
    pub fn bid_ask_spread(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    fn coupon_amount(&self) -> f64 {
        self.coupon_rate * self.face / self.frequency as f64
    }

    /// Remaining cash flows in ascending time order.
    pub fn cash_flows(&self) -> Vec<CashFlow> {
        if self.frequency == 0 {
            return vec![CashFlow {
                time: self.maturity,
                amount: self.face,
            }];
        }

        let period = 1.0 / self.frequency as f64;
        let coupon = self.coupon_amount();
        let mut flows = Vec::new();
        let mut k = 0usize;
        loop {
            let time = self.maturity - k as f64 * period;
            if time <= SETTLED_EPSILON {
                break;
            }
            let amount = if k == 0 { coupon + self.face } else { coupon };
            flows.push(CashFlow { time, amount });
            k += 1;
        }
        flows.reverse();
        flows
    }

    /// Coupon accrued since the last payment date.
    pub fn accrued_interest(&self) -> f64 {
        if self.frequency == 0 {
            return 0.0;
        }
        let period = 1.0 / self.frequency as f64;
        let first = self
            .cash_flows()
            .first()
            .map(|flow| flow.time)
            .unwrap_or(period);
        let elapsed = (period - first).max(0.0);
        self.coupon_amount() * elapsed / period
    }

    /// Present value of all remaining cash flows.
    pub fn dirty_price(&self, curve: &NodeYieldCurve, yields: &DVector<f64>) -> f64 {
        self.cash_flows()
            .iter()
            .map(|flow| flow.amount * curve.discount_factor(yields, flow.time))
            .sum()
    }

    /// Dirty price less accrued interest.
    pub fn clean_price(&self, curve: &NodeYieldCurve, yields: &DVector<f64>) -> f64 {
        self.dirty_price(curve, yields) - self.accrued_interest()
    }

    /// Derivative of the clean price with respect to each node yield.
    pub fn gradient(&self, curve: &NodeYieldCurve, yields: &DVector<f64>) -> DVector<f64> {
        let mut gradient = DVector::zeros(curve.len());
        for flow in self.cash_flows() {
            let sensitivity =
                -flow.time * flow.amount * curve.discount_factor(yields, flow.time);
            let ((lower, w_lower), (upper, w_upper)) = curve.weights(flow.time);
            gradient[lower] += w_lower * sensitivity;
            gradient[upper] += w_upper * sensitivity;
        }
        gradient
    }

    /// Weighted model-minus-market price; zero while the bond is unquoted.
    pub fn residual(&self, curve: &NodeYieldCurve, yields: &DVector<f64>) -> f64 {
        match self.mid() {
            Some(mid) => self.weight * (self.clean_price(curve, yields) - mid),
            None => 0.0,
        }
    }
}
