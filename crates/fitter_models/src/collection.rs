//! The fittable instrument collection.
//!
//! Instruments are keyed by their instrument key and iterated in key order, so
//! residual `i` and Jacobian row `i` always refer to the same bond.

use crate::bond::FixedRateBond;
use crate::curve::NodeYieldCurve;
use crate::error::ModelError;
use fitter_core::objective::{half_sum_of_squares, ObjectiveProvider};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-bond comparison of market and model prices.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PricingRow {
    /// Instrument key.
    pub key: String,
    /// Time to maturity in years.
    pub maturity: f64,
    /// Bid/ask mid, if quoted.
    pub market_mid: Option<f64>,
    /// Clean model price.
    pub model_price: f64,
    /// Weighted model-minus-market residual.
    pub residual: f64,
}

/// Bonds fitted together against one node yield curve.
///
/// The node yields of the curve are the parameter vector; the collection is
/// an [`ObjectiveProvider`] with residual `i` equal to the weighted
/// model-minus-mid price of bond `i`.
#[derive(Debug, Clone)]
pub struct FittableCollection {
    curve: NodeYieldCurve,
    instruments: BTreeMap<String, FixedRateBond>,
}

impl FittableCollection {
    /// Create an empty collection fitted against `curve`.
    pub fn new(curve: NodeYieldCurve) -> Self {
        Self {
            curve,
            instruments: BTreeMap::new(),
        }
    }

    /// The curve whose node yields are fitted.
    #[inline]
    pub fn curve(&self) -> &NodeYieldCurve {
        &self.curve
    }

    /// Number of instruments.
    #[inline]
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// True if there are no instruments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Instrument under `key`.
    pub fn get(&self, key: &str) -> Option<&FixedRateBond> {
        self.instruments.get(key)
    }

    /// Instruments in key order.
    pub fn iter(&self) -> impl Iterator<Item = &FixedRateBond> {
        self.instruments.values()
    }

    /// Add `bond`; returns false if its key is already present.
    pub fn add(&mut self, bond: FixedRateBond) -> bool {
        if self.instruments.contains_key(bond.key()) {
            debug!(key = bond.key(), "Instrument already present");
            return false;
        }
        debug!(key = bond.key(), "Adding instrument");
        self.instruments.insert(bond.key().to_string(), bond);
        true
    }

    /// Remove the instrument under `key`, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<FixedRateBond> {
        let removed = self.instruments.remove(key);
        match &removed {
            Some(_) => debug!(key, "Removed instrument"),
            None => debug!(key, "No instrument to remove"),
        }
        removed
    }

    fn instrument_mut(&mut self, key: &str) -> Result<&mut FixedRateBond, ModelError> {
        self.instruments
            .get_mut(key)
            .ok_or_else(|| ModelError::UnknownInstrument(key.to_string()))
    }

    /// Update the bid of `key`.
    pub fn update_bid(&mut self, key: &str, bid: f64) -> Result<(), ModelError> {
        self.instrument_mut(key)?.set_bid(bid);
        Ok(())
    }

    /// Update the ask of `key`.
    pub fn update_ask(&mut self, key: &str, ask: f64) -> Result<(), ModelError> {
        self.instrument_mut(key)?.set_ask(ask);
        Ok(())
    }

    /// Update both quotes of `key`.
    pub fn update_bid_ask(&mut self, key: &str, bid: f64, ask: f64) -> Result<(), ModelError> {
        let bond = self.instrument_mut(key)?;
        bond.set_bid(bid);
        bond.set_ask(ask);
        Ok(())
    }

    /// True when the collection is non-empty and every bond is quoted.
    pub fn has_fittable_values(&self) -> bool {
        if self.instruments.is_empty() {
            debug!("Collection is empty");
            return false;
        }
        match self.iter().find(|bond| !bond.has_fittable_values()) {
            Some(bond) => {
                debug!(key = bond.key(), "Instrument has no fittable values");
                false
            }
            None => true,
        }
    }

    /// Check that `parameters` has one entry per curve node.
    pub fn check_parameters(&self, parameters: &DVector<f64>) -> Result<(), ModelError> {
        self.curve.check_yields(parameters)
    }

    /// Market versus model prices at `parameters`, in key order.
    pub fn pricing_report(&self, parameters: &DVector<f64>) -> Result<Vec<PricingRow>, ModelError> {
        self.check_parameters(parameters)?;
        Ok(self
            .iter()
            .map(|bond| PricingRow {
                key: bond.key().to_string(),
                maturity: bond.maturity(),
                market_mid: bond.mid(),
                model_price: bond.clean_price(&self.curve, parameters),
                residual: bond.residual(&self.curve, parameters),
            })
            .collect())
    }
}

impl ObjectiveProvider for FittableCollection {
    fn objective_value(&self, parameters: &DVector<f64>) -> f64 {
        if parameters.len() != self.curve.len() {
            return f64::NAN;
        }
        half_sum_of_squares(&self.residual(parameters))
    }

    /// Row `i` is the weighted price gradient of bond `i`.
    ///
    /// A parameter vector of the wrong length yields a zero matrix with one
    /// column per node, which the solver rejects as a shape mismatch.
    fn jacobian(&self, parameters: &DVector<f64>) -> DMatrix<f64> {
        let mut jacobian = DMatrix::zeros(self.len(), self.curve.len());
        if parameters.len() != self.curve.len() {
            return jacobian;
        }
        for (i, bond) in self.iter().enumerate() {
            let gradient = bond.gradient(&self.curve, parameters) * bond.weight();
            jacobian.set_row(i, &gradient.transpose());
        }
        jacobian
    }

    fn residual(&self, parameters: &DVector<f64>) -> DVector<f64> {
        if parameters.len() != self.curve.len() {
            return DVector::from_element(self.len(), f64::NAN);
        }
        DVector::from_iterator(
            self.len(),
            self.iter().map(|bond| bond.residual(&self.curve, parameters)),
        )
    }
}
