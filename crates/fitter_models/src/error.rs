//! Model error types.

use thiserror::Error;

/// Errors raised while building curves, instruments or collections.
///
/// # Variants
/// - `InsufficientPillars`: Curve has no pillars
/// - `InvalidPillar`: Pillar is non-positive, non-finite or out of order
/// - `InvalidInstrument`: Instrument terms failed validation
/// - `UnknownInstrument`: No instrument under the given key
/// - `ParameterLengthMismatch`: Parameter vector does not match the curve
///
/// # Examples
/// ```
/// use fitter_models::ModelError;
///
/// let err = ModelError::UnknownInstrument("UST 2Y".to_string());
/// assert!(format!("{}", err).contains("UST 2Y"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Curve needs at least `need` pillars.
    #[error("Insufficient pillars: got {got}, need at least {need}")]
    InsufficientPillars {
        /// Number supplied
        got: usize,
        /// Minimum required
        need: usize,
    },

    /// Pillar at `index` is invalid.
    #[error("Invalid pillar at index {index}: t = {t}")]
    InvalidPillar {
        /// Position of the offending pillar
        index: usize,
        /// Its value in years
        t: f64,
    },

    /// Instrument terms are invalid.
    #[error("Invalid instrument {key}: {reason}")]
    InvalidInstrument {
        /// Instrument key
        key: String,
        /// What is wrong
        reason: String,
    },

    /// Instrument key is not in the collection.
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// Parameter vector length differs from the number of curve nodes.
    #[error("Parameter length mismatch: expected {expected}, got {got}")]
    ParameterLengthMismatch {
        /// Number of curve nodes
        expected: usize,
        /// Length supplied
        got: usize,
    },
}

impl ModelError {
    /// Create an invalid instrument error.
    pub fn invalid_instrument(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInstrument {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pillar_display() {
        let err = ModelError::InvalidPillar { index: 2, t: -1.0 };
        assert_eq!(format!("{}", err), "Invalid pillar at index 2: t = -1");
    }

    #[test]
    fn test_invalid_instrument_helper() {
        let err = ModelError::invalid_instrument("B1", "maturity must be positive");
        assert!(format!("{}", err).contains("B1: maturity must be positive"));
    }
}
