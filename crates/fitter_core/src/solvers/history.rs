//! Append-only iteration history.

use nalgebra::DVector;

/// Ordered record of solver iterations.
///
/// Each entry holds the last accepted parameter vector followed by the
/// auxiliary scalars saved with it (objective value and damping factor for
/// Levenberg-Marquardt), so every entry has length `n + k`.
///
/// The history only grows; [`clear`](Self::clear) is the sole way to shrink it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterationHistory {
    entries: Vec<DVector<f64>>,
}

impl IterationHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `parameters` followed by `aux`.
    pub fn push(&mut self, parameters: &DVector<f64>, aux: &[f64]) {
        let n = parameters.len();
        let entry = DVector::from_fn(n + aux.len(), |i, _| {
            if i < n {
                parameters[i]
            } else {
                aux[i - n]
            }
        });
        self.entries.push(entry);
    }

    /// Number of recorded iterations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over entries in recording order.
    pub fn iter(&self) -> std::slice::Iter<'_, DVector<f64>> {
        self.entries.iter()
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&DVector<f64>> {
        self.entries.get(index)
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&DVector<f64>> {
        self.entries.last()
    }

    /// Tabular dump with one column per iteration and one row per component.
    ///
    /// ```
    /// use fitter_core::solvers::IterationHistory;
    /// use nalgebra::DVector;
    ///
    /// let mut history = IterationHistory::new();
    /// history.push(&DVector::from_vec(vec![1.0]), &[0.5]);
    /// history.push(&DVector::from_vec(vec![2.0]), &[0.25]);
    ///
    /// assert_eq!(history.to_display_string(), "Iter0,Iter1\n1, 2\n0.5, 0.25\n");
    /// ```
    pub fn to_display_string(&self) -> String {
        let Some(first) = self.entries.first() else {
            return String::new();
        };

        let header: Vec<String> = (0..self.entries.len())
            .map(|i| format!("Iter{}", i))
            .collect();
        let mut out = header.join(",");
        out.push('\n');

        for row in 0..first.len() {
            let cells: Vec<String> = self
                .entries
                .iter()
                .map(|entry| entry.get(row).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            out.push_str(&cells.join(", "));
            out.push('\n');
        }

        out
    }
}

impl<'a> IntoIterator for &'a IterationHistory {
    type Item = &'a DVector<f64>;
    type IntoIter = std::slice::Iter<'a, DVector<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
