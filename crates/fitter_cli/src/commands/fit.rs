//! Fit command implementation
//!
//! Loads bond quotes from CSV, fits the configured node curve and prints the
//! solver result with a per-bond pricing table.

use fitter_core::solvers::{FittingSolver, LevenbergMarquardt, Solver, SolverKind, SolverResult};
use fitter_models::{FittableCollection, PricingRow};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use crate::config::{FitterConfig, OutputFormat};
use crate::{input, CliError, Result};

/// Serialised form of a completed fit.
#[derive(Debug, Serialize)]
pub struct FitReport<'a> {
    pub pillars: &'a [f64],
    pub result: &'a SolverResult,
    pub pricing: Vec<PricingRow>,
}

/// Run the fit command
pub fn run(config: &FitterConfig, bonds: &Path, solver: &str) -> Result<()> {
    let kind: SolverKind = solver
        .parse()
        .map_err(|e: String| CliError::Config(crate::config::ConfigError::Solver(e)))?;

    let mut collection = FittableCollection::new(config.curve()?);
    for bond in input::load_bonds(bonds)? {
        let key = bond.key().to_string();
        if !collection.add(bond) {
            warn!(key = %key, "Duplicate instrument ignored");
        }
    }
    info!(
        instruments = collection.len(),
        file = %bonds.display(),
        solver = %kind,
        "Loaded bonds"
    );

    let result = fit_collection(config, &collection, kind)?;
    let report = FitReport {
        pillars: collection.curve().pillars(),
        pricing: collection.pricing_report(&result.parameters_current)?,
        result: &result,
    };

    match config.output {
        OutputFormat::Table => print!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// Fit `collection` from the configured flat starting curve.
pub fn fit_collection(
    config: &FitterConfig,
    collection: &FittableCollection,
    kind: SolverKind,
) -> Result<SolverResult> {
    let solver = match kind {
        SolverKind::LevenbergMarquardt => {
            FittingSolver::from(LevenbergMarquardt::new(config.lm_config()))
        }
        other => FittingSolver::from_kind(other),
    };

    let initial = config.initial_parameters();
    let options = config.solver_options(initial.len());
    let mut result = SolverResult::new();
    solver.estimate(collection, &initial, &options, &mut result)?;
    Ok(result)
}

/// Plain-text table: solver summary, fitted node yields, per-bond pricing.
impl fmt::Display for FitReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.result)?;
        writeln!(f)?;

        writeln!(f, "{:>8}  {:>10}", "Pillar", "Yield")?;
        for (t, y) in self.pillars.iter().zip(self.result.parameters_current.iter()) {
            writeln!(f, "{:>8.2}  {:>9.4}%", t, y * 100.0)?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:<12} {:>8} {:>12} {:>12} {:>12}",
            "Key", "Maturity", "Market", "Model", "Residual"
        )?;
        for row in &self.pricing {
            let market = row
                .market_mid
                .map(|m| format!("{:.6}", m))
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "{:<12} {:>8.2} {:>12} {:>12.6} {:>12.6}",
                row.key, row.maturity, market, row.model_price, row.residual
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fitter_models::{FixedRateBond, NodeYieldCurve};
    use nalgebra::DVector;

    fn config() -> FitterConfig {
        let mut config = FitterConfig::default();
        config.curve.pillars = vec![2.0, 5.0];
        config.solver.minimum_delta_value = 1e-14;
        config.solver.minimum_delta_parameters = 1e-12;
        config
    }

    fn collection(config: &FitterConfig) -> FittableCollection {
        let curve = NodeYieldCurve::new(config.curve.pillars.clone()).unwrap();
        let truth = DVector::from_vec(vec![0.025, 0.032]);
        let mut collection = FittableCollection::new(curve.clone());
        for (key, maturity) in [("B2", 2.0), ("B3", 3.0), ("B5", 5.0)] {
            let bond = FixedRateBond::new(key, maturity, 0.03, 2).unwrap();
            let price = bond.clean_price(&curve, &truth);
            collection.add(bond.with_prices(price - 0.05, price + 0.05));
        }
        collection
    }

    #[test]
    fn test_fit_collection_recovers_yields() {
        let config = config();
        let collection = collection(&config);
        let result = fit_collection(&config, &collection, SolverKind::LevenbergMarquardt).unwrap();

        assert!(result.status.is_converged());
        assert_relative_eq!(result.parameters_current[0], 0.025, epsilon = 1e-6);
        assert_relative_eq!(result.parameters_current[1], 0.032, epsilon = 1e-6);
    }

    #[test]
    fn test_unimplemented_solver_is_reported() {
        let config = config();
        let err = fit_collection(&config, &collection(&config), SolverKind::Qr).unwrap_err();
        assert!(matches!(err, CliError::Solver(_)));
    }

    #[test]
    fn test_render_table_and_json() {
        let config = config();
        let collection = collection(&config);
        let result = fit_collection(&config, &collection, SolverKind::LevenbergMarquardt).unwrap();
        let report = FitReport {
            pillars: collection.curve().pillars(),
            pricing: collection.pricing_report(&result.parameters_current).unwrap(),
            result: &result,
        };

        let table = report.to_string();
        assert!(table.contains("Status = "));
        assert!(table.contains("B3"));
        assert!(table.contains("2.50"));

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["pricing"].as_array().unwrap().len(), 3);
        assert_eq!(json["pillars"][1], 5.0);
    }

    #[test]
    fn test_table_marks_unquoted_bonds() {
        let result = SolverResult::new();
        let report = FitReport {
            pillars: &[],
            result: &result,
            pricing: vec![PricingRow {
                key: "B7".to_string(),
                maturity: 7.0,
                market_mid: None,
                model_price: 99.5,
                residual: 0.0,
            }],
        };

        let table = report.to_string();
        let row = table.lines().find(|l| l.starts_with("B7")).unwrap();
        let columns: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(columns, vec!["B7", "7.00", "-", "99.500000", "0.000000"]);
        assert!(table.ends_with('\n'));
    }
}
