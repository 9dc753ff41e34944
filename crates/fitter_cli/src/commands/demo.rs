//! Demo command: a synthetic re-fitting session.
//!
//! Quotes one bond per configured pillar off a smooth generating curve, fits
//! once through the re-fitting service, then moves one quote per round and
//! refits warm from the previous optimum.
//!
//! # Expected Output
//!
//! ```text
//! [Demo] Initial fit: MinimumDeltaValueConverged after 6 iterations, value 1.812e-13, 0.391ms
//! [Demo] Round 1: bumped B01.00Y by +5.0c: MinimumDeltaValueConverged after 3 iterations, value 2.217e-15, 0.118ms
//! ```

use fitter_core::solvers::SolverResult;
use fitter_models::{FittableCollection, FixedRateBond, NodeYieldCurve};
use fitter_service::{FitterService, ServiceConfig};
use nalgebra::DVector;
use std::sync::Arc;
use tracing::info;

use crate::config::FitterConfig;
use crate::Result;

const HALF_SPREAD: f64 = 0.02;
const BUMP: f64 = 0.05;

/// Smooth upward-sloping generating curve.
fn generating_yields(curve: &NodeYieldCurve) -> DVector<f64> {
    DVector::from_iterator(
        curve.len(),
        curve
            .pillars()
            .iter()
            .map(|t| 0.02 + 0.015 * (1.0 - (-t / 5.0).exp())),
    )
}

/// One annual-coupon bond per pillar, quoted at its model price.
fn synthetic_bonds(curve: &NodeYieldCurve, yields: &DVector<f64>) -> Result<Vec<FixedRateBond>> {
    curve
        .pillars()
        .iter()
        .zip(yields.iter())
        .map(|(&t, &y)| -> Result<FixedRateBond> {
            let bond = FixedRateBond::new(format!("B{:05.2}Y", t), t, y, 1)?;
            let price = bond.clean_price(curve, yields);
            Ok(bond.with_prices(price - HALF_SPREAD, price + HALF_SPREAD))
        })
        .collect()
}

fn print_result(label: &str, result: &SolverResult) {
    println!(
        "[Demo] {}: {} after {} iterations, value {:.3e}, {:.3}ms",
        label,
        result.status,
        result.iterations(),
        result.value_current,
        result.fitting_time.as_secs_f64() * 1e3
    );
}

/// Runs the demo session.
pub async fn run(config: &FitterConfig, rounds: usize) -> Result<()> {
    println!("========================================");
    println!("Yield Curve Re-Fitting Demo");
    println!("========================================");

    let curve = config.curve()?;
    let truth = generating_yields(&curve);
    let bonds = synthetic_bonds(&curve, &truth)?;
    let n = curve.len();

    let service = FitterService::spawn(
        FittableCollection::new(curve),
        config.initial_parameters(),
        config.solver_options(n),
        ServiceConfig::default().with_solver(config.lm_config()),
    )?;
    let handle = service.handle();

    println!("[Demo] Quoting {} bonds", bonds.len());
    let mut mids = Vec::with_capacity(bonds.len());
    for bond in bonds {
        mids.push((bond.key().to_string(), bond.mid().unwrap_or_default()));
        handle.add_instrument(bond)?;
    }

    let mut last: Arc<SolverResult> = handle.fit().await?;
    print_result("Initial fit", &last);

    for round in 1..=rounds {
        if mids.is_empty() {
            break;
        }
        let index = (round - 1) % mids.len();
        let (key, mid) = &mut mids[index];
        let sign = if round % 2 == 0 { -1.0 } else { 1.0 };
        *mid += sign * BUMP;
        handle.update_price(key.clone(), *mid - HALF_SPREAD, *mid + HALF_SPREAD)?;

        let result = handle.fit().await?;
        info!(round, key = %key, iterations = result.iterations(), "Refit complete");
        print_result(
            &format!("Round {}: bumped {} by {:+.1}c", round, key, sign * BUMP * 100.0),
            &result,
        );
        last = result;
    }

    println!();
    println!("{}", last);
    service.shutdown().await?;
    Ok(())
}
