//! Check command: print the merged configuration and solver support.

use fitter_core::solvers::SolverKind;

use crate::config::FitterConfig;
use crate::Result;

/// Run the check command
pub fn run(config: &FitterConfig) -> Result<()> {
    println!("{}", summary(config)?);
    Ok(())
}

fn summary(config: &FitterConfig) -> Result<String> {
    config.validate()?;
    let curve = config.curve()?;
    let s = &config.solver;

    let mut lines = vec![
        "Configuration OK".to_string(),
        format!("  log_level          = {}", config.log_level),
        format!("  output             = {}", config.output),
        format!("  pillars            = {:?}", curve.pillars()),
        format!("  initial_yield      = {}", config.curve.initial_yield),
        format!("  minimum_delta_value      = {:e}", s.minimum_delta_value),
        format!("  minimum_delta_parameters = {:e}", s.minimum_delta_parameters),
        format!("  maximum_iterations = {}", s.maximum_iterations),
        format!("  lambda_initial     = {:e}", s.lambda_initial),
        format!("  lambda_factor      = {}", s.lambda_factor),
        format!("  constrain          = {}", s.constrain),
    ];
    lines.push("Solvers:".to_string());
    for kind in SolverKind::ALL {
        let state = if kind.is_implemented() {
            "available"
        } else {
            "not implemented"
        };
        lines.push(format!("  {:<20} {}", kind.as_str(), state));
    }
    Ok(lines.join("\n"))
}
