//! Fitter configuration management
//!
//! Handles loading configuration from TOML files and CLI arguments. The
//! `FITTER_*` environment variables are read by clap into the same arguments.

use fitter_core::solvers::{LMConfig, SolverOptions};
use fitter_models::NodeYieldCurve;
use nalgebra::DVector;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid output format: {0}. Must be one of: table, json")]
    InvalidOutputFormat(String),

    #[error("Invalid solver settings: {0}")]
    Solver(String),

    #[error("Invalid curve settings: {0}")]
    Curve(String),

    #[error("Configuration file error: {0}")]
    FileError(String),
}

/// Log levels accepted by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// How fit results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ConfigError::InvalidOutputFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// `[solver]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverSection {
    pub minimum_delta_value: f64,
    pub minimum_delta_parameters: f64,
    pub maximum_iterations: usize,
    pub lambda_initial: f64,
    pub lambda_factor: f64,
    pub debug_calculations: bool,
    /// Clamp candidates into the bounds; implied by setting either bound
    pub constrain: bool,
    /// Lower bound applied to every node yield
    pub lower_bound: Option<f64>,
    /// Upper bound applied to every node yield
    pub upper_bound: Option<f64>,
}

impl Default for SolverSection {
    fn default() -> Self {
        let options = SolverOptions::default();
        let lm = LMConfig::default();
        Self {
            minimum_delta_value: options.minimum_delta_value,
            minimum_delta_parameters: options.minimum_delta_parameters,
            maximum_iterations: options.maximum_iterations,
            lambda_initial: lm.lambda_initial,
            lambda_factor: lm.lambda_factor,
            debug_calculations: lm.debug_calculations,
            constrain: false,
            lower_bound: None,
            upper_bound: None,
        }
    }
}

/// `[curve]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CurveSection {
    /// Node maturities in years
    pub pillars: Vec<f64>,
    /// Flat starting yield for every node (decimal)
    pub initial_yield: f64,
}

impl Default for CurveSection {
    fn default() -> Self {
        Self {
            pillars: vec![1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 20.0, 30.0],
            initial_yield: 0.03,
        }
    }
}

/// Fitter configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(deserialize_with = "deserialize_output_format")]
    pub output: OutputFormat,
    pub solver: SolverSection,
    pub curve: CurveSection,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

fn deserialize_output_format<'de, D>(deserializer: D) -> Result<OutputFormat, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OutputFormat::from_str(&s).map_err(serde::de::Error::custom)
}

impl FitterConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(level) = &cli.log_level {
            self.log_level = LogLevel::from_str(level)?;
        }
        if let Some(output) = &cli.output {
            self.output = OutputFormat::from_str(output)?;
        }
        if let Some(max) = cli.max_iterations {
            self.solver.maximum_iterations = max;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.curve()?;
        let n = self.curve.pillars.len();
        self.solver_options(n)
            .validate(n)
            .map_err(|e| ConfigError::Solver(e.to_string()))?;
        self.lm_config()
            .validate()
            .map_err(|e| ConfigError::Solver(e.to_string()))?;
        if !self.curve.initial_yield.is_finite() {
            return Err(ConfigError::Curve(format!(
                "initial_yield must be finite, got {}",
                self.curve.initial_yield
            )));
        }
        Ok(())
    }

    /// Node curve built from `[curve]`
    pub fn curve(&self) -> Result<NodeYieldCurve, ConfigError> {
        NodeYieldCurve::new(self.curve.pillars.clone()).map_err(|e| ConfigError::Curve(e.to_string()))
    }

    /// Flat starting yields, one per pillar
    pub fn initial_parameters(&self) -> DVector<f64> {
        DVector::from_element(self.curve.pillars.len(), self.curve.initial_yield)
    }

    /// Solver options for `n` parameters; scalar bounds are broadcast.
    ///
    /// A configured bound enables clamping, as `SolverOptions::with_bounds` does.
    pub fn solver_options(&self, n: usize) -> SolverOptions {
        let s = &self.solver;
        SolverOptions {
            minimum_delta_value: s.minimum_delta_value,
            minimum_delta_parameters: s.minimum_delta_parameters,
            maximum_iterations: s.maximum_iterations,
            constrain: s.constrain || s.lower_bound.is_some() || s.upper_bound.is_some(),
            lower_bounds: s.lower_bound.map(|b| DVector::from_element(n, b)),
            upper_bounds: s.upper_bound.map(|b| DVector::from_element(n, b)),
        }
    }

    /// Damping schedule from `[solver]`
    pub fn lm_config(&self) -> LMConfig {
        LMConfig::new(self.solver.lambda_initial, self.solver.lambda_factor)
            .with_debug_calculations(self.solver.debug_calculations)
    }
}

/// CLI arguments structure
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Log level override
    pub log_level: Option<String>,
    /// Output format override
    pub output: Option<String>,
    /// Iteration budget override
    pub max_iterations: Option<usize>,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (via clap `env`)
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<FitterConfig, ConfigError> {
    let mut config = match &cli.config_file {
        Some(path) => FitterConfig::from_file(path)?,
        None => FitterConfig::default(),
    };

    config.merge_with_cli(cli)?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FitterConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.output, OutputFormat::Table);
        assert_eq!(config.solver.maximum_iterations, 5000);
        assert_eq!(config.solver.lambda_initial, 1e-3);
        assert_eq!(config.solver.lambda_factor, 10.0);
        assert!(!config.solver.constrain);
        assert_eq!(config.curve.pillars.len(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("Warn").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("verbose").is_err());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::from_str("csv").is_err());
        assert_eq!(format!("{}", OutputFormat::Json), "json");
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
            log_level = "debug"
            output = "json"

            [solver]
            minimum_delta_value = 1e-10
            maximum_iterations = 200
            lambda_initial = 0.01
            constrain = true
            lower_bound = 0.0
            upper_bound = 0.2

            [curve]
            pillars = [1.0, 5.0, 10.0]
            initial_yield = 0.04
        "#;

        let config: FitterConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.solver.maximum_iterations, 200);
        assert_eq!(config.solver.lambda_initial, 0.01);
        // Unspecified keys keep their defaults
        assert_eq!(config.solver.lambda_factor, 10.0);
        assert_eq!(config.solver.minimum_delta_parameters, 1e-6);
        assert_eq!(config.curve.pillars, vec![1.0, 5.0, 10.0]);
        assert!(config.validate().is_ok());

        let options = config.solver_options(3);
        assert!(options.constrain);
        assert_eq!(options.lower_bounds.unwrap(), DVector::from_element(3, 0.0));
        assert_eq!(options.upper_bounds.unwrap(), DVector::from_element(3, 0.2));
    }

    #[test]
    fn test_invalid_log_level_in_toml() {
        let result: Result<FitterConfig, _> = toml::from_str(r#"log_level = "loud""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_args_merge() {
        let mut config = FitterConfig::default();
        let cli = CliArgs {
            log_level: Some("error".to_string()),
            output: Some("json".to_string()),
            max_iterations: Some(7),
            config_file: None,
        };

        config.merge_with_cli(&cli).unwrap();
        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.solver.maximum_iterations, 7);
    }

    #[test]
    fn test_validate_rejects_bad_sections() {
        let mut config = FitterConfig::default();
        config.solver.lambda_factor = 1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Solver(_))));

        let mut config = FitterConfig::default();
        config.curve.pillars = vec![5.0, 1.0];
        assert!(matches!(config.validate(), Err(ConfigError::Curve(_))));

        let mut config = FitterConfig::default();
        config.solver.lower_bound = Some(0.1);
        config.solver.upper_bound = Some(0.0);
        assert!(matches!(config.validate(), Err(ConfigError::Solver(_))));

        let mut config = FitterConfig::default();
        config.solver.maximum_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scalar_bound_enables_clamping() {
        let config: FitterConfig = toml::from_str(
            r#"
            [solver]
            upper_bound = 0.05
        "#,
        )
        .unwrap();
        assert!(!config.solver.constrain);

        let options = config.solver_options(config.curve.pillars.len());
        assert!(options.constrain);
        assert!(options.lower_bounds.is_none());
        assert_eq!(options.upper_bounds.unwrap()[0], 0.05);
    }

    #[test]
    fn test_crossed_bounds_rejected_without_constrain_flag() {
        let config: FitterConfig = toml::from_str(
            r#"
            [solver]
            lower_bound = 0.1
            upper_bound = 0.0
        "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Solver(_))));
    }

    #[test]
    fn test_lm_config_conversion() {
        let mut config = FitterConfig::default();
        config.solver.debug_calculations = true;
        let lm = config.lm_config();
        assert!(lm.debug_calculations);
        assert_eq!(lm.lambda_initial, 1e-3);
    }
}
