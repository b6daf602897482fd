use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

const DEFAULT_SOLVER_CONFIG_YAML: &str = include_str!("../../config/solver.default.yaml");

/// Convergence tolerance on the largest per-sweep change.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
/// Hard cap on sweeps; reaching it silently ends the run.
pub const DEFAULT_MAX_SWEEPS: usize = 10_000;

/// Backup operator used to collapse Q-values over actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operator {
    /// `V(s) = max_a Q(s, a)`.
    #[default]
    HardMax,
    /// Boltzmann-weighted mean of Q-values with inverse temperature `beta`.
    Boltzmann { beta: f64 },
}

impl Operator {
    /// Inverse temperature this operator corresponds to; the hard max is the `beta -> inf` limit.
    pub fn beta(&self) -> f64 {
        match self {
            Operator::HardMax => f64::INFINITY,
            Operator::Boltzmann { beta } => *beta,
        }
    }
}

/// Solver configuration shared by value iteration and policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub gamma: f64,
    pub tolerance: f64,
    pub max_sweeps: usize,
    pub operator: Operator,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            gamma: 0.99,
            tolerance: DEFAULT_TOLERANCE,
            max_sweeps: DEFAULT_MAX_SWEEPS,
            operator: Operator::HardMax,
        }
    }
}

impl SolverConfig {
    /// Hard-max configuration with the default stopping rule.
    pub fn hard_max(gamma: f64) -> Self {
        SolverConfig {
            gamma,
            ..Self::default()
        }
    }

    /// Boltzmann configuration with the default stopping rule.
    pub fn boltzmann(gamma: f64, beta: f64) -> Self {
        SolverConfig {
            gamma,
            operator: Operator::Boltzmann { beta },
            ..Self::default()
        }
    }

    /// Parse a solver config from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SolverConfigError> {
        let config: SolverConfig = serde_yaml::from_str(yaml).map_err(SolverConfigError::Yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a solver config from a YAML file path.
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self, SolverConfigError> {
        let yaml = fs::read_to_string(path).map_err(SolverConfigError::Io)?;
        Self::from_yaml_str(&yaml)
    }

    /// Return the default YAML config included with this crate.
    pub fn default_yaml() -> &'static str {
        DEFAULT_SOLVER_CONFIG_YAML
    }

    /// Parse the default YAML config included with this crate.
    pub fn from_default_yaml() -> Result<Self, SolverConfigError> {
        Self::from_yaml_str(Self::default_yaml())
    }

    pub fn validate(&self) -> Result<(), SolverConfigError> {
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(SolverConfigError::Invalid(format!(
                "gamma must lie in [0, 1], got {}",
                self.gamma
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(SolverConfigError::Invalid(
                "tolerance must be finite and > 0".to_string(),
            ));
        }
        if self.max_sweeps == 0 {
            return Err(SolverConfigError::Invalid(
                "max_sweeps must be greater than 0".to_string(),
            ));
        }
        if let Operator::Boltzmann { beta } = self.operator {
            if beta.is_nan() || beta < 0.0 {
                return Err(SolverConfigError::Invalid(format!(
                    "beta must be >= 0, got {beta}"
                )));
            }
        }
        Ok(())
    }
}

/// Error type for loading and validating `SolverConfig`.
#[derive(Debug)]
pub enum SolverConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for SolverConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverConfigError::Io(err) => write!(f, "failed to read config file: {err}"),
            SolverConfigError::Yaml(err) => write!(f, "failed to parse config YAML: {err}"),
            SolverConfigError::Invalid(err) => write!(f, "invalid solver config: {err}"),
        }
    }
}

impl std::error::Error for SolverConfigError {}
