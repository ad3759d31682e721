// src/config.rs

//! Run configuration: strategy selection from the command line and search
//! parameters from the input document.
//!
//! The parameters ride in the same JSON document as the catalogue, each
//! with a default, and two of them can be overridden from the environment
//! after decoding: `REUSE_SCHED_BEAM_WIDTH` and `REUSE_SCHED_OPTS`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::search::Orientation;
use crate::strategy::beam::{DEFAULT_BEAM_WIDTH, DEFAULT_TIMEOUT_SECS};
use crate::strategy::greedy::DEFAULT_NUM_PRUNED;
use crate::strategy::Optimizations;

pub const BEAM_WIDTH_ENV: &str = "REUSE_SCHED_BEAM_WIDTH";
pub const OPTIMIZATIONS_ENV: &str = "REUSE_SCHED_OPTS";

pub const USAGE: &str =
    "usage: reuse-sched [--beam|--greedy|--brute-force|--bottom-up|--top-down]";

/// Which search strategy drives the run. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    #[default]
    Beam,
    Greedy,
    BruteForce,
}

/// Strategy plus the exhaustive engine's exploration orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunMode {
    pub strategy: Strategy,
    pub orientation: Orientation,
}

impl RunMode {
    /// Parse the run mode from the process arguments (program name
    /// excluded). Anything unrecognized is a configuration error.
    pub fn from_args(args: &[String]) -> Result<Self> {
        match args {
            [] => Ok(Self::default()),
            [flag] => match flag.as_str() {
                "--beam" => Ok(Self {
                    strategy: Strategy::Beam,
                    ..Self::default()
                }),
                "--greedy" => Ok(Self {
                    strategy: Strategy::Greedy,
                    ..Self::default()
                }),
                "--brute-force" => Ok(Self {
                    strategy: Strategy::BruteForce,
                    ..Self::default()
                }),
                "--top-down" => Ok(Self {
                    strategy: Strategy::BruteForce,
                    orientation: Orientation::TopDown,
                }),
                "--bottom-up" => Ok(Self {
                    strategy: Strategy::BruteForce,
                    orientation: Orientation::BottomUp,
                }),
                other => bail!("unrecognized argument: {other}"),
            },
            _ => bail!("too many arguments"),
        }
    }
}

fn default_num_pruned() -> usize {
    DEFAULT_NUM_PRUNED
}

fn default_beam_width() -> usize {
    DEFAULT_BEAM_WIDTH
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_optimizations() -> u64 {
    Optimizations::default().bits()
}

/// Search parameters decoded from the input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Partial candidates the greedy strategy retains per step.
    pub num_pruned: usize,
    /// Frontier width of the beam strategy.
    pub beam_width: usize,
    /// Beam wall-clock deadline in seconds.
    pub timeout: f64,
    /// Raw optimizations bitmask; unknown bits are ignored.
    pub optimizations: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_pruned: default_num_pruned(),
            beam_width: default_beam_width(),
            timeout: default_timeout(),
            optimizations: default_optimizations(),
        }
    }
}

impl RunConfig {
    /// Apply environment overrides on top of the decoded values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(BEAM_WIDTH_ENV) {
            self.beam_width = raw
                .parse()
                .with_context(|| format!("invalid {BEAM_WIDTH_ENV}: {raw:?}"))?;
        }
        if let Ok(raw) = std::env::var(OPTIMIZATIONS_ENV) {
            self.optimizations = raw
                .parse()
                .with_context(|| format!("invalid {OPTIMIZATIONS_ENV}: {raw:?}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.beam_width == 0 {
            bail!("beam_width must be at least 1");
        }
        if self.num_pruned == 0 {
            bail!("num_pruned must be at least 1");
        }
        if !self.timeout.is_finite() || self.timeout < 0.0 {
            bail!("timeout must be a non-negative number of seconds");
        }
        Ok(())
    }

    pub fn optimizations(&self) -> Optimizations {
        Optimizations::from_bits_truncate(self.optimizations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_to_the_beam_strategy() {
        let mode = RunMode::from_args(&[]).unwrap();
        assert_eq!(mode.strategy, Strategy::Beam);
    }

    #[test]
    fn orientation_flags_select_brute_force() {
        let mode = RunMode::from_args(&args(&["--bottom-up"])).unwrap();
        assert_eq!(mode.strategy, Strategy::BruteForce);
        assert_eq!(mode.orientation, Orientation::BottomUp);
    }

    #[test]
    fn unrecognized_arguments_are_rejected() {
        assert!(RunMode::from_args(&args(&["--frobnicate"])).is_err());
        assert!(RunMode::from_args(&args(&["--beam", "--greedy"])).is_err());
    }

    #[test]
    fn document_defaults_match_the_documented_values() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.num_pruned, 3);
        assert_eq!(config.beam_width, 16);
        assert_eq!(config.timeout, 600.0);
        assert_eq!(config.optimizations(), Optimizations::all());
    }

    #[test]
    fn document_values_override_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{"beam_width": 4, "timeout": 1.5, "optimizations": 2}"#)
                .unwrap();
        assert_eq!(config.beam_width, 4);
        assert_eq!(config.timeout, 1.5);
        assert_eq!(config.optimizations(), Optimizations::PAIRWISE_ONLY);
    }

    #[test]
    fn environment_overrides_take_precedence() {
        std::env::set_var(BEAM_WIDTH_ENV, "5");
        let mut config = RunConfig::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.beam_width, 5);

        std::env::set_var(BEAM_WIDTH_ENV, "not-a-number");
        assert!(config.apply_env_overrides().is_err());
        std::env::remove_var(BEAM_WIDTH_ENV);
    }

    #[test]
    fn zero_widths_fail_validation() {
        let mut config = RunConfig::default();
        config.beam_width = 0;
        assert!(config.validate().is_err());
    }
}
