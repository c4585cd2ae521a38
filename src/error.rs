use std::path::PathBuf;

use crate::Real;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("reward map is {rows}x{cols} but the grid is {expected_rows}x{expected_cols}")]
    RewardShape {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error("cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("slip probabilities for {action} sum to {sum}, expected 1")]
    SlipDistribution { action: String, sum: Real },

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Errors raised by the solvers and the learner.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("non-terminal state {state} has no legal actions")]
    NoLegalActions { state: String },

    #[error("outcomes of {action} in {state} have invalid probabilities (sum {sum})")]
    InvalidDistribution {
        state: String,
        action: String,
        sum: Real,
    },

    #[error("did not converge after {iterations} iterations (last delta {delta})")]
    NotConverged { iterations: usize, delta: Real },

    #[error("failed to sample an outcome: {0}")]
    Sampling(String),
}
