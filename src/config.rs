use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Real;
use crate::error::ConfigError;
use crate::grid::SlipTable;
use crate::learning::decay::{Decay, DecaySchedule, Linear};
use crate::learning::q_learning::TdRule;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub solver: SolverConfig,
    pub learning: LearningConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.solver.validate()?;
        self.learning.validate()
    }
}

/// Static description of a grid world.
///
/// Rewards are the intrinsic reward of *entering* a cell. Whether a cell ends
/// an episode is given separately by `terminals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,
    /// Added to every transition, typically a small negative cost.
    pub step_reward: Real,
    pub rewards: Vec<Vec<Real>>,
    pub terminals: Vec<[usize; 2]>,
    pub walls: Vec<[usize; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<[usize; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slip: Option<SlipConfig>,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            rows: 3,
            cols: 4,
            step_reward: -0.01,
            rewards: vec![
                vec![0.0, 0.0, 0.0, 1.0],
                vec![0.0, 0.0, 0.0, -1.0],
                vec![0.0, 0.0, 0.0, 0.0],
            ],
            terminals: vec![[0, 3], [1, 3]],
            walls: vec![[1, 1]],
            start: Some([2, 0]),
            slip: None,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::Validation(
                "grid.rows and grid.cols must be > 0".into(),
            ));
        }
        let rows = self.rewards.len();
        let cols = self.rewards.first().map_or(0, Vec::len);
        if rows != self.rows || self.rewards.iter().any(|row| row.len() != self.cols) {
            return Err(ConfigError::RewardShape {
                rows,
                cols,
                expected_rows: self.rows,
                expected_cols: self.cols,
            });
        }
        let cells = self
            .terminals
            .iter()
            .chain(self.walls.iter())
            .chain(self.start.iter());
        for &[row, col] in cells {
            self.check_bounds(row, col)?;
        }
        if let Some(cell) = self.terminals.iter().find(|cell| self.walls.contains(cell)) {
            return Err(ConfigError::Validation(format!(
                "cell ({}, {}) cannot be both a wall and a terminal",
                cell[0], cell[1]
            )));
        }
        if let Some(start) = self.start {
            if self.walls.contains(&start) {
                return Err(ConfigError::Validation(
                    "grid.start cannot be a wall".into(),
                ));
            }
        }
        SlipTable::from_config(self.slip.as_ref())?;
        Ok(())
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<(), ConfigError> {
        if row >= self.rows || col >= self.cols {
            return Err(ConfigError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }
}

/// The standard slip model: the intended move happens with probability
/// `intended`, each of the two orthogonal moves with probability `orthogonal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlipConfig {
    pub intended: Real,
    pub orthogonal: Real,
}

impl Default for SlipConfig {
    fn default() -> Self {
        SlipConfig {
            intended: 0.8,
            orthogonal: 0.1,
        }
    }
}

/// Parameters shared by value iteration and policy iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub gamma: Real,
    /// Convergence threshold on the largest per-sweep change.
    pub theta: Real,
    /// Sweeps for value iteration, improvement rounds for policy iteration.
    pub max_iterations: usize,
    /// Sweeps allowed for a single policy evaluation.
    pub max_evaluation_sweeps: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            gamma: 0.9,
            theta: 1e-4,
            max_iterations: 1_000,
            max_evaluation_sweeps: 10_000,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_discount("solver.gamma", self.gamma)?;
        if !(self.theta > 0.0 && self.theta.is_finite()) {
            return Err(ConfigError::Validation(
                "solver.theta must be > 0".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Validation(
                "solver.max_iterations must be > 0".into(),
            ));
        }
        if self.max_evaluation_sweeps == 0 {
            return Err(ConfigError::Validation(
                "solver.max_evaluation_sweeps must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Parameters of the tabular temporal-difference learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Learning rate.
    pub alpha: Real,
    pub gamma: Real,
    /// Initial exploration rate.
    pub epsilon: Real,
    pub episodes: usize,
    /// Step cap per episode.
    pub max_steps: usize,
    pub rule: TdRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Log progress every this many episodes, 0 disables it.
    pub log_every: usize,
    pub decay: DecaySchedule,
}

impl Default for LearningConfig {
    fn default() -> Self {
        LearningConfig {
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 1.0,
            episodes: 5_000,
            max_steps: 200,
            rule: TdRule::QLearning,
            seed: None,
            log_every: 1_000,
            decay: DecaySchedule::Linear(Linear {
                step: 0.0002,
                floor: 0.01,
            }),
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::Validation(
                "learning.alpha must be in (0, 1]".into(),
            ));
        }
        check_discount("learning.gamma", self.gamma)?;
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(ConfigError::Validation(
                "learning.epsilon must be in [0, 1]".into(),
            ));
        }
        if self.episodes == 0 {
            return Err(ConfigError::Validation(
                "learning.episodes must be > 0".into(),
            ));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::Validation(
                "learning.max_steps must be > 0".into(),
            ));
        }
        self.decay.validate()
    }
}

fn check_discount(name: &str, gamma: Real) -> Result<(), ConfigError> {
    if gamma > 0.0 && gamma <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{name} must be in (0, 1]")))
    }
}
