use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::Real;
use crate::error::ConfigError;

/// How the exploration rate shrinks after each episode.
#[enum_dispatch]
pub trait Decay {
    /// The exploration rate for the next episode. Never below the floor.
    fn decay(&self, epsilon: Real) -> Real;
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Subtract a fixed `step` per episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    pub step: Real,
    pub floor: Real,
}

/// Multiply by `factor` per episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multiplicative {
    pub factor: Real,
    pub floor: Real,
}

impl Decay for Linear {
    fn decay(&self, epsilon: Real) -> Real {
        (epsilon - self.step).max(self.floor)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_floor(self.floor)?;
        if self.step < 0.0 {
            return Err(ConfigError::Validation(
                "learning.decay.step must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

impl Decay for Multiplicative {
    fn decay(&self, epsilon: Real) -> Real {
        (epsilon * self.factor).max(self.floor)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_floor(self.floor)?;
        if !(self.factor > 0.0 && self.factor <= 1.0) {
            return Err(ConfigError::Validation(
                "learning.decay.factor must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

fn check_floor(floor: Real) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&floor) {
        Ok(())
    } else {
        Err(ConfigError::Validation(
            "learning.decay.floor must be in [0, 1]".into(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[enum_dispatch(Decay)]
pub enum DecaySchedule {
    Linear(Linear),
    Multiplicative(Multiplicative),
}
