use std::hash::Hash;

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::Real;
use crate::config::LearningConfig;
use crate::error::{ConfigError, SolveError};
use crate::learning::decay::Decay;
use crate::learning::environment::Environment;
use crate::learning::q_table::QTable;

/// The bootstrap target of the temporal-difference update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TdRule {
    /// Off-policy: `max_a' Q(s', a')`.
    #[default]
    QLearning,
    /// On-policy: `Q(s', a')` for the action actually taken next.
    Sarsa,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub steps: usize,
    pub total_reward: Real,
    /// The step cap ended the episode before a terminal state.
    pub timed_out: bool,
}

#[derive(Debug, Clone)]
pub struct Training<S: Eq + Hash, A: Eq + Hash> {
    pub q_table: QTable<S, A>,
    pub episodes: Vec<EpisodeSummary>,
    /// Exploration rate after the last decay.
    pub epsilon: Real,
}

impl<S: Eq + Hash, A: Eq + Hash> Training<S, A> {
    pub fn timeouts(&self) -> usize {
        self.episodes.iter().filter(|e| e.timed_out).count()
    }
}

/// Tabular epsilon-greedy TD control.
#[derive(Debug, Clone)]
pub struct QLearner {
    config: LearningConfig,
}

impl QLearner {
    pub fn new(config: LearningConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(QLearner { config })
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Runs the configured number of episodes against `env`, starting from
    /// an all-zero table.
    pub fn train<E: Environment>(
        &self,
        env: &E,
    ) -> Result<Training<E::State, E::Action>, SolveError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut q_table = QTable::new();
        let mut epsilon = self.config.epsilon;
        let mut episodes = Vec::with_capacity(self.config.episodes);

        for episode in 1..=self.config.episodes {
            let summary = self.run_episode(env, &mut q_table, epsilon, &mut rng)?;
            if summary.timed_out {
                debug!("episode {episode} hit the step cap of {}", self.config.max_steps);
            }
            episodes.push(summary);
            epsilon = self.config.decay.decay(epsilon);

            if self.config.log_every > 0 && episode % self.config.log_every == 0 {
                let recent = &episodes[episodes.len() - self.config.log_every..];
                let mean = recent.iter().map(|e| e.total_reward).sum::<Real>()
                    / recent.len() as Real;
                info!(
                    "episode {episode}/{}: mean reward {mean:.3}, epsilon {epsilon:.3}, {} states seen",
                    self.config.episodes,
                    q_table.len()
                );
            }
        }

        Ok(Training {
            q_table,
            episodes,
            epsilon,
        })
    }

    fn run_episode<E: Environment>(
        &self,
        env: &E,
        q_table: &mut QTable<E::State, E::Action>,
        epsilon: Real,
        rng: &mut StdRng,
    ) -> Result<EpisodeSummary, SolveError> {
        let LearningConfig {
            alpha,
            gamma,
            max_steps,
            rule,
            ..
        } = self.config;

        let mut state = env.reset(rng);
        let mut action = q_table.epsilon_greedy(&state, &env.actions(&state), epsilon, rng);
        let mut steps = 0;
        let mut total_reward = 0.0;
        let mut done = false;

        while let Some(current) = action {
            if steps == max_steps {
                break;
            }
            let step = env.step(&state, current, rng)?;
            steps += 1;
            total_reward += step.reward;

            let (next_action, future) = if step.done {
                (None, 0.0)
            } else {
                let next_actions = env.actions(&step.next_state);
                if next_actions.is_empty() {
                    return Err(SolveError::NoLegalActions {
                        state: format!("{:?}", step.next_state),
                    });
                }
                let next_action =
                    q_table.epsilon_greedy(&step.next_state, &next_actions, epsilon, rng);
                let future = match (rule, next_action) {
                    (TdRule::Sarsa, Some(next)) => q_table.get(&step.next_state, next),
                    _ => q_table.max_q(&step.next_state, &next_actions),
                };
                (next_action, future)
            };

            let old = q_table.get(&state, current);
            let target = step.reward + gamma * future;
            q_table.set(state, current, old + alpha * (target - old));

            if step.done {
                done = true;
                break;
            }
            state = step.next_state;
            action = next_action;
        }

        Ok(EpisodeSummary {
            steps,
            total_reward,
            // An episode that starts in a state without actions is over at once.
            timed_out: !done && steps == max_steps,
        })
    }
}
