use std::fmt::Debug;
use std::hash::Hash;

use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;

use crate::Real;
use crate::error::SolveError;
use crate::mdp::{Mdp, Transition};

/// Result of one environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<S> {
    pub next_state: S,
    pub reward: Real,
    pub done: bool,
}

/// Model-free interface used by the learner and the episode runner.
pub trait Environment {
    type State: Clone + Eq + Hash + Debug;
    type Action: Copy + Eq + Hash + Debug;

    /// Actions available in `state`, in their fixed order. Empty once done.
    fn actions(&self, state: &Self::State) -> Vec<Self::Action>;

    fn reset(&self, rng: &mut StdRng) -> Self::State;

    fn step(
        &self,
        state: &Self::State,
        action: Self::Action,
        rng: &mut StdRng,
    ) -> Result<Step<Self::State>, SolveError>;
}

/// Runs a known model as an environment by sampling its outcomes.
#[derive(Debug, Clone)]
pub struct Simulator<M: Mdp> {
    model: M,
    starts: Vec<M::State>,
}

impl<M: Mdp> Simulator<M> {
    /// Episodes start uniformly among `starts`.
    pub fn new(model: M, starts: Vec<M::State>) -> Result<Self, SolveError> {
        if starts.is_empty() {
            return Err(SolveError::Sampling("no start states".into()));
        }
        Ok(Simulator { model, starts })
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

/// Draws one outcome with its probability.
pub fn sample<S: Clone>(
    outcomes: &[Transition<S>],
    rng: &mut StdRng,
) -> Result<Transition<S>, SolveError> {
    let weights = WeightedIndex::new(outcomes.iter().map(|outcome| outcome.probability))
        .map_err(|e| SolveError::Sampling(e.to_string()))?;
    Ok(outcomes[rng.sample(&weights)].clone())
}

impl<M: Mdp> Environment for Simulator<M> {
    type State = M::State;
    type Action = M::Action;

    fn actions(&self, state: &M::State) -> Vec<M::Action> {
        self.model.legal_actions(state)
    }

    fn reset(&self, rng: &mut StdRng) -> M::State {
        self.starts[rng.random_range(0..self.starts.len())].clone()
    }

    fn step(
        &self,
        state: &M::State,
        action: M::Action,
        rng: &mut StdRng,
    ) -> Result<Step<M::State>, SolveError> {
        let outcome = sample(&self.model.outcomes(state, action), rng)?;
        Ok(Step {
            next_state: outcome.next_state,
            reward: outcome.reward,
            done: outcome.terminal,
        })
    }
}
