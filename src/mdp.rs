use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::Real;
use crate::error::SolveError;

/// Allowed deviation of a transition distribution from a total of 1.
pub const PROBABILITY_TOLERANCE: Real = 1e-9;

/// One possible result of taking an action in a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<S> {
    pub probability: Real,
    pub next_state: S,
    pub reward: Real,
    pub terminal: bool,
}

impl<S> Transition<S> {
    /// A transition that happens with probability 1.
    pub fn certain(next_state: S, reward: Real, terminal: bool) -> Self {
        Transition {
            probability: 1.0,
            next_state,
            reward,
            terminal,
        }
    }
}

/// Markov Decision Process - Sutton & Barto 2018.
///
/// `outcomes` is only defined for legal actions at non-terminal states.
pub trait Mdp {
    type State: Clone + Eq + Hash + Debug;
    type Action: Copy + Eq + Hash + Debug;

    /// Legal actions in the model's fixed tie-breaking order.
    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    fn is_terminal(&self, state: &Self::State) -> bool;

    fn outcomes(&self, state: &Self::State, action: Self::Action) -> Vec<Transition<Self::State>>;
}

/// A model whose decision states can be listed up front.
pub trait StateSpace: Mdp {
    /// Every state the solvers should sweep, in a deterministic order.
    fn states(&self) -> Vec<Self::State>;
}

/// Checks that the outcomes of one (state, action) pair form a distribution.
pub fn check_distribution<S: Debug, A: Debug>(
    state: &S,
    action: A,
    outcomes: &[Transition<S>],
) -> Result<(), SolveError> {
    let sum: Real = outcomes.iter().map(|outcome| outcome.probability).sum();
    let in_range = outcomes
        .iter()
        .all(|outcome| outcome.probability > 0.0 && outcome.probability <= 1.0);
    if !in_range || (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(SolveError::InvalidDistribution {
            state: format!("{state:?}"),
            action: format!("{action:?}"),
            sum,
        });
    }
    Ok(())
}

/// Fails fast on a model that cannot be solved: a non-terminal state without
/// legal actions, or an action whose outcomes do not sum to 1.
pub fn check_model<M: Mdp>(model: &M, states: &[M::State]) -> Result<(), SolveError> {
    for state in states.iter().filter(|state| !model.is_terminal(state)) {
        let actions = model.legal_actions(state);
        if actions.is_empty() {
            return Err(SolveError::NoLegalActions {
                state: format!("{state:?}"),
            });
        }
        for action in actions {
            check_distribution(state, action, &model.outcomes(state, action))?;
        }
    }
    Ok(())
}
