//! Dynamic programming over a known model.

use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::Real;
use crate::learning::policy::PolicyMap;
use crate::learning::value::ValueFunction;
use crate::mdp::Mdp;

pub mod policy_iteration;
pub mod value_iteration;

pub use policy_iteration::policy_iteration;
pub use value_iteration::value_iteration;

/// Values and a greedy policy for the decision states of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize, A: Serialize",
    deserialize = "S: Deserialize<'de> + Eq + Hash, A: Deserialize<'de>"
))]
pub struct Solution<S: Eq + Hash, A> {
    pub values: ValueFunction<S>,
    pub policy: PolicyMap<S, A>,
    /// Sweeps for value iteration, improvement rounds for policy iteration.
    pub iterations: usize,
}

/// Expected return of taking `action` in `state` and following `values` after.
pub fn q_value<M: Mdp>(
    model: &M,
    values: &ValueFunction<M::State>,
    state: &M::State,
    action: M::Action,
    gamma: Real,
) -> Real {
    model
        .outcomes(state, action)
        .iter()
        .map(|outcome| {
            let future = if outcome.terminal {
                0.0
            } else {
                values.get(&outcome.next_state)
            };
            outcome.probability * (outcome.reward + gamma * future)
        })
        .sum()
}

/// The first legal action with the largest `q_value`, and that value.
pub fn greedy_action<M: Mdp>(
    model: &M,
    values: &ValueFunction<M::State>,
    state: &M::State,
    gamma: Real,
) -> Option<(M::Action, Real)> {
    let mut best: Option<(M::Action, Real)> = None;
    for action in model.legal_actions(state) {
        let q = q_value(model, values, state, action, gamma);
        match best {
            Some((_, best_q)) if q <= best_q => {}
            _ => best = Some((action, q)),
        }
    }
    best
}

/// Greedy policy over the non-terminal `states`.
pub fn greedy_policy<M: Mdp>(
    model: &M,
    states: &[M::State],
    values: &ValueFunction<M::State>,
    gamma: Real,
) -> PolicyMap<M::State, M::Action> {
    states
        .iter()
        .filter(|state| !model.is_terminal(state))
        .filter_map(|state| {
            greedy_action(model, values, state, gamma).map(|(action, _)| (state.clone(), action))
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_models::Choice;
    use super::*;
    use crate::actions::Move;
    use crate::config::GridConfig;
    use crate::grid::{Cell, GridWorld};

    #[test]
    fn test_q_value_ignores_terminal_successor_values() {
        let grid = GridWorld::new(&GridConfig::default()).unwrap();
        let mut values = ValueFunction::new();
        // A stale value on the goal must not leak into the backup.
        values.insert(Cell(0, 3), 100.0);
        let q = q_value(&grid, &values, &Cell(0, 2), Move::Right, 0.9);
        assert_eq!(q, 1.0 - 0.01);
    }

    #[test]
    fn test_greedy_ties_go_to_first_action() {
        let grid = GridWorld::new(&GridConfig::default()).unwrap();
        let values = ValueFunction::new();
        // From (2, 0) every move costs the step reward only.
        let (action, q) = greedy_action(&grid, &values, &Cell(2, 0), 0.9).unwrap();
        assert_eq!(action, Move::Up);
        assert_eq!(q, -0.01);
    }

    #[test]
    fn test_greedy_policy_skips_terminals() {
        let values = ValueFunction::new();
        let policy = greedy_policy(&Choice, &[0, 1, 2], &values, 0.9);
        assert_eq!(policy.len(), 2);
        assert_eq!(policy.get(&0), Some(1));
        assert_eq!(policy.get(&1), Some(0));
        assert_eq!(policy.get(&2), None);
    }
}
