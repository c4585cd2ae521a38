use std::collections::HashMap;
use std::hash::Hash;

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::Real;
use crate::learning::policy::Policy;
use crate::learning::serde_utils;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QKey<S, A>(pub S, pub A);

impl<S, A> From<(S, A)> for QKey<S, A> {
    fn from(pair: (S, A)) -> Self {
        QKey(pair.0, pair.1)
    }
}

/// Action values for (state, action) pairs. Unseen pairs read as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize, A: Serialize",
    deserialize = "S: Deserialize<'de> + Eq + Hash, A: Deserialize<'de> + Eq + Hash"
))]
pub struct QTable<S: Eq + Hash, A: Eq + Hash> {
    // Struct keys are not valid JSON object keys, see `serde_utils`.
    #[serde(with = "serde_utils")]
    tab: HashMap<QKey<S, A>, Real>,
}

impl<S: Eq + Hash, A: Eq + Hash> Default for QTable<S, A> {
    fn default() -> Self {
        QTable {
            tab: HashMap::new(),
        }
    }
}

impl<S, A> QTable<S, A>
where
    S: Clone + Eq + Hash,
    A: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, state: &S, action: A) -> Real {
        self.tab
            .get(&QKey(state.clone(), action))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set(&mut self, state: S, action: A, value: Real) {
        self.tab.insert(QKey(state, action), value);
    }

    pub fn len(&self) -> usize {
        self.tab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tab.is_empty()
    }

    /// True if any of `actions` has been written for `state`.
    pub fn contains_state(&self, state: &S, actions: &[A]) -> bool {
        actions
            .iter()
            .any(|&action| self.tab.contains_key(&QKey(state.clone(), action)))
    }

    /// The first action in `actions` with the largest value, with its value.
    pub fn best(&self, state: &S, actions: &[A]) -> Option<(A, Real)> {
        let mut best: Option<(A, Real)> = None;
        for &action in actions {
            let q = self.get(state, action);
            match best {
                Some((_, best_q)) if q <= best_q => {}
                _ => best = Some((action, q)),
            }
        }
        best
    }

    pub fn greedy(&self, state: &S, actions: &[A]) -> Option<A> {
        self.best(state, actions).map(|(action, _)| action)
    }

    /// `max_a Q(state, a)`, or 0 when there are no actions.
    pub fn max_q(&self, state: &S, actions: &[A]) -> Real {
        self.best(state, actions).map_or(0.0, |(_, q)| q)
    }

    /// Uniformly random action with probability `epsilon`, greedy otherwise.
    pub fn epsilon_greedy(
        &self,
        state: &S,
        actions: &[A],
        epsilon: Real,
        rng: &mut StdRng,
    ) -> Option<A> {
        if actions.is_empty() {
            return None;
        }
        let r: Real = rng.random();
        if r < epsilon {
            Some(actions[rng.random_range(0..actions.len())])
        } else {
            self.greedy(state, actions)
        }
    }
}

/// Greedy with respect to the table. An unseen state reads as all zeros, so
/// it gets the first legal action like any other tie.
impl<S, A> Policy<S, A> for QTable<S, A>
where
    S: Clone + Eq + Hash,
    A: Copy + Eq + Hash,
{
    fn choose_action(&self, state: &S, actions: &[A]) -> Option<A> {
        self.greedy(state, actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Move;
    use crate::grid::Cell;
    use rand::SeedableRng;

    #[test]
    fn test_unseen_pairs_are_zero() {
        let mut q = QTable::new();
        q.set(Cell(0, 0), Move::Up, 0.5);
        assert_eq!(q.get(&Cell(0, 0), Move::Up), 0.5);
        assert_eq!(q.get(&Cell(0, 0), Move::Down), 0.0);
        assert_eq!(q.get(&Cell(1, 0), Move::Up), 0.0);
    }

    #[test]
    fn test_greedy_breaks_ties_by_action_order() {
        let mut q = QTable::new();
        let actions = Move::all();
        // All zero: the first action wins.
        assert_eq!(q.greedy(&Cell(0, 0), &actions), Some(Move::Up));

        q.set(Cell(0, 0), Move::Left, 1.0);
        q.set(Cell(0, 0), Move::Right, 1.0);
        assert_eq!(q.greedy(&Cell(0, 0), &actions), Some(Move::Left));
        assert_eq!(q.max_q(&Cell(0, 0), &actions), 1.0);
    }

    #[test]
    fn test_negative_values_lose_to_unseen() {
        let mut q = QTable::new();
        q.set(Cell(0, 0), Move::Up, -1.0);
        assert_eq!(q.greedy(&Cell(0, 0), &Move::all()), Some(Move::Down));
        assert_eq!(q.max_q(&Cell(0, 0), &Move::all()), 0.0);
        assert_eq!(q.max_q(&Cell(0, 0), &[]), 0.0);
    }

    #[test]
    fn test_policy_agrees_with_default_reads() {
        let mut q = QTable::new();
        q.set(Cell(0, 0), Move::Right, 0.3);
        let actions = Move::all();
        assert_eq!(q.choose_action(&Cell(0, 0), &actions), Some(Move::Right));

        // Never written: every action reads 0, so the first one is chosen.
        assert!(!q.contains_state(&Cell(2, 2), &actions));
        assert_eq!(q.get(&Cell(2, 2), Move::Up), 0.0);
        assert_eq!(q.choose_action(&Cell(2, 2), &actions), Some(Move::Up));
        assert_eq!(q.choose_action(&Cell(2, 2), &[Move::Left, Move::Down]), Some(Move::Left));
        // Only a state without legal actions has no choice.
        assert_eq!(q.choose_action(&Cell(2, 2), &[]), None);
    }

    #[test]
    fn test_epsilon_greedy_extremes() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut q = QTable::new();
        q.set(0u8, 1usize, 1.0);
        let actions = [0, 1, 2];
        for _ in 0..100 {
            assert_eq!(q.epsilon_greedy(&0, &actions, 0.0, &mut rng), Some(1));
        }
        // Fully random still only picks legal actions, and eventually all of them.
        let picked: Vec<usize> = (0..200)
            .filter_map(|_| q.epsilon_greedy(&0, &actions, 1.0, &mut rng))
            .collect();
        for action in actions {
            assert!(picked.contains(&action));
        }
        assert_eq!(q.epsilon_greedy(&0, &[], 1.0, &mut rng), None);
    }

    #[test]
    fn test_json_round_trip() {
        let mut q = QTable::new();
        q.set(Cell(2, 0), Move::Up, 0.5);
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, r#"{"tab":[[[[2,0],"Up"],0.5]]}"#);
        let back: QTable<Cell, Move> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }
}
