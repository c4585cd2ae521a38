use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::learning::serde_utils;

/// Picks an action for a state, or none if the policy does not cover it.
///
/// `actions` are the legal actions in their fixed order. Tables of numbers
/// such as [`QTable`](crate::learning::q_table::QTable) read unseen entries
/// as 0 and so cover every state with actions; only an explicit
/// [`PolicyMap`] can leave a state out.
pub trait Policy<S, A> {
    fn choose_action(&self, state: &S, actions: &[A]) -> Option<A>;
}

/// An explicit state to action table, as produced by the DP solvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize, A: Serialize",
    deserialize = "S: Deserialize<'de> + Eq + Hash, A: Deserialize<'de>"
))]
pub struct PolicyMap<S: Eq + Hash, A> {
    #[serde(with = "serde_utils")]
    actions: HashMap<S, A>,
}

impl<S: Eq + Hash, A> Default for PolicyMap<S, A> {
    fn default() -> Self {
        PolicyMap {
            actions: HashMap::new(),
        }
    }
}

impl<S: Eq + Hash, A: Copy> PolicyMap<S, A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, state: &S) -> Option<A> {
        self.actions.get(state).copied()
    }

    /// Sets the action for `state`, returning the previous one.
    pub fn insert(&mut self, state: S, action: A) -> Option<A> {
        self.actions.insert(state, action)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, A)> {
        self.actions.iter().map(|(state, action)| (state, *action))
    }
}

impl<S: Eq + Hash, A> FromIterator<(S, A)> for PolicyMap<S, A> {
    fn from_iter<I: IntoIterator<Item = (S, A)>>(iter: I) -> Self {
        PolicyMap {
            actions: iter.into_iter().collect(),
        }
    }
}

impl<S: Eq + Hash, A: Copy> Policy<S, A> for PolicyMap<S, A> {
    fn choose_action(&self, state: &S, _actions: &[A]) -> Option<A> {
        self.get(state)
    }
}
