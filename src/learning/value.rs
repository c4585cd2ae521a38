use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::Real;
use crate::learning::serde_utils;

/// State values. States never written read as 0, which is also the value of
/// every terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize",
    deserialize = "S: Deserialize<'de> + Eq + Hash"
))]
pub struct ValueFunction<S: Eq + Hash> {
    #[serde(with = "serde_utils")]
    values: HashMap<S, Real>,
}

impl<S: Eq + Hash> Default for ValueFunction<S> {
    fn default() -> Self {
        ValueFunction {
            values: HashMap::new(),
        }
    }
}

impl<S: Eq + Hash> ValueFunction<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, state: &S) -> Real {
        self.values.get(state).copied().unwrap_or(0.0)
    }

    pub fn insert(&mut self, state: S, value: Real) {
        self.values.insert(state, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, Real)> {
        self.values.iter().map(|(state, value)| (state, *value))
    }

    /// Largest absolute difference to `other` over the states of either table.
    pub fn max_difference(&self, other: &ValueFunction<S>) -> Real {
        self.values
            .keys()
            .chain(other.values.keys())
            .map(|state| (self.get(state) - other.get(state)).abs())
            .fold(0.0, Real::max)
    }
}

impl<S: Eq + Hash> FromIterator<(S, Real)> for ValueFunction<S> {
    fn from_iter<I: IntoIterator<Item = (S, Real)>>(iter: I) -> Self {
        ValueFunction {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;

    #[test]
    fn test_unseen_states_default_to_zero() {
        let mut values = ValueFunction::new();
        values.insert(Cell(0, 0), 0.5);
        assert_eq!(values.get(&Cell(0, 0)), 0.5);
        assert_eq!(values.get(&Cell(4, 4)), 0.0);
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_max_difference() {
        let a: ValueFunction<u8> = [(0, 1.0), (1, 2.0)].into_iter().collect();
        let b: ValueFunction<u8> = [(0, 1.5), (2, -3.0)].into_iter().collect();
        // State 1 only in a, state 2 only in b.
        assert_eq!(a.max_difference(&b), 3.0);
        assert_eq!(b.max_difference(&a), 3.0);
    }

    #[test]
    fn test_json_round_trip() {
        let values: ValueFunction<Cell> = [(Cell(1, 2), 0.25)].into_iter().collect();
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"{"values":[[[1,2],0.25]]}"#);
        let back: ValueFunction<Cell> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
