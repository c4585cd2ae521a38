use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// A movement on a grid. The declaration order is the fixed action order
/// used for tie-breaking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter, Display,
)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// All moves in tie-breaking order.
    pub fn all() -> Vec<Move> {
        Move::iter().collect()
    }

    /// Row and column offsets of the move.
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Move::Up => (-1, 0),
            Move::Down => (1, 0),
            Move::Left => (0, -1),
            Move::Right => (0, 1),
        }
    }

    /// The two moves perpendicular to this one. Never includes the reverse move.
    pub fn orthogonal(&self) -> [Move; 2] {
        if self.is_vertical() {
            [Move::Left, Move::Right]
        } else {
            [Move::Up, Move::Down]
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, Move::Up | Move::Down)
    }
}
