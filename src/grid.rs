use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::Real;
use crate::actions::Move;
use crate::config::{GridConfig, SlipConfig};
use crate::error::ConfigError;
use crate::mdp::{Mdp, PROBABILITY_TOLERANCE, StateSpace, Transition};

/// A (row, col) position on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell(pub usize, pub usize);

impl From<(usize, usize)> for Cell {
    fn from(pair: (usize, usize)) -> Self {
        Cell(pair.0, pair.1)
    }
}

impl From<[usize; 2]> for Cell {
    fn from(pair: [usize; 2]) -> Self {
        Cell(pair[0], pair[1])
    }
}

impl Cell {
    pub fn row(&self) -> usize {
        self.0
    }

    pub fn col(&self) -> usize {
        self.1
    }
}

/// For every intended move, the moves that actually happen and their probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct SlipTable {
    table: HashMap<Move, Vec<(Move, Real)>>,
}

impl SlipTable {
    /// Every move happens as intended.
    pub fn deterministic() -> Self {
        SlipTable {
            table: Move::iter().map(|action| (action, vec![(action, 1.0)])).collect(),
        }
    }

    /// The intended move with probability `intended`, each perpendicular move
    /// with probability `orthogonal`.
    pub fn orthogonal(intended: Real, orthogonal: Real) -> Result<Self, ConfigError> {
        let table = Move::iter()
            .map(|action| {
                let [a, b] = action.orthogonal();
                (action, vec![(action, intended), (a, orthogonal), (b, orthogonal)])
            })
            .collect();
        SlipTable::new(table)
    }

    /// Validates a custom table. Every move must have an entry whose
    /// probabilities sum to 1. Zero-probability entries are dropped.
    pub fn new(table: HashMap<Move, Vec<(Move, Real)>>) -> Result<Self, ConfigError> {
        let mut checked = HashMap::new();
        for action in Move::iter() {
            let Some(row) = table.get(&action) else {
                return Err(ConfigError::Validation(format!(
                    "slip table has no entry for {action}"
                )));
            };
            let sum: Real = row.iter().map(|(_, p)| p).sum();
            let negative = row.iter().any(|(_, p)| *p < 0.0);
            if negative || (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                return Err(ConfigError::SlipDistribution {
                    action: action.to_string(),
                    sum,
                });
            }
            let row = row.iter().copied().filter(|(_, p)| *p > 0.0).collect_vec();
            checked.insert(action, row);
        }
        Ok(SlipTable { table: checked })
    }

    pub fn from_config(config: Option<&SlipConfig>) -> Result<Self, ConfigError> {
        match config {
            Some(slip) => SlipTable::orthogonal(slip.intended, slip.orthogonal),
            None => Ok(SlipTable::deterministic()),
        }
    }

    /// The moves that may happen when `action` is intended.
    pub fn deviations(&self, action: Move) -> &[(Move, Real)] {
        self.table.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A rectangular grid world. The boundary and wall cells block movement.
#[derive(Debug, Clone, PartialEq)]
pub struct GridWorld {
    rows: usize,
    cols: usize,
    step_reward: Real,
    rewards: Vec<Vec<Real>>,
    terminals: HashSet<Cell>,
    walls: HashSet<Cell>,
    start: Option<Cell>,
    slip: SlipTable,
}

impl GridWorld {
    pub fn new(config: &GridConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(GridWorld {
            rows: config.rows,
            cols: config.cols,
            step_reward: config.step_reward,
            rewards: config.rewards.clone(),
            terminals: config.terminals.iter().copied().map(Cell::from).collect(),
            walls: config.walls.iter().copied().map(Cell::from).collect(),
            start: config.start.map(Cell::from),
            slip: SlipTable::from_config(config.slip.as_ref())?,
        })
    }

    /// Replace the slip model, e.g. with a custom validated table.
    pub fn with_slip(mut self, slip: SlipTable) -> Self {
        self.slip = slip;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Intrinsic reward of entering `cell`, 0 for a cell off the grid.
    pub fn reward(&self, cell: Cell) -> Real {
        self.rewards
            .get(cell.row())
            .and_then(|row| row.get(cell.col()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row() < self.rows && cell.col() < self.cols
    }

    pub fn is_wall(&self, cell: Cell) -> bool {
        self.walls.contains(&cell)
    }

    /// Where `action` leads from `cell` when it happens as intended.
    pub fn next_cell(&self, cell: Cell, action: Move) -> Cell {
        let (dr, dc) = action.delta();
        let next = Cell(clamp(cell.row(), dr, self.rows), clamp(cell.col(), dc, self.cols));
        if self.is_wall(next) { cell } else { next }
    }

    /// Every non-wall cell in row-major order.
    pub fn cells(&self) -> Vec<Cell> {
        (0..self.rows)
            .cartesian_product(0..self.cols)
            .map(Cell::from)
            .filter(|cell| !self.is_wall(*cell))
            .collect()
    }

    /// The configured start cell, or every non-terminal cell.
    pub fn start_states(&self) -> Vec<Cell> {
        match self.start {
            Some(cell) => vec![cell],
            None => self
                .cells()
                .into_iter()
                .filter(|cell| !self.is_terminal(cell))
                .collect(),
        }
    }
}

fn clamp(position: usize, delta: isize, len: usize) -> usize {
    let moved = position as isize + delta;
    moved.clamp(0, len as isize - 1) as usize
}

impl Mdp for GridWorld {
    type State = Cell;
    type Action = Move;

    fn legal_actions(&self, state: &Cell) -> Vec<Move> {
        if self.is_terminal(state) {
            return Vec::new();
        }
        Move::all()
    }

    fn is_terminal(&self, state: &Cell) -> bool {
        self.terminals.contains(state)
    }

    fn outcomes(&self, state: &Cell, action: Move) -> Vec<Transition<Cell>> {
        self.slip
            .deviations(action)
            .iter()
            .map(|&(actual, probability)| {
                let next_state = self.next_cell(*state, actual);
                Transition {
                    probability,
                    next_state,
                    reward: self.step_reward + self.reward(next_state),
                    terminal: self.is_terminal(&next_state),
                }
            })
            .collect()
    }
}

impl StateSpace for GridWorld {
    fn states(&self) -> Vec<Cell> {
        self.cells()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdp::check_model;

    fn world() -> GridWorld {
        GridWorld::new(&GridConfig::default()).unwrap()
    }

    fn slippery() -> GridWorld {
        GridWorld::new(&GridConfig {
            slip: Some(SlipConfig::default()),
            ..GridConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_boundary_clamping() {
        let grid = world();
        // Moving up from the top row stays in the top row.
        assert_eq!(grid.next_cell(Cell(0, 0), Move::Up), Cell(0, 0));
        assert_eq!(grid.next_cell(Cell(0, 2), Move::Up), Cell(0, 2));
        assert_eq!(grid.next_cell(Cell(2, 3), Move::Right), Cell(2, 3));
        assert_eq!(grid.next_cell(Cell(2, 0), Move::Down), Cell(2, 0));
        assert_eq!(grid.next_cell(Cell(2, 0), Move::Left), Cell(2, 0));
        // Free movement.
        assert_eq!(grid.next_cell(Cell(2, 0), Move::Up), Cell(1, 0));
        assert_eq!(grid.next_cell(Cell(0, 0), Move::Right), Cell(0, 1));
    }

    #[test]
    fn test_walls_block() {
        let grid = world();
        assert_eq!(grid.next_cell(Cell(0, 1), Move::Down), Cell(0, 1));
        assert_eq!(grid.next_cell(Cell(1, 0), Move::Right), Cell(1, 0));
        assert!(!grid.cells().contains(&Cell(1, 1)));
        assert_eq!(grid.cells().len(), 11);
    }

    #[test]
    fn test_reward_and_terminal() {
        let grid = world();
        let outcomes = grid.outcomes(&Cell(0, 2), Move::Right);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].next_state, Cell(0, 3));
        assert_eq!(outcomes[0].reward, 1.0 - 0.01);
        assert!(outcomes[0].terminal);

        let outcomes = grid.outcomes(&Cell(2, 3), Move::Up);
        assert_eq!(outcomes[0].next_state, Cell(1, 3));
        assert_eq!(outcomes[0].reward, -1.0 - 0.01);
        assert!(outcomes[0].terminal);

        let outcomes = grid.outcomes(&Cell(2, 0), Move::Right);
        assert_eq!(outcomes[0].reward, -0.01);
        assert!(!outcomes[0].terminal);
    }

    #[test]
    fn test_cells_off_the_grid() {
        let grid = world();
        assert!(grid.contains(Cell(2, 3)));
        assert!(!grid.contains(Cell(3, 0)));
        assert!(!grid.contains(Cell(0, 4)));
        assert_eq!(grid.reward(Cell(3, 0)), 0.0);
        assert_eq!(grid.reward(Cell(0, 9)), 0.0);
        // Moves from outside are clamped back onto the grid.
        let outcomes = grid.outcomes(&Cell(7, 7), Move::Up);
        assert_eq!(outcomes[0].next_state, Cell(2, 3));
    }

    #[test]
    fn test_terminal_cells_have_no_actions() {
        let grid = world();
        assert!(grid.legal_actions(&Cell(0, 3)).is_empty());
        assert_eq!(grid.legal_actions(&Cell(0, 0)).len(), 4);
    }

    #[test]
    fn test_slip_outcomes_sum_to_one() {
        let grid = slippery();
        for cell in grid.cells() {
            for action in grid.legal_actions(&cell) {
                let outcomes = grid.outcomes(&cell, action);
                assert_eq!(outcomes.len(), 3);
                let sum: Real = outcomes.iter().map(|o| o.probability).sum();
                assert_eq!(sum, 1.0);
            }
        }
        assert!(check_model(&grid, &grid.states()).is_ok());
    }

    #[test]
    fn test_slip_deviates_orthogonally() {
        let grid = slippery();
        let outcomes = grid.outcomes(&Cell(2, 1), Move::Up);
        let next = outcomes
            .iter()
            .map(|o| (o.next_state, o.probability))
            .collect_vec();
        // Up is blocked by the wall at (1, 1), so the agent stays put.
        assert_eq!(next, vec![(Cell(2, 1), 0.8), (Cell(2, 0), 0.1), (Cell(2, 2), 0.1)]);

        let outcomes = grid.outcomes(&Cell(2, 0), Move::Right);
        let next = outcomes.iter().map(|o| o.next_state).collect_vec();
        assert_eq!(next, vec![Cell(2, 1), Cell(1, 0), Cell(2, 0)]);
    }

    #[test]
    fn test_custom_slip_table() {
        let mut table: HashMap<Move, Vec<(Move, Real)>> = Move::iter()
            .map(|action| (action, vec![(action, 0.5), (action.orthogonal()[0], 0.5)]))
            .collect();
        let slip = SlipTable::new(table.clone()).unwrap();
        assert_eq!(slip.deviations(Move::Up), &[(Move::Up, 0.5), (Move::Left, 0.5)]);

        table.insert(Move::Down, vec![(Move::Down, 0.9)]);
        assert!(matches!(
            SlipTable::new(table.clone()),
            Err(ConfigError::SlipDistribution { .. })
        ));

        table.remove(&Move::Down);
        assert!(matches!(
            SlipTable::new(table),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_slip_is_deterministic() {
        let slip = SlipTable::orthogonal(1.0, 0.0).unwrap();
        assert_eq!(slip, SlipTable::deterministic());
    }

    #[test]
    fn test_start_states() {
        let grid = world();
        assert_eq!(grid.start_states(), vec![Cell(2, 0)]);

        let grid = GridWorld::new(&GridConfig {
            start: None,
            ..GridConfig::default()
        })
        .unwrap();
        let starts = grid.start_states();
        assert_eq!(starts.len(), 9);
        assert!(!starts.contains(&Cell(0, 3)));
        assert!(!starts.contains(&Cell(1, 1)));
    }
}
