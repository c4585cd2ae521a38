use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::Real;
use crate::enumerate::reachable;
use crate::mdp::{Mdp, StateSpace, Transition};

pub const CELLS: usize = 9;

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mark {
    Empty,
    /// The learning player, `X`. Always moves first.
    Agent,
    /// The environment-controlled player, `O`.
    Opponent,
}

impl Mark {
    pub fn symbol(&self) -> char {
        match self {
            Mark::Empty => '.',
            Mark::Agent => 'X',
            Mark::Opponent => 'O',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Mark> {
        match symbol {
            '.' => Some(Mark::Empty),
            'X' => Some(Mark::Agent),
            'O' => Some(Mark::Opponent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseBoardError {
    #[error("expected {CELLS} cells, found {0}")]
    Length(usize),

    #[error("invalid mark {0:?}, expected one of 'X', 'O', '.'")]
    Mark(char),
}

/// A 3x3 board, cells numbered row-major from 0.
///
/// Boards are immutable values. The key form is the 9-character string of
/// marks (`X`, `O`, `.`) produced by `Display` and read back by `FromStr`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Board([Mark; CELLS]);

impl Board {
    pub fn empty() -> Self {
        Board([Mark::Empty; CELLS])
    }

    pub fn mark(&self, cell: usize) -> Mark {
        self.0[cell]
    }

    /// A copy of the board with `mark` placed on `cell`.
    pub fn place(&self, cell: usize, mark: Mark) -> Board {
        let mut cells = self.0;
        cells[cell] = mark;
        Board(cells)
    }

    pub fn empty_cells(&self) -> Vec<usize> {
        (0..CELLS).filter(|&cell| self.0[cell] == Mark::Empty).collect()
    }

    pub fn count(&self, mark: Mark) -> usize {
        self.0.iter().filter(|&&m| m == mark).count()
    }

    pub fn is_full(&self) -> bool {
        !self.0.contains(&Mark::Empty)
    }

    pub fn is_won_by(&self, mark: Mark) -> bool {
        LINES
            .iter()
            .any(|line| line.iter().all(|&cell| self.0[cell] == mark))
    }

    pub fn winner(&self) -> Option<Mark> {
        [Mark::Agent, Mark::Opponent]
            .into_iter()
            .find(|&mark| self.is_won_by(mark))
    }

    /// A win for either side or a full board.
    pub fn is_over(&self) -> bool {
        self.winner().is_some() || self.is_full()
    }

    /// The agent moves first, so it is to move whenever both have placed
    /// the same number of marks.
    pub fn to_move(&self) -> Mark {
        if self.count(Mark::Agent) == self.count(Mark::Opponent) {
            Mark::Agent
        } else {
            Mark::Opponent
        }
    }

    /// Boards reachable by one move of the side to move. None once the game is over.
    pub fn successors(&self) -> Vec<Board> {
        if self.is_over() {
            return Vec::new();
        }
        let mark = self.to_move();
        self.empty_cells()
            .into_iter()
            .map(|cell| self.place(cell, mark))
            .collect()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key: String = self.0.iter().map(Mark::symbol).collect();
        f.write_str(&key)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({self})")
    }
}

impl FromStr for Board {
    type Err = ParseBoardError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let marks = key
            .chars()
            .map(|symbol| Mark::from_symbol(symbol).ok_or(ParseBoardError::Mark(symbol)))
            .collect::<Result<Vec<Mark>, _>>()?;
        let cells: [Mark; CELLS] = marks
            .try_into()
            .map_err(|marks: Vec<Mark>| ParseBoardError::Length(marks.len()))?;
        Ok(Board(cells))
    }
}

impl From<Board> for String {
    fn from(board: Board) -> Self {
        board.to_string()
    }
}

impl TryFrom<String> for Board {
    type Error = ParseBoardError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        key.parse()
    }
}

/// Tic-tac-toe against an opponent who picks uniformly among the empty cells.
///
/// The agent's action is the cell it marks. The opponent's reply is part of
/// the transition, so every non-terminal next state has the agent to move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicTacToe;

impl TicTacToe {
    pub const WIN_REWARD: Real = 1.0;
    pub const LOSS_REWARD: Real = -1.0;
    pub const DRAW_REWARD: Real = 0.0;

    pub fn new() -> Self {
        TicTacToe
    }

    /// Every board reachable from the empty board by alternating play,
    /// including finished games and boards with the opponent to move.
    pub fn reachable(&self) -> HashSet<Board> {
        reachable(Board::empty(), Board::successors)
    }
}

impl Mdp for TicTacToe {
    type State = Board;
    type Action = usize;

    fn legal_actions(&self, state: &Board) -> Vec<usize> {
        if state.is_over() {
            return Vec::new();
        }
        state.empty_cells()
    }

    fn is_terminal(&self, state: &Board) -> bool {
        state.is_over()
    }

    fn outcomes(&self, state: &Board, action: usize) -> Vec<Transition<Board>> {
        let afterstate = state.place(action, Mark::Agent);
        if afterstate.is_won_by(Mark::Agent) {
            return vec![Transition::certain(afterstate, TicTacToe::WIN_REWARD, true)];
        }
        let replies = afterstate.empty_cells();
        if replies.is_empty() {
            return vec![Transition::certain(afterstate, TicTacToe::DRAW_REWARD, true)];
        }
        let probability = 1.0 / replies.len() as Real;
        replies
            .into_iter()
            .map(|reply| {
                let next_state = afterstate.place(reply, Mark::Opponent);
                let (reward, terminal) = if next_state.is_won_by(Mark::Opponent) {
                    (TicTacToe::LOSS_REWARD, true)
                } else if next_state.is_full() {
                    (TicTacToe::DRAW_REWARD, true)
                } else {
                    (0.0, false)
                };
                Transition {
                    probability,
                    next_state,
                    reward,
                    terminal,
                }
            })
            .collect()
    }
}

impl StateSpace for TicTacToe {
    /// Unfinished boards with the agent to move, sorted.
    fn states(&self) -> Vec<Board> {
        self.reachable()
            .into_iter()
            .filter(|board| !board.is_over() && board.to_move() == Mark::Agent)
            .sorted()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdp::check_model;

    fn board(key: &str) -> Board {
        key.parse().unwrap()
    }

    #[test]
    fn test_key_round_trip() {
        let b = board("XO.X..O..");
        assert_eq!(b.to_string(), "XO.X..O..");
        assert_eq!(b.mark(0), Mark::Agent);
        assert_eq!(b.mark(1), Mark::Opponent);
        assert_eq!(b.mark(2), Mark::Empty);
        assert_eq!(format!("{b:?}"), "Board(XO.X..O..)");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("XO".parse::<Board>(), Err(ParseBoardError::Length(2)));
        assert_eq!(
            "XO.X..O.Z".parse::<Board>(),
            Err(ParseBoardError::Mark('Z'))
        );
    }

    #[test]
    fn test_serde_uses_key_form() {
        let b = board("X...O....");
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "\"X...O....\"");
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert!(serde_json::from_str::<Board>("\"X\"").is_err());
    }

    #[test]
    fn test_winner() {
        assert_eq!(board("XXX.OO...").winner(), Some(Mark::Agent));
        assert_eq!(board("XO.XO..O.").winner(), Some(Mark::Opponent));
        assert_eq!(board("X.O.X.O.X").winner(), Some(Mark::Agent));
        assert_eq!(board("X.O.OXO..").winner(), Some(Mark::Opponent));
        assert_eq!(board("XOXXOOOXX").winner(), None);
        assert!(board("XOXXOOOXX").is_over());
        assert!(!Board::empty().is_over());
    }

    #[test]
    fn test_place_returns_new_board() {
        let empty = Board::empty();
        let next = empty.place(4, Mark::Agent);
        assert_eq!(empty, Board::empty());
        assert_eq!(next.to_string(), "....X....");
        assert_eq!(next.to_move(), Mark::Opponent);
        assert_eq!(next.successors().len(), 8);
    }

    #[test]
    fn test_immediate_win() {
        let game = TicTacToe::new();
        let outcomes = game.outcomes(&board("OO.XX...."), 5);
        assert_eq!(
            outcomes,
            vec![Transition::certain(board("OO.XXX..."), 1.0, true)]
        );
    }

    #[test]
    fn test_draw_on_last_cell() {
        let game = TicTacToe::new();
        let outcomes = game.outcomes(&board("XOXXOOOX."), 8);
        assert_eq!(
            outcomes,
            vec![Transition::certain(board("XOXXOOOXX"), 0.0, true)]
        );
    }

    #[test]
    fn test_opponent_replies() {
        let game = TicTacToe::new();
        let outcomes = game.outcomes(&board("OO.XX...."), 8);
        assert_eq!(outcomes.len(), 4);
        for outcome in &outcomes {
            assert_eq!(outcome.probability, 0.25);
        }
        // The opponent completes the top row.
        let loss = &outcomes[0];
        assert_eq!(loss.next_state, board("OOOXX...X"));
        assert_eq!(loss.reward, -1.0);
        assert!(loss.terminal);
        for outcome in &outcomes[1..] {
            assert_eq!(outcome.reward, 0.0);
            assert!(!outcome.terminal);
            assert_eq!(outcome.next_state.to_move(), Mark::Agent);
        }
    }

    #[test]
    fn test_opponent_fills_board() {
        let game = TicTacToe::new();
        // Not reachable by alternating play, but the opponent's only reply
        // fills the board without completing a line.
        let outcomes = game.outcomes(&board("X.OOXXX.O"), 1);
        assert_eq!(
            outcomes,
            vec![Transition::certain(board("XXOOXXXOO"), 0.0, true)]
        );
    }

    #[test]
    fn test_decision_states() {
        let game = TicTacToe::new();
        let states = game.states();
        assert!(states.contains(&Board::empty()));
        assert!(states.iter().all(|b| !b.is_over()));
        assert!(states.iter().all(|b| b.to_move() == Mark::Agent));
        assert!(states.windows(2).all(|w| w[0] < w[1]));
        assert!(check_model(&game, &states).is_ok());
    }
}
