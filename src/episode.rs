use log::debug;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::Real;
use crate::error::SolveError;
use crate::grid::{Cell, GridWorld};
use crate::learning::environment::{Environment, Simulator};
use crate::learning::policy::Policy;
use crate::mdp::Mdp;
use crate::tictactoe::{Board, Mark, TicTacToe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
    /// The step cap was reached first.
    Timeout,
    /// An explicit policy map had no entry for a state on the way.
    Unmapped,
}

/// Classifies the terminal state an episode ended in.
pub trait Terminus<S> {
    fn classify(&self, terminal: &S) -> Outcome;
}

/// Goal cells carry a positive reward, hazards a negative one.
impl Terminus<Cell> for GridWorld {
    fn classify(&self, terminal: &Cell) -> Outcome {
        let reward = self.reward(*terminal);
        if reward > 0.0 {
            Outcome::Win
        } else if reward < 0.0 {
            Outcome::Loss
        } else {
            Outcome::Draw
        }
    }
}

impl Terminus<Board> for TicTacToe {
    fn classify(&self, terminal: &Board) -> Outcome {
        match terminal.winner() {
            Some(Mark::Agent) => Outcome::Win,
            Some(_) => Outcome::Loss,
            None => Outcome::Draw,
        }
    }
}

impl<M: Mdp + Terminus<M::State>> Terminus<M::State> for Simulator<M> {
    fn classify(&self, terminal: &M::State) -> Outcome {
        self.model().classify(terminal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode<S> {
    pub steps: usize,
    pub total_reward: Real,
    pub outcome: Outcome,
    /// Every state visited, starting with the start state.
    pub trajectory: Vec<S>,
}

/// Follows `policy` from `start` without exploration until a terminal state,
/// an unmapped state or `max_steps` steps.
pub fn run_greedy<E, P>(
    env: &E,
    policy: &P,
    start: E::State,
    max_steps: usize,
    rng: &mut StdRng,
) -> Result<Episode<E::State>, SolveError>
where
    E: Environment + Terminus<E::State>,
    P: Policy<E::State, E::Action>,
{
    let mut state = start;
    let mut trajectory = vec![state.clone()];
    let mut total_reward = 0.0;
    let mut steps = 0;

    let outcome = loop {
        let actions = env.actions(&state);
        if actions.is_empty() {
            break env.classify(&state);
        }
        if steps == max_steps {
            break Outcome::Timeout;
        }
        let Some(action) = policy.choose_action(&state, &actions) else {
            debug!("no action for {state:?}");
            break Outcome::Unmapped;
        };
        let step = env.step(&state, action, rng)?;
        steps += 1;
        total_reward += step.reward;
        trajectory.push(step.next_state.clone());
        if step.done {
            break env.classify(&step.next_state);
        }
        state = step.next_state;
    };

    Ok(Episode {
        steps,
        total_reward,
        outcome,
        trajectory,
    })
}
