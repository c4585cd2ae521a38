use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::process;

use bellman::{
    Real,
    actions::Move,
    config::{Config, SolverConfig},
    episode::{Episode, Outcome, run_greedy},
    grid::{Cell, GridWorld},
    learning::{
        environment::{Environment, Simulator},
        q_learning::QLearner,
    },
    mdp::StateSpace,
    solver::{policy_iteration, value_iteration},
    tictactoe::{Board, TicTacToe},
};
use itertools::Itertools;
use log::{error, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

const GAMES: usize = 1_000;

#[derive(Serialize)]
struct Report {
    grid_values: Vec<(Cell, Real)>,
    grid_policy: Vec<(Cell, Move)>,
    value_iteration_sweeps: usize,
    policy_iteration_rounds: usize,
    solved_episode: Episode<Cell>,
    learned_episode: Episode<Cell>,
    final_epsilon: Real,
    tictactoe_states: usize,
    opening_value: Real,
    opening_move: Option<usize>,
    tictactoe_results: HashMap<Outcome, usize>,
    learned_tictactoe_boards_seen: usize,
    learned_tictactoe_results: HashMap<Outcome, usize>,
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path))?,
        None => Config::default(),
    };
    let mut rng = match config.learning.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    // Grid world, solved both ways.
    let grid = GridWorld::new(&config.grid)?;
    let cells = grid.states();
    let vi = value_iteration(&grid, &cells, &config.solver)?;
    let pi = policy_iteration(&grid, &cells, &config.solver)?;
    let disagreements = cells
        .iter()
        .filter(|cell| vi.policy.get(cell) != pi.policy.get(cell))
        .count();
    info!(
        "grid solved: {} sweeps of value iteration, {} rounds of policy iteration, {disagreements} cells choose differently",
        vi.iterations, pi.iterations
    );

    // The same grid, learned from samples.
    let starts = grid.start_states();
    let env = Simulator::new(grid, starts)?;
    let training = QLearner::new(config.learning.clone())?.train(&env)?;
    if training.timeouts() > 0 {
        warn!(
            "{} of {} training episodes hit the step cap",
            training.timeouts(),
            training.episodes.len()
        );
    }

    let start = env.reset(&mut rng);
    let max_steps = config.learning.max_steps;
    let solved_episode = run_greedy(&env, &vi.policy, start, max_steps, &mut rng)?;
    let learned_episode = run_greedy(&env, &training.q_table, start, max_steps, &mut rng)?;
    info!(
        "greedy episodes from {start:?}: solved policy {} in {} steps, learned policy {} in {} steps",
        solved_episode.outcome,
        solved_episode.steps,
        learned_episode.outcome,
        learned_episode.steps
    );

    // Tic-tac-toe against a random opponent. Games are short, so no discount.
    let game = TicTacToe::new();
    let boards = game.states();
    let game_config = SolverConfig {
        gamma: 1.0,
        ..config.solver.clone()
    };
    let game_solution = value_iteration(&game, &boards, &game_config)?;
    let opening_value = game_solution.values.get(&Board::empty());
    let opening_move = game_solution.policy.get(&Board::empty());
    info!(
        "tic-tac-toe: {} decision states, opening value {opening_value:.3}, opening move {opening_move:?}",
        boards.len()
    );

    let game_env = Simulator::new(game, vec![Board::empty()])?;
    let outcomes: Vec<Outcome> = (0..GAMES)
        .map(|_| {
            run_greedy(&game_env, &game_solution.policy, Board::empty(), 9, &mut rng)
                .map(|episode| episode.outcome)
        })
        .collect::<Result<_, _>>()?;
    let tictactoe_results = outcomes.into_iter().counts();
    info!("{GAMES} games with the solved policy: {tictactoe_results:?}");

    // The same game learned from play, without the model.
    let game_training = QLearner::new(config.learning.clone())?.train(&game_env)?;
    let learned_tictactoe_boards_seen = boards
        .iter()
        .filter(|board| game_training.q_table.contains_state(board, &game_env.actions(board)))
        .count();
    let outcomes: Vec<Outcome> = (0..GAMES)
        .map(|_| {
            run_greedy(&game_env, &game_training.q_table, Board::empty(), 9, &mut rng)
                .map(|episode| episode.outcome)
        })
        .collect::<Result<_, _>>()?;
    let learned_tictactoe_results = outcomes.into_iter().counts();
    info!(
        "{GAMES} games with the learned policy ({learned_tictactoe_boards_seen} of {} boards seen in training): {learned_tictactoe_results:?}",
        boards.len()
    );

    let report = Report {
        grid_values: vi
            .values
            .iter()
            .map(|(cell, value)| (*cell, value))
            .sorted_by_key(|(cell, _)| *cell)
            .collect(),
        grid_policy: cells
            .iter()
            .filter_map(|cell| vi.policy.get(cell).map(|action| (*cell, action)))
            .collect(),
        value_iteration_sweeps: vi.iterations,
        policy_iteration_rounds: pi.iterations,
        solved_episode,
        learned_episode,
        final_epsilon: training.epsilon,
        tictactoe_states: boards.len(),
        opening_value,
        opening_move,
        tictactoe_results,
        learned_tictactoe_boards_seen,
        learned_tictactoe_results,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
