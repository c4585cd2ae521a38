pub mod actions;
pub mod config;
pub mod enumerate;
pub mod episode;
pub mod error;
pub mod grid;
pub mod learning;
pub mod mdp;
pub mod solver;
pub mod tictactoe;

pub type Real = f64;
