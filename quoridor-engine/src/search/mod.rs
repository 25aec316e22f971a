//! Move search: depth-limited alpha-beta and Monte Carlo tree search.

pub mod alphabeta;
pub mod mcts;

pub use alphabeta::alphabeta_search;
pub use mcts::Mcts;
