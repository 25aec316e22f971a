//! # Quoridor engine
//!
//! Core logic for the Quoridor board game: board geometry and notation,
//! incrementally-maintained shortest paths under wall placement and undo,
//! reversible game state with full rules enforcement, neural-net plane
//! encoders, and two searches (alpha-beta and PUCT Monte Carlo tree search).
//! Frontends such as the CLI match runner live in other crates.

pub mod agent;
pub mod board;
pub mod error;
pub mod eval;
pub mod game;
pub mod pathgraph;
pub mod planes;
pub mod search;

// The types almost every consumer touches.
pub use board::{Loc, Move, Orientation, Player, Wall};
pub use error::GameError;
pub use game::{HistoryEntry, PlayerState, Quoridor, TempMove};
pub use pathgraph::PathGraph;

pub use agent::{Agent, AlphaBetaAgent, GreedyPathAgent, MctsAgent, RandomAgent};
pub use eval::{heuristic_oracle, simple_value, uniform_policy};
pub use planes::{encode_actions, encode_state, sample_action, PolicyTensor, StateTensor};
pub use search::{alphabeta_search, Mcts};
