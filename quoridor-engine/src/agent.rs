//! Playable strategies built on the search and evaluation modules.

use log::warn;
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::board::Move;
use crate::eval::{heuristic_oracle, simple_value};
use crate::game::Quoridor;
use crate::planes::sample_action;
use crate::search::{alphabeta_search, Mcts};

/// A move-picking strategy. `choose_move` takes the game mutably because
/// searches descend through temporary moves; every implementation hands the
/// state back exactly as it found it.
pub trait Agent {
    fn name(&self) -> String;

    /// The chosen move, or `None` when the agent finds nothing playable
    /// (finished game, or a search came back empty).
    fn choose_move(&mut self, game: &mut Quoridor) -> Option<Move>;
}

/// Uniformly random over all fully-legal moves.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        RandomAgent { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> String {
        "random".to_string()
    }

    fn choose_move(&mut self, game: &mut Quoridor) -> Option<Move> {
        game.all_legal_moves(false).choose(&mut self.rng).copied()
    }
}

/// Never places a wall: steps along the maintained shortest path, falling
/// back to the distance-minimizing legal pawn move when the path is blocked
/// by the opponent's pawn (jump situations).
pub struct GreedyPathAgent;

impl Agent for GreedyPathAgent {
    fn name(&self) -> String {
        "greedy-path".to_string()
    }

    fn choose_move(&mut self, game: &mut Quoridor) -> Option<Move> {
        let me = game.current_player();
        let pos = game.position(me);
        let step = game.path_graph(me).path_from(pos).next();
        if let Some(step) = step {
            let mv = Move::Pawn(step);
            if game.is_legal_move(&mv) {
                return Some(mv);
            }
        }
        game.all_legal_moves(false)
            .into_iter()
            .filter_map(|mv| match mv {
                Move::Pawn(to) => {
                    let left = game.path_graph(me).distance(to)?;
                    Some((left, mv))
                }
                Move::Wall(_) => None,
            })
            .min_by_key(|(left, _)| *left)
            .map(|(_, mv)| mv)
    }
}

/// Alpha-beta over the heuristic evaluation.
pub struct AlphaBetaAgent {
    depth: usize,
}

impl AlphaBetaAgent {
    pub fn new(depth: usize) -> Self {
        AlphaBetaAgent { depth }
    }
}

impl Agent for AlphaBetaAgent {
    fn name(&self) -> String {
        format!("alphabeta{}", self.depth)
    }

    fn choose_move(&mut self, game: &mut Quoridor) -> Option<Move> {
        alphabeta_search(game, &simple_value, self.depth)
    }
}

/// PUCT tree search over the heuristic oracle, choosing the most-visited
/// action. Builds a fresh tree per decision; persistent trees with
/// `step_and_prune` belong to self-play loops that control both sides.
pub struct MctsAgent {
    n_evals: usize,
    c_puct: f32,
    rng: StdRng,
}

impl MctsAgent {
    pub fn new(n_evals: usize, c_puct: f32, seed: u64) -> Self {
        MctsAgent { n_evals, c_puct, rng: StdRng::seed_from_u64(seed) }
    }
}

impl Agent for MctsAgent {
    fn name(&self) -> String {
        format!("mcts{}", self.n_evals)
    }

    fn choose_move(&mut self, game: &mut Quoridor) -> Option<Move> {
        let mut mcts = Mcts::new(game, heuristic_oracle);
        let policy = match mcts.search(game, self.c_puct, self.n_evals) {
            Ok(policy) => policy,
            Err(err) => {
                warn!("mcts search failed: {err}");
                return None;
            }
        };
        sample_action(&policy, game.current_player(), 0.0, &mut self.rng)
    }
}
