//! Depth-limited minimax with alpha-beta pruning and transposition skipping.

use std::collections::HashSet;

use log::debug;

use crate::board::{Move, Player};
use crate::game::Quoridor;

const INFINITY: f64 = 1e9;

/// Pick the best move for the side to move by minimax to `max_depth` extra
/// plies, pruning with alpha-beta and skipping any state already visited in
/// this search (the visited set is seeded with the root, so null-ish
/// shuffles are never explored twice).
///
/// `eval_fn` scores a position for a given player and is always called with
/// the root player, whoever is to move at the leaf. It must be pure and
/// finite. Ties at the root go to the first candidate in move order. The
/// game is explored through temporary moves and comes back untouched.
pub fn alphabeta_search<F>(game: &mut Quoridor, eval_fn: &F, max_depth: usize) -> Option<Move>
where
    F: Fn(&Quoridor, Player) -> f64,
{
    let search = AlphaBeta {
        eval_fn,
        root_player: game.current_player(),
        max_depth,
    };
    let mut visited: HashSet<u64> = HashSet::from([game.hash_key()]);

    let mut best: Option<(f64, Move)> = None;
    for mv in game.all_legal_moves(false) {
        let mut scope = game.temp_move(&mv);
        if !visited.insert(scope.hash_key()) {
            continue;
        }
        let score = search.min_value(&mut scope, -INFINITY, INFINITY, 0, &mut visited);
        drop(scope);
        if best.map_or(true, |(b, _)| score > b) {
            best = Some((score, mv));
        }
    }
    if let Some((score, mv)) = best {
        debug!("alphabeta depth {max_depth}: {mv} scores {score:.2}");
    }
    best.map(|(_, mv)| mv)
}

struct AlphaBeta<'a, F> {
    eval_fn: &'a F,
    root_player: Player,
    max_depth: usize,
}

impl<F> AlphaBeta<'_, F>
where
    F: Fn(&Quoridor, Player) -> f64,
{
    fn cutoff(&self, game: &Quoridor, depth: usize) -> bool {
        depth > self.max_depth || game.winner().is_some()
    }

    fn max_value(
        &self,
        game: &mut Quoridor,
        mut alpha: f64,
        beta: f64,
        depth: usize,
        visited: &mut HashSet<u64>,
    ) -> f64 {
        if self.cutoff(game, depth) {
            return (self.eval_fn)(game, self.root_player);
        }
        let mut value = -INFINITY;
        for mv in game.all_legal_moves(false) {
            let mut scope = game.temp_move(&mv);
            if !visited.insert(scope.hash_key()) {
                continue;
            }
            value = value.max(self.min_value(&mut scope, alpha, beta, depth + 1, visited));
            drop(scope);
            if value >= beta {
                return value;
            }
            alpha = alpha.max(value);
        }
        value
    }

    fn min_value(
        &self,
        game: &mut Quoridor,
        alpha: f64,
        mut beta: f64,
        depth: usize,
        visited: &mut HashSet<u64>,
    ) -> f64 {
        if self.cutoff(game, depth) {
            return (self.eval_fn)(game, self.root_player);
        }
        let mut value = INFINITY;
        for mv in game.all_legal_moves(false) {
            let mut scope = game.temp_move(&mv);
            if !visited.insert(scope.hash_key()) {
                continue;
            }
            value = value.min(self.max_value(&mut scope, alpha, beta, depth + 1, visited));
            drop(scope);
            if value <= alpha {
                return value;
            }
            beta = beta.min(value);
        }
        value
    }
}
