//! Heuristic evaluation and simple policies, for play without a trained net.

use crate::board::{Move, Player};
use crate::game::Quoridor;
use crate::planes::{encode_actions, PolicyTensor};

/// Distance stand-in for a cut-off pawn. Legal games never produce one; this
/// keeps the evaluation finite if a caller breaks that rule.
const UNREACHABLE_STEPS: usize = 100;

/// Static score of the position from `player`'s perspective: being ahead on
/// walls is worth a point each, being ahead on path length four points per
/// step, winning a thousand.
pub fn simple_value(game: &Quoridor, player: Player) -> f64 {
    let steps = |p: Player| game.distance_to_goal(p).unwrap_or(UNREACHABLE_STEPS) as f64;
    let walls = |p: Player| game.walls_remaining(p) as f64;

    let opponent = player.opponent();
    let path_diff = steps(player) - steps(opponent);
    let wall_diff = walls(player) - walls(opponent);

    let mut score = wall_diff - 4.0 * path_diff;
    if game.winner() == Some(player) {
        score += 1000.0;
    }
    score
}

/// Equal weight on every candidate move, with the cheap (partial) wall
/// filter: a sampler over this will occasionally propose a sealing wall and
/// must tolerate the rejection.
pub fn uniform_policy(game: &mut Quoridor) -> Vec<(Move, f64)> {
    game.all_legal_moves(true)
        .into_iter()
        .map(|mv| (mv, 1.0))
        .collect()
}

/// A drop-in policy/value oracle built from the pieces above: uniform prior
/// over fully-legal moves, heuristic value squashed into `[-1, 1]` from the
/// side to move's perspective.
pub fn heuristic_oracle(game: &mut Quoridor) -> (PolicyTensor, f32) {
    let me = game.current_player();
    let legal = game.all_legal_moves(false);
    let mut policy = encode_actions(&legal, me);
    if !legal.is_empty() {
        let weight = 1.0 / legal.len() as f32;
        for plane in &mut policy {
            for row in plane {
                for cell in row {
                    *cell *= weight;
                }
            }
        }
    }
    let value = (simple_value(game, me) / 25.0).tanh() as f32;
    (policy, value)
}
