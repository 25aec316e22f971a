//! Tensor encodings of states and actions for a policy/value oracle.
//!
//! Everything here is oriented to the acting player: boards are flipped on
//! the row axis for South so that the enemy's gate is always "down" at row 8.
//! Tensors are plain fixed-size arrays indexed `[plane][row][col]`.

use rand::distributions::WeightedIndex;
use rand::prelude::*;

use crate::board::{Move, Orientation, Player, Wall, BOARD_SIZE, WALL_RANGE};
use crate::game::Quoridor;

/// State planes: {current pos, current walls, other pos, other walls,
/// horizontal-wall mask, vertical-wall mask}.
pub const STATE_PLANES: usize = 6;

/// Policy planes: {0: pawn destination, 1: horizontal wall, 2: vertical wall}.
pub const POLICY_PLANES: usize = 3;

pub type StateTensor = [[[f32; BOARD_SIZE]; BOARD_SIZE]; STATE_PLANES];
pub type PolicyTensor = [[[f32; BOARD_SIZE]; BOARD_SIZE]; POLICY_PLANES];

/// Flip a row coordinate into the acting player's perspective. The function
/// is its own inverse, so it also maps tensor rows back to board rows.
/// Vertical walls are labeled by their top cell, so their flip pivots one
/// row short: what was the bottom cell at `row + 1` becomes the new top.
pub fn flip_row(row: usize, player: Player, is_vwall: bool) -> usize {
    match player {
        Player::North => row,
        Player::South if is_vwall => WALL_RANGE - 1 - row,
        Player::South => BOARD_SIZE - 1 - row,
    }
}

/// Encode a game into `(6, 9, 9)` feature planes from the perspective of the
/// side to move.
pub fn encode_state(game: &Quoridor) -> StateTensor {
    let mut out = [[[0.0; BOARD_SIZE]; BOARD_SIZE]; STATE_PLANES];
    let me = game.current_player();
    let other = me.opponent();

    let (row, col) = game.position(me);
    out[0][flip_row(row, me, false)][col] = 1.0;
    out[1] = [[game.walls_remaining(me) as f32; BOARD_SIZE]; BOARD_SIZE];

    let (row, col) = game.position(other);
    out[2][flip_row(row, me, false)][col] = 1.0;
    out[3] = [[game.walls_remaining(other) as f32; BOARD_SIZE]; BOARD_SIZE];

    for wall in game.walls() {
        match wall.orient {
            Orientation::Horizontal => {
                let r = flip_row(wall.row, me, false);
                out[4][r][wall.col] = 1.0;
                out[4][r][wall.col + 1] = 1.0;
            }
            Orientation::Vertical => {
                let r = flip_row(wall.row, me, true);
                out[5][r][wall.col] = 1.0;
                out[5][r + 1][wall.col] = 1.0;
            }
        }
    }
    out
}

/// The `(plane, row, col)` policy-tensor coordinate of a move, in the acting
/// player's perspective.
pub fn action_index(mv: &Move, player: Player) -> (usize, usize, usize) {
    match *mv {
        Move::Pawn((row, col)) => (0, flip_row(row, player, false), col),
        Move::Wall(wall) => {
            let plane = match wall.orient {
                Orientation::Horizontal => 1,
                Orientation::Vertical => 2,
            };
            let is_vwall = wall.orient == Orientation::Vertical;
            (plane, flip_row(wall.row, player, is_vwall), wall.col)
        }
    }
}

/// Inverse of [`action_index`]: decode a tensor coordinate back into a move.
/// Returns `None` for coordinates that name no move at all (wall planes past
/// the `h8` anchor limit); legality is not checked beyond that.
pub fn index_action(plane: usize, row: usize, col: usize, player: Player) -> Option<Move> {
    match plane {
        0 => Some(Move::Pawn((flip_row(row, player, false), col))),
        1 => {
            let r = flip_row(row, player, false);
            (r < WALL_RANGE && col < WALL_RANGE)
                .then(|| Move::Wall(Wall::new(r, col, Orientation::Horizontal)))
        }
        2 => {
            let r = match player {
                Player::North => row,
                Player::South => {
                    if row >= WALL_RANGE {
                        return None;
                    }
                    WALL_RANGE - 1 - row
                }
            };
            (r < WALL_RANGE && col < WALL_RANGE)
                .then(|| Move::Wall(Wall::new(r, col, Orientation::Vertical)))
        }
        _ => None,
    }
}

/// One-hot union of the given moves as a policy tensor (a legality mask when
/// fed the legal move list).
pub fn encode_actions<'a>(moves: impl IntoIterator<Item = &'a Move>, player: Player) -> PolicyTensor {
    let mut out = [[[0.0; BOARD_SIZE]; BOARD_SIZE]; POLICY_PLANES];
    for mv in moves {
        let (p, r, c) = action_index(mv, player);
        out[p][r][c] = 1.0;
    }
    out
}

/// Sample an action from a nonnegative policy tensor. Near temperature zero
/// this is a plain argmax (ties to the first coordinate in scan order);
/// otherwise a multinomial draw over `policy^temperature`. No legality
/// checks: mask the policy first to confine the draw to legal moves.
pub fn sample_action(
    policy: &PolicyTensor,
    player: Player,
    temperature: f64,
    rng: &mut impl Rng,
) -> Option<Move> {
    if temperature < 1e-6 {
        let mut best = (f32::NEG_INFINITY, 0, 0, 0);
        for (p, plane) in policy.iter().enumerate() {
            for (r, row) in plane.iter().enumerate() {
                for (c, &weight) in row.iter().enumerate() {
                    if weight > best.0 {
                        best = (weight, p, r, c);
                    }
                }
            }
        }
        return index_action(best.1, best.2, best.3, player);
    }

    let weights: Vec<f64> = policy
        .iter()
        .flatten()
        .flatten()
        .map(|&w| (w as f64).powf(temperature))
        .collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    let idx = dist.sample(rng);
    let cells = BOARD_SIZE * BOARD_SIZE;
    index_action(idx / cells, (idx % cells) / BOARD_SIZE, idx % BOARD_SIZE, player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn flip_row_is_its_own_inverse() {
        for row in 0..BOARD_SIZE {
            assert_eq!(flip_row(row, Player::North, false), row);
            assert_eq!(
                flip_row(flip_row(row, Player::South, false), Player::South, false),
                row
            );
        }
        for row in 0..WALL_RANGE {
            assert_eq!(
                flip_row(flip_row(row, Player::South, true), Player::South, true),
                row
            );
        }
        assert_eq!(flip_row(0, Player::South, false), 8);
        assert_eq!(flip_row(0, Player::South, true), 7);
    }

    #[test]
    fn every_legal_move_encodes_and_decodes() {
        let mut game = Quoridor::new();
        for mv_str in ["b5", "h5", "d4h", "f6v"] {
            game.exec_move(mv_str, true, false).unwrap();
        }
        for player in [Player::North, Player::South] {
            for mv in game.all_legal_moves(false) {
                let (p, r, c) = action_index(&mv, player);
                assert_eq!(index_action(p, r, c, player), Some(mv), "via {player}");
            }
        }
    }

    #[test]
    fn masked_argmax_recovers_each_action() {
        let game = Quoridor::new();
        let me = game.current_player();
        for mv in [Move::parse("b5").unwrap(), Move::parse("a1h").unwrap()] {
            let planes = encode_actions(std::iter::once(&mv), me);
            let mut rng = StdRng::seed_from_u64(7);
            assert_eq!(sample_action(&planes, me, 0.0, &mut rng), Some(mv));
        }
    }

    #[test]
    fn state_planes_follow_the_current_player() {
        let mut game = Quoridor::new();
        for mv_str in ["a4", "h5", "a1v", "d4h", "h3v", "h8v"] {
            game.exec_move(mv_str, true, false).unwrap();
        }
        // North to move again after six plies.
        assert_eq!(game.current_player(), Player::North);
        let planes_north = encode_state(&game);

        let mut flipped = game.clone();
        flipped.exec_move("a3", true, false).unwrap(); // hand the turn to South
        // Undo the pawn displacement by looking only at flip identities of
        // the planes that ignore pawn positions.
        let planes_south = encode_state(&flipped);

        // Wall planes are row-flips of each other between perspectives.
        for plane in [4, 5] {
            for r in 0..BOARD_SIZE {
                for c in 0..BOARD_SIZE {
                    assert_eq!(
                        planes_north[plane][r][c],
                        planes_south[plane][BOARD_SIZE - 1 - r][c],
                        "plane {plane} at ({r},{c})"
                    );
                }
            }
        }
        // Wall-count planes are flooded with a single value.
        assert_eq!(planes_north[1], [[8.0; BOARD_SIZE]; BOARD_SIZE]);
        assert_eq!(planes_north[3], [[8.0; BOARD_SIZE]; BOARD_SIZE]);
    }

    #[test]
    fn one_hot_positions_swap_between_perspectives() {
        let mut game = Quoridor::new();
        game.exec_move("b5", true, false).unwrap();
        let south_view = encode_state(&game);
        game.exec_move("h5", true, false).unwrap();
        let north_view = encode_state(&game);

        // South saw North's pawn on its opponent plane, rows flipped.
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                assert_eq!(north_view[0][r][c], south_view[2][BOARD_SIZE - 1 - r][c]);
            }
        }
        // North's own plane holds exactly one cell.
        let ones: f32 = north_view[0].iter().flatten().sum();
        assert_eq!(ones, 1.0);
        assert_eq!(north_view[0][1][4], 1.0);
    }

    #[test]
    fn vertical_wall_mask_marks_both_rows() {
        let mut game = Quoridor::new();
        game.exec_move("d4v", true, false).unwrap(); // wall at (3, 3), vertical
        let view = encode_state(&game); // South's perspective now
        let r = flip_row(3, Player::South, true);
        assert_eq!(view[5][r][3], 1.0);
        assert_eq!(view[5][r + 1][3], 1.0);
        let total: f32 = view[5].iter().flatten().sum();
        assert_eq!(total, 2.0);
    }

    #[test]
    fn decode_rejects_out_of_range_wall_coordinates() {
        assert_eq!(index_action(1, 8, 0, Player::North), None);
        assert_eq!(index_action(1, 0, 8, Player::North), None);
        assert_eq!(index_action(2, 8, 0, Player::South), None);
        assert_eq!(index_action(3, 0, 0, Player::North), None);
        // Row 0 of the horizontal plane is fine for North, not for South
        // (it flips to the nonexistent anchor row 8).
        assert!(index_action(1, 0, 0, Player::North).is_some());
        assert_eq!(index_action(1, 0, 0, Player::South), None);
    }

    #[test]
    fn tempered_sampling_stays_inside_the_mask() {
        let mut game = Quoridor::new();
        let me = game.current_player();
        let legal = game.all_legal_moves(false);
        let mask = encode_actions(&legal, me);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let mv = sample_action(&mask, me, 1.0, &mut rng).unwrap();
            assert!(legal.contains(&mv));
        }
    }
}
