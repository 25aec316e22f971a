//! Monte Carlo tree search with PUCT selection over an oracle's priors.
//!
//! Nodes live in a hash-keyed registry; children are key handles, so
//! transpositions form a DAG without ownership cycles. The live game object
//! is threaded through every search and must always sit exactly at the root.

use std::collections::HashMap;

use log::debug;

use crate::board::{Move, Player, BOARD_SIZE};
use crate::error::GameError;
use crate::game::Quoridor;
use crate::planes::{action_index, encode_actions, index_action, PolicyTensor, POLICY_PLANES};

const VISIT_EPSILON: f32 = 1e-6;

/// One state in the search tree.
#[derive(Debug, Clone)]
pub struct MctsNode {
    /// N: how often each action was taken from here.
    counts: PolicyTensor,
    /// W: total backed-up reward per action.
    rewards: PolicyTensor,
    /// P: the oracle's prior over actions.
    policy: PolicyTensor,
    /// V: the oracle's value of this state, kept for depth-capped backups.
    value: f32,
    legal_mask: PolicyTensor,
    player: Player,
    key: u64,
    children: HashMap<Move, u64>,
    flagged: bool,
}

impl MctsNode {
    fn new(game: &mut Quoridor, policy: PolicyTensor, value: f32) -> Self {
        let player = game.current_player();
        let legal = game.all_legal_moves(false);
        MctsNode {
            counts: zeros(),
            rewards: zeros(),
            policy,
            value,
            legal_mask: encode_actions(&legal, player),
            player,
            key: game.hash_key(),
            children: HashMap::new(),
            flagged: false,
        }
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn visit_count(&self, mv: &Move) -> f32 {
        let (p, r, c) = action_index(mv, self.player);
        self.counts[p][r][c]
    }

    /// PUCT upper confidence over actions, with illegal entries at -inf.
    fn upper_conf(&self, c_puct: f32) -> PolicyTensor {
        let total: f32 = self.counts.iter().flatten().flatten().sum();
        let sqrt_total = total.sqrt();
        let mut u = zeros();
        for p in 0..POLICY_PLANES {
            for r in 0..BOARD_SIZE {
                for c in 0..BOARD_SIZE {
                    if self.legal_mask[p][r][c] == 0.0 {
                        u[p][r][c] = f32::NEG_INFINITY;
                    } else {
                        let n = self.counts[p][r][c];
                        let avg = self.rewards[p][r][c] / (n + VISIT_EPSILON);
                        u[p][r][c] = avg + c_puct * self.policy[p][r][c] * sqrt_total / (1.0 + n);
                    }
                }
            }
        }
        u
    }

    /// Greedy argmax over the upper confidence (selection temperature 0).
    fn select(&self, c_puct: f32) -> Option<Move> {
        let u = self.upper_conf(c_puct);
        let mut best: Option<(f32, Move)> = None;
        for (p, plane) in u.iter().enumerate() {
            for (r, row) in plane.iter().enumerate() {
                for (c, &score) in row.iter().enumerate() {
                    if score == f32::NEG_INFINITY {
                        continue;
                    }
                    if best.map_or(true, |(b, _)| score > b) {
                        if let Some(mv) = index_action(p, r, c, self.player) {
                            best = Some((score, mv));
                        }
                    }
                }
            }
        }
        best.map(|(_, mv)| mv)
    }

    fn backup(&mut self, mv: &Move, value: f32) {
        let (p, r, c) = action_index(mv, self.player);
        self.rewards[p][r][c] += value;
        self.counts[p][r][c] += 1.0;
    }

    /// Visit distribution N / ΣN, used as training target and action
    /// sampler. All zeros before the first backup.
    pub fn policy_target(&self) -> PolicyTensor {
        let total: f32 = self.counts.iter().flatten().flatten().sum();
        if total == 0.0 {
            return self.counts;
        }
        let mut out = self.counts;
        for plane in &mut out {
            for row in plane {
                for cell in row {
                    *cell /= total;
                }
            }
        }
        out
    }
}

fn zeros() -> PolicyTensor {
    [[[0.0; BOARD_SIZE]; BOARD_SIZE]; POLICY_PLANES]
}

/// The search tree plus the oracle that scores fresh leaves.
///
/// The oracle is `game -> (policy, value)` with the policy a nonnegative
/// prior in the acting player's perspective and the value in `[-1, 1]` for
/// the side to move. It may probe the game through temporary moves but must
/// hand it back unchanged.
pub struct Mcts<F> {
    oracle: F,
    nodes: HashMap<u64, MctsNode>,
    root_key: u64,
    /// Hard bound on descent depth; transposition links can form cycles, so
    /// selection must not be allowed to recurse without limit.
    max_rollout_depth: usize,
}

impl<F> Mcts<F>
where
    F: FnMut(&mut Quoridor) -> (PolicyTensor, f32),
{
    pub fn new(game: &mut Quoridor, mut oracle: F) -> Self {
        let (policy, value) = oracle(game);
        let root = MctsNode::new(game, policy, value);
        let root_key = root.key;
        let mut nodes = HashMap::new();
        nodes.insert(root_key, root);
        Mcts { oracle, nodes, root_key, max_rollout_depth: 81 }
    }

    pub fn with_rollout_depth(mut self, depth: usize) -> Self {
        self.max_rollout_depth = depth.max(1);
        self
    }

    pub fn root_player(&self) -> Player {
        self.nodes[&self.root_key].player
    }

    pub fn root(&self) -> &MctsNode {
        &self.nodes[&self.root_key]
    }

    /// Number of states in the registry.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Run `n_evals` single searches from the root and return the visit
    /// distribution there. The game must sit at the root going in and is
    /// verified to sit there again after every descent.
    pub fn search(
        &mut self,
        game: &mut Quoridor,
        c_puct: f32,
        n_evals: usize,
    ) -> Result<PolicyTensor, GameError> {
        let key = game.hash_key();
        if key != self.root_key {
            return Err(GameError::InvariantViolation(
                "search: the root must never deviate from the live state".to_string(),
            ));
        }
        for _ in 0..n_evals {
            self.single_search(game, c_puct, 0)?;
            if game.hash_key() != key {
                return Err(GameError::InvariantViolation(
                    "search: a descent failed to restore the state".to_string(),
                ));
            }
        }
        Ok(self.nodes[&self.root_key].policy_target())
    }

    /// One selection/expansion/backup pass. Returns the value backed up at
    /// this level, from the perspective of the player to move here.
    fn single_search(
        &mut self,
        game: &mut Quoridor,
        c_puct: f32,
        depth: usize,
    ) -> Result<f32, GameError> {
        let key = game.hash_key();
        let (action, player) = {
            let node = self.nodes.get(&key).ok_or_else(|| {
                GameError::InvariantViolation("descended into an unregistered state".to_string())
            })?;
            let action = node.select(c_puct).ok_or_else(|| {
                GameError::InvariantViolation("no selectable action at node".to_string())
            })?;
            (action, node.player)
        };

        let backup_val = {
            let mut scope = game.temp_move(&action);
            if let Some(winner) = scope.winner() {
                // The move ended the game: certain reward, no oracle needed.
                if winner == player {
                    1.0
                } else {
                    -1.0
                }
            } else {
                let child_key = scope.hash_key();
                if !self.nodes.contains_key(&child_key) {
                    // Fresh leaf: ask the oracle and graft a new node. The
                    // sign flips because the oracle speaks for the child's
                    // player.
                    let (policy, value) = (self.oracle)(&mut scope);
                    let child = MctsNode::new(&mut scope, policy, value);
                    self.nodes.insert(child_key, child);
                    if let Some(node) = self.nodes.get_mut(&key) {
                        node.children.insert(action, child_key);
                    }
                    -value
                } else {
                    // Transposition: make sure the edge exists, then keep
                    // descending (bounded; selection can cycle).
                    if let Some(node) = self.nodes.get_mut(&key) {
                        node.children.insert(action, child_key);
                    }
                    if depth + 1 >= self.max_rollout_depth {
                        -self.nodes[&child_key].value
                    } else {
                        -self.single_search(&mut scope, c_puct, depth + 1)?
                    }
                }
            }
        };

        if let Some(node) = self.nodes.get_mut(&key) {
            node.backup(&action, backup_val);
        }
        Ok(backup_val)
    }

    /// Commit `mv` on the live game, advance the root, and drop every node
    /// that is no longer reachable from it.
    pub fn step_and_prune(&mut self, game: &mut Quoridor, mv: &Move) -> Result<(), GameError> {
        if game.hash_key() != self.root_key {
            return Err(GameError::InvariantViolation(
                "step_and_prune: the root must never deviate from the live state".to_string(),
            ));
        }
        game.play(mv)?;
        let new_root = game.hash_key();
        if !self.nodes.contains_key(&new_root) {
            return Err(GameError::InvariantViolation(
                "step_and_prune: chosen action leads outside the tree".to_string(),
            ));
        }

        // Mark everything reachable from the new root, sweep the rest.
        let mut stack = vec![new_root];
        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&key) else {
                continue;
            };
            if node.flagged {
                continue;
            }
            node.flagged = true;
            stack.extend(node.children.values().copied());
        }
        let before = self.nodes.len();
        self.nodes.retain(|_, node| node.flagged);
        for node in self.nodes.values_mut() {
            node.flagged = false;
        }
        debug!(
            "step_and_prune: kept {} of {before} nodes after {mv}",
            self.nodes.len()
        );
        self.root_key = new_root;
        Ok(())
    }
}
