//! Game state, rules enforcement, reversible move execution, and hashing.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Write as _;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use log::warn;

use crate::board::{self, Loc, Move, Player, Wall, BOARD_SIZE, WALL_RANGE};
use crate::error::GameError;
use crate::pathgraph::PathGraph;

/// Number of wall segments each side starts with.
pub const WALLS_PER_PLAYER: usize = 10;

/// One side's mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerState {
    pub pos: Loc,
    pub walls_left: usize,
}

/// What it takes to reverse one executed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEntry {
    PawnMove { from: Loc, to: Loc },
    WallPlacement(Wall),
}

impl HistoryEntry {
    /// The move that produced this entry, for replay and persistence.
    pub fn as_move(&self) -> Move {
        match *self {
            HistoryEntry::PawnMove { to, .. } => Move::Pawn(to),
            HistoryEntry::WallPlacement(wall) => Move::Wall(wall),
        }
    }
}

/// A single game of Quoridor on the standard 9×9 board.
///
/// The state is fully reversible: every executed move pushes a history entry
/// whose undo restores the exact prior position, including the incremental
/// path indexes and the set of still-open wall slots.
///
/// Notation: rows are letters `a..i` from the top, columns digits `1..9`
/// from the left, so `a1` is the top-left corner. A pawn move names its
/// destination (`e5`); a wall names its top-left anchor plus `h` or `v`
/// (`d4h`).
#[derive(Debug, Clone)]
pub struct Quoridor {
    walls: BTreeSet<Wall>,
    players: [PlayerState; 2],
    history: Vec<HistoryEntry>,
    redo_stack: Vec<Move>,
    current: Player,
    /// Wall slots not physically ruled out by a played wall.
    open_walls: HashSet<Wall>,
    /// One path index per player, sinks on that player's goal row. Each owns
    /// its own adjacency copy, so every wall cuts (and uncuts) both.
    path_graphs: [PathGraph; 2],
}

impl Quoridor {
    pub fn new() -> Self {
        let players = [Player::North, Player::South].map(|p| PlayerState {
            pos: p.start(),
            walls_left: WALLS_PER_PLAYER,
        });
        let path_graphs = [Player::North, Player::South]
            .map(|p| PathGraph::new(board::adjacency(), p.goal_cells()));
        Quoridor {
            walls: BTreeSet::new(),
            players,
            history: Vec::new(),
            redo_stack: Vec::new(),
            current: Player::North,
            open_walls: board::all_walls().collect(),
            path_graphs,
        }
    }

    pub fn current_player(&self) -> Player {
        self.current
    }

    pub fn position(&self, player: Player) -> Loc {
        self.players[player.index()].pos
    }

    pub fn walls_remaining(&self, player: Player) -> usize {
        self.players[player.index()].walls_left
    }

    /// Walls played so far, in canonical (sorted) order.
    pub fn walls(&self) -> &BTreeSet<Wall> {
        &self.walls
    }

    /// Wall slots not yet physically ruled out by a played wall.
    pub fn open_walls(&self) -> &HashSet<Wall> {
        &self.open_walls
    }

    /// The path index tracking `player`'s distance-to-goal.
    pub fn path_graph(&self, player: Player) -> &PathGraph {
        &self.path_graphs[player.index()]
    }

    /// Shortest-path steps from `player`'s pawn to its goal row.
    pub fn distance_to_goal(&self, player: Player) -> Option<usize> {
        self.path_graph(player).distance(self.position(player))
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// The first player standing on their goal row, if any.
    pub fn winner(&self) -> Option<Player> {
        [Player::North, Player::South]
            .into_iter()
            .find(|&p| self.position(p).0 == p.goal_row())
    }

    /// Execute a move given in game notation.
    ///
    /// With `check_legal`, an illegal or unparseable move fails with
    /// [`GameError::IllegalMove`] and mutates nothing. Without it, the move
    /// is applied blindly; feeding an illegal move that way leaves the game
    /// in an unspecified state (trusted fast paths only, e.g. search over
    /// pre-filtered candidates). `is_redo` preserves the redo stack, which
    /// is otherwise cleared.
    pub fn exec_move(&mut self, mv: &str, check_legal: bool, is_redo: bool) -> Result<(), GameError> {
        let parsed = Move::parse(mv).ok_or_else(|| GameError::IllegalMove(mv.to_string()))?;
        if check_legal && !self.is_legal_move(&parsed) {
            return Err(GameError::IllegalMove(mv.to_string()));
        }
        self.apply(parsed, is_redo);
        Ok(())
    }

    /// Execute an already-parsed move with full legality checking.
    pub fn play(&mut self, mv: &Move) -> Result<(), GameError> {
        if !self.is_legal_move(mv) {
            return Err(GameError::IllegalMove(mv.to_string()));
        }
        self.apply(*mv, false);
        Ok(())
    }

    fn apply(&mut self, mv: Move, is_redo: bool) {
        let idx = self.current.index();
        match mv {
            Move::Pawn(to) => {
                self.history.push(HistoryEntry::PawnMove { from: self.players[idx].pos, to });
                self.players[idx].pos = to;
            }
            Move::Wall(wall) => {
                self.walls.insert(wall);
                self.players[idx].walls_left = self.players[idx].walls_left.saturating_sub(1);
                let cuts = wall.cuts();
                for graph in &mut self.path_graphs {
                    graph.cut(&cuts);
                }
                for ruled_out in wall.intersecting() {
                    self.open_walls.remove(&ruled_out);
                }
                self.history.push(HistoryEntry::WallPlacement(wall));
            }
        }
        self.current = self.current.opponent();
        if !is_redo {
            self.redo_stack.clear();
        }
    }

    /// Undo the last move, making it available for [`Quoridor::redo`].
    pub fn undo(&mut self) -> bool {
        self.undo_inner(true)
    }

    fn undo_inner(&mut self, allow_redo: bool) -> bool {
        let Some(entry) = self.history.pop() else {
            return false;
        };
        let prev = self.current.opponent();
        let idx = prev.index();
        match entry {
            HistoryEntry::PawnMove { from, to } => {
                self.players[idx].pos = from;
                if allow_redo {
                    self.redo_stack.push(Move::Pawn(to));
                }
            }
            HistoryEntry::WallPlacement(wall) => {
                self.walls.remove(&wall);
                self.players[idx].walls_left += 1;
                let cuts = wall.cuts();
                for graph in &mut self.path_graphs {
                    graph.uncut(&cuts);
                }
                // A slot reopens only if no other played wall still rules
                // it out.
                for slot in wall.intersecting() {
                    if !slot.intersecting().iter().any(|w| self.walls.contains(w)) {
                        self.open_walls.insert(slot);
                    }
                }
                if allow_redo {
                    self.redo_stack.push(Move::Wall(wall));
                }
            }
        }
        self.current = prev;
        true
    }

    /// Replay the most recently undone move.
    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(mv) => {
                debug_assert!(self.is_legal_move(&mv));
                self.apply(mv, true);
                true
            }
            None => false,
        }
    }

    /// Rewind to the starting position, leaving every move on the redo
    /// stack.
    pub fn undo_all(&mut self) {
        while self.undo_inner(true) {}
    }

    /// Execute `mv` for the duration of a scope. The returned guard undoes
    /// the move when dropped, on every exit path, without touching the redo
    /// stack. No legality check is performed; the caller vouches for
    /// the move. Guards nest and unwind in LIFO order; the caller must not
    /// mutate the game through other means while a guard is live.
    pub fn temp_move(&mut self, mv: &Move) -> TempMove<'_> {
        self.apply(*mv, true);
        TempMove { game: self }
    }

    /// Total legality check on a notation string. Never panics; anything
    /// that is not a well-formed 2- or 3-character move is simply illegal.
    ///
    /// Takes `&mut self` because the wall cut-off test tentatively cuts the
    /// path indexes and restores them before returning.
    pub fn is_legal(&mut self, mv: &str) -> bool {
        match Move::parse(mv) {
            Some(parsed) => self.is_legal_move(&parsed),
            None => false,
        }
    }

    /// Full legality check on a parsed move.
    pub fn is_legal_move(&mut self, mv: &Move) -> bool {
        self.legal_inner(mv, false)
    }

    fn occupied(&self, loc: Loc) -> bool {
        self.players.iter().any(|p| p.pos == loc)
    }

    fn legal_inner(&mut self, mv: &Move, partial_check: bool) -> bool {
        match *mv {
            Move::Pawn(to) => self.pawn_move_legal(to),
            Move::Wall(wall) => self.wall_move_legal(wall, partial_check),
        }
    }

    fn pawn_move_legal(&self, to: Loc) -> bool {
        if to.0 >= BOARD_SIZE || to.1 >= BOARD_SIZE {
            return false;
        }
        let cur = self.position(self.current);
        let opp = self.position(self.current.opponent());
        // Adjacency is identical in both indexes; read it from one.
        let adj = &self.path_graphs[0];

        let opponent_adjacent = adj.are_adjacent(cur, opp);
        if opponent_adjacent {
            if to == opp {
                return false;
            }
            // Jump rules. `further` is the cell straight past the opponent.
            let (dr, dc) = (opp.0 as isize - cur.0 as isize, opp.1 as isize - cur.1 as isize);
            let further_signed = (opp.0 as isize + dr, opp.1 as isize + dc);
            let further = (further_signed.0 as usize, further_signed.1 as usize);
            let on_board = further_signed.0 >= 0
                && further_signed.1 >= 0
                && further.0 < BOARD_SIZE
                && further.1 < BOARD_SIZE;
            if on_board && adj.are_adjacent(opp, further) {
                // Straight jump open: it is the only jump on offer.
                if to == further && !self.occupied(further) {
                    return true;
                }
            } else {
                // Straight jump blocked by a wall or the board edge; the
                // two perpendicular diagonals open up instead.
                let diagonals = if dr == 0 {
                    [(opp.0.wrapping_sub(1), opp.1), (opp.0 + 1, opp.1)]
                } else {
                    [(opp.0, opp.1.wrapping_sub(1)), (opp.0, opp.1 + 1)]
                };
                for d in diagonals {
                    if to == d && adj.are_adjacent(opp, d) && !self.occupied(d) {
                        return true;
                    }
                }
            }
        }
        // Plain step: destination connected to the pawn and unoccupied.
        adj.are_adjacent(cur, to) && !self.occupied(to)
    }

    fn wall_move_legal(&mut self, wall: Wall, partial_check: bool) -> bool {
        if self.players[self.current.index()].walls_left == 0 {
            return false;
        }
        if wall.row >= WALL_RANGE || wall.col >= WALL_RANGE {
            return false;
        }
        if !self.open_walls.contains(&wall) {
            return false;
        }
        if partial_check {
            return true;
        }

        // No-full-cut-off rule. A lone wall can never seal a region: any
        // enclosing barrier must chain through a junction of an existing
        // wall, and a wall that leaves both players' current shortest paths
        // intact cannot have cut anyone off.
        if !self.walls.iter().any(|played| wall.touches(played)) {
            return true;
        }
        if !self.wall_severs_current_path(&wall) {
            return true;
        }

        // Expensive check: tentatively cut, probe, restore. The indexes are
        // back to their exact state before this returns.
        let cuts = wall.cuts();
        for graph in &mut self.path_graphs {
            graph.cut(&cuts);
        }
        let all_connected = [Player::North, Player::South]
            .into_iter()
            .all(|p| self.path_graphs[p.index()].has_path(self.players[p.index()].pos));
        for graph in &mut self.path_graphs {
            graph.uncut(&cuts);
        }
        all_connected
    }

    /// Would this wall cut an edge on some player's current shortest path?
    fn wall_severs_current_path(&self, wall: &Wall) -> bool {
        let cuts = wall.cuts();
        for player in [Player::North, Player::South] {
            let graph = self.path_graph(player);
            let mut prev = self.position(player);
            for node in graph.path_from(prev) {
                if cuts
                    .iter()
                    .any(|&(a, b)| (prev, node) == (a, b) || (prev, node) == (b, a))
                {
                    return true;
                }
                prev = node;
            }
        }
        false
    }

    /// Every legal move for the side to move, deterministically ordered.
    ///
    /// Pawn candidates are the cells within two steps of the pawn (jumps
    /// reach that far); wall candidates are the open slots. With
    /// `partial_check`, walls skip the expensive cut-off test; the
    /// policy-uniform sampler trades exactness for speed there.
    pub fn all_legal_moves(&mut self, partial_check: bool) -> Vec<Move> {
        let mut moves = Vec::new();
        let (row, col) = self.position(self.current);
        for dr in -2isize..=2 {
            for dc in -2isize..=2 {
                let (r, c) = (row as isize + dr, col as isize + dc);
                if r < 0 || c < 0 || r >= BOARD_SIZE as isize || c >= BOARD_SIZE as isize {
                    continue;
                }
                let mv = Move::Pawn((r as usize, c as usize));
                if self.legal_inner(&mv, partial_check) {
                    moves.push(mv);
                }
            }
        }
        let candidates: Vec<Wall> = self.open_walls.iter().copied().collect();
        for wall in candidates {
            let mv = Move::Wall(wall);
            if self.legal_inner(&mv, partial_check) {
                moves.push(mv);
            }
        }
        moves.sort_unstable();
        moves
    }

    /// Order-independent key over `(side to move, walls, player states)`.
    /// Histories do not contribute: two games reaching the same position by
    /// different move orders share a key.
    pub fn hash_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Write the move list: a comment header, the player count, then one
    /// move per line in execution order.
    pub fn save(&self, path: &Path) -> Result<(), GameError> {
        let mut out = fs::File::create(path)?;
        writeln!(out, "# quoridor move list ({} plies)", self.history.len())?;
        writeln!(out, "2")?;
        for entry in &self.history {
            writeln!(out, "{}", entry.as_move())?;
        }
        Ok(())
    }

    /// Load a move list saved by [`Quoridor::save`], replaying every move
    /// with full legality checks.
    pub fn load(path: &Path) -> Result<Quoridor, GameError> {
        let text = fs::read_to_string(path)?;
        let mut lines = text.lines().peekable();
        if lines.peek().is_some_and(|l| l.trim_start().starts_with('#')) {
            lines.next();
        }
        let count_line = lines
            .next()
            .ok_or_else(|| GameError::InputFormat("empty save file".to_string()))?;
        let count: usize = count_line
            .trim()
            .parse()
            .map_err(|_| GameError::InputFormat(format!("bad player count: {count_line:?}")))?;
        if count != 2 {
            return Err(GameError::InputFormat(format!(
                "only 2-player games are supported, file says {count}"
            )));
        }
        let mut game = Quoridor::new();
        for line in lines {
            let mv = line.trim();
            if mv.is_empty() {
                warn!("skipping blank line in move list");
                continue;
            }
            game.exec_move(mv, true, false)?;
        }
        Ok(game)
    }
}

impl Default for Quoridor {
    fn default() -> Self {
        Quoridor::new()
    }
}

impl PartialEq for Quoridor {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current
            && self.walls == other.walls
            && self.players == other.players
    }
}

impl Eq for Quoridor {}

impl Hash for Quoridor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.current.index().hash(state);
        self.walls.hash(state);
        self.players.hash(state);
    }
}

/// Scope guard for a temporarily executed move; see [`Quoridor::temp_move`].
/// Dereferences to the game so searches can keep descending through it.
pub struct TempMove<'a> {
    game: &'a mut Quoridor,
}

impl Deref for TempMove<'_> {
    type Target = Quoridor;

    fn deref(&self) -> &Quoridor {
        self.game
    }
}

impl DerefMut for TempMove<'_> {
    fn deref_mut(&mut self) -> &mut Quoridor {
        self.game
    }
}

impl Drop for TempMove<'_> {
    fn drop(&mut self) {
        self.game.undo_inner(false);
    }
}
