//! Board geometry and notation: locations, walls, moves, and the static
//! relations between walls and the adjacency edges they cut.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Number of cells along each board axis.
pub const BOARD_SIZE: usize = 9;

/// Wall anchors run over the top-left cell of the wall, `0..=7` on both axes.
pub const WALL_RANGE: usize = BOARD_SIZE - 1;

/// A board cell, `(row, col)` with `(0, 0)` the top-left corner (`a1`).
pub type Loc = (usize, usize);

/// The two sides of the game. North starts on row 0 and walks toward row 8;
/// South starts on row 8 and walks toward row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Player {
    North,
    South,
}

impl Player {
    /// Zero-based index used for player-keyed arrays and tensors.
    pub fn index(self) -> usize {
        match self {
            Player::North => 0,
            Player::South => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Player> {
        match index {
            0 => Some(Player::North),
            1 => Some(Player::South),
            _ => None,
        }
    }

    pub fn opponent(self) -> Player {
        match self {
            Player::North => Player::South,
            Player::South => Player::North,
        }
    }

    /// The row this player must reach to win.
    pub fn goal_row(self) -> usize {
        match self {
            Player::North => BOARD_SIZE - 1,
            Player::South => 0,
        }
    }

    /// Every cell on the player's goal row.
    pub fn goal_cells(self) -> impl Iterator<Item = Loc> {
        let row = self.goal_row();
        (0..BOARD_SIZE).map(move |col| (row, col))
    }

    /// Starting position: the center cell of the player's home row.
    pub fn start(self) -> Loc {
        match self {
            Player::North => (0, BOARD_SIZE / 2),
            Player::South => (BOARD_SIZE - 1, BOARD_SIZE / 2),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::North => write!(f, "north"),
            Player::South => write!(f, "south"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A two-cell wall, anchored at its top-left cell (rows `a..h`, cols `1..8`).
///
/// A horizontal wall at `(r, c)` lies below cells `(r, c)` and `(r, c+1)`,
/// cutting the edges down to row `r + 1`. A vertical wall at `(r, c)` lies to
/// the right of cells `(r, c)` and `(r+1, c)`, cutting the edges across to
/// column `c + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Wall {
    pub row: usize,
    pub col: usize,
    pub orient: Orientation,
}

impl Wall {
    pub fn new(row: usize, col: usize, orient: Orientation) -> Wall {
        Wall { row, col, orient }
    }

    pub fn loc(&self) -> Loc {
        (self.row, self.col)
    }

    /// The wall sharing this anchor with the other orientation.
    pub fn cross(&self) -> Wall {
        let orient = match self.orient {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        };
        Wall::new(self.row, self.col, orient)
    }

    /// The two adjacency edges this wall removes.
    pub fn cuts(&self) -> [(Loc, Loc); 2] {
        let (r, c) = (self.row, self.col);
        match self.orient {
            Orientation::Horizontal => [((r, c), (r + 1, c)), ((r, c + 1), (r + 1, c + 1))],
            Orientation::Vertical => [((r, c), (r, c + 1)), ((r + 1, c), (r + 1, c + 1))],
        }
    }

    /// Walls that physically overlap this one and therefore can never be on
    /// the board at the same time: the wall itself, its cross, and the
    /// same-orientation neighbors along its span.
    pub fn intersecting(&self) -> Vec<Wall> {
        let (r, c) = (self.row, self.col);
        let mut out = vec![*self, self.cross()];
        match self.orient {
            Orientation::Vertical => {
                if r > 0 {
                    out.push(Wall::new(r - 1, c, Orientation::Vertical));
                }
                if r + 1 < WALL_RANGE {
                    out.push(Wall::new(r + 1, c, Orientation::Vertical));
                }
            }
            Orientation::Horizontal => {
                if c > 0 {
                    out.push(Wall::new(r, c - 1, Orientation::Horizontal));
                }
                if c + 1 < WALL_RANGE {
                    out.push(Wall::new(r, c + 1, Orientation::Horizontal));
                }
            }
        }
        out
    }

    /// The three grid junctions this wall runs through, in a coordinate
    /// system where junction `(j, k)` is the corner shared by cells
    /// `(j-1, k-1)` and `(j, k)`.
    fn junctions(&self) -> [(usize, usize); 3] {
        let (r, c) = (self.row, self.col);
        match self.orient {
            Orientation::Horizontal => [(r + 1, c), (r + 1, c + 1), (r + 1, c + 2)],
            Orientation::Vertical => [(r, c + 1), (r + 1, c + 1), (r + 2, c + 1)],
        }
    }

    /// True when the two walls share a junction point. This is the contact
    /// relation that lets walls chain into longer barriers; it is a strict
    /// superset of [`Wall::intersecting`], which only covers overlaps.
    pub fn touches(&self, other: &Wall) -> bool {
        let mine = self.junctions();
        other.junctions().iter().any(|j| mine.contains(j))
    }
}

impl fmt::Display for Wall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.orient {
            Orientation::Horizontal => 'h',
            Orientation::Vertical => 'v',
        };
        write!(f, "{}{}", encode_loc((self.row, self.col)), tag)
    }
}

/// A single game action: step the pawn to a cell, or place a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Move {
    Pawn(Loc),
    Wall(Wall),
}

impl Move {
    /// Parse a move in game notation: 2 characters for a pawn destination
    /// (`e5`), 3 for a wall (`d4h`). Returns `None` for anything else. The
    /// row letter and the orientation tag are case-insensitive.
    pub fn parse(s: &str) -> Option<Move> {
        if !s.is_ascii() {
            return None;
        }
        let bytes = s.as_bytes();
        match bytes.len() {
            2 => parse_loc(s).map(Move::Pawn),
            3 => {
                let (row, col) = parse_loc(&s[..2])?;
                if row >= WALL_RANGE || col >= WALL_RANGE {
                    return None;
                }
                let orient = match bytes[2].to_ascii_lowercase() {
                    b'h' => Orientation::Horizontal,
                    b'v' => Orientation::Vertical,
                    _ => return None,
                };
                Some(Move::Wall(Wall::new(row, col, orient)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Pawn(loc) => write!(f, "{}", encode_loc(*loc)),
            Move::Wall(wall) => write!(f, "{}", wall),
        }
    }
}

/// Parse a 2-character cell like `e5` into `(row, col)`. Rows are letters
/// `a..i` (case-insensitive), columns digits `1..9`.
pub fn parse_loc(s: &str) -> Option<Loc> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let row = match bytes[0].to_ascii_lowercase() {
        b @ b'a'..=b'i' => (b - b'a') as usize,
        _ => return None,
    };
    let col = match bytes[1] {
        b @ b'1'..=b'9' => (b - b'1') as usize,
        _ => return None,
    };
    Some((row, col))
}

/// Inverse of [`parse_loc`].
pub fn encode_loc(loc: Loc) -> String {
    let (row, col) = loc;
    debug_assert!(row < BOARD_SIZE && col < BOARD_SIZE);
    format!("{}{}", (b'a' + row as u8) as char, col + 1)
}

/// Every cell on the board.
pub fn all_positions() -> impl Iterator<Item = Loc> {
    (0..BOARD_SIZE).flat_map(|r| (0..BOARD_SIZE).map(move |c| (r, c)))
}

/// Every placeable wall (128 of them).
pub fn all_walls() -> impl Iterator<Item = Wall> {
    (0..WALL_RANGE).flat_map(|r| {
        (0..WALL_RANGE).flat_map(move |c| {
            [
                Wall::new(r, c, Orientation::Horizontal),
                Wall::new(r, c, Orientation::Vertical),
            ]
        })
    })
}

/// Build the 4-connected adjacency mapping of the empty board.
pub fn adjacency() -> HashMap<Loc, HashSet<Loc>> {
    let mut adj = HashMap::new();
    for (row, col) in all_positions() {
        let mut neighbors = HashSet::new();
        if row > 0 {
            neighbors.insert((row - 1, col));
        }
        if row + 1 < BOARD_SIZE {
            neighbors.insert((row + 1, col));
        }
        if col > 0 {
            neighbors.insert((row, col - 1));
        }
        if col + 1 < BOARD_SIZE {
            neighbors.insert((row, col + 1));
        }
        adj.insert((row, col), neighbors);
    }
    adj
}
