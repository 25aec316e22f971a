//! Error surface of the engine.

/// Everything that can go wrong at the game / persistence boundary.
///
/// Legality queries never error (they return booleans); the path engine
/// assumes a disciplined caller and never errors either.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// A move that failed a legality check, carrying the offending notation.
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// A precondition a caller was responsible for has been broken (for
    /// example, a search tree whose root no longer matches the live state).
    /// Fatal: continuing would corrupt the search.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Save/load failed at the filesystem level.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A save file with a malformed header or player count.
    #[error("input format error: {0}")]
    InputFormat(String),
}

#[cfg(test)]
mod tests {
    use super::GameError;

    #[test]
    fn display_carries_the_move() {
        let err = GameError::IllegalMove("e9h".to_string());
        assert_eq!(err.to_string(), "illegal move: e9h");
    }
}
