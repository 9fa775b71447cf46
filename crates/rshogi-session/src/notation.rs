//! USI notation parsing and formatting
//!
//! Board moves are `<from><to>[+]` (e.g. `7g7f`, `8h2b+`), drops are
//! `<PIECE>*<to>` (e.g. `P*5e`). Squares use a file digit counted down from
//! the board size and a rank letter counted up from `a`.
//!
//! The codec only checks syntax; legality is decided by the legal-move list
//! supplied by the server (see [`crate::legality`]).

use std::fmt;
use std::str::FromStr;

use crate::types::{PieceType, Square};

/// Error type for move notation parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidMoveNotationError {
    #[error("Invalid move format: {0}")]
    Shape(String),
    #[error("Invalid square notation in move: {0}")]
    Square(String),
    #[error("Invalid drop piece in move: {0}")]
    DropPiece(String),
}

/// A decoded USI move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsiMove {
    /// Board-to-board move
    Normal {
        from: Square,
        to: Square,
        promote: bool,
    },
    /// Drop of a piece in hand
    Drop { piece_type: PieceType, to: Square },
}

impl UsiMove {
    /// Parse a USI move notation (e.g., "7g7f", "7g7f+", "P*5e")
    pub fn parse(s: &str) -> Result<UsiMove, InvalidMoveNotationError> {
        if let Some((piece, square)) = s.split_once('*') {
            let mut piece_chars = piece.chars();
            let piece_type = match (piece_chars.next(), piece_chars.next()) {
                (Some(c), None) if c.is_ascii_uppercase() => PieceType::from_usi_char(c)
                    .filter(|pt| pt.is_hand_piece())
                    .ok_or_else(|| InvalidMoveNotationError::DropPiece(s.to_string()))?,
                _ => return Err(InvalidMoveNotationError::DropPiece(s.to_string())),
            };
            let to = Square::from_usi(square)
                .ok_or_else(|| InvalidMoveNotationError::Square(s.to_string()))?;
            return Ok(UsiMove::Drop { piece_type, to });
        }

        let (body, promote) = match s.strip_suffix('+') {
            Some(stripped) => (stripped, true),
            None => (s, false),
        };

        let chars: Vec<char> = body.chars().collect();
        if chars.len() != 4 {
            return Err(InvalidMoveNotationError::Shape(s.to_string()));
        }

        let from = Square::from_usi_chars(chars[0], chars[1])
            .ok_or_else(|| InvalidMoveNotationError::Square(s.to_string()))?;
        let to = Square::from_usi_chars(chars[2], chars[3])
            .ok_or_else(|| InvalidMoveNotationError::Square(s.to_string()))?;

        Ok(UsiMove::Normal { from, to, promote })
    }

    /// Source square (None for drops)
    pub fn from(&self) -> Option<Square> {
        match *self {
            UsiMove::Normal { from, .. } => Some(from),
            UsiMove::Drop { .. } => None,
        }
    }

    /// Destination square
    pub fn to(&self) -> Square {
        match *self {
            UsiMove::Normal { to, .. } | UsiMove::Drop { to, .. } => to,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, UsiMove::Drop { .. })
    }

    pub fn is_promote(&self) -> bool {
        matches!(self, UsiMove::Normal { promote: true, .. })
    }

    /// Convert to USI notation
    pub fn to_usi(&self) -> String {
        match *self {
            UsiMove::Normal { from, to, promote } => encode(from, to, promote),
            UsiMove::Drop { piece_type, to } => format!("{}*{}", piece_type.to_usi_char(), to),
        }
    }
}

impl FromStr for UsiMove {
    type Err = InvalidMoveNotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UsiMove::parse(s)
    }
}

impl fmt::Display for UsiMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_usi())
    }
}

/// Decode a move notation; alias of [`UsiMove::parse`]
pub fn decode(s: &str) -> Result<UsiMove, InvalidMoveNotationError> {
    UsiMove::parse(s)
}

/// Encode a board-to-board move.
///
/// Drops are never built here: the presentation layer hands over drop
/// notations as-is and they are forwarded unchanged.
pub fn encode(from: Square, to: Square, promote: bool) -> String {
    if promote {
        format!("{from}{to}+")
    } else {
        format!("{from}{to}")
    }
}
