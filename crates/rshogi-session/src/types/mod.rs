//! 基本型定義

mod color;
mod hand;
mod piece;
mod square;

pub use color::Color;
pub use hand::{Hand, Hands};
pub use piece::{Piece, PieceType};
pub use square::Square;

/// 盤の一辺のマス数
pub const BOARD_SIZE: usize = 9;
