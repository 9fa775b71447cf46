//! 手番（Color）

use serde::{Deserialize, Serialize};

/// 手番（先手/後手）
///
/// JSON 上は `"sente"` / `"gote"` で表現する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    #[serde(rename = "sente")]
    Black,
    #[serde(rename = "gote")]
    White,
}

impl Color {
    /// 相手番を返す
    #[inline]
    pub const fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// SFEN の手番文字（`b` / `w`）
    pub const fn to_sfen_char(self) -> char {
        match self {
            Color::Black => 'b',
            Color::White => 'w',
        }
    }

    /// SFEN の手番文字から変換
    pub fn from_sfen(s: &str) -> Option<Color> {
        match s {
            "b" => Some(Color::Black),
            "w" => Some(Color::White),
            _ => None,
        }
    }

    /// 表示用ラベル
    pub const fn label(self) -> &'static str {
        match self {
            Color::Black => "sente",
            Color::White => "gote",
        }
    }
}

impl std::ops::Not for Color {
    type Output = Color;

    #[inline]
    fn not(self) -> Color {
        self.opponent()
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
