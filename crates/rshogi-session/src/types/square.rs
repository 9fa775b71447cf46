//! 升目（Square）

use super::BOARD_SIZE;

/// 升目（盤面の行・列、いずれも 0 始まり）
///
/// 配置: 行優先。`row` 0 が一段目（USI の `a`）、`col` 0 が 9 筋（左端）。
/// したがって USI の筋番号は `BOARD_SIZE - col`、段文字は `'a' + row` になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Square {
    row: u8,
    col: u8,
}

impl Square {
    /// 升目の数
    pub const NUM: usize = BOARD_SIZE * BOARD_SIZE;

    /// 行・列から生成（範囲外なら None）
    #[inline]
    pub const fn new(row: usize, col: usize) -> Option<Square> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Some(Square {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// 行（0 = 一段目）
    #[inline]
    pub const fn row(self) -> usize {
        self.row as usize
    }

    /// 列（0 = 9 筋）
    #[inline]
    pub const fn col(self) -> usize {
        self.col as usize
    }

    /// USI の筋番号（1〜9）
    #[inline]
    pub const fn file_number(self) -> u8 {
        BOARD_SIZE as u8 - self.col
    }

    /// USI の段文字（a〜i）
    #[inline]
    pub const fn rank_char(self) -> char {
        (b'a' + self.row) as char
    }

    /// USI 形式の文字列（"7g" 等）に変換
    pub fn to_usi(self) -> String {
        format!("{}{}", self.file_number(), self.rank_char())
    }

    /// USI 形式の文字列から Square に変換
    pub fn from_usi(s: &str) -> Option<Square> {
        let mut chars = s.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Square::from_usi_chars(file, rank)
    }

    /// 筋文字・段文字の組から変換
    pub(crate) fn from_usi_chars(file: char, rank: char) -> Option<Square> {
        let file = file.to_digit(10)? as usize;
        if file == 0 || file > BOARD_SIZE || !rank.is_ascii_lowercase() {
            return None;
        }
        let row = (rank as u8 - b'a') as usize;
        Square::new(row, BOARD_SIZE - file)
    }

    /// 全ての升を返すイテレータ（行優先）
    pub fn all() -> impl Iterator<Item = Square> {
        (0..BOARD_SIZE)
            .flat_map(|row| (0..BOARD_SIZE).map(move |col| Square { row: row as u8, col: col as u8 }))
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.file_number(), self.rank_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_usi() {
        let sq = Square::new(6, 2).unwrap();
        assert_eq!(sq.to_usi(), "7g");
        assert_eq!(Square::from_usi("7g"), Some(sq));

        let top_right = Square::new(0, 8).unwrap();
        assert_eq!(top_right.to_usi(), "1a");
        let bottom_left = Square::new(8, 0).unwrap();
        assert_eq!(bottom_left.to_usi(), "9i");
    }

    #[test]
    fn test_square_bounds() {
        assert_eq!(Square::new(9, 0), None);
        assert_eq!(Square::new(0, 9), None);
        assert_eq!(Square::from_usi("0a"), None);
        assert_eq!(Square::from_usi("1j"), None);
        assert_eq!(Square::from_usi("1A"), None);
        assert_eq!(Square::from_usi("1a1"), None);
    }

    #[test]
    fn test_square_all() {
        let all: Vec<Square> = Square::all().collect();
        assert_eq!(all.len(), Square::NUM);
        assert_eq!(all[0], Square::new(0, 0).unwrap());
        assert_eq!(all[80], Square::new(8, 8).unwrap());
    }
}
