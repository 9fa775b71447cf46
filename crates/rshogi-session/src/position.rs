//! SFEN形式の解析・出力
//!
//! 盤面は上の段から順に `/` 区切りで記述する。段の中では連続する空きマスを
//! 数字 1〜9 で、駒を 1 文字（大文字が先手、小文字が後手）で表し、直前の `+` は成駒を示す。
//! サーバーから返ってくる局面文字列はすべてこの形式で解釈し、初期局面を特別扱いしない。

use std::fmt;
use std::str::FromStr;

use crate::types::{BOARD_SIZE, Color, Hands, Piece, PieceType, Square};

/// 平手初期局面のSFEN
pub const SFEN_STARTPOS: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";

/// USI の `position startpos` に対応する別名
pub const STARTPOS_ALIAS: &str = "startpos";

/// 局面文字列のパースエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedPositionError {
    /// 局面文字列が空
    #[error("position string is empty")]
    Empty,

    /// 段数が盤サイズと一致しない
    #[error("expected {expected} rows, got {actual}")]
    RowCount { expected: usize, actual: usize },

    /// 段のマス数が盤サイズと一致しない
    #[error("row {row} decodes to {actual} squares (expected {expected})")]
    RowWidth {
        row: usize,
        actual: usize,
        expected: usize,
    },

    /// 空きマス数の数字が 0 または盤サイズ超
    #[error("row {row}: invalid empty-run digit '{digit}'")]
    InvalidRun { row: usize, digit: char },

    /// `+` の直後に成れる駒の文字がない
    #[error("row {row}: promotion marker is not followed by a promotable piece letter")]
    DanglingPromotion { row: usize },

    /// 未知の駒文字
    #[error("row {row}: unknown piece character '{ch}'")]
    UnknownPiece { row: usize, ch: char },

    /// 手番の形式が不正
    #[error("invalid side to move: {0}")]
    SideToMove(String),

    /// 手駒の形式が不正
    #[error("invalid hand: {0}")]
    Hand(String),

    /// 手数の形式が不正
    #[error("invalid ply: {0}")]
    Ply(String),
}

/// 盤面（N×N の升目に駒または空き）
///
/// 局面文字列から導出される値で、指し手ごとにサーバーが返す局面文字列を
/// 再パースして新しい `Board` を作る。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Piece>; BOARD_SIZE]; BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    /// 駒のない盤面
    pub const fn empty() -> Board {
        Board {
            cells: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// 盤面部分をパース
    ///
    /// 空白を含む場合は完全な SFEN とみなし、先頭フィールドだけを盤面として読む。
    pub fn parse(position: &str) -> Result<Board, MalformedPositionError> {
        let board_str = position.split_whitespace().next().ok_or(MalformedPositionError::Empty)?;

        let rows: Vec<&str> = board_str.split('/').collect();
        if rows.len() != BOARD_SIZE {
            return Err(MalformedPositionError::RowCount {
                expected: BOARD_SIZE,
                actual: rows.len(),
            });
        }

        let mut board = Board::empty();
        for (row, row_str) in rows.iter().enumerate() {
            board.cells[row] = parse_row(row, row_str)?;
        }
        Ok(board)
    }

    /// 盤面部分を SFEN 文字列に変換
    pub fn to_sfen(&self) -> String {
        let mut result = String::new();

        for (row, cells) in self.cells.iter().enumerate() {
            let mut empty_count = 0;
            for cell in cells {
                match cell {
                    None => empty_count += 1,
                    Some(pc) => {
                        if empty_count > 0 {
                            result.push_str(&empty_count.to_string());
                            empty_count = 0;
                        }
                        result.push_str(&pc.to_sfen());
                    }
                }
            }
            if empty_count > 0 {
                result.push_str(&empty_count.to_string());
            }
            if row + 1 < BOARD_SIZE {
                result.push('/');
            }
        }

        result
    }

    /// 升目の駒
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.cells[sq.row()][sq.col()]
    }

    /// 駒を置き換えた新しい盤面を返す
    #[must_use]
    pub fn with_piece(mut self, sq: Square, piece: Option<Piece>) -> Board {
        self.cells[sq.row()][sq.col()] = piece;
        self
    }

    /// 駒のある升目を行優先で列挙
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|sq| self.piece_at(sq).map(|pc| (sq, pc)))
    }

    /// 指定手番の玉の位置
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, pc)| pc.color() == color && pc.piece_type() == PieceType::King)
            .map(|(sq, _)| sq)
    }
}

impl FromStr for Board {
    type Err = MalformedPositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::parse(s)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for col in 0..BOARD_SIZE {
            write!(f, "{:>3}", BOARD_SIZE - col)?;
        }
        writeln!(f)?;
        for (row, cells) in self.cells.iter().enumerate() {
            for cell in cells {
                match cell {
                    Some(pc) => write!(f, "{:>3}", pc.to_sfen())?,
                    None => write!(f, "{:>3}", ".")?,
                }
            }
            writeln!(f, "  {}", (b'a' + row as u8) as char)?;
        }
        Ok(())
    }
}

fn parse_row(row: usize, row_str: &str) -> Result<[Option<Piece>; BOARD_SIZE], MalformedPositionError> {
    let mut cells = [None; BOARD_SIZE];
    let mut col = 0usize;
    let mut chars = row_str.chars();

    while let Some(c) = chars.next() {
        if let Some(digit) = c.to_digit(10) {
            let run = digit as usize;
            if run == 0 || run > BOARD_SIZE {
                return Err(MalformedPositionError::InvalidRun { row, digit: c });
            }
            col += run;
            continue;
        }

        let piece = if c == '+' {
            chars
                .next()
                .and_then(|letter| Piece::from_sfen_char(letter, true))
                .ok_or(MalformedPositionError::DanglingPromotion { row })?
        } else {
            Piece::from_sfen_char(c, false)
                .ok_or(MalformedPositionError::UnknownPiece { row, ch: c })?
        };

        if col < BOARD_SIZE {
            cells[col] = Some(piece);
        }
        col += 1;
    }

    if col != BOARD_SIZE {
        return Err(MalformedPositionError::RowWidth {
            row,
            actual: col,
            expected: BOARD_SIZE,
        });
    }
    Ok(cells)
}

/// 完全な SFEN（盤面・手番・手駒・手数）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sfen {
    pub board: Board,
    pub side_to_move: Color,
    pub hands: Hands,
    pub ply: u32,
}

impl Sfen {
    /// 平手初期局面
    pub fn startpos() -> Sfen {
        // SFEN_STARTPOS は定数なので失敗しない
        Sfen {
            board: Board::parse(SFEN_STARTPOS).unwrap_or_default(),
            side_to_move: Color::Black,
            hands: Hands::default(),
            ply: 1,
        }
    }

    /// SFEN 文字列をパース。`startpos` も受け付ける。
    ///
    /// 手番・手駒は必須、手数は省略時 1。
    pub fn parse(sfen: &str) -> Result<Sfen, MalformedPositionError> {
        let sfen = resolve_alias(sfen);
        let parts: Vec<&str> = sfen.split_whitespace().collect();
        if parts.is_empty() {
            return Err(MalformedPositionError::Empty);
        }

        // 1. 盤面
        let board = Board::parse(parts[0])?;

        // 2. 手番
        let side_to_move = parts
            .get(1)
            .and_then(|s| Color::from_sfen(s))
            .ok_or_else(|| MalformedPositionError::SideToMove(parts.get(1).unwrap_or(&"").to_string()))?;

        // 3. 手駒
        let hand_str = parts.get(2).ok_or_else(|| MalformedPositionError::Hand(String::new()))?;
        let hands = parse_hands(hand_str)?;

        // 4. 手数（オプション）
        let ply = match parts.get(3) {
            Some(s) => match s.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(MalformedPositionError::Ply(s.to_string())),
            },
            None => 1,
        };

        Ok(Sfen {
            board,
            side_to_move,
            hands,
            ply,
        })
    }

    /// SFEN 文字列に変換
    pub fn to_sfen(&self) -> String {
        format!(
            "{} {} {} {}",
            self.board.to_sfen(),
            self.side_to_move.to_sfen_char(),
            hands_to_sfen(&self.hands),
            self.ply
        )
    }
}

impl FromStr for Sfen {
    type Err = MalformedPositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sfen::parse(s)
    }
}

impl fmt::Display for Sfen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sfen())
    }
}

/// `startpos` を平手初期局面の SFEN に置き換える
pub fn resolve_alias(position: &str) -> &str {
    if position.trim() == STARTPOS_ALIAS {
        SFEN_STARTPOS
    } else {
        position
    }
}

/// 手駒部分をパース（例: `2P3l`、`-`）
fn parse_hands(hand_str: &str) -> Result<Hands, MalformedPositionError> {
    let mut hands = Hands::default();
    if hand_str == "-" {
        return Ok(hands);
    }

    let mut count = 0u32;
    for c in hand_str.chars() {
        if let Some(digit) = c.to_digit(10) {
            count = count
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit))
                .ok_or_else(|| MalformedPositionError::Hand(hand_str.to_string()))?;
            continue;
        }

        let pt = PieceType::from_usi_char(c)
            .filter(|pt| pt.is_hand_piece())
            .ok_or_else(|| MalformedPositionError::Hand(format!("unknown hand piece '{c}'")))?;
        let color = if c.is_ascii_uppercase() {
            Color::Black
        } else {
            Color::White
        };
        let n = if count == 0 { 1 } else { count };
        let hand = hands.get_mut(color);
        *hand = hand
            .checked_added(pt, n)
            .ok_or_else(|| MalformedPositionError::Hand(format!("hand count overflow in '{hand_str}'")))?;
        count = 0;
    }

    if count != 0 {
        return Err(MalformedPositionError::Hand(format!("trailing count in '{hand_str}'")));
    }
    Ok(hands)
}

/// 手駒を SFEN 文字列に変換（先手→後手、飛角金銀桂香歩の順）
pub fn hands_to_sfen(hands: &Hands) -> String {
    let mut result = String::new();

    for color in [Color::Black, Color::White] {
        let hand = hands.get(color);
        for pt in PieceType::HAND_PIECES {
            let cnt = hand.count(pt);
            if cnt == 0 {
                continue;
            }
            if cnt > 1 {
                result.push_str(&cnt.to_string());
            }
            let c = pt.to_usi_char();
            result.push(if color == Color::Black {
                c
            } else {
                c.to_ascii_lowercase()
            });
        }
    }

    if result.is_empty() {
        result.push('-');
    }
    result
}
