//! 駒種（PieceType）と駒（Piece）
//!
//! 盤上の駒は「手番・生駒の種類・成りフラグ」の組で表す値型で、
//! マス目以外の同一性を持たない。

use super::Color;

/// 駒種（生駒のみ、先後の区別なし）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PieceType {
    Pawn = 1,
    Lance = 2,
    Knight = 3,
    Silver = 4,
    Bishop = 5,
    Rook = 6,
    Gold = 7,
    King = 8,
}

impl PieceType {
    /// 全駒種
    pub const ALL: [PieceType; 8] = [
        PieceType::Pawn,
        PieceType::Lance,
        PieceType::Knight,
        PieceType::Silver,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Gold,
        PieceType::King,
    ];

    /// 手駒になる駒種一覧（SFEN の手駒出力順: 飛角金銀桂香歩）
    pub const HAND_PIECES: [PieceType; 7] = [
        PieceType::Rook,
        PieceType::Bishop,
        PieceType::Gold,
        PieceType::Silver,
        PieceType::Knight,
        PieceType::Lance,
        PieceType::Pawn,
    ];

    /// 成れるかどうか
    #[inline]
    pub const fn can_promote(self) -> bool {
        !matches!(self, PieceType::Gold | PieceType::King)
    }

    /// 手駒にできるかどうか
    #[inline]
    pub const fn is_hand_piece(self) -> bool {
        !matches!(self, PieceType::King)
    }

    /// USI/SFEN の駒文字（大文字）
    pub const fn to_usi_char(self) -> char {
        match self {
            PieceType::Pawn => 'P',
            PieceType::Lance => 'L',
            PieceType::Knight => 'N',
            PieceType::Silver => 'S',
            PieceType::Bishop => 'B',
            PieceType::Rook => 'R',
            PieceType::Gold => 'G',
            PieceType::King => 'K',
        }
    }

    /// USI/SFEN の駒文字から変換（大文字・小文字どちらも受け付ける）
    pub fn from_usi_char(c: char) -> Option<PieceType> {
        match c.to_ascii_uppercase() {
            'P' => Some(PieceType::Pawn),
            'L' => Some(PieceType::Lance),
            'N' => Some(PieceType::Knight),
            'S' => Some(PieceType::Silver),
            'B' => Some(PieceType::Bishop),
            'R' => Some(PieceType::Rook),
            'G' => Some(PieceType::Gold),
            'K' => Some(PieceType::King),
            _ => None,
        }
    }
}

/// 駒（先後の区別あり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    color: Color,
    piece_type: PieceType,
    promoted: bool,
}

impl Piece {
    /// 生駒を生成
    #[inline]
    pub const fn new(color: Color, piece_type: PieceType) -> Piece {
        Piece {
            color,
            piece_type,
            promoted: false,
        }
    }

    /// 成駒を生成（成れない駒種の場合は None）
    #[inline]
    pub const fn promoted(color: Color, piece_type: PieceType) -> Option<Piece> {
        if piece_type.can_promote() {
            Some(Piece {
                color,
                piece_type,
                promoted: true,
            })
        } else {
            None
        }
    }

    /// 手番
    #[inline]
    pub const fn color(self) -> Color {
        self.color
    }

    /// 生駒としての駒種
    #[inline]
    pub const fn piece_type(self) -> PieceType {
        self.piece_type
    }

    /// 成駒かどうか
    #[inline]
    pub const fn is_promoted(self) -> bool {
        self.promoted
    }

    /// SFEN 文字列（例: `P`, `+b`）
    pub fn to_sfen(self) -> String {
        let c = self.piece_type.to_usi_char();
        let c = match self.color {
            Color::Black => c,
            Color::White => c.to_ascii_lowercase(),
        };
        if self.promoted { format!("+{c}") } else { c.to_string() }
    }

    /// SFEN の駒文字から生成。大文字が先手、小文字が後手。
    pub fn from_sfen_char(c: char, promoted: bool) -> Option<Piece> {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let color = if c.is_ascii_uppercase() {
            Color::Black
        } else {
            Color::White
        };
        let piece_type = PieceType::from_usi_char(c)?;
        if promoted {
            Piece::promoted(color, piece_type)
        } else {
            Some(Piece::new(color, piece_type))
        }
    }
}
