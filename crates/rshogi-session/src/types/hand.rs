//! 手駒（Hand）

use serde::{Deserialize, Serialize};

use super::{Color, PieceType};

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// 片方の手駒
///
/// JSON 上は `{"P": 2, "R": 1}` のように、0 枚の駒種を省略した形で表現する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hand {
    #[serde(rename = "P", default, skip_serializing_if = "is_zero")]
    pub pawn: u32,
    #[serde(rename = "L", default, skip_serializing_if = "is_zero")]
    pub lance: u32,
    #[serde(rename = "N", default, skip_serializing_if = "is_zero")]
    pub knight: u32,
    #[serde(rename = "S", default, skip_serializing_if = "is_zero")]
    pub silver: u32,
    #[serde(rename = "G", default, skip_serializing_if = "is_zero")]
    pub gold: u32,
    #[serde(rename = "B", default, skip_serializing_if = "is_zero")]
    pub bishop: u32,
    #[serde(rename = "R", default, skip_serializing_if = "is_zero")]
    pub rook: u32,
}

impl Hand {
    /// 指定駒種の枚数（玉は常に 0）
    pub const fn count(&self, pt: PieceType) -> u32 {
        match pt {
            PieceType::Pawn => self.pawn,
            PieceType::Lance => self.lance,
            PieceType::Knight => self.knight,
            PieceType::Silver => self.silver,
            PieceType::Gold => self.gold,
            PieceType::Bishop => self.bishop,
            PieceType::Rook => self.rook,
            PieceType::King => 0,
        }
    }

    fn slot_mut(&mut self, pt: PieceType) -> Option<&mut u32> {
        match pt {
            PieceType::Pawn => Some(&mut self.pawn),
            PieceType::Lance => Some(&mut self.lance),
            PieceType::Knight => Some(&mut self.knight),
            PieceType::Silver => Some(&mut self.silver),
            PieceType::Gold => Some(&mut self.gold),
            PieceType::Bishop => Some(&mut self.bishop),
            PieceType::Rook => Some(&mut self.rook),
            PieceType::King => None,
        }
    }

    /// 指定駒種を `n` 枚加えた手駒を返す（玉は無視、上限で飽和）
    #[must_use]
    pub fn with_added(mut self, pt: PieceType, n: u32) -> Hand {
        if let Some(slot) = self.slot_mut(pt) {
            *slot = slot.saturating_add(n);
        }
        self
    }

    /// 指定駒種を `n` 枚加える。枚数が `u32` に収まらなければ `None`
    #[must_use]
    pub fn checked_added(mut self, pt: PieceType, n: u32) -> Option<Hand> {
        if let Some(slot) = self.slot_mut(pt) {
            *slot = slot.checked_add(n)?;
        }
        Some(self)
    }

    /// 手駒の総枚数（上限で飽和）
    pub const fn total(&self) -> u32 {
        self.pawn
            .saturating_add(self.lance)
            .saturating_add(self.knight)
            .saturating_add(self.silver)
            .saturating_add(self.gold)
            .saturating_add(self.bishop)
            .saturating_add(self.rook)
    }

    /// 手駒が空かどうか
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// 両者の手駒（駒台）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hands {
    #[serde(default)]
    pub sente: Hand,
    #[serde(default)]
    pub gote: Hand,
}

impl Hands {
    /// 手番側の手駒
    pub const fn get(&self, color: Color) -> &Hand {
        match color {
            Color::Black => &self.sente,
            Color::White => &self.gote,
        }
    }

    pub(crate) fn get_mut(&mut self, color: Color) -> &mut Hand {
        match color {
            Color::Black => &mut self.sente,
            Color::White => &mut self.gote,
        }
    }

    /// 両者とも手駒なしかどうか
    pub const fn is_empty(&self) -> bool {
        self.sente.is_empty() && self.gote.is_empty()
    }
}
