//! 読み筋キャッシュ（HintCache）
//!
//! 1 局面分だけ、事前に計算した候補手を (局面, 手番) に紐付けて保持する。
//! 別の局面の解析結果を誤って使わないよう、取り出しは両方が完全一致したときだけ行う。

use crate::types::Color;

/// キャッシュの 1 エントリ
#[derive(Debug, Clone, PartialEq)]
pub struct HintEntry<T> {
    pub position: String,
    pub side_to_move: Color,
    pub suggestion: T,
}

/// 単一スロットのキャッシュ
#[derive(Debug, Clone)]
pub struct HintCache<T> {
    slot: Option<HintEntry<T>>,
}

impl<T> Default for HintCache<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> HintCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 無条件に上書きする
    pub fn put(&mut self, entry: HintEntry<T>) {
        self.slot = Some(entry);
    }

    /// 一致すれば取り出してスロットを空にする。不一致ならそのまま残す。
    pub fn consume(&mut self, position: &str, side_to_move: Color) -> Option<T> {
        if self.matches(position, side_to_move) {
            self.slot.take().map(|entry| entry.suggestion)
        } else {
            None
        }
    }

    /// 一致すれば参照を返す（スロットは空にしない）
    pub fn peek(&self, position: &str, side_to_move: Color) -> Option<&T> {
        self.slot
            .as_ref()
            .filter(|entry| entry.position == position && entry.side_to_move == side_to_move)
            .map(|entry| &entry.suggestion)
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    fn matches(&self, position: &str, side_to_move: Color) -> bool {
        self.peek(position, side_to_move).is_some()
    }
}
