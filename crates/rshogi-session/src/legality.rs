//! 合法手インデックス
//!
//! サーバーから受け取った合法手リスト（USI 文字列の平坦な配列）を、
//! 移動元マス → 移動先マス の対応表に組み替える。局面が変わるたびに作り直し、
//! 差分更新はしない。

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::notation::UsiMove;
use crate::types::{PieceType, Square};

/// 移動元・移動先が同じ手について、成り/不成のどちらが合法か
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromotionChoice {
    /// 成る手が合法
    pub may_promote: bool,
    /// 成らない手が合法
    pub may_decline: bool,
}

impl PromotionChoice {
    /// 成り/不成の選択をユーザーに問う必要があるか
    pub fn needs_prompt(&self) -> bool {
        self.may_promote && self.may_decline
    }
}

/// 合法手インデックス
#[derive(Debug, Clone, Default)]
pub struct LegalityIndex {
    targets: HashMap<Square, Vec<Square>>,
    promotions: HashMap<(Square, Square), PromotionChoice>,
    drops: HashMap<PieceType, Vec<Square>>,
    moves: HashSet<UsiMove>,
}

impl LegalityIndex {
    /// 合法手リストから構築する（O(件数)）
    ///
    /// 解釈できない文字列はログに残して読み飛ばす。
    pub fn build<S: AsRef<str>>(legal_moves: &[S]) -> LegalityIndex {
        let mut index = LegalityIndex::default();

        for notation in legal_moves {
            let notation = notation.as_ref();
            let mv = match UsiMove::parse(notation) {
                Ok(mv) => mv,
                Err(e) => {
                    warn!("skipping unparseable legal move '{notation}': {e}");
                    continue;
                }
            };
            if !index.moves.insert(mv) {
                continue;
            }

            match mv {
                UsiMove::Normal { from, to, promote } => {
                    if !index.promotions.contains_key(&(from, to)) {
                        index.targets.entry(from).or_default().push(to);
                    }
                    let choice = index.promotions.entry((from, to)).or_default();
                    if promote {
                        choice.may_promote = true;
                    } else {
                        choice.may_decline = true;
                    }
                }
                UsiMove::Drop { piece_type, to } => {
                    index.drops.entry(piece_type).or_default().push(to);
                }
            }
        }

        index
    }

    /// 指定マスの駒が移動できるマス（合法手がなければ空）
    pub fn moves_from(&self, from: Square) -> &[Square] {
        self.targets.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 指定駒種を打てるマス（合法手がなければ空）
    pub fn drop_targets(&self, piece_type: PieceType) -> &[Square] {
        self.drops.get(&piece_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 移動元・移動先の組に対する成り/不成の合法性
    pub fn promotion_choice(&self, from: Square, to: Square) -> Option<PromotionChoice> {
        self.promotions.get(&(from, to)).copied()
    }

    /// 指し手がそのまま合法手リストに含まれるか
    pub fn contains(&self, mv: &UsiMove) -> bool {
        self.moves.contains(mv)
    }

    /// 合法手の数（重複除く）
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}
