//! 棋譜台帳（MoveLedger）
//!
//! 確定した指し手を時刻付きで順に記録する。追記のみで、削除は待ったによる
//! 末尾の切り詰めだけ。記録は作成後に変更しない。

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::types::Color;

/// 台帳操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// 切り詰め位置が範囲外
    #[error("ledger index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// 指定番号の記録がない
    #[error("no ledger record at index {index}")]
    NotFound { index: usize },
}

/// 記録前の指し手（番号と時刻は台帳側で付与する）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveDraft {
    /// 指した側
    pub side: Color,
    /// USI 形式の指し手
    pub notation: String,
    /// サーバーが返した表示用の指し手名（例: "▲7六歩"）
    pub label: Option<String>,
    /// 指した後の局面（SFEN）
    pub resulting_position: String,
}

/// 確定した 1 手の記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    /// 0 始まりの通し番号
    pub index: usize,
    pub side: Color,
    pub notation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// 確定時点の対局時計の経過時間（ミリ秒）
    #[serde(rename = "committedAtOffset")]
    pub committed_at_ms: u64,
    /// 直前の記録からの差分（最初の記録は committed_at_ms と同じ）
    #[serde(rename = "deltaFromPrevious")]
    pub delta_ms: u64,
    #[serde(rename = "resultingPositionString")]
    pub resulting_position: String,
    /// 確定時のローカル時刻
    pub played_at: DateTime<Local>,
}

/// 棋譜台帳
#[derive(Debug, Clone, Default)]
pub struct MoveLedger {
    records: Vec<MoveRecord>,
}

impl MoveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指し手を追記し、次の通し番号を付ける（O(1)）
    pub fn append(&mut self, draft: MoveDraft, committed_at_ms: u64) -> &MoveRecord {
        let delta_ms = match self.records.last() {
            Some(prev) => committed_at_ms.saturating_sub(prev.committed_at_ms),
            None => committed_at_ms,
        };
        let record = MoveRecord {
            index: self.records.len(),
            side: draft.side,
            notation: draft.notation,
            label: draft.label,
            committed_at_ms,
            delta_ms,
            resulting_position: draft.resulting_position,
            played_at: Local::now(),
        };
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// `index` より後ろの記録をすべて削除する
    ///
    /// `index` は `0..len` の範囲でなければならない（空の台帳では常にエラー）。
    pub fn truncate_after(&mut self, index: usize) -> Result<(), LedgerError> {
        if index >= self.records.len() {
            return Err(LedgerError::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        self.records.truncate(index + 1);
        Ok(())
    }

    /// 指定番号の記録
    pub fn record_at(&self, index: usize) -> Result<&MoveRecord, LedgerError> {
        self.records.get(index).ok_or(LedgerError::NotFound { index })
    }

    pub fn last(&self) -> Option<&MoveRecord> {
        self.records.last()
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// USI 形式の指し手列（`position ... moves` の後ろに並べる形）
    pub fn usi_moves(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.notation.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(n: usize) -> MoveDraft {
        MoveDraft {
            side: if n % 2 == 0 { Color::Black } else { Color::White },
            notation: format!("move{n}"),
            label: None,
            resulting_position: format!("pos{n}"),
        }
    }

    #[test]
    fn test_append_assigns_index_and_delta() {
        let mut ledger = MoveLedger::new();
        let first = ledger.append(draft(0), 1_200).clone();
        assert_eq!(first.index, 0);
        assert_eq!(first.delta_ms, 1_200);

        let second = ledger.append(draft(1), 4_000).clone();
        assert_eq!(second.index, 1);
        assert_eq!(second.committed_at_ms, 4_000);
        assert_eq!(second.delta_ms, 2_800);
        assert_eq!(second.side, Color::White);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_truncate_after() {
        let mut ledger = MoveLedger::new();
        for i in 0..4 {
            ledger.append(draft(i), i as u64 * 1_000);
        }
        ledger.truncate_after(1).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.last().unwrap().notation, "move1");

        // 末尾指定は何も消さない
        ledger.truncate_after(1).unwrap();
        assert_eq!(ledger.len(), 2);

        // 切り詰め後は続きの番号から振り直す
        let next = ledger.append(draft(9), 5_000).clone();
        assert_eq!(next.index, 2);
        assert_eq!(next.delta_ms, 4_000);
    }

    #[test]
    fn test_truncate_out_of_range() {
        let mut ledger = MoveLedger::new();
        assert_eq!(
            ledger.truncate_after(0),
            Err(LedgerError::IndexOutOfRange { index: 0, len: 0 })
        );
        ledger.append(draft(0), 0);
        assert_eq!(
            ledger.truncate_after(1),
            Err(LedgerError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_record_at() {
        let mut ledger = MoveLedger::new();
        ledger.append(draft(0), 10);
        assert_eq!(ledger.record_at(0).unwrap().notation, "move0");
        assert_eq!(ledger.record_at(3), Err(LedgerError::NotFound { index: 3 }));
    }

    #[test]
    fn test_record_json_field_names() {
        let mut ledger = MoveLedger::new();
        ledger.append(
            MoveDraft {
                side: Color::Black,
                notation: "7g7f".to_string(),
                label: Some("▲7六歩".to_string()),
                resulting_position: "after".to_string(),
            },
            250,
        );
        let value = serde_json::to_value(ledger.record_at(0).unwrap()).unwrap();
        assert_eq!(value["committedAtOffset"], 250);
        assert_eq!(value["deltaFromPrevious"], 250);
        assert_eq!(value["resultingPositionString"], "after");
        assert_eq!(value["side"], "sente");
        assert_eq!(value["label"], "▲7六歩");
        assert!(value.get("playedAt").is_some());
    }
}
