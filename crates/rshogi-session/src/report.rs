//! 着手確定の結果報告（CommitReport）
//!
//! 致命的でない失敗（事前解析・事後解析・解説）は例外にせず、
//! ここに「劣化」として記録して呼び出し側へ返す。

use std::fmt::Write as _;

use serde::Serialize;

use crate::ledger::MoveRecord;
use crate::service::{Analysis, ServiceError};

/// 非致命的な失敗の種類
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "reason", rename_all = "camelCase")]
pub enum Degradation {
    /// 事前解析が失敗した
    PreMoveAnalysisFailed(String),
    /// 事前解析が着手適用までに間に合わなかった
    PreMoveAnalysisPending,
    /// 事後解析が失敗した
    PostMoveAnalysisFailed(String),
    /// 解説の生成に失敗した
    ExplanationFailed(String),
}

impl Degradation {
    pub(crate) fn pre_move(e: &ServiceError) -> Self {
        Degradation::PreMoveAnalysisFailed(e.to_string())
    }

    pub(crate) fn post_move(e: &ServiceError) -> Self {
        Degradation::PostMoveAnalysisFailed(e.to_string())
    }

    pub(crate) fn explanation(e: &ServiceError) -> Self {
        Degradation::ExplanationFailed(e.to_string())
    }
}

/// 1 手の確定結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    /// 台帳に追加された記録
    pub record: MoveRecord,
    /// 指す前の局面に対する候補手（間に合わなかった・失敗した場合は None）
    pub pre_move_suggestion: Option<Analysis>,
    /// 指した後の局面の解析
    pub post_move_analysis: Option<Analysis>,
    /// 解説文（ベストエフォート）
    pub explanation: Option<String>,
    pub degradations: Vec<Degradation>,
    /// 表示用の文章
    pub narrative: String,
}

impl CommitReport {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// 表示用の文章を組み立てる
///
/// 事後解析がなければ「指した」だけの素の文になる。
pub(crate) fn compose_narrative(
    record: &MoveRecord,
    pre_move: Option<&Analysis>,
    post_move: Option<&Analysis>,
    explanation: Option<&str>,
) -> String {
    let shown = record.label.as_deref().unwrap_or(&record.notation);
    let mut text = format!("{} played {}.", record.side, shown);

    let Some(post) = post_move else {
        return text;
    };

    if let Some(pre) = pre_move {
        if pre.best_move == record.notation {
            text.push_str(" This matches the suggested move.");
        } else {
            let _ = write!(text, " The suggested move was {}.", pre.best_move);
        }
    }

    match post.score() {
        Some(score) => {
            let _ = write!(text, " Evaluation: {score}, best reply {}.", post.best_move);
        }
        None => {
            let _ = write!(text, " Best reply {}.", post.best_move);
        }
    }

    if let Some(explanation) = explanation {
        text.push(' ');
        text.push_str(explanation);
    }
    text
}
