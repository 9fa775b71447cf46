//! 外部サービス（局面取得・着手適用・解析・解説）とのインターフェース
//!
//! 通信路は実装側の関心事で、ここではやり取りする値の形と操作の契約だけを定める。
//! HTTP 実装は [`crate::http::HttpGameService`]。

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::position::{MalformedPositionError, Sfen};
use crate::types::{Color, Hands};

/// サービス呼び出しのエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// タイムアウト
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// 接続・送受信の失敗
    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx 以外のステータス
    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// サービスが要求を拒否した（`{"error": ...}`）
    #[error("service rejected the request: {0}")]
    Rejected(String),

    /// 応答を解釈できない
    #[error("failed to decode service response: {0}")]
    Decode(String),
}

/// 局面のスナップショット
///
/// 着手の確定や明示的な再読み込みのたびに丸ごと置き換える。部分更新はしない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// 局面文字列（SFEN）
    #[serde(rename = "positionString")]
    pub position: String,
    pub side_to_move: Color,
    /// 現局面の合法手（USI 形式）
    #[serde(default)]
    pub legal_moves: Vec<String>,
    #[serde(default)]
    pub in_check: bool,
    #[serde(default)]
    pub is_over: bool,
    #[serde(default)]
    pub winner: Option<Color>,
    /// 駒台（持ち駒の枚数）
    #[serde(default)]
    pub captured_counts: Hands,
}

impl GameState {
    /// 局面文字列をパース
    pub fn sfen(&self) -> Result<Sfen, MalformedPositionError> {
        Sfen::parse(&self.position)
    }
}

/// 着手適用の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveApplied {
    pub state: GameState,
    /// 表示用の指し手名（例: "▲7六歩"）
    #[serde(default)]
    pub move_label: Option<String>,
}

/// 探索情報
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seldepth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nps: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pv: Vec<String>,
}

/// 局面解析の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// 最善手（USI 形式）
    #[serde(rename = "bestMoveNotation")]
    pub best_move: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_cp: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_mate: Option<i32>,
    #[serde(default)]
    pub search_info: SearchInfo,
}

impl Analysis {
    /// 評価値（詰みがあれば詰みを優先）
    pub fn score(&self) -> Option<Score> {
        match (self.score_mate, self.score_cp) {
            (Some(mate), _) => Some(Score::Mate(mate)),
            (None, Some(cp)) => Some(Score::Cp(cp)),
            (None, None) => None,
        }
    }
}

/// 手番側から見た評価値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// センチポーン
    Cp(i32),
    /// 詰みまでの手数（負なら詰まされる）
    Mate(i32),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Score::Cp(cp) => write!(f, "{cp:+}cp"),
            Score::Mate(n) if n >= 0 => write!(f, "mate in {n}"),
            Score::Mate(n) => write!(f, "mated in {}", n.unsigned_abs()),
        }
    }
}

/// 解説生成の依頼
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
    #[serde(rename = "positionString")]
    pub position: String,
    /// 直前に指された手
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_move: Option<String>,
    pub analysis: Analysis,
}

/// 外部サービスの操作
///
/// 実装は通信路（HTTP 等）を自由に選べる。返す Future は `Send` であること。
pub trait GameService {
    /// 現局面、または指定局面の GameState を取得
    fn fetch_state(
        &self,
        position: Option<&str>,
    ) -> impl Future<Output = Result<GameState, ServiceError>> + Send;

    /// 局面に指し手を適用し、結果の GameState を返す
    fn apply_move(
        &self,
        position: &str,
        notation: &str,
    ) -> impl Future<Output = Result<MoveApplied, ServiceError>> + Send;

    /// 局面を解析
    fn analyze(&self, position: &str) -> impl Future<Output = Result<Analysis, ServiceError>> + Send;

    /// 局面の解説文を生成（ベストエフォート）
    fn explain(
        &self,
        request: &ExplainRequest,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

/// Future に時間制限を付け、超過したら `ServiceError::Timeout` にする
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_state_json() {
        let json = r#"{
            "positionString": "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1",
            "sideToMove": "sente",
            "legalMoves": ["7g7f", "2g2f"],
            "inCheck": false,
            "isOver": false,
            "winner": null,
            "capturedCounts": {"sente": {}, "gote": {"P": 1}}
        }"#;
        let state: GameState = serde_json::from_str(json).unwrap();
        assert_eq!(state.side_to_move, Color::Black);
        assert_eq!(state.legal_moves.len(), 2);
        assert_eq!(state.captured_counts.gote.pawn, 1);
        assert_eq!(state.sfen().unwrap().ply, 1);
    }

    #[test]
    fn test_game_state_defaults() {
        let json = r#"{"positionString": "9/9/9/9/9/9/9/9/9 w - 3", "sideToMove": "gote"}"#;
        let state: GameState = serde_json::from_str(json).unwrap();
        assert!(state.legal_moves.is_empty());
        assert!(!state.is_over);
        assert_eq!(state.winner, None);
        assert!(state.captured_counts.is_empty());
    }

    #[test]
    fn test_analysis_score() {
        let json = r#"{"bestMoveNotation": "2g2f", "scoreCp": 35, "searchInfo": {"depth": 12, "pv": ["2g2f", "8c8d"]}}"#;
        let analysis: Analysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.score(), Some(Score::Cp(35)));
        assert_eq!(analysis.search_info.depth, Some(12));
        assert_eq!(analysis.search_info.pv.len(), 2);

        let mate: Analysis =
            serde_json::from_str(r#"{"bestMoveNotation": "G*5b", "scoreCp": 30000, "scoreMate": 3}"#).unwrap();
        assert_eq!(mate.score(), Some(Score::Mate(3)));
    }

    #[test]
    fn test_score_display() {
        assert_eq!(Score::Cp(120).to_string(), "+120cp");
        assert_eq!(Score::Cp(-45).to_string(), "-45cp");
        assert_eq!(Score::Mate(5).to_string(), "mate in 5");
        assert_eq!(Score::Mate(-3).to_string(), "mated in 3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout() {
        let limit = Duration::from_millis(500);
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, ServiceError>(1)
        };
        assert_eq!(with_timeout(limit, slow).await, Err(ServiceError::Timeout(limit)));

        let fast = async { Ok::<_, ServiceError>(2) };
        assert_eq!(with_timeout(limit, fast).await, Ok(2));
    }
}
