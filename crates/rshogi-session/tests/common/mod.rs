//! 統合テスト用の疑似サービス
//!
//! 局面は SFEN を実際に書き換えて進める。合法手は「手番側の駒を 1 マス前進」だけの
//! 簡易生成で、敵陣に入る手には成り/不成の両方を出す。

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use rshogi_session::notation::{UsiMove, encode};
use rshogi_session::position::{SFEN_STARTPOS, Sfen, resolve_alias};
use rshogi_session::service::{Analysis, ExplainRequest, GameService, GameState, MoveApplied, SearchInfo, ServiceError};
use rshogi_session::types::{Color, Piece, Square};
use rshogi_session::{ManualTimeSource, SessionConfig};

#[derive(Debug, Default)]
pub struct MockBehavior {
    pub apply_delay: Duration,
    pub analyze_delay: Duration,
    pub fail_apply: bool,
    pub fail_analyze: bool,
    pub fail_explain: bool,
    pub fail_fetch: bool,
    /// 次の apply で壊れた局面文字列を返す
    pub corrupt_next_apply: bool,
    /// この手が指されたら対局終了
    pub finishing_move: Option<String>,
}

#[derive(Debug, Default)]
pub struct MockCalls {
    pub fetch: Vec<Option<String>>,
    pub apply: Vec<String>,
    pub analyze: Vec<String>,
    pub explain: usize,
}

/// clone したハンドルは同じ設定と呼び出し記録を共有する
#[derive(Debug, Clone, Default)]
pub struct MockService {
    behavior: Arc<Mutex<MockBehavior>>,
    calls: Arc<Mutex<MockCalls>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&self, f: impl FnOnce(&mut MockBehavior)) {
        f(&mut self.behavior.lock());
    }

    pub fn apply_calls(&self) -> usize {
        self.calls.lock().apply.len()
    }

    pub fn analyze_calls(&self) -> usize {
        self.calls.lock().analyze.len()
    }

    pub fn explain_calls(&self) -> usize {
        self.calls.lock().explain
    }

    pub fn fetch_calls(&self) -> Vec<Option<String>> {
        self.calls.lock().fetch.clone()
    }
}

/// 手番側の駒を 1 マス前進させる手
pub fn forward_moves(sfen: &Sfen) -> Vec<String> {
    let side = sfen.side_to_move;
    let mut moves = Vec::new();
    for (from, piece) in sfen.board.pieces() {
        if piece.color() != side {
            continue;
        }
        let row = match side {
            Color::Black => from.row().checked_sub(1),
            Color::White => Some(from.row() + 1),
        };
        let Some(to) = row.and_then(|r| Square::new(r, from.col())) else {
            continue;
        };
        if sfen.board.piece_at(to).is_some_and(|p| p.color() == side) {
            continue;
        }
        moves.push(encode(from, to, false));
        let in_zone = match side {
            Color::Black => to.row() <= 2,
            Color::White => to.row() >= 6,
        };
        if in_zone && piece.piece_type().can_promote() && !piece.is_promoted() {
            moves.push(encode(from, to, true));
        }
    }
    moves
}

pub fn state_for(sfen: &Sfen) -> GameState {
    GameState {
        position: sfen.to_sfen(),
        side_to_move: sfen.side_to_move,
        legal_moves: forward_moves(sfen),
        in_check: false,
        is_over: false,
        winner: None,
        captured_counts: sfen.hands,
    }
}

fn apply(sfen: &Sfen, notation: &str) -> Result<Sfen, ServiceError> {
    let mv = UsiMove::parse(notation).map_err(|e| ServiceError::Rejected(e.to_string()))?;
    let UsiMove::Normal { from, to, promote } = mv else {
        return Err(ServiceError::Rejected(format!("drops are not supported: {notation}")));
    };
    let piece = sfen
        .board
        .piece_at(from)
        .ok_or_else(|| ServiceError::Rejected(format!("no piece at {from}")))?;

    let mut next = sfen.clone();
    if let Some(captured) = sfen.board.piece_at(to) {
        let hand = match sfen.side_to_move {
            Color::Black => &mut next.hands.sente,
            Color::White => &mut next.hands.gote,
        };
        *hand = hand.with_added(captured.piece_type(), 1);
    }
    let moved = if promote {
        Piece::promoted(piece.color(), piece.piece_type())
            .ok_or_else(|| ServiceError::Rejected(format!("cannot promote: {notation}")))?
    } else {
        piece
    };
    next.board = next.board.with_piece(from, None).with_piece(to, Some(moved));
    next.side_to_move = sfen.side_to_move.opponent();
    next.ply += 1;
    Ok(next)
}

fn label(side: Color, notation: &str) -> String {
    let mark = match side {
        Color::Black => '▲',
        Color::White => '△',
    };
    format!("{mark}{notation}")
}

impl GameService for MockService {
    async fn fetch_state(&self, position: Option<&str>) -> Result<GameState, ServiceError> {
        self.calls.lock().fetch.push(position.map(str::to_string));
        if self.behavior.lock().fail_fetch {
            return Err(ServiceError::Transport("connection refused".to_string()));
        }
        let sfen = Sfen::parse(resolve_alias(position.unwrap_or(SFEN_STARTPOS)))
            .map_err(|e| ServiceError::Rejected(e.to_string()))?;
        Ok(state_for(&sfen))
    }

    async fn apply_move(&self, position: &str, notation: &str) -> Result<MoveApplied, ServiceError> {
        self.calls.lock().apply.push(notation.to_string());
        let delay = self.behavior.lock().apply_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let (fail, corrupt, finishing) = {
            let mut behavior = self.behavior.lock();
            let corrupt = std::mem::take(&mut behavior.corrupt_next_apply);
            (behavior.fail_apply, corrupt, behavior.finishing_move.clone())
        };
        if fail {
            return Err(ServiceError::Transport("connection reset".to_string()));
        }

        let sfen = Sfen::parse(position).map_err(|e| ServiceError::Rejected(e.to_string()))?;
        let next = apply(&sfen, notation)?;
        let mut state = state_for(&next);
        if corrupt {
            state.position = "lnsgkgsnl/9 w - 2".to_string();
        }
        if finishing.as_deref() == Some(notation) {
            state.is_over = true;
            state.winner = Some(sfen.side_to_move);
            state.legal_moves.clear();
        }
        Ok(MoveApplied {
            state,
            move_label: Some(label(sfen.side_to_move, notation)),
        })
    }

    async fn analyze(&self, position: &str) -> Result<Analysis, ServiceError> {
        self.calls.lock().analyze.push(position.to_string());
        let (delay, fail) = {
            let behavior = self.behavior.lock();
            (behavior.analyze_delay, behavior.fail_analyze)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(ServiceError::Status {
                status: 503,
                body: "engine unavailable".to_string(),
            });
        }

        let sfen = Sfen::parse(position).map_err(|e| ServiceError::Rejected(e.to_string()))?;
        let moves = forward_moves(&sfen);
        let best_move = moves
            .first()
            .cloned()
            .ok_or_else(|| ServiceError::Rejected("no legal moves".to_string()))?;
        Ok(Analysis {
            best_move,
            score_cp: Some(sfen.ply as i32 * 10),
            score_mate: None,
            search_info: SearchInfo {
                depth: Some(8),
                pv: moves.into_iter().take(2).collect(),
                ..SearchInfo::default()
            },
        })
    }

    async fn explain(&self, request: &ExplainRequest) -> Result<String, ServiceError> {
        self.calls.lock().explain += 1;
        if self.behavior.lock().fail_explain {
            return Err(ServiceError::Transport("explainer offline".to_string()));
        }
        Ok(format!(
            "After {}, consider {}.",
            request.last_move.as_deref().unwrap_or("-"),
            request.analysis.best_move
        ))
    }
}

pub fn test_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.service.request_timeout_ms = 500;
    config.service.analysis_timeout_ms = 3_000;
    config
}

pub fn time_source() -> ManualTimeSource {
    ManualTimeSource::new()
}
