//! 対局セッションの進行管理（GameOrchestrator）
//!
//! 着手の確定・待った・再読み込みを、外部サービスとのやり取りを挟みつつ順に進める。
//!
//! - 同時に進行できる確定/待ったは 1 つだけ。処理中の要求は待たせずに `Busy` で拒否する。
//! - 状態は短いロックの内側でだけ書き換え、ロックを保持したまま `.await` しない。
//!   そのため `current_elapsed()` や `state()` は処理中でもブロックしない。
//! - 致命的な失敗（着手送信・局面取得・局面文字列のパース）ではどの状態も変えない。
//!   解析や解説の失敗は [`CommitReport::degradations`] に記録して処理を続ける。
//!
//! 保留中の着手の流れ:
//!
//! ```text
//! Idle ──(時計停止中の着手)──▶ AwaitingClockConfirmation ──(confirm)──▶ Committing ──▶ Idle
//!   │                                   └──(decline)──▶ Idle
//!   └──(時計計時中の着手)──▶ Committing ──▶ Idle
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::clock::{ClockState, SessionClock, SystemTimeSource, TimeSource};
use crate::config::{ServiceConfig, SessionConfig};
use crate::hint::{HintCache, HintEntry};
use crate::ledger::{LedgerError, MoveDraft, MoveLedger, MoveRecord};
use crate::legality::{LegalityIndex, PromotionChoice};
use crate::notation::{InvalidMoveNotationError, UsiMove};
use crate::position::{Board, MalformedPositionError, SFEN_STARTPOS, Sfen, resolve_alias};
use crate::report::{CommitReport, Degradation, compose_narrative};
use crate::service::{
    Analysis, ExplainRequest, GameService, GameState, MoveApplied, ServiceError, with_timeout,
};
use crate::types::{PieceType, Square};

/// 進行管理のエラー
///
/// どのエラーが返っても局面・台帳・時計・読み筋キャッシュは呼び出し前のまま。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    /// 別の確定/待ったが進行中
    #[error("another commit or revert is in progress")]
    Busy,

    #[error("the game is over")]
    GameOver,

    /// 合法手リストにない指し手
    #[error("move {0} is not legal in the current position")]
    IllegalMove(String),

    /// 確認待ちの着手がない
    #[error("no move is awaiting clock confirmation")]
    NoPendingMove,

    /// 別の着手が確認待ち
    #[error("move {0} is already awaiting clock confirmation")]
    ConfirmationPending(String),

    #[error(transparent)]
    InvalidMoveNotation(#[from] InvalidMoveNotationError),

    #[error(transparent)]
    MalformedPosition(#[from] MalformedPositionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// 着手確定の進行状態
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommitPhase {
    #[default]
    Idle,
    /// 時計の開始確認待ち（時計は停止中）
    AwaitingClockConfirmation { pending: String },
    /// 着手送信から事後解析まで進行中
    Committing { notation: String },
}

/// `submit_move_intent` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentOutcome {
    /// 時計が止まっているので確認待ちにした
    AwaitingClockConfirmation { pending: String },
    /// 確定した
    Committed(Box<CommitReport>),
}

/// 現局面と、そこから作った派生データ
///
/// 局面が変わるたびに丸ごと作り直して差し替える。
#[derive(Debug, Clone)]
pub struct LiveState {
    pub state: GameState,
    pub sfen: Sfen,
    pub legality: LegalityIndex,
}

impl LiveState {
    /// 局面文字列をパースできなければ作らない
    pub fn new(state: GameState) -> Result<LiveState, MalformedPositionError> {
        let sfen = state.sfen()?;
        if sfen.side_to_move != state.side_to_move {
            warn!(
                "side to move disagrees with position string ({} vs {})",
                state.side_to_move, sfen.side_to_move
            );
        }
        let legality = LegalityIndex::build(&state.legal_moves);
        Ok(LiveState {
            state,
            sfen,
            legality,
        })
    }

    pub fn board(&self) -> &Board {
        &self.sfen.board
    }
}

/// 確定/待ったの実行権
///
/// drop 時に busy を解放し、`Committing` のまま残っていれば `Idle` に戻す。
/// 処理中の Future が破棄された場合もこれで後始末される。
struct SequenceGuard<'a> {
    busy: &'a AtomicBool,
    phase: &'a Mutex<CommitPhase>,
}

impl<'a> SequenceGuard<'a> {
    fn acquire(
        busy: &'a AtomicBool,
        phase: &'a Mutex<CommitPhase>,
    ) -> Result<SequenceGuard<'a>, OrchestratorError> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| OrchestratorError::Busy)?;
        Ok(SequenceGuard { busy, phase })
    }
}

impl Drop for SequenceGuard<'_> {
    fn drop(&mut self) {
        let mut phase = self.phase.lock();
        if matches!(*phase, CommitPhase::Committing { .. }) {
            *phase = CommitPhase::Idle;
        }
        self.busy.store(false, Ordering::Release);
    }
}

/// 確認済み着手の巻き戻し
///
/// 棋譜に記録されないまま drop されたら（失敗・Future の破棄とも）、
/// 時計を確認前の状態に戻し、着手を確認待ちに戻す。
/// `SequenceGuard` より先に drop されるよう後から作ること。
struct ConfirmRollback<'a, T: TimeSource> {
    clock: &'a Mutex<SessionClock<T>>,
    phase: &'a Mutex<CommitPhase>,
    ledger: &'a Mutex<MoveLedger>,
    saved_clock: ClockState,
    ledger_len: usize,
    pending: String,
}

impl<T: TimeSource> Drop for ConfirmRollback<'_, T> {
    fn drop(&mut self) {
        if self.ledger.lock().len() != self.ledger_len {
            return;
        }
        debug!("confirmed move {} was not recorded; restoring clock", self.pending);
        self.clock.lock().set_state(self.saved_clock);
        *self.phase.lock() = CommitPhase::AwaitingClockConfirmation {
            pending: std::mem::take(&mut self.pending),
        };
    }
}

/// 対局セッション
pub struct GameOrchestrator<S, T = SystemTimeSource> {
    service: S,
    config: ServiceConfig,
    /// 棋譜出力用の開始局面（正規化済み SFEN）
    start_position: RwLock<String>,
    live: RwLock<Arc<LiveState>>,
    clock: Mutex<SessionClock<T>>,
    ledger: Mutex<MoveLedger>,
    hints: Mutex<HintCache<Analysis>>,
    phase: Mutex<CommitPhase>,
    busy: AtomicBool,
}

impl<S: GameService, T: TimeSource> GameOrchestrator<S, T> {
    /// 開始局面を取得してセッションを作る
    pub async fn start(
        service: S,
        config: &SessionConfig,
        time: T,
    ) -> Result<GameOrchestrator<S, T>, OrchestratorError> {
        let start = resolve_alias(&config.session.start_position);
        Sfen::parse(start)?;
        let state = with_timeout(
            config.service.request_timeout(),
            service.fetch_state(Some(start)),
        )
        .await?;
        let live = LiveState::new(state)?;
        info!("session started at {}", live.state.position);

        Ok(GameOrchestrator {
            service,
            config: config.service.clone(),
            start_position: RwLock::new(live.sfen.to_sfen()),
            live: RwLock::new(Arc::new(live)),
            clock: Mutex::new(SessionClock::with_time_source(time)),
            ledger: Mutex::new(MoveLedger::new()),
            hints: Mutex::new(HintCache::new()),
            phase: Mutex::new(CommitPhase::Idle),
            busy: AtomicBool::new(false),
        })
    }

    // =========================================================================
    // 読み出し
    // =========================================================================

    /// 現局面と派生データ
    pub fn live(&self) -> Arc<LiveState> {
        Arc::clone(&self.live.read())
    }

    /// 現局面のスナップショット
    pub fn state(&self) -> GameState {
        self.live.read().state.clone()
    }

    pub fn board(&self) -> Board {
        self.live.read().sfen.board.clone()
    }

    pub fn phase(&self) -> CommitPhase {
        self.phase.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// 対局時計の経過時間（ブロックしない）
    pub fn current_elapsed(&self) -> Duration {
        self.clock.lock().elapsed()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.lock().state()
    }

    /// 台帳の写し
    pub fn ledger_snapshot(&self) -> Vec<MoveRecord> {
        self.ledger.lock().records().to_vec()
    }

    /// 読み筋キャッシュに何か入っているか
    pub fn hint_cached(&self) -> bool {
        !self.hints.lock().is_empty()
    }

    pub fn moves_from(&self, from: Square) -> Vec<Square> {
        self.live.read().legality.moves_from(from).to_vec()
    }

    pub fn drop_targets(&self, piece_type: PieceType) -> Vec<Square> {
        self.live.read().legality.drop_targets(piece_type).to_vec()
    }

    pub fn promotion_choice(&self, from: Square, to: Square) -> Option<PromotionChoice> {
        self.live.read().legality.promotion_choice(from, to)
    }

    /// 開始局面と台帳から USI の position コマンドを作る
    pub fn usi_position_command(&self) -> String {
        let start = self.start_position.read().clone();
        let mut command = if start == SFEN_STARTPOS {
            "position startpos".to_string()
        } else {
            format!("position sfen {start}")
        };
        let ledger = self.ledger.lock();
        if !ledger.is_empty() {
            command.push_str(" moves ");
            command.push_str(&ledger.usi_moves().join(" "));
        }
        command
    }

    // =========================================================================
    // 着手
    // =========================================================================

    /// 指し手を受け付ける
    ///
    /// 時計が止まっていれば確認待ちにして返し、計時中ならそのまま確定する。
    pub async fn submit_move_intent(&self, notation: &str) -> Result<IntentOutcome, OrchestratorError> {
        let guard = SequenceGuard::acquire(&self.busy, &self.phase)?;
        let mv = UsiMove::parse(notation)?;
        let live = self.live();

        if live.state.is_over {
            return Err(OrchestratorError::GameOver);
        }
        if let CommitPhase::AwaitingClockConfirmation { pending } = &*self.phase.lock() {
            return Err(OrchestratorError::ConfirmationPending(pending.clone()));
        }
        if !live.legality.contains(&mv) {
            return Err(OrchestratorError::IllegalMove(notation.to_string()));
        }

        let notation = notation.to_string();
        if !self.clock.lock().is_running() {
            debug!("clock stopped; holding {notation} for confirmation");
            *self.phase.lock() = CommitPhase::AwaitingClockConfirmation {
                pending: notation.clone(),
            };
            return Ok(IntentOutcome::AwaitingClockConfirmation { pending: notation });
        }

        let report = self.commit(&guard, &live, notation).await?;
        Ok(IntentOutcome::Committed(Box::new(report)))
    }

    /// 確認待ちの着手を確定する（時計を開始してから送信）
    ///
    /// 棋譜に記録される前に失敗・破棄された場合は時計も確認待ちの状態も元に戻す。
    pub async fn confirm_pending_move(&self) -> Result<CommitReport, OrchestratorError> {
        let guard = SequenceGuard::acquire(&self.busy, &self.phase)?;
        let pending = match &*self.phase.lock() {
            CommitPhase::AwaitingClockConfirmation { pending } => pending.clone(),
            _ => return Err(OrchestratorError::NoPendingMove),
        };

        let rollback = ConfirmRollback {
            clock: &self.clock,
            phase: &self.phase,
            ledger: &self.ledger,
            saved_clock: self.clock.lock().state(),
            ledger_len: self.ledger.lock().len(),
            pending: pending.clone(),
        };
        self.clock.lock().start();
        info!("clock started; committing {pending}");

        let live = self.live();
        let result = self.commit(&guard, &live, pending).await;
        drop(rollback);
        result
    }

    /// 確認待ちの着手を取り消す
    pub fn decline_pending_move(&self) -> Result<String, OrchestratorError> {
        let mut phase = self.phase.lock();
        match std::mem::take(&mut *phase) {
            CommitPhase::AwaitingClockConfirmation { pending } => {
                debug!("declined pending move {pending}");
                Ok(pending)
            }
            other => {
                *phase = other;
                Err(OrchestratorError::NoPendingMove)
            }
        }
    }

    /// 着手を送信して状態を更新する
    ///
    /// 1. 事前の候補手（キャッシュ、なければ解析要求）と着手送信を同時に待つ。
    ///    送信が先に終われば候補手は待たずに省く。
    /// 2. 送信が成功したら局面を差し替えて台帳に記録する。
    /// 3. 新しい局面を解析し、次の手の読み筋としてキャッシュする。
    async fn commit(
        &self,
        _guard: &SequenceGuard<'_>,
        live: &LiveState,
        notation: String,
    ) -> Result<CommitReport, OrchestratorError> {
        *self.phase.lock() = CommitPhase::Committing {
            notation: notation.clone(),
        };
        let position = live.state.position.as_str();
        let side = live.state.side_to_move;
        let mut degradations = Vec::new();

        let cached = self.hints.lock().consume(position, side);
        if cached.is_some() {
            debug!("using cached suggestion for {position}");
        }
        let consumed = cached.clone();
        let analysis_timeout = self.config.analysis_timeout();
        let pre_analysis = async {
            match cached {
                Some(hit) => Ok(hit),
                None => with_timeout(analysis_timeout, self.service.analyze(position)).await,
            }
        };
        let apply = with_timeout(
            self.config.request_timeout(),
            self.service.apply_move(position, &notation),
        );
        tokio::pin!(pre_analysis);
        tokio::pin!(apply);

        let mut pre_move = None;
        let applied = loop {
            tokio::select! {
                biased;
                result = &mut pre_analysis, if pre_move.is_none() => {
                    pre_move = Some(result);
                }
                result = &mut apply => break result,
            }
        };

        let installed = match applied {
            Ok(MoveApplied { state, move_label }) => LiveState::new(state)
                .map(|next| (next, move_label))
                .map_err(OrchestratorError::from),
            Err(e) => Err(OrchestratorError::from(e)),
        };
        let (next, move_label) = match installed {
            Ok(installed) => installed,
            Err(e) => {
                warn!("move {notation} was not applied: {e}");
                // 取り出した読み筋は失敗時に戻す
                if let Some(suggestion) = consumed {
                    self.hints.lock().put(HintEntry {
                        position: position.to_string(),
                        side_to_move: side,
                        suggestion,
                    });
                }
                return Err(e);
            }
        };

        let pre_move_suggestion = match pre_move {
            Some(Ok(analysis)) => Some(analysis),
            Some(Err(e)) => {
                warn!("pre-move analysis failed: {e}");
                degradations.push(Degradation::pre_move(&e));
                None
            }
            None => {
                debug!("pre-move analysis still pending; omitting comparison");
                degradations.push(Degradation::PreMoveAnalysisPending);
                None
            }
        };

        // ここから先は await を挟まずに反映する
        let record = {
            let mut clock = self.clock.lock();
            if next.state.is_over {
                clock.stop();
            }
            let committed_at_ms = clock.elapsed_ms();
            self.ledger
                .lock()
                .append(
                    MoveDraft {
                        side,
                        notation: notation.clone(),
                        label: move_label,
                        resulting_position: next.state.position.clone(),
                    },
                    committed_at_ms,
                )
                .clone()
        };
        self.hints.lock().clear();
        let next = Arc::new(next);
        *self.live.write() = Arc::clone(&next);
        info!(
            "committed #{} {} ({} ms)",
            record.index, record.notation, record.committed_at_ms
        );
        if next.state.is_over {
            info!("game over; winner: {:?}", next.state.winner);
        }

        let post_move_analysis = if next.state.is_over {
            None
        } else {
            match with_timeout(analysis_timeout, self.service.analyze(&next.state.position)).await {
                Ok(analysis) => {
                    self.hints.lock().put(HintEntry {
                        position: next.state.position.clone(),
                        side_to_move: next.state.side_to_move,
                        suggestion: analysis.clone(),
                    });
                    Some(analysis)
                }
                Err(e) => {
                    warn!("post-move analysis failed: {e}");
                    degradations.push(Degradation::post_move(&e));
                    None
                }
            }
        };

        let explanation = match (&post_move_analysis, self.config.explain) {
            (Some(analysis), true) => {
                let request = ExplainRequest {
                    position: next.state.position.clone(),
                    last_move: Some(notation.clone()),
                    analysis: analysis.clone(),
                };
                match with_timeout(analysis_timeout, self.service.explain(&request)).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!("explanation failed: {e}");
                        degradations.push(Degradation::explanation(&e));
                        None
                    }
                }
            }
            _ => None,
        };

        let narrative = compose_narrative(
            &record,
            pre_move_suggestion.as_ref(),
            post_move_analysis.as_ref(),
            explanation.as_deref(),
        );
        *self.phase.lock() = CommitPhase::Idle;

        Ok(CommitReport {
            record,
            pre_move_suggestion,
            post_move_analysis,
            explanation,
            degradations,
            narrative,
        })
    }

    // =========================================================================
    // 待った・再読み込み
    // =========================================================================

    /// 台帳の `index` 番の手を指した直後の局面まで戻す
    ///
    /// 確認待ちの着手は破棄し、時計はその手の確定時刻で停止させる。
    pub async fn revert_to_ledger_index(&self, index: usize) -> Result<MoveRecord, OrchestratorError> {
        let _guard = SequenceGuard::acquire(&self.busy, &self.phase)?;
        let record = self.ledger.lock().record_at(index)?.clone();

        let state = with_timeout(
            self.config.request_timeout(),
            self.service.fetch_state(Some(&record.resulting_position)),
        )
        .await?;
        let next = LiveState::new(state)?;

        self.ledger.lock().truncate_after(index)?;
        *self.phase.lock() = CommitPhase::Idle;
        self.clock
            .lock()
            .restore(Duration::from_millis(record.committed_at_ms));
        self.hints.lock().clear();
        *self.live.write() = Arc::new(next);

        info!("reverted to #{} {}", record.index, record.notation);
        Ok(record)
    }

    /// 局面を取得し直して新しい対局にする
    ///
    /// `position` が None ならサービス側の現局面。台帳・時計・キャッシュは初期化する。
    pub async fn reload(&self, position: Option<&str>) -> Result<GameState, OrchestratorError> {
        let _guard = SequenceGuard::acquire(&self.busy, &self.phase)?;
        let position = position.map(resolve_alias);
        if let Some(position) = position {
            Sfen::parse(position)?;
        }

        let state = with_timeout(self.config.request_timeout(), self.service.fetch_state(position)).await?;
        let next = LiveState::new(state)?;

        *self.phase.lock() = CommitPhase::Idle;
        self.ledger.lock().clear();
        self.clock.lock().reset();
        self.hints.lock().clear();
        *self.start_position.write() = next.sfen.to_sfen();
        let snapshot = next.state.clone();
        *self.live.write() = Arc::new(next);

        info!("reloaded session at {}", snapshot.position);
        Ok(snapshot)
    }

    // =========================================================================
    // 読み筋
    // =========================================================================

    /// 現局面の候補手
    ///
    /// キャッシュにあればそれを返し（取り出さない）、なければ解析してキャッシュする。
    pub async fn request_hint(&self) -> Result<Analysis, OrchestratorError> {
        let _guard = SequenceGuard::acquire(&self.busy, &self.phase)?;
        let live = self.live();
        let position = live.state.position.as_str();
        let side = live.state.side_to_move;

        let cached = self.hints.lock().peek(position, side).cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let analysis = with_timeout(self.config.analysis_timeout(), self.service.analyze(position)).await?;
        self.hints.lock().put(HintEntry {
            position: position.to_string(),
            side_to_move: side,
            suggestion: analysis.clone(),
        });
        Ok(analysis)
    }
}
