//! # rshogi-session
//!
//! 対局クライアント側のセッション管理ライブラリ。
//! 局面・指し手・合法手は外部サービスから受け取り、このクレートは
//! 着手確定の手順、対局時計、棋譜台帳、待った、読み筋キャッシュを受け持つ。
//!
//! ## モジュール構成
//!
//! - `types`: 基本型（Color, Square, Piece, Hand）
//! - `position`: SFEN の読み書き
//! - `notation`: USI 指し手の読み書き
//! - `legality`: 合法手インデックス
//! - `clock`: 対局時計
//! - `ledger`: 棋譜台帳
//! - `hint`: 読み筋キャッシュ
//! - `service`: 外部サービスのインターフェース
//! - `http`: HTTP 実装（`http` feature）
//! - `config`: 設定ファイル
//! - `report`: 着手確定の結果報告
//! - `orchestrator`: 対局セッションの進行管理

pub mod types;

pub mod notation;
pub mod position;

pub mod legality;

pub mod clock;
pub mod hint;
pub mod ledger;

pub mod config;
#[cfg(feature = "http")]
pub mod http;
pub mod service;

pub mod orchestrator;
pub mod report;

pub use clock::{ManualTimeSource, SessionClock, SystemTimeSource, TimeSource};
pub use config::{ConfigError, SessionConfig};
#[cfg(feature = "http")]
pub use http::HttpGameService;
pub use ledger::{LedgerError, MoveLedger, MoveRecord};
pub use legality::LegalityIndex;
pub use notation::{InvalidMoveNotationError, UsiMove};
pub use orchestrator::{CommitPhase, GameOrchestrator, IntentOutcome, OrchestratorError};
pub use position::{Board, MalformedPositionError, SFEN_STARTPOS, Sfen};
pub use report::{CommitReport, Degradation};
pub use service::{Analysis, GameService, GameState, MoveApplied, ServiceError};
pub use types::{Color, Square};
