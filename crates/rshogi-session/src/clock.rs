//! 対局時計（SessionClock）
//!
//! 累積経過時間を start / stop / reset で管理する。`elapsed()` は保持状態と
//! 現在時刻から計算する純粋な読み出しで、UI がどの間隔でポーリングしても副作用はない。

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// 現在時刻の取得元
pub trait TimeSource {
    fn now(&self) -> Instant;
}

/// `Instant::now()` を返す実時計
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 手動で進める時計（テスト・リプレイ用）
///
/// clone したハンドルは同じ時刻を共有する。
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    /// 基準からの経過ミリ秒
    current_ms: u64,
    base_instant: Instant,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                current_ms: 0,
                base_instant: Instant::now(),
            })),
        }
    }

    /// 時刻を `ms` ミリ秒進める
    pub fn advance(&self, ms: u64) {
        self.state.lock().current_ms += ms;
    }

    /// 基準からの経過ミリ秒
    pub fn current_ms(&self) -> u64 {
        self.state.lock().current_ms
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        let state = self.state.lock();
        state.base_instant + Duration::from_millis(state.current_ms)
    }
}

/// 計時状態
///
/// 停止中は計測開始時刻を持たない（`running == false ⇒ 開始時刻なし` を型で保証）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockRun {
    Stopped,
    Running { since: Instant },
}

/// 時計の状態のスナップショット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockState {
    pub run: ClockRun,
    pub accumulated: Duration,
}

impl ClockState {
    pub fn is_running(&self) -> bool {
        matches!(self.run, ClockRun::Running { .. })
    }
}

/// 対局時計
#[derive(Debug, Clone)]
pub struct SessionClock<T = SystemTimeSource> {
    time: T,
    state: ClockState,
}

impl SessionClock<SystemTimeSource> {
    pub fn new() -> Self {
        Self::with_time_source(SystemTimeSource)
    }
}

impl Default for SessionClock<SystemTimeSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeSource> SessionClock<T> {
    /// 停止状態・累積 0 で生成
    pub fn with_time_source(time: T) -> Self {
        Self {
            time,
            state: ClockState {
                run: ClockRun::Stopped,
                accumulated: Duration::ZERO,
            },
        }
    }

    /// 計時開始（計時中なら何もしない）
    pub fn start(&mut self) {
        if let ClockRun::Stopped = self.state.run {
            self.state.run = ClockRun::Running {
                since: self.time.now(),
            };
        }
    }

    /// 計時停止。今回の計測分を累積に加える（停止中なら何もしない）
    pub fn stop(&mut self) {
        if let ClockRun::Running { since } = self.state.run {
            let lap = self.time.now().saturating_duration_since(since);
            self.state.accumulated += lap;
            self.state.run = ClockRun::Stopped;
        }
    }

    /// 累積を 0 にして停止状態へ戻す
    pub fn reset(&mut self) {
        self.restore(Duration::ZERO);
    }

    /// 累積を指定値に設定して停止状態へ戻す（待ったで使用）
    pub fn restore(&mut self, accumulated: Duration) {
        self.state = ClockState {
            run: ClockRun::Stopped,
            accumulated,
        };
    }

    /// 表示用の経過時間: 累積 + (計時中なら今回の計測分)
    pub fn elapsed(&self) -> Duration {
        match self.state.run {
            ClockRun::Stopped => self.state.accumulated,
            ClockRun::Running { since } => {
                self.state.accumulated + self.time.now().saturating_duration_since(since)
            }
        }
    }

    /// 経過時間（ミリ秒）
    pub fn elapsed_ms(&self) -> u64 {
        duration_to_millis(self.elapsed())
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// 停止時点までの累積
    pub fn accumulated(&self) -> Duration {
        self.state.accumulated
    }

    /// 現在の状態
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// スナップショットから状態を戻す
    pub fn set_state(&mut self, state: ClockState) {
        self.state = state;
    }
}

/// Duration をミリ秒（u64）に変換（飽和）
pub fn duration_to_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
