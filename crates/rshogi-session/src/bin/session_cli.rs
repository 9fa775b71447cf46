//! 対局セッションの対話 CLI
//!
//! 標準入力から 1 行 1 コマンドで操作する。`help` で一覧を表示。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use rshogi_session::orchestrator::IntentOutcome;
use rshogi_session::position::hands_to_sfen;
use rshogi_session::types::PieceType;
use rshogi_session::{
    CommitReport, GameOrchestrator, HttpGameService, SessionConfig, Square, SystemTimeSource,
};

type Session = GameOrchestrator<HttpGameService, SystemTimeSource>;

const HELP: &str = "\
commands:
  board              show the current position
  moves <sq|PIECE>   legal targets from a square (7g) or drop targets for a piece (P)
  move <usi>         play a move (7g7f, 8h2b+, P*5e)
  confirm            start the clock and play the pending move
  decline            discard the pending move
  hint               suggested move for the current position
  revert <index>     go back to the position after ledger move <index>
  ledger [--json]    list committed moves
  time               show the session clock
  kifu               print the USI position command for this game
  reload [sfen]      start a new game (startpos or the given SFEN)
  quit";

#[derive(Parser, Debug)]
#[command(name = "session_cli", version, about = "Interactive shogi session client")]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Service base URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Start position: "startpos" or a full SFEN (overrides the config file)
    #[arg(long)]
    start: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(url) = cli.base_url {
        config.service.base_url = url;
    }
    if let Some(start) = cli.start {
        config.session.start_position = start;
    }
    config.validate().context("invalid configuration")?;

    let service =
        HttpGameService::from_config(&config.service).context("failed to build HTTP client")?;
    info!("connecting to {}", service.base_url());
    let session = GameOrchestrator::start(service, &config, SystemTimeSource)
        .await
        .context("failed to start session")?;

    print_board(&session);
    prompt()?;
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let cmd = line.trim();
        if cmd == "quit" || cmd == "exit" {
            break;
        }
        if !cmd.is_empty() {
            if let Err(e) = handle_command(&session, cmd).await {
                println!("error: {e:#}");
            }
        }
        prompt()?;
    }
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush().context("failed to flush stdout")
}

async fn handle_command(session: &Session, cmd: &str) -> Result<()> {
    let mut parts = cmd.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match (name, arg) {
        ("help", _) => println!("{HELP}"),
        ("board", _) => print_board(session),
        ("moves", Some(arg)) => print_targets(session, arg)?,
        ("move", Some(notation)) => match session.submit_move_intent(notation).await? {
            IntentOutcome::AwaitingClockConfirmation { pending } => {
                println!("clock is stopped; `confirm` to start it and play {pending}, `decline` to cancel");
            }
            IntentOutcome::Committed(report) => print_report(session, &report),
        },
        ("confirm", _) => {
            let report = session.confirm_pending_move().await?;
            print_report(session, &report);
        }
        ("decline", _) => println!("discarded {}", session.decline_pending_move()?),
        ("hint", _) => {
            let hint = session.request_hint().await?;
            match hint.score() {
                Some(score) => println!("hint: {} ({score})", hint.best_move),
                None => println!("hint: {}", hint.best_move),
            }
        }
        ("revert", Some(index)) => {
            let index: usize = index.parse().context("revert takes a ledger index")?;
            let record = session.revert_to_ledger_index(index).await?;
            println!("reverted to #{} {}", record.index, record.notation);
            print_board(session);
        }
        ("ledger", flag) => print_ledger(session, flag == Some("--json"))?,
        ("time", _) => println!(
            "{} ({})",
            format_elapsed(session.current_elapsed()),
            if session.clock_state().is_running() { "running" } else { "stopped" }
        ),
        ("kifu", _) => println!("{}", session.usi_position_command()),
        ("reload", position) => {
            session.reload(Some(position.unwrap_or("startpos"))).await?;
            print_board(session);
        }
        _ => println!("unknown command: {cmd} (try `help`)"),
    }
    Ok(())
}

fn print_board(session: &Session) {
    let live = session.live();
    print!("{}", live.board());
    println!("hands: {}", hands_to_sfen(&live.state.captured_counts));
    let check = if live.state.in_check { " (check)" } else { "" };
    println!("to move: {}{check}  ply {}", live.state.side_to_move, live.sfen.ply);
    if live.state.is_over {
        match live.state.winner {
            Some(winner) => println!("game over: {winner} wins"),
            None => println!("game over: draw"),
        }
    }
}

fn print_targets(session: &Session, arg: &str) -> Result<()> {
    let targets = if let Some(sq) = Square::from_usi(arg) {
        if let Some(choice) = promotion_hint(session, sq) {
            println!("{choice}");
        }
        session.moves_from(sq)
    } else {
        let piece_type = single_char(arg)
            .and_then(PieceType::from_usi_char)
            .filter(|pt| pt.is_hand_piece())
            .with_context(|| format!("expected a square or a hand piece letter, got {arg}"))?;
        session.drop_targets(piece_type)
    };
    if targets.is_empty() {
        println!("no legal targets");
    } else {
        let list: Vec<String> = targets.iter().map(|sq| sq.to_usi()).collect();
        println!("{}", list.join(" "));
    }
    Ok(())
}

/// 成り/不成を選べる移動先があれば一覧にする
fn promotion_hint(session: &Session, from: Square) -> Option<String> {
    let optional: Vec<String> = session
        .moves_from(from)
        .into_iter()
        .filter(|&to| session.promotion_choice(from, to).is_some_and(|c| c.needs_prompt()))
        .map(|to| to.to_usi())
        .collect();
    (!optional.is_empty()).then(|| format!("promotion optional at: {}", optional.join(" ")))
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

fn print_report(session: &Session, report: &CommitReport) {
    println!("{}", report.narrative);
    for degradation in &report.degradations {
        log::debug!("degraded: {degradation:?}");
    }
    print_board(session);
}

fn print_ledger(session: &Session, json: bool) -> Result<()> {
    let records = session.ledger_snapshot();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("failed to serialize ledger")?
        );
        return Ok(());
    }
    for record in &records {
        println!(
            "{:>3}  {:<4} {:<8} {:>10} (+{})  {}",
            record.index,
            record.side.label(),
            record.label.as_deref().unwrap_or(&record.notation),
            format_elapsed(Duration::from_millis(record.committed_at_ms)),
            format_elapsed(Duration::from_millis(record.delta_ms)),
            record.played_at.format("%H:%M:%S"),
        );
    }
    Ok(())
}

fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}.{}", secs / 60, secs % 60, d.subsec_millis() / 100)
}
