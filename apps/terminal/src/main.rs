//! # Ringside Terminal Entry Point
//!
//! Headless teller terminal. Runs one [`TerminalSession`] against the local
//! database and exposes the teller operations as subcommands.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Initialize tracing (RUST_LOG overrides the default filter)          │
//! │  2. Load terminal.toml (+ RINGSIDE_* environment overrides)             │
//! │  3. Open the SQLite database and run migrations                         │
//! │  4. Start the TerminalSession                                           │
//! │  5. Run the command, then shut the session down                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! ringside-terminal watch
//! ringside-terminal place MERON 500
//! ringside-terminal redeem "fight_id=F1,bet_id=2025-10-0001,..."
//! ringside-terminal --config ./terminal.toml report 2025-10-14
//! ```

use chrono::{NaiveDate, Utc};
use ringside_core::{Money, Side};
use ringside_db::{Database, DbConfig};
use ringside_sync::{LiveStore, LogPrinter, ReceiptPrinter, TerminalConfig, TerminalSession};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: ringside-terminal [--config PATH] <watch | place SIDE PESOS | redeem PAYLOAD | report [YYYY-MM-DD]>";

enum Command {
    Watch,
    Place { side: Side, amount: Money },
    Redeem { payload: String },
    Report { day: Option<NaiveDate> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, command) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    let config = TerminalConfig::load(config_path)?;
    info!(teller = %config.teller.id, db = ?config.storage.db_path, "Starting Ringside terminal");

    let db = Database::new(DbConfig::new(&config.storage.db_path)).await?;
    let session = TerminalSession::start(LiveStore::new(db), &config)?;

    let outcome = run(&session, command).await;
    session.shutdown().await;
    outcome
}

async fn run(session: &TerminalSession, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let printer = LogPrinter;
    match command {
        Command::Watch => watch(session).await?,
        Command::Place { side, amount } => {
            session.wait_ready().await?;
            let placement = session.place(side, amount).await?;
            if placement.degraded {
                warn!(wager_id = %placement.wager.id, "Wager id came from the fallback path");
            }
            printer.print(&placement.print_job).await?;
            println!("{}", placement.qr_payload);
        }
        Command::Redeem { payload } => {
            let redemption = session.redeem(&payload).await?;
            println!("{:?}: {}", redemption.status(), redemption.payout());
            if let Some(job) = &redemption.print_job {
                printer.print(job).await?;
            }
        }
        Command::Report { day } => {
            let day = day.unwrap_or_else(|| session.ledger().local_day(Utc::now()));
            let statement = session.ledger().daily_statement(day).await?;
            let report = &statement.report;
            println!("Report for {}", report.day);
            println!("  Cash in: {}", report.cash_in);
            println!("  Bets:    {} ({})", report.bets, report.bet_count);
            println!("  Payouts: {} ({})", report.payouts, report.payout_count);
            println!("  Net:     {}", report.net);
            for entry in &statement.entries {
                println!("  {} {:?} {} {}", entry.recorded_at, entry.kind, entry.amount, entry.reason);
            }
        }
    }
    Ok(())
}

/// Logs the live views until Ctrl+C.
async fn watch(session: &TerminalSession) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = session.config_updates();
    let mut events = session.events();
    let mut wagers = session.wagers();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                return Ok(());
            }
            changed = config.changed() => {
                changed?;
                match config.borrow_and_update().as_ref() {
                    Some(live) => info!(
                        session = live.current_session_number,
                        event = live.current_event_number,
                        meron_open = live.meron_open,
                        wala_open = live.wala_open,
                        "Live config"
                    ),
                    None => info!("Waiting for live config"),
                }
            }
            changed = events.changed() => {
                changed?;
                let view = events.borrow_and_update();
                info!(count = view.items.len(), ready = view.ready, stale = view.stale.len(), "Events updated");
                for event in view.items.iter().take(5) {
                    info!(
                        event = event.event_number,
                        status = ?event.status,
                        meron = %event.meron_pool,
                        wala = %event.wala_pool,
                        draw = %event.draw_pool,
                        "  event"
                    );
                }
            }
            changed = wagers.changed() => {
                changed?;
                let view = wagers.borrow_and_update();
                info!(count = view.items.len(), ready = view.ready, stale = view.stale.len(), "Wagers updated");
            }
        }
    }
}

fn parse_args(args: &[String]) -> Result<(Option<PathBuf>, Command), String> {
    let mut config_path = None;
    let mut rest = args;
    if let [flag, path, tail @ ..] = rest {
        if flag == "--config" || flag == "-c" {
            config_path = Some(PathBuf::from(path));
            rest = tail;
        }
    }

    let command = match rest {
        [cmd] if cmd == "watch" => Command::Watch,
        [cmd, side, pesos] if cmd == "place" => Command::Place {
            side: side.parse().map_err(|err| format!("{err}"))?,
            amount: Money::from_pesos(pesos.parse::<i64>().map_err(|_| format!("invalid amount: {pesos}"))?),
        },
        [cmd, payload] if cmd == "redeem" => Command::Redeem {
            payload: payload.clone(),
        },
        [cmd] if cmd == "report" => Command::Report { day: None },
        [cmd, day] if cmd == "report" => Command::Report {
            day: Some(NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| format!("invalid day: {day}"))?),
        },
        [] => return Err("missing command".to_string()),
        other => return Err(format!("unknown command: {}", other.join(" "))),
    };
    Ok((config_path, command))
}

/// Initializes the tracing subscriber for structured logging.
///
/// - `RUST_LOG=debug` shows debug messages everywhere
/// - `RUST_LOG=ringside=trace` narrows tracing to the ringside crates
/// - Default: `info,ringside=debug,sqlx=warn`
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ringside=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
