//! # Seed Data Generator
//!
//! Populates a development database with a live config, one session of
//! events in the current month's partition, and an opening float.
//!
//! ## Usage
//! ```bash
//! cargo run -p ringside-db --bin seed
//! cargo run -p ringside-db --bin seed -- --db ./data/ringside.db --events 40 --session 3
//! ```

use chrono::Utc;
use ringside_core::{
    CommissionRate, EntityKind, EventRecord, EventStatus, LedgerEntry, LedgerKind, LiveConfig,
    Money, Odds, Outcome, PartitionResolver, DEFAULT_UTC_OFFSET_MINUTES,
};
use ringside_db::{Database, DbConfig};
use std::env;
use uuid::Uuid;

const DRAW_MULTIPLIER_BPS: u32 = 80_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./ringside_dev.db");
    let mut events: i64 = 20;
    let mut session: i64 = 1;
    let mut teller = String::from("teller-1");
    let mut float_pesos: i64 = 10_000;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" if i + 1 < args.len() => {
                db_path = args[i + 1].clone();
                i += 1;
            }
            "--events" | "-e" if i + 1 < args.len() => {
                events = args[i + 1].parse().unwrap_or(events);
                i += 1;
            }
            "--session" | "-s" if i + 1 < args.len() => {
                session = args[i + 1].parse().unwrap_or(session);
                i += 1;
            }
            "--teller" | "-t" if i + 1 < args.len() => {
                teller = args[i + 1].clone();
                i += 1;
            }
            "--float" | "-f" if i + 1 < args.len() => {
                float_pesos = args[i + 1].parse().unwrap_or(float_pesos);
                i += 1;
            }
            "--help" | "-h" => {
                println!("Ringside Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: ./ringside_dev.db)");
                println!("  -e, --events <N>      Events to open in the session (default: 20)");
                println!("  -s, --session <N>     Session number (default: 1)");
                println!("  -t, --teller <ID>     Teller to issue the opening float to (default: teller-1)");
                println!("  -f, --float <PESOS>   Opening float (default: 10000)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Ringside Seed Data Generator");
    println!("============================");
    println!("Database: {db_path}");
    println!("Session:  {session} ({events} events)");
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    if db.live_config().get().await?.is_some() {
        println!("⚠ Live config already present; skipping seed to avoid duplicates.");
        return Ok(());
    }

    let now = Utc::now();
    let resolver = PartitionResolver::new(DEFAULT_UTC_OFFSET_MINUTES)?;
    let partition = resolver.current(EntityKind::Event, now)?;

    for number in 1..=events {
        db.events()
            .insert(&EventRecord {
                id: Uuid::new_v4().to_string(),
                partition_key: partition.to_string(),
                event_number: number,
                session_number: session,
                meron_pool: Money::zero(),
                wala_pool: Money::zero(),
                draw_pool: Money::zero(),
                meron_odds: Odds::zero(),
                wala_odds: Odds::zero(),
                draw_odds: Odds::from_bps(DRAW_MULTIPLIER_BPS),
                draw_multiplier: Odds::from_bps(DRAW_MULTIPLIER_BPS),
                commission_collected: Money::zero(),
                outcome: Outcome::Pending,
                status: EventStatus::Open,
                created_at: now,
            })
            .await?;
    }
    println!("✓ {events} events opened in {partition}");

    let config = LiveConfig {
        current_event_number: 1,
        current_session_number: session,
        commission_rate: CommissionRate::from_bps(1000),
        meron_open: true,
        wala_open: true,
        petty_cash: Money::from_pesos(float_pesos),
    };
    db.live_config().put(&config, now).await?;
    println!("✓ Live config written (event #1, 10% commission)");

    db.ledger()
        .append(&LedgerEntry {
            id: Uuid::new_v4().to_string(),
            teller_id: teller.clone(),
            kind: LedgerKind::CashIn,
            amount: Money::from_pesos(float_pesos),
            recorded_at: now,
            wager_id: None,
            event_number: None,
            side: None,
            reason: "Opening float".to_string(),
        })
        .await?;
    println!("✓ Opening float {} issued to {teller}", Money::from_pesos(float_pesos));

    db.close().await;
    Ok(())
}
