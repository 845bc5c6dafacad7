//! # Print Jobs
//!
//! Receipt content handed to whatever printer the terminal is paired with.
//!
//! ## Layout (58mm thermal)
//! ```text
//! ┌──────────────────────────────┐
//! │         BET RECEIPT          │  title
//! │──────────────────────────────│
//! │ 10/14/2025 08:00:00 PM       │  lines
//! │ Teller: Ana                  │
//! │ Bet ID: 2025-10-0042         │
//! │ ...                          │
//! │           [QR]               │  qr_payload (bet receipts only)
//! │──────────────────────────────│
//! │          THANK YOU!          │
//! └──────────────────────────────┘
//! ```

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::settlement::{Assessment, SettlementStatus};
use crate::types::{Side, WagerRecord};

const RULE: &str = "--------------------------------";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PrintJob {
    pub title: String,
    pub lines: Vec<String>,
    pub qr_payload: Option<String>,
}

impl PrintJob {
    /// Receipt handed to the bettor when a wager is placed.
    pub fn bet_receipt(wager: &WagerRecord, qr_payload: String, offset: FixedOffset) -> Self {
        PrintJob {
            title: "BET RECEIPT".to_string(),
            lines: vec![
                stamp(wager.placed_at, offset),
                format!("Teller: {}", wager.teller_name),
                format!("Bet ID: {}", wager.id),
                format!("Fight ID: {}", wager.event_id),
                format!("Fight #: {}", wager.event_number),
                format!("Side: {}", wager.side),
                format!("Amount: {}", wager.amount.receipt_display()),
            ],
            qr_payload: Some(qr_payload),
        }
    }

    /// Receipt printed when a winning wager is paid out.
    pub fn payout_receipt(wager: &WagerRecord, assessment: &Assessment, offset: FixedOffset) -> Self {
        let odds_line = if assessment.side == Side::Draw {
            format!("Multiplier: {}x", assessment.odds)
        } else {
            format!("Odds: {}", assessment.odds)
        };
        PrintJob {
            title: "PAYOUT RECEIPT".to_string(),
            lines: vec![
                stamp(wager.placed_at, offset),
                format!("Teller: {}", wager.teller_name),
                format!("Bet ID: {}", wager.id),
                format!("Fight ID: {}", wager.event_id),
                format!("Side: {}", assessment.side),
                format!("Amount: {}", assessment.amount.receipt_display()),
                format!("Outcome: {}", assessment.outcome),
                odds_line,
                format!("Result: {}", result_label(assessment.status)),
                format!("PAYOUT: {}", assessment.payout.receipt_display()),
            ],
            qr_payload: None,
        }
    }

    /// Plain-text rendering, one printer line per element.
    pub fn render(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.lines.len() + 6);
        out.push(self.title.clone());
        out.push(RULE.to_string());
        out.extend(self.lines.iter().cloned());
        if let Some(qr) = &self.qr_payload {
            out.push(format!("[QR] {qr}"));
        }
        out.push(RULE.to_string());
        out.push("THANK YOU!".to_string());
        out
    }
}

fn stamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%m/%d/%Y %I:%M:%S %p").to_string()
}

fn result_label(status: SettlementStatus) -> &'static str {
    match status {
        SettlementStatus::Won => "WON",
        SettlementStatus::Lost => "LOST",
        SettlementStatus::Pending => "PENDING",
    }
}
