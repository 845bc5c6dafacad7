//! # Receipt Printer Sink
//!
//! The terminal hands finished print jobs to a [`ReceiptPrinter`]. Turning
//! them into printer bytes (Bluetooth, ESC/POS) happens outside this crate.

use async_trait::async_trait;
use ringside_core::print::PrintJob;
use tracing::info;

use crate::error::SyncResult;

#[async_trait]
pub trait ReceiptPrinter: Send + Sync {
    async fn print(&self, job: &PrintJob) -> SyncResult<()>;
}

/// Writes each rendered line to the log. Used when no printer is paired.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPrinter;

#[async_trait]
impl ReceiptPrinter for LogPrinter {
    async fn print(&self, job: &PrintJob) -> SyncResult<()> {
        for line in job.render() {
            info!(target: "ringside::printer", "{line}");
        }
        Ok(())
    }
}
