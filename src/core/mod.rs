//! Core business logic: ledger planning, summaries, the status rollup and the services that
//! tie them to a [`Sheet`](crate::sheets::Sheet).

pub mod catalog;
pub mod debt;
pub mod ledger;
pub mod reader;
pub mod rollup;
pub mod submission;
pub mod summary;
pub mod time;

pub use debt::{Committed, DebtBook, NewDebt, PaymentOutcome, PaymentRequest, PaymentTarget};
pub use ledger::{DebtItem, LedgerChanges, Tender};
pub use summary::ContactSummary;

use rollup::RollupSettings;
use std::time::Duration;

/// Timing knobs shared by the ledger services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Pause between sequential remote reads and writes
    pub pace: Duration,
    /// Status rollup retry policy
    pub rollup: RollupSettings,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            pace: Duration::from_millis(300),
            rollup: RollupSettings::default(),
        }
    }
}

impl LedgerSettings {
    /// No pacing and no retry delay, for local backends and tests.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            pace: Duration::ZERO,
            rollup: RollupSettings {
                max_attempts: 3,
                retry_delay: Duration::ZERO,
                write_delay: Duration::ZERO,
            },
        }
    }
}

/// Sleeps for `pace` unless it is zero.
pub(crate) async fn pause(pace: Duration) {
    if !pace.is_zero() {
        tokio::time::sleep(pace).await;
    }
}
