//! StatusHutang projector.
//!
//! The StatusHutang sheet is a read model: one row per contact, rebuilt from the Debts and
//! DebtPayments sheets and upserted by contact id. Nothing in the ledger reads it back.
//! Failures are retried a few times, then logged and skipped.

use super::reader::load;
use super::summary::{ContactSummary, summarize};
use super::time::format_wib;
use super::pause;
use crate::errors::{Error, Result};
use crate::records::{DebtRecord, PaymentRecord, SheetRecord, StatusRow, into_records};
use crate::sheets::Sheet;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Retry and pacing policy for status upserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupSettings {
    /// Attempts per upsert
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub retry_delay: Duration,
    /// Pause between consecutive upserts
    pub write_delay: Duration,
}

impl Default for RollupSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            write_delay: Duration::from_millis(300),
        }
    }
}

/// Which contacts to recompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollupScope {
    /// Every contact with ledger rows
    All,
    /// One contact
    Contact(String),
}

impl RollupScope {
    fn includes(&self, contact_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Contact(id) => id == contact_id,
        }
    }
}

/// Outcome of one rollup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupReport {
    /// Existing rows overwritten
    pub updated: usize,
    /// Rows appended
    pub appended: usize,
    /// Contact ids whose upsert gave up
    pub failed: Vec<String>,
}

/// Projects summaries onto StatusHutang rows, skipping contacts without ledger rows.
#[must_use]
pub fn project(
    summaries: &BTreeMap<String, ContactSummary>,
    scope: &RollupScope,
    updated_at: &str,
) -> Vec<StatusRow> {
    summaries
        .values()
        .filter(|summary| summary.debt_count > 0 && scope.includes(&summary.contact_id))
        .map(|summary| StatusRow {
            contact_id: summary.contact_id.clone(),
            contact_name: summary.contact_name.clone(),
            contact_type: summary.contact_type,
            total_original: summary.total_original,
            total_paid: summary.total_paid,
            total_debt: summary.total_debt,
            titip_uang: summary.titip_uang,
            titip_barang: summary.titip_barang,
            cash_out: summary.cash_out,
            net_balance: summary.net_balance,
            status: summary.status(),
            updated_at: updated_at.to_string(),
        })
        .collect()
}

/// Runs `op` up to `max_attempts` times with a fixed delay. Validation errors are not
/// retried.
async fn with_retry<F, Fut>(settings: &RollupSettings, label: &str, mut op: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let attempts = settings.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(()) => return Ok(()),
            Err(e @ Error::Validation { .. }) => return Err(e),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!("{label} failed (attempt {attempt}/{attempts}): {e}");
                pause(settings.retry_delay).await;
                attempt += 1;
            }
        }
    }
}

/// Upserts `rows` by contact id.
pub async fn write_status_rows(
    sheet: &dyn Sheet,
    rows: Vec<StatusRow>,
    settings: &RollupSettings,
) -> Result<RollupReport> {
    let existing: HashMap<String, usize> = load::<StatusRow>(sheet)
        .await?
        .into_iter()
        .map(|stored| (stored.record.contact_id, stored.row))
        .collect();

    let mut report = RollupReport::default();
    for (i, row) in rows.into_iter().enumerate() {
        if i > 0 {
            pause(settings.write_delay).await;
        }
        let cells = row.to_row();
        let label = format!("Status upsert for {}", row.contact_id);
        let target = existing.get(&row.contact_id).copied();
        let result = match target {
            Some(row_index) => {
                with_retry(settings, &label, || {
                    sheet.update_row(StatusRow::SHEET, row_index, &cells)
                })
                .await
            }
            None => {
                let rows = [cells.clone()];
                with_retry(settings, &label, || sheet.append_rows(StatusRow::SHEET, &rows)).await
            }
        };
        match result {
            Ok(()) if target.is_some() => report.updated += 1,
            Ok(()) => report.appended += 1,
            Err(e) => {
                error!("{label} gave up: {e}");
                report.failed.push(row.contact_id);
            }
        }
    }
    Ok(report)
}

/// Recomputes and writes StatusHutang rows for `scope`.
pub async fn refresh_status(
    sheet: &dyn Sheet,
    scope: &RollupScope,
    settings: &RollupSettings,
) -> Result<RollupReport> {
    sheet
        .ensure_sheet(StatusRow::SHEET, StatusRow::HEADERS)
        .await?;
    let ledger = load::<DebtRecord>(sheet).await?;
    pause(settings.write_delay).await;
    let payments = into_records(load::<PaymentRecord>(sheet).await?);

    let summaries = summarize(&ledger, &payments);
    let rows = project(&summaries, scope, &format_wib(Utc::now()));
    debug!("Projected {} status rows for {scope:?}", rows.len());

    let report = write_status_rows(sheet, rows, settings).await?;
    info!(
        "Status rollup done: {} updated, {} appended, {} failed",
        report.updated,
        report.appended,
        report.failed.len()
    );
    Ok(report)
}

/// Runs [`refresh_status`] in the background. The handle may be awaited or dropped.
///
/// `gate` is held across the read and the upsert, so refreshes sharing it never interleave
/// and cannot both append a row for the same contact.
pub fn spawn_refresh(
    sheet: Arc<dyn Sheet>,
    scope: RollupScope,
    settings: RollupSettings,
    gate: Arc<Mutex<()>>,
) -> JoinHandle<Result<RollupReport>> {
    tokio::spawn(async move {
        let _turn = gate.lock().await;
        let result = refresh_status(sheet.as_ref(), &scope, &settings).await;
        if let Err(e) = &result {
            error!("Status rollup for {scope:?} failed: {e}");
        }
        result
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::reader::{ensure_workbook, load_records};
    use crate::records::{BalanceStatus, ContactType, EntryKind};
    use crate::test_utils::{FlakySheet, contact, seed_ledger, setup_test_sheet};

    fn fast() -> RollupSettings {
        RollupSettings {
            max_attempts: 3,
            retry_delay: Duration::ZERO,
            write_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_refresh_appends_then_updates() -> Result<()> {
        let sheet = setup_test_sheet().await?;
        ensure_workbook(&sheet, Duration::ZERO).await?;
        let budi = contact("C1", "Budi", ContactType::Customer);
        seed_ledger(&sheet, &budi, EntryKind::Debt, 40000.0).await?;

        let first = refresh_status(&sheet, &RollupScope::All, &fast()).await?;
        assert_eq!(first.appended, 1);

        seed_ledger(&sheet, &budi, EntryKind::TitipUang, 50000.0).await?;
        let second = refresh_status(&sheet, &RollupScope::All, &fast()).await?;
        assert_eq!(second.updated, 1);
        assert_eq!(second.appended, 0);

        let rows = load_records::<StatusRow>(&sheet).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].net_balance, -10000.0);
        assert_eq!(rows[0].status, BalanceStatus::TitipUang);
        Ok(())
    }

    #[tokio::test]
    async fn test_scope_limits_written_contacts() -> Result<()> {
        let sheet = setup_test_sheet().await?;
        ensure_workbook(&sheet, Duration::ZERO).await?;
        let budi = contact("C1", "Budi", ContactType::Customer);
        let ani = contact("C2", "Ani", ContactType::Customer);
        seed_ledger(&sheet, &budi, EntryKind::Debt, 1000.0).await?;
        seed_ledger(&sheet, &ani, EntryKind::Debt, 2000.0).await?;

        let report =
            refresh_status(&sheet, &RollupScope::Contact("C2".to_string()), &fast()).await?;
        assert_eq!(report.appended, 1);
        let rows = load_records::<StatusRow>(&sheet).await?;
        assert_eq!(rows[0].contact_id, "C2");
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_retries_transient_failures() -> Result<()> {
        let inner = setup_test_sheet().await?;
        ensure_workbook(&inner, Duration::ZERO).await?;
        let budi = contact("C1", "Budi", ContactType::Customer);
        seed_ledger(&inner, &budi, EntryKind::Debt, 1000.0).await?;

        let sheet = FlakySheet::new(inner, 2);
        let report = refresh_status(&sheet, &RollupScope::All, &fast()).await?;
        assert_eq!(report.appended, 1);
        assert!(report.failed.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_gives_up_after_max_attempts() -> Result<()> {
        let inner = setup_test_sheet().await?;
        ensure_workbook(&inner, Duration::ZERO).await?;
        let budi = contact("C1", "Budi", ContactType::Customer);
        seed_ledger(&inner, &budi, EntryKind::Debt, 1000.0).await?;

        let sheet = FlakySheet::new(inner, 3);
        let report = refresh_status(&sheet, &RollupScope::All, &fast()).await?;
        assert_eq!(report.failed, vec!["C1".to_string()]);
        assert_eq!(report.appended, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_spawned_refresh_can_be_awaited() -> Result<()> {
        let sheet = setup_test_sheet().await?;
        ensure_workbook(&sheet, Duration::ZERO).await?;
        let budi = contact("C1", "Budi", ContactType::Customer);
        seed_ledger(&sheet, &budi, EntryKind::Debt, 1000.0).await?;

        let shared: Arc<dyn Sheet> = Arc::new(sheet);
        let gate = Arc::new(Mutex::new(()));
        let report = spawn_refresh(shared, RollupScope::All, fast(), gate).await??;
        assert_eq!(report.appended, 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refreshes_keep_one_row_per_contact() -> Result<()> {
        let sheet = setup_test_sheet().await?;
        ensure_workbook(&sheet, Duration::ZERO).await?;
        let budi = contact("C1", "Budi", ContactType::Customer);
        seed_ledger(&sheet, &budi, EntryKind::Debt, 1000.0).await?;

        let shared: Arc<dyn Sheet> = Arc::new(sheet);
        let gate = Arc::new(Mutex::new(()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                spawn_refresh(
                    Arc::clone(&shared),
                    RollupScope::Contact("C1".to_string()),
                    fast(),
                    Arc::clone(&gate),
                )
            })
            .collect();
        let mut appended = 0;
        for handle in handles {
            appended += handle.await??.appended;
        }
        assert_eq!(appended, 1);

        let rows = load_records::<StatusRow>(shared.as_ref()).await?;
        assert_eq!(rows.iter().filter(|row| row.contact_id == "C1").count(), 1);
        Ok(())
    }

    #[test]
    fn test_project_skips_empty_summaries() {
        let mut summaries = BTreeMap::new();
        summaries.insert(
            "C1".to_string(),
            ContactSummary {
                contact_id: "C1".to_string(),
                debt_count: 0,
                ..ContactSummary::default()
            },
        );
        summaries.insert(
            "C2".to_string(),
            ContactSummary {
                contact_id: "C2".to_string(),
                debt_count: 1,
                net_balance: 5000.0,
                ..ContactSummary::default()
            },
        );
        let rows = project(&summaries, &RollupScope::All, "now");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, BalanceStatus::Hutang);
    }
}
