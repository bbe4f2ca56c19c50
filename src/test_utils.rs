//! Shared test utilities for `HutangBuddy`.
//!
//! This module provides an in-memory workbook, record builders with sensible defaults and
//! sheet doubles that fail on purpose.

use crate::{
    core::{
        DebtBook, LedgerSettings,
        catalog::{self, NewContact, NewProduct},
        reader::ensure_workbook,
    },
    errors::{Error, Result},
    records::{
        Contact, ContactType, DebtKind, DebtRecord, DebtStatus, EntryKind, Product, SheetRecord,
    },
    sheets::{LocalSheet, Sheet, SheetBatch},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

static SEED_SEQUENCE: AtomicUsize = AtomicUsize::new(1);

/// Creates an in-memory `SQLite` workbook with the tables created but no sheets.
/// This is the standard setup for all backend-level tests.
pub async fn setup_test_sheet() -> Result<LocalSheet> {
    LocalSheet::open("sqlite::memory:").await
}

/// Creates an in-memory workbook with every sheet bootstrapped, wrapped in a `DebtBook`
/// without pacing. The sheet is returned as well for seeding and inspection.
pub async fn setup_book() -> Result<(DebtBook, Arc<LocalSheet>)> {
    let sheet = Arc::new(setup_test_sheet().await?);
    ensure_workbook(sheet.as_ref(), Duration::ZERO).await?;
    let shared: Arc<dyn Sheet> = Arc::clone(&sheet) as Arc<dyn Sheet>;
    Ok((DebtBook::new(shared, LedgerSettings::immediate()), sheet))
}

/// Contact value, not written anywhere.
pub fn contact(id: &str, name: &str, contact_type: ContactType) -> Contact {
    Contact {
        id: id.to_string(),
        name: name.to_string(),
        contact_type,
        phone: String::new(),
        address: String::new(),
        notes: String::new(),
        created_at: "2024-01-15 10:00:00 WIB".to_string(),
    }
}

/// Product value with `price = cost`, not written anywhere.
pub fn product(id: &str, name: &str, cost: f64) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        category: String::new(),
        unit: "pcs".to_string(),
        cost,
        price: cost,
        stock: 0.0,
        created_at: "2024-01-15 10:00:00 WIB".to_string(),
        updated_at: "2024-01-15 10:00:00 WIB".to_string(),
    }
}

/// Untouched money ledger row: `total = remaining = amount`, nothing paid.
///
/// # Defaults
/// * `kind`: money
/// * `created_at`: 2024-01-15 10:00 WIB
pub fn ledger_entry(id: &str, contact: &Contact, entry: EntryKind, amount: f64) -> DebtRecord {
    DebtRecord {
        id: id.to_string(),
        contact_id: contact.id.clone(),
        contact_name: contact.name.clone(),
        contact_type: contact.contact_type,
        kind: DebtKind::Money,
        entry,
        description: format!("{entry} {}", contact.name),
        amount,
        product_id: None,
        product_name: None,
        quantity: 0.0,
        status: DebtStatus::derive(0.0, amount),
        total_amount: amount,
        paid_amount: 0.0,
        remaining_amount: amount,
        due_date: None,
        created_at: "2024-01-15 10:00:00 WIB".to_string(),
        updated_at: "2024-01-15 10:00:00 WIB".to_string(),
        notes: String::new(),
    }
}

/// Appends a contact through the catalog.
pub async fn seed_contact(
    sheet: &dyn Sheet,
    name: &str,
    contact_type: ContactType,
) -> Result<Contact> {
    catalog::add_contact(
        sheet,
        &NewContact {
            name: name.to_string(),
            contact_type,
            ..NewContact::default()
        },
    )
    .await
}

/// Appends a product with `price = cost` through the catalog.
pub async fn seed_product(sheet: &dyn Sheet, name: &str, cost: f64) -> Result<Product> {
    catalog::add_product(
        sheet,
        &NewProduct {
            name: name.to_string(),
            unit: "pcs".to_string(),
            cost,
            price: cost,
            ..NewProduct::default()
        },
    )
    .await
}

/// Appends an untouched ledger row for `contact` directly to the Debts sheet.
pub async fn seed_ledger(
    sheet: &dyn Sheet,
    contact: &Contact,
    entry: EntryKind,
    amount: f64,
) -> Result<DebtRecord> {
    let id = format!("SEED-{}", SEED_SEQUENCE.fetch_add(1, Ordering::Relaxed));
    let record = ledger_entry(&id, contact, entry, amount);
    sheet
        .append_rows(DebtRecord::SHEET, &[record.to_row()])
        .await?;
    Ok(record)
}

fn injected(what: &str) -> Error {
    Error::remote(format!("injected failure: {what}"))
}

/// Fails the first `failures` row writes, then behaves like the wrapped sheet.
pub struct FlakySheet {
    inner: LocalSheet,
    failures: AtomicUsize,
}

impl FlakySheet {
    /// Wraps `inner`, failing its next `failures` writes.
    pub const fn new(inner: LocalSheet, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
        }
    }

    fn should_fail(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl Sheet for FlakySheet {
    async fn get_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        self.inner.get_rows(sheet).await
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<()> {
        if self.should_fail() {
            return Err(injected("append"));
        }
        self.inner.append_rows(sheet, rows).await
    }

    async fn update_row(&self, sheet: &str, row_index: usize, row: &[String]) -> Result<()> {
        if self.should_fail() {
            return Err(injected("update"));
        }
        self.inner.update_row(sheet, row_index, row).await
    }

    async fn delete_row(&self, sheet: &str, row_index: usize) -> Result<()> {
        self.inner.delete_row(sheet, row_index).await
    }

    async fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()> {
        self.inner.ensure_sheet(sheet, headers).await
    }
}

/// Reads through to the wrapped sheet but rejects every batch commit.
pub struct FailingCommitSheet {
    inner: Arc<LocalSheet>,
}

impl FailingCommitSheet {
    /// Wraps `inner`.
    pub const fn new(inner: Arc<LocalSheet>) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl Sheet for FailingCommitSheet {
    async fn get_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        self.inner.get_rows(sheet).await
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<()> {
        self.inner.append_rows(sheet, rows).await
    }

    async fn update_row(&self, sheet: &str, row_index: usize, row: &[String]) -> Result<()> {
        self.inner.update_row(sheet, row_index, row).await
    }

    async fn delete_row(&self, sheet: &str, row_index: usize) -> Result<()> {
        self.inner.delete_row(sheet, row_index).await
    }

    async fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()> {
        self.inner.ensure_sheet(sheet, headers).await
    }

    async fn commit(&self, _batch: &SheetBatch) -> Result<()> {
        Err(injected("commit"))
    }
}
