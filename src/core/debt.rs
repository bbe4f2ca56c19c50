//! Debt book service - runs ledger operations against a sheet.
//!
//! Each mutation follows the same shape: read the current rows, plan the complete change set
//! with the pure functions in [`ledger`](super::ledger), commit it as one batch, then start
//! the StatusHutang rollup for the affected contact in the background. Concurrent
//! submissions of the same operation are rejected by a [`SubmissionTracker`].

use super::ledger::{self, DebtItem, LedgerChanges, Stamp, Tender};
use super::reader::{contact_in, debt_in, load, load_records, product_in};
use super::rollup::{RollupReport, RollupScope, refresh_status, spawn_refresh};
use super::submission::{SubmissionKey, SubmissionTracker};
use super::summary::{ContactSummary, summarize, summarize_contact};
use super::{LedgerSettings, pause};
use crate::errors::{Error, Result};
use crate::records::{Contact, DebtRecord, EntryKind, PaymentRecord, Product, Stored};
use crate::sheets::Sheet;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

/// Request to record a new debt.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDebt {
    /// Debtor or creditor
    pub contact_id: String,
    /// Money or goods
    pub item: DebtItem,
    /// Used as the description when given
    pub notes: Option<String>,
    /// Free-text due date
    pub due_date: Option<String>,
    /// Idempotency key
    pub request_id: Option<String>,
}

/// What a payment is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTarget {
    /// All open debts of the contact, oldest first
    Contact(String),
    /// One ledger row
    Debt(String),
}

/// Request to apply a payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    /// Bulk or individual
    pub target: PaymentTarget,
    /// Money or goods
    pub tender: Tender,
    /// Copied to every payment row
    pub notes: Option<String>,
    /// Idempotency key
    pub request_id: Option<String>,
}

/// Rows touched by a payment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentOutcome {
    /// Debts after the payment
    pub updated: Vec<DebtRecord>,
    /// Titip rows created from leftovers
    pub created: Vec<DebtRecord>,
    /// Payment log entries written
    pub payments: Vec<PaymentRecord>,
    /// Amount applied to existing debts
    pub applied: f64,
    /// Value parked as titip
    pub leftover: f64,
}

/// A committed mutation together with its background status rollup.
#[derive(Debug)]
pub struct Committed<T> {
    /// What was written
    pub value: T,
    /// The rollup task; await it to observe the StatusHutang write, or drop it
    pub rollup: JoinHandle<Result<RollupReport>>,
}

impl<T> Committed<T> {
    /// Waits for the rollup and returns the value with its report.
    pub async fn with_rollup(self) -> Result<(T, RollupReport)> {
        let report = self.rollup.await??;
        Ok((self.value, report))
    }
}

/// Ledger operations over one workbook.
pub struct DebtBook {
    sheet: Arc<dyn Sheet>,
    settings: LedgerSettings,
    submissions: SubmissionTracker,
    rollup_gate: Arc<Mutex<()>>,
}

impl DebtBook {
    /// Service over `sheet`
    #[must_use]
    pub fn new(sheet: Arc<dyn Sheet>, settings: LedgerSettings) -> Self {
        Self {
            sheet,
            settings,
            submissions: SubmissionTracker::new(),
            rollup_gate: Arc::new(Mutex::new(())),
        }
    }

    /// The backing sheet
    #[must_use]
    pub fn sheet(&self) -> &dyn Sheet {
        self.sheet.as_ref()
    }

    /// Timing knobs
    #[must_use]
    pub const fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Submission states, for callers that want to show progress
    #[must_use]
    pub const fn submissions(&self) -> &SubmissionTracker {
        &self.submissions
    }

    async fn contacts(&self) -> Result<Vec<Contact>> {
        let contacts = load_records::<Contact>(self.sheet()).await?;
        pause(self.settings.pace).await;
        Ok(contacts)
    }

    async fn products(&self) -> Result<Vec<Product>> {
        let products = load_records::<Product>(self.sheet()).await?;
        pause(self.settings.pace).await;
        Ok(products)
    }

    async fn ledger(&self) -> Result<Vec<Stored<DebtRecord>>> {
        let ledger = load::<DebtRecord>(self.sheet()).await?;
        pause(self.settings.pace).await;
        Ok(ledger)
    }

    async fn payments(&self) -> Result<Vec<PaymentRecord>> {
        let payments = load_records::<PaymentRecord>(self.sheet()).await?;
        pause(self.settings.pace).await;
        Ok(payments)
    }

    async fn commit<T>(
        &self,
        changes: &LedgerChanges,
        contact_id: &str,
        value: T,
    ) -> Result<Committed<T>> {
        self.sheet.commit(&changes.to_batch()).await?;
        let rollup = spawn_refresh(
            Arc::clone(&self.sheet),
            RollupScope::Contact(contact_id.to_string()),
            self.settings.rollup,
            Arc::clone(&self.rollup_gate),
        );
        Ok(Committed { value, rollup })
    }

    /// Records a new debt, spending the customer's titip-uang credit first.
    #[instrument(skip(self, request), fields(contact = %request.contact_id))]
    pub async fn create_debt(&self, request: NewDebt) -> Result<Committed<DebtRecord>> {
        let key = SubmissionKey::for_request(
            request.request_id.as_deref(),
            "create_debt",
            &request.contact_id,
        );
        self.submissions
            .run(&key, self.create_debt_inner(&request))
            .await
    }

    async fn create_debt_inner(&self, request: &NewDebt) -> Result<Committed<DebtRecord>> {
        let contacts = self.contacts().await?;
        let contact = contact_in(&contacts, &request.contact_id)?;

        let products = match &request.item {
            DebtItem::Product { .. } => self.products().await?,
            DebtItem::Money { .. } => Vec::new(),
        };
        let product = match &request.item {
            DebtItem::Product { product_id, .. } => Some(product_in(&products, product_id)?),
            DebtItem::Money { .. } => None,
        };

        let ledger = self.ledger().await?;
        let (changes, record) = ledger::plan_create_debt(
            &ledger,
            contact,
            &request.item,
            product,
            request.notes.as_deref(),
            request.due_date.as_deref(),
            &Stamp::now(),
        )?;

        let committed = self.commit(&changes, &contact.id, record).await?;
        info!(
            "Debt {} recorded for {}: {} ({} offset from titip uang)",
            committed.value.id,
            contact.name,
            committed.value.total_amount,
            committed.value.paid_amount
        );
        Ok(committed)
    }

    /// Applies a payment to all open debts of a contact or to one debt.
    #[instrument(skip(self, request), fields(target = ?request.target))]
    pub async fn apply_payment(&self, request: PaymentRequest) -> Result<Committed<PaymentOutcome>> {
        let subject = match &request.target {
            PaymentTarget::Contact(id) | PaymentTarget::Debt(id) => id.clone(),
        };
        let key = SubmissionKey::for_request(request.request_id.as_deref(), "payment", &subject);
        self.submissions
            .run(&key, self.apply_payment_inner(&request))
            .await
    }

    async fn apply_payment_inner(&self, request: &PaymentRequest) -> Result<Committed<PaymentOutcome>> {
        let ledger = self.ledger().await?;
        let contacts = self.contacts().await?;

        let (contact, targets) = match &request.target {
            PaymentTarget::Contact(id) => {
                let contact = contact_in(&contacts, id)?;
                (contact, ledger::open_debts(&ledger, id))
            }
            PaymentTarget::Debt(id) => {
                let debt = debt_in(&ledger, id)?;
                if debt.record.entry != EntryKind::Debt {
                    return Err(Error::validation(format!(
                        "{id} is a {} entry, not a debt",
                        debt.record.entry
                    )));
                }
                if !debt.record.is_outstanding() {
                    return Err(Error::validation(format!("{id} is already paid off")));
                }
                let contact = contact_in(&contacts, &debt.record.contact_id)?;
                (contact, vec![debt.clone()])
            }
        };

        let products = match &request.tender {
            Tender::Goods { .. } => self.products().await?,
            Tender::Money { .. } => Vec::new(),
        };
        let product = match &request.tender {
            Tender::Goods { product_id, .. } => Some(product_in(&products, product_id)?),
            Tender::Money { .. } => None,
        };

        let plan = ledger::plan_payment(
            contact,
            &targets,
            &request.tender,
            product,
            request.notes.as_deref(),
            &Stamp::now(),
        )?;
        if plan.changes.is_empty() {
            return Err(Error::validation(format!(
                "Nothing to apply for {}",
                contact.name
            )));
        }

        let outcome = PaymentOutcome {
            updated: plan.changes.updated.iter().map(|s| s.record.clone()).collect(),
            created: plan.changes.created.clone(),
            payments: plan.changes.payments.clone(),
            applied: plan.applied,
            leftover: plan.leftover,
        };
        let committed = self.commit(&plan.changes, &contact.id, outcome).await?;
        info!(
            "Payment for {} applied: {} to {} debts, {} parked",
            contact.name,
            plan.applied,
            plan.changes.updated.len(),
            plan.leftover
        );
        Ok(committed)
    }

    /// Pays every open debt of the contact in full.
    pub async fn settle_all(
        &self,
        contact_id: &str,
        request_id: Option<String>,
    ) -> Result<Committed<PaymentOutcome>> {
        let summary = self.summary_for(contact_id).await?;
        if summary.total_debt <= crate::records::AMOUNT_EPSILON {
            return Err(Error::validation(format!(
                "{} has no outstanding debt",
                summary.contact_name
            )));
        }
        self.apply_payment(PaymentRequest {
            target: PaymentTarget::Contact(contact_id.to_string()),
            tender: Tender::Money {
                amount: summary.total_debt,
            },
            notes: Some("Pelunasan".to_string()),
            request_id,
        })
        .await
    }

    /// Pays a customer's credit balance back out.
    #[instrument(skip(self))]
    pub async fn cash_out(
        &self,
        contact_id: &str,
        request_id: Option<String>,
    ) -> Result<Committed<DebtRecord>> {
        let key = SubmissionKey::for_request(request_id.as_deref(), "cash_out", contact_id);
        self.submissions
            .run(&key, self.cash_out_inner(contact_id))
            .await
    }

    async fn cash_out_inner(&self, contact_id: &str) -> Result<Committed<DebtRecord>> {
        let contacts = self.contacts().await?;
        let contact = contact_in(&contacts, contact_id)?;
        let ledger = self.ledger().await?;
        let payments = self.payments().await?;

        let (changes, record) =
            ledger::plan_cash_out(&ledger, &payments, contact, &Stamp::now())?;
        let committed = self.commit(&changes, &contact.id, record).await?;
        info!(
            "Cashed out {} to {}",
            committed.value.total_amount.abs(),
            contact.name
        );
        Ok(committed)
    }

    /// Summaries of every contact with ledger rows.
    pub async fn summaries(&self) -> Result<BTreeMap<String, ContactSummary>> {
        let ledger = self.ledger().await?;
        let payments = self.payments().await?;
        Ok(summarize(&ledger, &payments))
    }

    /// Summary of one contact; an empty summary when it has no ledger rows.
    pub async fn summary_for(&self, contact_id: &str) -> Result<ContactSummary> {
        let contacts = self.contacts().await?;
        let contact = contact_in(&contacts, contact_id)?;
        let ledger = self.ledger().await?;
        let payments = self.payments().await?;
        Ok(
            summarize_contact(&ledger, &payments, contact_id).unwrap_or_else(|| ContactSummary {
                contact_id: contact.id.clone(),
                contact_name: contact.name.clone(),
                contact_type: contact.contact_type,
                ..ContactSummary::default()
            }),
        )
    }

    /// Rebuilds StatusHutang for every contact and waits for it.
    pub async fn refresh_all_status(&self) -> Result<RollupReport> {
        let _turn = self.rollup_gate.lock().await;
        refresh_status(self.sheet(), &RollupScope::All, &self.settings.rollup).await
    }
}
