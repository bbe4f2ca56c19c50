//! Per-contact balance summary, recomputed from the full ledger on every call.

use super::time::parse_wib;
use crate::records::{
    AMOUNT_EPSILON, BalanceStatus, ContactType, DebtRecord, EntryKind, PaymentRecord, Stored,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Balances of one contact.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactSummary {
    /// Grouping key
    pub contact_id: String,
    /// Latest name seen on the contact's rows
    pub contact_name: String,
    /// Customer or supplier
    pub contact_type: ContactType,
    /// Still owed on open debts
    pub total_debt: f64,
    /// Already paid on open debts
    pub total_paid: f64,
    /// Original amount of open debts
    pub total_original: f64,
    /// Unspent titip-uang credit
    pub titip_uang: f64,
    /// Unspent titip-barang value
    pub titip_barang: f64,
    /// Credit already paid back out
    pub cash_out: f64,
    /// `total_debt - titip_uang - titip_barang + cash_out`
    pub net_balance: f64,
    /// Ledger rows of any kind
    pub debt_count: usize,
    /// Ordinary debts fully paid
    pub completed_count: usize,
    /// `created_at` of the newest ledger row
    pub last_debt_time: Option<String>,
    /// `paid_at` of the newest payment
    pub last_payment_date: Option<String>,
}

impl ContactSummary {
    fn empty(record: &DebtRecord) -> Self {
        Self {
            contact_id: record.contact_id.clone(),
            contact_name: record.contact_name.clone(),
            contact_type: record.contact_type,
            ..Self::default()
        }
    }

    /// Sign of the net balance
    #[must_use]
    pub fn status(&self) -> BalanceStatus {
        BalanceStatus::from_net_balance(self.net_balance)
    }

    fn add(&mut self, record: &DebtRecord) {
        self.debt_count += 1;
        if !record.contact_name.is_empty() {
            self.contact_name.clone_from(&record.contact_name);
        }
        keep_latest(&mut self.last_debt_time, &record.created_at);

        match record.entry {
            EntryKind::Debt if record.is_outstanding() => {
                self.total_debt += record.remaining_amount;
                self.total_paid += record.paid_amount;
                self.total_original += record.total_amount;
            }
            EntryKind::Debt => self.completed_count += 1,
            EntryKind::TitipUang => self.titip_uang += record.remaining_amount,
            EntryKind::TitipBarang => self.titip_barang += record.remaining_amount,
            EntryKind::CashOut => self.cash_out += record.total_amount.abs(),
        }
    }

    fn finish(&mut self) {
        let net = self.total_debt - self.titip_uang - self.titip_barang + self.cash_out;
        self.net_balance = if net.abs() < AMOUNT_EPSILON { 0.0 } else { net };
    }
}

/// Replaces `slot` with `candidate` when `candidate` is a later timestamp. Unparseable text
/// only fills an empty slot.
fn keep_latest(slot: &mut Option<String>, candidate: &str) {
    if candidate.trim().is_empty() {
        return;
    }
    let newer = match slot.as_deref() {
        None => true,
        Some(current) => match (parse_wib(current), parse_wib(candidate)) {
            (Some(current), Some(candidate)) => candidate > current,
            (None, Some(_)) => true,
            _ => false,
        },
    };
    if newer {
        *slot = Some(candidate.to_string());
    }
}

/// Summaries of every contact with ledger rows, keyed by contact id.
#[must_use]
pub fn summarize(
    ledger: &[Stored<DebtRecord>],
    payments: &[PaymentRecord],
) -> BTreeMap<String, ContactSummary> {
    let mut summaries: BTreeMap<String, ContactSummary> = BTreeMap::new();
    for record in ledger.iter().map(|stored| &stored.record) {
        summaries
            .entry(record.contact_id.clone())
            .or_insert_with(|| ContactSummary::empty(record))
            .add(record);
    }
    for payment in payments {
        if let Some(summary) = summaries.get_mut(&payment.contact_id) {
            keep_latest(&mut summary.last_payment_date, &payment.paid_at);
        }
    }
    for summary in summaries.values_mut() {
        summary.finish();
    }
    summaries
}

/// Summary of one contact, `None` when the contact has no ledger rows.
#[must_use]
pub fn summarize_contact(
    ledger: &[Stored<DebtRecord>],
    payments: &[PaymentRecord],
    contact_id: &str,
) -> Option<ContactSummary> {
    let own: Vec<Stored<DebtRecord>> = ledger
        .iter()
        .filter(|stored| stored.record.contact_id == contact_id)
        .cloned()
        .collect();
    summarize(&own, payments).remove(contact_id)
}
