//! Debts sheet: one row per ledger entry.
//!
//! A ledger entry is an ordinary debt, a pre-paid credit ("titip uang"), goods left with the
//! business ("titip barang") or a disbursement of a credit balance. The entry kind is an
//! explicit column; rows written before that column existed are classified from their
//! description once, when read.

use super::{AMOUNT_EPSILON, ContactType, SheetRecord, cells};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a debt is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtKind {
    /// Nominal rupiah debt
    #[default]
    Money,
    /// Goods taken on credit; `quantity` and `product_id` are set
    Product,
}

impl DebtKind {
    /// Cell value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Money => "money",
            Self::Product => "product",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "product" | "barang" => Self::Product,
            _ => Self::Money,
        }
    }
}

/// Ledger entry classification used by the summary and by auto-offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Ordinary debt owed by (customer) or to (supplier) the contact
    #[default]
    Debt,
    /// Money the contact left with the business, available to offset future debts
    TitipUang,
    /// Goods value the contact left with the business
    TitipBarang,
    /// Credit balance paid back out to the contact
    CashOut,
}

impl EntryKind {
    /// Cell value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debt => "debt",
            Self::TitipUang => "titip_uang",
            Self::TitipBarang => "titip_barang",
            Self::CashOut => "cash_out",
        }
    }

    /// Parses the explicit `entryKind` column.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "debt" => Some(Self::Debt),
            "titip_uang" => Some(Self::TitipUang),
            "titip_barang" => Some(Self::TitipBarang),
            "cash_out" => Some(Self::CashOut),
            _ => None,
        }
    }

    /// Classifies a legacy row that has no `entryKind` cell by its description tag.
    #[must_use]
    pub fn infer_from_description(description: &str) -> Self {
        let lower = description.to_lowercase();
        if lower.contains("pencairan saldo") || lower.contains("cashout") {
            Self::CashOut
        } else if lower.contains("titip uang") {
            Self::TitipUang
        } else if lower.contains("titip barang") {
            Self::TitipBarang
        } else {
            Self::Debt
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement state, always derived from the amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    /// Nothing paid yet
    #[default]
    Pending,
    /// Partly paid
    Partial,
    /// Nothing remaining
    Completed,
}

impl DebtStatus {
    /// completed iff remaining <= 0, partial iff something was paid, pending otherwise.
    #[must_use]
    pub fn derive(paid: f64, remaining: f64) -> Self {
        if remaining <= AMOUNT_EPSILON {
            Self::Completed
        } else if paid > AMOUNT_EPSILON {
            Self::Partial
        } else {
            Self::Pending
        }
    }

    /// Cell value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Debts sheet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtRecord {
    /// Unique id, minted from the creation time
    pub id: String,
    /// Owning contact
    pub contact_id: String,
    /// Contact name at creation, display only
    pub contact_name: String,
    /// Customer or supplier
    pub contact_type: ContactType,
    /// Money or product
    pub kind: DebtKind,
    /// Ledger classification
    pub entry: EntryKind,
    /// Free text
    pub description: String,
    /// Nominal amount, or unit price for product debts
    pub amount: f64,
    /// Product debts only
    pub product_id: Option<String>,
    /// Product debts only
    pub product_name: Option<String>,
    /// Outstanding units for product debts
    pub quantity: f64,
    /// Derived from `paid_amount` and `remaining_amount`
    pub status: DebtStatus,
    /// Always `paid_amount + remaining_amount`
    pub total_amount: f64,
    /// Paid so far
    pub paid_amount: f64,
    /// Still owed (or, for credits, still available)
    pub remaining_amount: f64,
    /// Optional due date text
    pub due_date: Option<String>,
    /// WIB timestamp
    pub created_at: String,
    /// WIB timestamp
    pub updated_at: String,
    /// Notes
    pub notes: String,
}

impl DebtRecord {
    /// Whether anything is still owed or available on this entry.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        self.remaining_amount > AMOUNT_EPSILON
    }

    /// Ordinary debt with something left to pay.
    #[must_use]
    pub fn is_open_debt(&self) -> bool {
        self.entry == EntryKind::Debt && self.is_outstanding()
    }

    /// Titip-uang credit that can still be drained.
    #[must_use]
    pub fn is_available_credit(&self) -> bool {
        self.entry == EntryKind::TitipUang && self.is_outstanding()
    }

    /// Moves `amount` from remaining to paid and re-derives the status.
    pub fn apply_payment(&mut self, amount: f64, updated_at: &str) {
        self.paid_amount += amount;
        self.remaining_amount -= amount;
        if self.remaining_amount.abs() < AMOUNT_EPSILON {
            self.remaining_amount = 0.0;
        }
        self.status = DebtStatus::derive(self.paid_amount, self.remaining_amount);
        updated_at.clone_into(&mut self.updated_at);
    }
}

impl SheetRecord for DebtRecord {
    const SHEET: &'static str = "Debts";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "contactId",
        "contactName",
        "contactType",
        "type",
        "description",
        "amount",
        "productId",
        "productName",
        "quantity",
        "status",
        "totalAmount",
        "paidAmount",
        "remainingAmount",
        "dueDate",
        "createdAt",
        "updatedAt",
        "notes",
        "entryKind",
    ];

    fn from_row(row: &[String]) -> Option<Self> {
        let id = cells::owned(row, 0);
        if id.is_empty() {
            return None;
        }
        let description = cells::owned(row, 5);
        let entry = EntryKind::parse(cells::text(row, 18))
            .unwrap_or_else(|| EntryKind::infer_from_description(&description));
        let total_amount = cells::amount(row, 11);
        let paid_amount = cells::amount(row, 12);
        let remaining_amount =
            cells::optional_amount(row, 13).unwrap_or(total_amount - paid_amount);

        Some(Self {
            id,
            contact_id: cells::owned(row, 1),
            contact_name: cells::owned(row, 2),
            contact_type: cells::text(row, 3).parse().unwrap_or_default(),
            kind: DebtKind::parse(cells::text(row, 4)),
            entry,
            description,
            amount: cells::amount(row, 6),
            product_id: cells::optional(row, 7),
            product_name: cells::optional(row, 8),
            quantity: cells::amount(row, 9),
            // The stored status cell is not trusted; amounts are.
            status: DebtStatus::derive(paid_amount, remaining_amount),
            total_amount,
            paid_amount,
            remaining_amount,
            due_date: cells::optional(row, 14),
            created_at: cells::owned(row, 15),
            updated_at: cells::owned(row, 16),
            notes: cells::owned(row, 17),
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.contact_id.clone(),
            self.contact_name.clone(),
            self.contact_type.to_string(),
            self.kind.as_str().to_string(),
            self.description.clone(),
            cells::format_amount(self.amount),
            cells::format_optional(self.product_id.as_ref()),
            cells::format_optional(self.product_name.as_ref()),
            cells::format_amount(self.quantity),
            self.status.to_string(),
            cells::format_amount(self.total_amount),
            cells::format_amount(self.paid_amount),
            cells::format_amount(self.remaining_amount),
            cells::format_optional(self.due_date.as_ref()),
            self.created_at.clone(),
            self.updated_at.clone(),
            self.notes.clone(),
            self.entry.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    fn legacy_row(description: &str, total: &str, paid: &str, remaining: &str) -> Vec<String> {
        [
            "D1", "C1", "Budi", "customer", "money", description, total, "", "", "0", "pending",
            total, paid, remaining, "", "2024-01-15 10:00:00 WIB", "", "",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    #[test]
    fn test_three_decimal_amounts_round_trip() {
        let mut row = legacy_row("Hutang gula", "2,3906", "0", "2,3906");
        row.push("debt".to_string());
        let mut record = DebtRecord::from_row(&row).unwrap();
        record.kind = DebtKind::Product;
        record.quantity = 1.125;
        record.amount = 2.125;

        let read_back = DebtRecord::from_row(&record.to_row()).unwrap();
        assert_eq!(read_back.quantity, 1.125);
        assert_eq!(read_back.amount, 2.125);
        assert_eq!(read_back, record);
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(DebtStatus::derive(0.0, 100.0), DebtStatus::Pending);
        assert_eq!(DebtStatus::derive(40.0, 60.0), DebtStatus::Partial);
        assert_eq!(DebtStatus::derive(100.0, 0.0), DebtStatus::Completed);
        assert_eq!(DebtStatus::derive(-15000.0, 0.0), DebtStatus::Completed);
    }

    #[test]
    fn test_legacy_rows_are_classified_by_description() {
        let credit = DebtRecord::from_row(&legacy_row("Titip uang Budi", "50000", "0", "50000"))
            .unwrap();
        assert_eq!(credit.entry, EntryKind::TitipUang);

        let cash_out =
            DebtRecord::from_row(&legacy_row("CASHOUT saldo", "-15000", "-15000", "0")).unwrap();
        assert_eq!(cash_out.entry, EntryKind::CashOut);

        let goods = DebtRecord::from_row(&legacy_row("Titip barang", "9000", "0", "9000")).unwrap();
        assert_eq!(goods.entry, EntryKind::TitipBarang);

        let plain = DebtRecord::from_row(&legacy_row("Hutang beras", "9000", "0", "9000")).unwrap();
        assert_eq!(plain.entry, EntryKind::Debt);
    }

    #[test]
    fn test_explicit_entry_kind_wins_over_description() {
        let mut row = legacy_row("Titip uang lama", "50000", "0", "50000");
        row.push("debt".to_string());
        assert_eq!(DebtRecord::from_row(&row).unwrap().entry, EntryKind::Debt);
    }

    #[test]
    fn test_blank_remaining_is_derived_and_status_recomputed() {
        let record = DebtRecord::from_row(&legacy_row("Hutang", "90000", "30000", "")).unwrap();
        assert_eq!(record.remaining_amount, 60000.0);
        assert_eq!(record.status, DebtStatus::Partial);
    }

    #[test]
    fn test_apply_payment_keeps_total_invariant() {
        let mut record = DebtRecord::from_row(&legacy_row("Hutang", "90000", "0", "90000")).unwrap();
        record.apply_payment(60000.0, "now");
        assert_eq!(record.paid_amount + record.remaining_amount, record.total_amount);
        assert_eq!(record.status, DebtStatus::Partial);
        record.apply_payment(30000.0, "later");
        assert_eq!(record.remaining_amount, 0.0);
        assert_eq!(record.status, DebtStatus::Completed);
        assert_eq!(record.updated_at, "later");
    }

    #[test]
    fn test_to_row_has_every_column() {
        let record = DebtRecord::from_row(&legacy_row("Hutang", "90000", "0", "90000")).unwrap();
        let row = record.to_row();
        assert_eq!(row.len(), DebtRecord::HEADERS.len());
        assert_eq!(row[18], "debt");
        assert_eq!(DebtRecord::from_row(&row).unwrap(), record);
    }
}
