//! DebtPayments sheet: append-only log of every amount applied to a ledger entry.

use super::{SheetRecord, cells};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a payment row was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Money or goods paid against a debt
    #[default]
    Payment,
    /// Titip-uang credit consumed by a new debt
    AutoOffset,
    /// Leftover of a payment, parked as titip uang or titip barang
    Overpayment,
    /// Credit balance paid back out
    CashOut,
}

impl PaymentKind {
    /// Cell value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::AutoOffset => "auto_offset",
            Self::Overpayment => "overpayment",
            Self::CashOut => "cash_out",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "auto_offset" => Self::AutoOffset,
            "overpayment" => Self::Overpayment,
            "cash_out" => Self::CashOut,
            _ => Self::Payment,
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DebtPayments sheet row. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique id
    pub id: String,
    /// Ledger entry the amount was applied to
    pub debt_id: String,
    /// Owning contact
    pub contact_id: String,
    /// Contact name, display only
    pub contact_name: String,
    /// Amount applied
    pub amount: f64,
    /// Units, for goods payments
    pub quantity: f64,
    /// Why it was written
    pub kind: PaymentKind,
    /// WIB timestamp
    pub paid_at: String,
    /// Notes
    pub notes: String,
}

impl SheetRecord for PaymentRecord {
    const SHEET: &'static str = "DebtPayments";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "debtId",
        "contactId",
        "contactName",
        "amount",
        "quantity",
        "kind",
        "paidAt",
        "notes",
    ];

    fn from_row(row: &[String]) -> Option<Self> {
        let id = cells::owned(row, 0);
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id,
            debt_id: cells::owned(row, 1),
            contact_id: cells::owned(row, 2),
            contact_name: cells::owned(row, 3),
            amount: cells::amount(row, 4),
            quantity: cells::amount(row, 5),
            kind: PaymentKind::parse(cells::text(row, 6)),
            paid_at: cells::owned(row, 7),
            notes: cells::owned(row, 8),
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.debt_id.clone(),
            self.contact_id.clone(),
            self.contact_name.clone(),
            cells::format_amount(self.amount),
            cells::format_amount(self.quantity),
            self.kind.to_string(),
            self.paid_at.clone(),
            self.notes.clone(),
        ]
    }
}
