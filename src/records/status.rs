//! StatusHutang sheet: one denormalized summary row per contact, written for reporting only.

use super::{AMOUNT_EPSILON, ContactType, SheetRecord, cells};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sign of a contact's net balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceStatus {
    /// Settled
    Lunas,
    /// Contact owes the business
    Hutang,
    /// Business holds the contact's money
    TitipUang,
}

impl BalanceStatus {
    /// Status for a net balance.
    #[must_use]
    pub fn from_net_balance(net_balance: f64) -> Self {
        if net_balance > AMOUNT_EPSILON {
            Self::Hutang
        } else if net_balance < -AMOUNT_EPSILON {
            Self::TitipUang
        } else {
            Self::Lunas
        }
    }

    /// Cell value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lunas => "LUNAS",
            Self::Hutang => "HUTANG",
            Self::TitipUang => "TITIP_UANG",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.trim() {
            "HUTANG" => Self::Hutang,
            "TITIP_UANG" => Self::TitipUang,
            _ => Self::Lunas,
        }
    }
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// StatusHutang sheet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRow {
    /// Contact the row summarises, the upsert key
    pub contact_id: String,
    /// Contact name
    pub contact_name: String,
    /// Customer or supplier
    pub contact_type: ContactType,
    /// Original total of open debts
    pub total_original: f64,
    /// Paid so far on open debts
    pub total_paid: f64,
    /// Still owed on open debts
    pub total_debt: f64,
    /// Available titip-uang credit
    pub titip_uang: f64,
    /// Available titip-barang value
    pub titip_barang: f64,
    /// Disbursed credit
    pub cash_out: f64,
    /// `total_debt - titip_uang - titip_barang + cash_out`
    pub net_balance: f64,
    /// Sign of `net_balance`
    pub status: BalanceStatus,
    /// WIB timestamp of the projection
    pub updated_at: String,
}

impl SheetRecord for StatusRow {
    const SHEET: &'static str = "StatusHutang";
    const HEADERS: &'static [&'static str] = &[
        "contactId",
        "contactName",
        "contactType",
        "totalOriginal",
        "totalPaid",
        "totalDebt",
        "titipUang",
        "titipBarang",
        "cashOut",
        "netBalance",
        "status",
        "updatedAt",
    ];

    fn from_row(row: &[String]) -> Option<Self> {
        let contact_id = cells::owned(row, 0);
        if contact_id.is_empty() {
            return None;
        }
        Some(Self {
            contact_id,
            contact_name: cells::owned(row, 1),
            contact_type: cells::text(row, 2).parse().unwrap_or_default(),
            total_original: cells::amount(row, 3),
            total_paid: cells::amount(row, 4),
            total_debt: cells::amount(row, 5),
            titip_uang: cells::amount(row, 6),
            titip_barang: cells::amount(row, 7),
            cash_out: cells::amount(row, 8),
            net_balance: cells::amount(row, 9),
            status: BalanceStatus::parse(cells::text(row, 10)),
            updated_at: cells::owned(row, 11),
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.contact_id.clone(),
            self.contact_name.clone(),
            self.contact_type.to_string(),
            cells::format_amount(self.total_original),
            cells::format_amount(self.total_paid),
            cells::format_amount(self.total_debt),
            cells::format_amount(self.titip_uang),
            cells::format_amount(self.titip_barang),
            cells::format_amount(self.cash_out),
            cells::format_amount(self.net_balance),
            self.status.to_string(),
            self.updated_at.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_status_from_sign() {
        assert_eq!(BalanceStatus::from_net_balance(10.0), BalanceStatus::Hutang);
        assert_eq!(BalanceStatus::from_net_balance(-10.0), BalanceStatus::TitipUang);
        assert_eq!(BalanceStatus::from_net_balance(0.0), BalanceStatus::Lunas);
        assert_eq!(BalanceStatus::from_net_balance(0.001), BalanceStatus::Lunas);
    }

    #[test]
    fn test_status_row_has_twelve_columns() {
        assert_eq!(StatusRow::HEADERS.len(), 12);
    }
}
