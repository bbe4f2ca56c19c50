//! Typed records for every sheet of the workbook and their positional row mappings.
//!
//! Each sheet is a fixed positional contract: column `n` of a row always holds the same field.
//! The mappings here are the only place that knows those positions.

pub mod cells;
pub mod contact;
pub mod debt;
pub mod payment;
pub mod product;
pub mod status;

pub use contact::{Contact, ContactType};
pub use debt::{DebtKind, DebtRecord, DebtStatus, EntryKind};
pub use payment::{PaymentKind, PaymentRecord};
pub use product::{Product, Purchase, Sale};
pub use status::{BalanceStatus, StatusRow};

/// Amounts closer to zero than this are treated as zero.
pub const AMOUNT_EPSILON: f64 = 0.005;

/// A record type that lives in one sheet of the workbook.
pub trait SheetRecord: Sized {
    /// Sheet (tab) title
    const SHEET: &'static str;
    /// Header row written when the sheet is bootstrapped
    const HEADERS: &'static [&'static str];

    /// Maps a raw row. Returns `None` for blank rows (no id).
    fn from_row(row: &[String]) -> Option<Self>;

    /// Maps back to a full row in column order.
    fn to_row(&self) -> Vec<String>;
}

/// A record together with the 1-based sheet row it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    /// Sheet row number (the header is row 1, the first record row 2)
    pub row: usize,
    /// The parsed record
    pub record: T,
}

/// Sheet row number of the `index`-th data row (0-based, header stripped).
#[must_use]
pub const fn data_row_number(index: usize) -> usize {
    index + 2
}

/// Parses all data rows of a sheet, skipping blank rows but keeping row numbers exact.
#[must_use]
pub fn parse_rows<T: SheetRecord>(rows: &[Vec<String>]) -> Vec<Stored<T>> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            T::from_row(row).map(|record| Stored {
                row: data_row_number(index),
                record,
            })
        })
        .collect()
}

/// Strips row positions.
#[must_use]
pub fn into_records<T>(stored: Vec<Stored<T>>) -> Vec<T> {
    stored.into_iter().map(|s| s.record).collect()
}
