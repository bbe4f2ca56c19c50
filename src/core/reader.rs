//! Typed reads over the workbook.
//!
//! Every lookup loads the whole sheet; the ledger is small enough (hundreds of rows) that a
//! full read per operation is the simplest consistent view.

use crate::errors::{Error, Result};
use crate::records::{
    Contact, DebtRecord, PaymentRecord, Product, Purchase, Sale, SheetRecord, StatusRow, Stored,
    into_records, parse_rows,
};
use crate::sheets::Sheet;
use std::time::Duration;
use tracing::{debug, info};

/// Loads every record of `T`'s sheet with its row number.
pub async fn load<T: SheetRecord>(sheet: &dyn Sheet) -> Result<Vec<Stored<T>>> {
    let rows = sheet.get_rows(T::SHEET).await?;
    let records = parse_rows::<T>(&rows);
    debug!("Loaded {} records from {}", records.len(), T::SHEET);
    Ok(records)
}

/// Loads every record of `T`'s sheet, dropping row numbers.
pub async fn load_records<T: SheetRecord>(sheet: &dyn Sheet) -> Result<Vec<T>> {
    Ok(into_records(load::<T>(sheet).await?))
}

/// Contact by id from an already loaded list.
pub fn contact_in<'a>(contacts: &'a [Contact], id: &str) -> Result<&'a Contact> {
    contacts
        .iter()
        .find(|contact| contact.id == id)
        .ok_or_else(|| Error::ContactNotFound { id: id.to_string() })
}

/// Product by id from an already loaded list.
pub fn product_in<'a>(products: &'a [Product], id: &str) -> Result<&'a Product> {
    products
        .iter()
        .find(|product| product.id == id)
        .ok_or_else(|| Error::ProductNotFound { id: id.to_string() })
}

/// Ledger row by id from an already loaded ledger.
pub fn debt_in<'a>(ledger: &'a [Stored<DebtRecord>], id: &str) -> Result<&'a Stored<DebtRecord>> {
    ledger
        .iter()
        .find(|stored| stored.record.id == id)
        .ok_or_else(|| Error::DebtNotFound { id: id.to_string() })
}

/// Reads the Contacts sheet and returns the contact with `id`.
pub async fn find_contact(sheet: &dyn Sheet, id: &str) -> Result<Contact> {
    let contacts = load_records::<Contact>(sheet).await?;
    contact_in(&contacts, id).cloned()
}

/// Reads the Products sheet and returns the product with `id`.
pub async fn find_product(sheet: &dyn Sheet, id: &str) -> Result<Product> {
    let products = load_records::<Product>(sheet).await?;
    product_in(&products, id).cloned()
}

/// Reads the Debts sheet and returns the row with `id`.
pub async fn find_debt(sheet: &dyn Sheet, id: &str) -> Result<Stored<DebtRecord>> {
    let ledger = load::<DebtRecord>(sheet).await?;
    debt_in(&ledger, id).cloned()
}

/// Creates any missing sheet of the workbook and writes its header row.
pub async fn ensure_workbook(sheet: &dyn Sheet, pace: Duration) -> Result<()> {
    let layouts: [(&str, &[&str]); 7] = [
        (Contact::SHEET, Contact::HEADERS),
        (Product::SHEET, Product::HEADERS),
        (Sale::SHEET, Sale::HEADERS),
        (Purchase::SHEET, Purchase::HEADERS),
        (DebtRecord::SHEET, DebtRecord::HEADERS),
        (PaymentRecord::SHEET, PaymentRecord::HEADERS),
        (StatusRow::SHEET, StatusRow::HEADERS),
    ];
    for (name, headers) in layouts {
        sheet.ensure_sheet(name, headers).await?;
        super::pause(pace).await;
    }
    info!("Workbook ready");
    Ok(())
}
