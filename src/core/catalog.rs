//! Catalog writes - adds contacts and products.
//!
//! Both sheets are append-only from this crate's point of view; rows are edited by hand in
//! the spreadsheet when needed.

use super::ledger::Stamp;
use crate::errors::{Error, Result};
use crate::records::{Contact, ContactType, Product, SheetRecord};
use crate::sheets::Sheet;
use tracing::info;

/// Fields of a new contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    /// Display name, required
    pub name: String,
    /// Customer or supplier
    pub contact_type: ContactType,
    /// Optional phone
    pub phone: String,
    /// Optional address
    pub address: String,
    /// Optional notes
    pub notes: String,
}

/// Fields of a new product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProduct {
    /// Display name, required
    pub name: String,
    /// Free-text category
    pub category: String,
    /// Unit of sale
    pub unit: String,
    /// Purchase cost per unit
    pub cost: f64,
    /// Selling price per unit
    pub price: f64,
    /// Opening stock
    pub stock: f64,
}

fn required_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

fn non_negative(value: f64, field: &str) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    Ok(value)
}

/// Appends a contact and returns it with its minted id.
pub async fn add_contact(sheet: &dyn Sheet, new: &NewContact) -> Result<Contact> {
    let name = required_name(&new.name, "Contact")?;
    let stamp = Stamp::now();
    let contact = Contact {
        id: stamp.next_id("C"),
        name,
        contact_type: new.contact_type,
        phone: new.phone.trim().to_string(),
        address: new.address.trim().to_string(),
        notes: new.notes.trim().to_string(),
        created_at: stamp.timestamp(),
    };
    sheet.append_rows(Contact::SHEET, &[contact.to_row()]).await?;
    info!("Added {} {} ({})", contact.contact_type, contact.name, contact.id);
    Ok(contact)
}

/// Appends a product and returns it with its minted id.
pub async fn add_product(sheet: &dyn Sheet, new: &NewProduct) -> Result<Product> {
    let name = required_name(&new.name, "Product")?;
    let stamp = Stamp::now();
    let now = stamp.timestamp();
    let product = Product {
        id: stamp.next_id("P"),
        name,
        category: new.category.trim().to_string(),
        unit: new.unit.trim().to_string(),
        cost: non_negative(new.cost, "cost")?,
        price: non_negative(new.price, "price")?,
        stock: non_negative(new.stock, "stock")?,
        created_at: now.clone(),
        updated_at: now,
    };
    sheet.append_rows(Product::SHEET, &[product.to_row()]).await?;
    info!("Added product {} ({})", product.name, product.id);
    Ok(product)
}
