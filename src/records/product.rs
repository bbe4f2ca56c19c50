//! Products, Sales and Purchases sheets.

use super::{SheetRecord, cells};
use serde::{Deserialize, Serialize};

/// Products sheet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique id
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-text category
    pub category: String,
    /// Unit of sale, e.g. "pcs", "kg"
    pub unit: String,
    /// Purchase cost per unit
    pub cost: f64,
    /// Selling price per unit
    pub price: f64,
    /// Units on hand
    pub stock: f64,
    /// WIB timestamp
    pub created_at: String,
    /// WIB timestamp
    pub updated_at: String,
}

impl SheetRecord for Product {
    const SHEET: &'static str = "Products";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "name",
        "category",
        "unit",
        "cost",
        "price",
        "stock",
        "createdAt",
        "updatedAt",
    ];

    fn from_row(row: &[String]) -> Option<Self> {
        let id = cells::owned(row, 0);
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id,
            name: cells::owned(row, 1),
            category: cells::owned(row, 2),
            unit: cells::owned(row, 3),
            cost: cells::amount(row, 4),
            price: cells::amount(row, 5),
            stock: cells::amount(row, 6),
            created_at: cells::owned(row, 7),
            updated_at: cells::owned(row, 8),
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.category.clone(),
            self.unit.clone(),
            cells::format_amount(self.cost),
            cells::format_amount(self.price),
            cells::format_amount(self.stock),
            self.created_at.clone(),
            self.updated_at.clone(),
        ]
    }
}

/// Sales sheet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    /// Unique id
    pub id: String,
    /// Sale date (WIB text)
    pub date: String,
    /// Product sold
    pub product_id: String,
    /// Product name at the time of sale
    pub product_name: String,
    /// Units sold
    pub quantity: f64,
    /// Price per unit
    pub unit_price: f64,
    /// Line total
    pub total: f64,
    /// Buyer, blank for walk-in sales
    pub customer_id: Option<String>,
    /// Buyer name
    pub customer_name: String,
    /// Notes
    pub notes: String,
}

impl SheetRecord for Sale {
    const SHEET: &'static str = "Sales";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "date",
        "productId",
        "productName",
        "quantity",
        "unitPrice",
        "total",
        "customerId",
        "customerName",
        "notes",
    ];

    fn from_row(row: &[String]) -> Option<Self> {
        let id = cells::owned(row, 0);
        if id.is_empty() {
            return None;
        }
        let quantity = cells::amount(row, 4);
        let unit_price = cells::amount(row, 5);
        Some(Self {
            id,
            date: cells::owned(row, 1),
            product_id: cells::owned(row, 2),
            product_name: cells::owned(row, 3),
            quantity,
            unit_price,
            total: cells::optional_amount(row, 6).unwrap_or(quantity * unit_price),
            customer_id: cells::optional(row, 7),
            customer_name: cells::owned(row, 8),
            notes: cells::owned(row, 9),
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.date.clone(),
            self.product_id.clone(),
            self.product_name.clone(),
            cells::format_amount(self.quantity),
            cells::format_amount(self.unit_price),
            cells::format_amount(self.total),
            cells::format_optional(self.customer_id.as_ref()),
            self.customer_name.clone(),
            self.notes.clone(),
        ]
    }
}

/// Purchases sheet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    /// Unique id
    pub id: String,
    /// Purchase date (WIB text)
    pub date: String,
    /// Product bought
    pub product_id: String,
    /// Product name at the time of purchase
    pub product_name: String,
    /// Units bought
    pub quantity: f64,
    /// Cost per unit
    pub unit_cost: f64,
    /// Line total
    pub total: f64,
    /// Seller
    pub supplier_id: Option<String>,
    /// Seller name
    pub supplier_name: String,
    /// Notes
    pub notes: String,
}

impl SheetRecord for Purchase {
    const SHEET: &'static str = "Purchases";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "date",
        "productId",
        "productName",
        "quantity",
        "unitCost",
        "total",
        "supplierId",
        "supplierName",
        "notes",
    ];

    fn from_row(row: &[String]) -> Option<Self> {
        let id = cells::owned(row, 0);
        if id.is_empty() {
            return None;
        }
        let quantity = cells::amount(row, 4);
        let unit_cost = cells::amount(row, 5);
        Some(Self {
            id,
            date: cells::owned(row, 1),
            product_id: cells::owned(row, 2),
            product_name: cells::owned(row, 3),
            quantity,
            unit_cost,
            total: cells::optional_amount(row, 6).unwrap_or(quantity * unit_cost),
            supplier_id: cells::optional(row, 7),
            supplier_name: cells::owned(row, 8),
            notes: cells::owned(row, 9),
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.date.clone(),
            self.product_id.clone(),
            self.product_name.clone(),
            cells::format_amount(self.quantity),
            cells::format_amount(self.unit_cost),
            cells::format_amount(self.total),
            cells::format_optional(self.supplier_id.as_ref()),
            self.supplier_name.clone(),
            self.notes.clone(),
        ]
    }
}
