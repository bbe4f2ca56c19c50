//! Contacts sheet: customers and suppliers.

use super::{SheetRecord, cells};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether the contact buys from or sells to the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    /// Buys from the business; may hold a titip-uang credit
    #[default]
    Customer,
    /// Sells to the business
    Supplier,
}

impl ContactType {
    /// Cell value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Supplier => "supplier",
        }
    }
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" | "pelanggan" => Ok(Self::Customer),
            "supplier" | "pemasok" => Ok(Self::Supplier),
            other => Err(format!("unknown contact type '{other}'")),
        }
    }
}

/// Contacts sheet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Unique id
    pub id: String,
    /// Display name
    pub name: String,
    /// Customer or supplier
    pub contact_type: ContactType,
    /// Phone number, free text
    pub phone: String,
    /// Address, free text
    pub address: String,
    /// Notes
    pub notes: String,
    /// WIB timestamp
    pub created_at: String,
}

impl SheetRecord for Contact {
    const SHEET: &'static str = "Contacts";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "name",
        "type",
        "phone",
        "address",
        "notes",
        "createdAt",
    ];

    fn from_row(row: &[String]) -> Option<Self> {
        let id = cells::owned(row, 0);
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id,
            name: cells::owned(row, 1),
            // Unknown types were customers in every sheet seen so far.
            contact_type: cells::text(row, 2).parse().unwrap_or_default(),
            phone: cells::owned(row, 3),
            address: cells::owned(row, 4),
            notes: cells::owned(row, 5),
            created_at: cells::owned(row, 6),
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.contact_type.to_string(),
            self.phone.clone(),
            self.address.clone(),
            self.notes.clone(),
            self.created_at.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_contact_type_parsing() {
        assert_eq!("Customer".parse::<ContactType>(), Ok(ContactType::Customer));
        assert_eq!("pemasok".parse::<ContactType>(), Ok(ContactType::Supplier));
        assert!("vendor".parse::<ContactType>().is_err());
    }

    #[test]
    fn test_contact_row_mapping() {
        let row: Vec<String> = ["C1", "Budi", "supplier", "0812", "Jl. Mawar", "", "x"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let contact = Contact::from_row(&row).unwrap();
        assert_eq!(contact.contact_type, ContactType::Supplier);
        assert_eq!(contact.to_row(), row);
    }

    #[test]
    fn test_contact_blank_id_is_skipped() {
        assert!(Contact::from_row(&[String::new(), "Budi".to_string()]).is_none());
    }
}
