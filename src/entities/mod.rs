//! Entity module - SeaORM entity definitions for the local sheet store.
//! The local backend keeps every sheet as rows of JSON-encoded cells, so a single
//! table mirrors the whole workbook.

pub mod sheet_row;

pub use sheet_row::{Column as SheetRowColumn, Entity as SheetRow, Model as SheetRowModel};
