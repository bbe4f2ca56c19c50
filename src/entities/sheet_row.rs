//! Sheet row entity - One spreadsheet row held by the local backend.
//!
//! Rows are addressed the same way the remote API addresses them: by `sheet_name` and the
//! 1-based `row_index`, where row 1 is the header. `cells` holds the row as a JSON array
//! of strings.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sheet row database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sheet_rows")]
pub struct Model {
    /// Surrogate key
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Sheet (tab) title
    pub sheet_name: String,
    /// 1-based row number inside the sheet
    pub row_index: i64,
    /// JSON array of cell strings
    #[sea_orm(column_type = "Text")]
    pub cells: String,
    /// When the row was last written
    pub updated_at: DateTime,
}

/// `SheetRow` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
