//! `SQLite` sheet backend.
//!
//! Mirrors the row semantics of the remote API on top of the `sheet_rows` table: a sheet
//! exists once it has any row, appends go after the highest row number, deletes shift later
//! rows up. Batches run inside one database transaction, so a failed commit leaves no
//! partial writes behind.

use super::{Sheet, SheetBatch, SheetOp, check_row_index};
use crate::config::database;
use crate::entities::{SheetRow, sheet_row};
use crate::errors::{Error, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, instrument};

/// Workbook stored in a local database.
#[derive(Debug, Clone)]
pub struct LocalSheet {
    db: DatabaseConnection,
}

impl LocalSheet {
    /// Wraps an existing connection whose tables were already created.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connects and creates the tables if needed.
    pub async fn open(database_url: &str) -> Result<Self> {
        let db = database::create_connection(database_url).await?;
        database::create_tables(&db).await?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn encode(cells: &[String]) -> Result<String> {
    serde_json::to_string(cells).map_err(Into::into)
}

fn decode(model: &sheet_row::Model) -> Result<Vec<String>> {
    serde_json::from_str(&model.cells).map_err(Into::into)
}

fn to_db_index(row_index: usize) -> Result<i64> {
    i64::try_from(row_index).map_err(|_| Error::validation("row index out of range"))
}

async fn sheet_rows<C>(db: &C, sheet: &str) -> Result<Vec<sheet_row::Model>>
where
    C: ConnectionTrait,
{
    SheetRow::find()
        .filter(sheet_row::Column::SheetName.eq(sheet))
        .order_by_asc(sheet_row::Column::RowIndex)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn require_sheet<C>(db: &C, sheet: &str) -> Result<Vec<sheet_row::Model>>
where
    C: ConnectionTrait,
{
    let rows = sheet_rows(db, sheet).await?;
    if rows.is_empty() {
        return Err(Error::SheetNotFound {
            name: sheet.to_string(),
        });
    }
    Ok(rows)
}

async fn insert_row<C>(db: &C, sheet: &str, row_index: i64, cells: &[String]) -> Result<()>
where
    C: ConnectionTrait,
{
    sheet_row::ActiveModel {
        sheet_name: Set(sheet.to_string()),
        row_index: Set(row_index),
        cells: Set(encode(cells)?),
        updated_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn append_in<C>(db: &C, sheet: &str, rows: &[Vec<String>]) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = require_sheet(db, sheet).await?;
    let mut next = existing.last().map_or(1, |last| last.row_index + 1);
    for cells in rows {
        insert_row(db, sheet, next, cells).await?;
        next += 1;
    }
    Ok(())
}

async fn update_in<C>(db: &C, sheet: &str, row_index: usize, cells: &[String]) -> Result<()>
where
    C: ConnectionTrait,
{
    check_row_index(row_index)?;
    require_sheet(db, sheet).await?;
    let index = to_db_index(row_index)?;

    let existing = SheetRow::find()
        .filter(sheet_row::Column::SheetName.eq(sheet))
        .filter(sheet_row::Column::RowIndex.eq(index))
        .one(db)
        .await?;

    if let Some(model) = existing {
        let mut active: sheet_row::ActiveModel = model.into();
        active.cells = Set(encode(cells)?);
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        active.update(db).await?;
    } else {
        insert_row(db, sheet, index, cells).await?;
    }
    Ok(())
}

async fn delete_in<C>(db: &C, sheet: &str, row_index: usize) -> Result<()>
where
    C: ConnectionTrait,
{
    check_row_index(row_index)?;
    require_sheet(db, sheet).await?;
    let index = to_db_index(row_index)?;

    SheetRow::delete_many()
        .filter(sheet_row::Column::SheetName.eq(sheet))
        .filter(sheet_row::Column::RowIndex.eq(index))
        .exec(db)
        .await?;

    // Later rows move up, as they do in a spreadsheet.
    SheetRow::update_many()
        .col_expr(
            sheet_row::Column::RowIndex,
            Expr::col(sheet_row::Column::RowIndex).sub(1),
        )
        .filter(sheet_row::Column::SheetName.eq(sheet))
        .filter(sheet_row::Column::RowIndex.gt(index))
        .exec(db)
        .await?;
    Ok(())
}

#[async_trait::async_trait]
impl Sheet for LocalSheet {
    async fn get_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let rows = require_sheet(&self.db, sheet).await?;
        let last = rows.last().map_or(1, |model| model.row_index);
        let data_len = usize::try_from(last.saturating_sub(1)).unwrap_or(0);

        // Gaps read back as empty rows, like blank rows in a spreadsheet.
        let mut out = vec![Vec::new(); data_len];
        for model in rows.iter().filter(|model| model.row_index >= 2) {
            if let Some(slot) = usize::try_from(model.row_index - 2)
                .ok()
                .and_then(|i| out.get_mut(i))
            {
                *slot = decode(model)?;
            }
        }
        Ok(out)
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<()> {
        append_in(&self.db, sheet, rows).await
    }

    async fn update_row(&self, sheet: &str, row_index: usize, row: &[String]) -> Result<()> {
        update_in(&self.db, sheet, row_index, row).await
    }

    async fn delete_row(&self, sheet: &str, row_index: usize) -> Result<()> {
        delete_in(&self.db, sheet, row_index).await
    }

    async fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()> {
        let rows = sheet_rows(&self.db, sheet).await?;
        if rows.iter().any(|model| model.row_index == 1) {
            return Ok(());
        }
        debug!("Writing header row for sheet {sheet}");
        let header: Vec<String> = headers.iter().map(ToString::to_string).collect();
        insert_row(&self.db, sheet, 1, &header).await
    }

    async fn commit(&self, batch: &SheetBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin().await?;
        for op in batch.ops() {
            match op {
                SheetOp::Update { sheet, row, cells } => update_in(&txn, sheet, *row, cells).await?,
                SheetOp::Append { sheet, rows } => append_in(&txn, sheet, rows).await?,
            }
        }
        txn.commit().await?;
        debug!("Committed {} sheet writes", batch.ops().len());
        Ok(())
    }
}
