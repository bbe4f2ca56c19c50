//! Sheet access: the row-level contract every backend implements.
//!
//! - `Sheet` abstracts a workbook of named sheets holding positional rows.
//! - `GoogleSheet` talks to the Google Sheets REST API.
//! - `LocalSheet` keeps the same rows in `SQLite`, for offline use and tests.
//!
//! Row numbers are 1-based and include the header, exactly like A1 notation: the first
//! data row returned by `get_rows` is sheet row 2.

pub mod google;
pub mod local;
pub mod token;

pub use google::GoogleSheet;
pub use local::LocalSheet;
pub use token::TokenProvider;

use crate::config::{AppConfig, Backend};
use crate::errors::{Error, Result};
use std::sync::Arc;

/// One row write inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetOp {
    /// Overwrite a full row in place
    Update {
        /// Sheet title
        sheet: String,
        /// 1-based row number
        row: usize,
        /// Full row, column order
        cells: Vec<String>,
    },
    /// Add rows after the last used row
    Append {
        /// Sheet title
        sheet: String,
        /// Rows in order
        rows: Vec<Vec<String>>,
    },
}

/// An ordered set of row writes that a backend applies all-or-nothing where it can.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetBatch {
    ops: Vec<SheetOp>,
}

impl SheetBatch {
    /// Empty batch
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Queues a full-row overwrite.
    pub fn update(&mut self, sheet: &str, row: usize, cells: Vec<String>) {
        self.ops.push(SheetOp::Update {
            sheet: sheet.to_string(),
            row,
            cells,
        });
    }

    /// Queues an append; consecutive appends to the same sheet are merged.
    pub fn append(&mut self, sheet: &str, rows: Vec<Vec<String>>) {
        if rows.is_empty() {
            return;
        }
        if let Some(SheetOp::Append {
            sheet: last_sheet,
            rows: last_rows,
        }) = self.ops.last_mut()
        {
            if last_sheet.as_str() == sheet {
                last_rows.extend(rows);
                return;
            }
        }
        self.ops.push(SheetOp::Append {
            sheet: sheet.to_string(),
            rows,
        });
    }

    /// Queued writes in order
    #[must_use]
    pub fn ops(&self) -> &[SheetOp] {
        &self.ops
    }

    /// Whether nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Row-level access to a workbook.
#[async_trait::async_trait]
pub trait Sheet: Send + Sync {
    /// All rows of a sheet with the header row stripped.
    async fn get_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>>;

    /// Appends rows after the last used row.
    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<()>;

    /// Overwrites a full row. `row_index` is 1-based and counts the header.
    async fn update_row(&self, sheet: &str, row_index: usize, row: &[String]) -> Result<()>;

    /// Deletes a row; later rows move up by one.
    async fn delete_row(&self, sheet: &str, row_index: usize) -> Result<()>;

    /// Creates the sheet if missing and writes the header row if it is empty.
    async fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()>;

    /// Applies a batch. The default applies each write in turn and stops at the first
    /// failure; backends with a transactional primitive override it.
    async fn commit(&self, batch: &SheetBatch) -> Result<()> {
        for op in batch.ops() {
            match op {
                SheetOp::Update { sheet, row, cells } => self.update_row(sheet, *row, cells).await?,
                SheetOp::Append { sheet, rows } => self.append_rows(sheet, rows).await?,
            }
        }
        Ok(())
    }
}

/// Rejects row 0, which does not exist in A1 notation.
pub(crate) fn check_row_index(row_index: usize) -> Result<()> {
    if row_index == 0 {
        return Err(Error::validation("sheet rows are numbered from 1"));
    }
    Ok(())
}

/// Builds the configured backend.
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn Sheet>> {
    match config.sheets.backend {
        Backend::Google => {
            let spreadsheet_id =
                config
                    .sheets
                    .spreadsheet_id
                    .as_deref()
                    .ok_or_else(|| Error::Config {
                        message: "SPREADSHEET_ID is required for the google backend".to_string(),
                    })?;
            let tokens = TokenProvider::from_config(&config.sheets)?;
            tracing::info!("Using Google Sheets backend for spreadsheet {spreadsheet_id}");
            Ok(Arc::new(GoogleSheet::new(spreadsheet_id, tokens)?))
        }
        Backend::Local => {
            tracing::info!("Using local backend at {}", config.sheets.database_url);
            Ok(Arc::new(LocalSheet::open(&config.sheets.database_url).await?))
        }
    }
}
