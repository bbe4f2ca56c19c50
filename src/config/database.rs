//! Database configuration for the local sheet backend.
//!
//! The local backend mirrors the workbook in `SQLite` through `SeaORM`. Tables are generated
//! from the entity definitions with `Schema::create_table_from_entity`, so the schema always
//! matches the Rust structs without hand-written SQL.

use crate::entities::SheetRow;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Default location of the local workbook; `mode=rwc` creates the file on first use.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://hutang_buddy.sqlite?mode=rwc";

/// Opens a connection to the given database URL.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the local store tables if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut sheet_row_table = schema.create_table_from_entity(SheetRow);
    sheet_row_table.if_not_exists();

    db.execute(builder.build(&sheet_row_table)).await?;

    Ok(())
}
