//! Unified error type for the ledger, the sheet clients and the CLI.

use thiserror::Error;

/// Every failure the crate can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// No contact with this id exists in the Contacts sheet
    #[error("Contact not found: {id}")]
    ContactNotFound {
        /// Contact id that was looked up
        id: String,
    },

    /// No ledger row with this id exists in the Debts sheet
    #[error("Debt record not found: {id}")]
    DebtNotFound {
        /// Debt id that was looked up
        id: String,
    },

    /// No product with this id exists in the Products sheet
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Product id that was looked up
        id: String,
    },

    /// A required field is missing or a request makes no sense for the current ledger
    #[error("Validation error: {message}")]
    Validation {
        /// Human readable reason
        message: String,
    },

    /// Amount is zero, negative or not a finite number
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// The sheet backend rejected or failed a read/write
    #[error("Remote sheet request failed: {message}")]
    RemoteWrite {
        /// Status and body, or transport error text
        message: String,
    },

    /// No usable access token could be obtained
    #[error("Access token expired and could not be refreshed")]
    TokenExpired,

    /// The named sheet (tab) does not exist
    #[error("Sheet not found: {name}")]
    SheetNotFound {
        /// Sheet title
        name: String,
    },

    /// The same operation is still running
    #[error("Operation already in progress: {key}")]
    AlreadySubmitting {
        /// Submission key
        key: String,
    },

    /// A request id that already completed was submitted again
    #[error("Request already completed: {key}")]
    DuplicateSubmission {
        /// Submission key
        key: String,
    },

    /// Local store failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// A background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::RemoteWrite`].
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteWrite {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
