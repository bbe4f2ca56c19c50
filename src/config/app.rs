//! Application configuration loaded from `config.toml`.
//!
//! Every section is optional; a missing file yields the defaults (local backend, 300 ms
//! pacing, three rollup attempts one second apart). Environment variables, usually set
//! through `.env`, override the file.

use super::database::DEFAULT_DATABASE_URL;
use crate::core::{LedgerSettings, rollup::RollupSettings};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which sheet backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Google Sheets REST API
    Google,
    /// `SQLite` mirror of the workbook
    #[default]
    Local,
}

impl std::str::FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "local" => Ok(Self::Local),
            other => Err(Error::Config {
                message: format!("Unknown sheet backend '{other}' (expected google or local)"),
            }),
        }
    }
}

/// `[sheets]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Backend selection
    pub backend: Backend,
    /// Spreadsheet id, required for the Google backend
    pub spreadsheet_id: Option<String>,
    /// Bearer token, usually from `SHEETS_ACCESS_TOKEN` rather than the file
    pub access_token: Option<String>,
    /// JSON file holding `access_token`, kept fresh by an external OAuth helper
    pub token_file: Option<PathBuf>,
    /// Local backend database
    pub database_url: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            spreadsheet_id: None,
            access_token: None,
            token_file: None,
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// `[pacing]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause between sequential remote calls, to stay under API rate limits
    pub write_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self { write_delay_ms: 300 }
    }
}

/// `[rollup]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RollupConfig {
    /// Attempts per StatusHutang upsert
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub retry_delay_ms: u64,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// The whole config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend and credentials
    pub sheets: SheetsConfig,
    /// Rate-limit pacing
    pub pacing: PacingConfig,
    /// Status rollup retry policy
    pub rollup: RollupConfig,
}

impl AppConfig {
    /// Applies `HUTANG_BACKEND`, `SPREADSHEET_ID`, `SHEETS_ACCESS_TOKEN`, `SHEETS_TOKEN_FILE`
    /// and `DATABASE_URL` from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("HUTANG_BACKEND") {
            self.sheets.backend = backend.parse()?;
        }
        if let Some(id) = lookup("SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = Some(id);
        }
        if let Some(token) = lookup("SHEETS_ACCESS_TOKEN") {
            self.sheets.access_token = Some(token);
        }
        if let Some(path) = lookup("SHEETS_TOKEN_FILE") {
            self.sheets.token_file = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.sheets.database_url = url;
        }
        Ok(())
    }

    /// Timing knobs for the ledger service.
    #[must_use]
    pub const fn ledger_settings(&self) -> LedgerSettings {
        let pace = Duration::from_millis(self.pacing.write_delay_ms);
        LedgerSettings {
            pace,
            rollup: RollupSettings {
                max_attempts: self.rollup.max_attempts,
                retry_delay: Duration::from_millis(self.rollup.retry_delay_ms),
                write_delay: pace,
            },
        }
    }
}

/// Loads configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads the file when present (defaults otherwise) and applies environment overrides.
pub fn load_app_configuration<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    let mut config = if path_ref.exists() {
        load_config(path_ref)?
    } else {
        tracing::info!(
            "No config file at {}, using defaults",
            path_ref.display()
        );
        AppConfig::default()
    };
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}
