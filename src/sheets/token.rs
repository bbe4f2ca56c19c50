//! Access token source for the Google backend.
//!
//! The consent flow and refresh-token exchange live outside this crate. A token is either
//! fixed (environment) or read from a JSON file that an external OAuth helper keeps fresh;
//! `refresh` simply re-reads that file.

use crate::config::app::SheetsConfig;
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
enum TokenSource {
    Fixed(String),
    File(PathBuf),
}

/// Token file layout, a subset of what OAuth helpers usually persist.
#[derive(Debug, Deserialize)]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

/// Hands out the current bearer token and re-reads it on demand.
#[derive(Debug)]
pub struct TokenProvider {
    source: TokenSource,
    current: RwLock<Option<String>>,
}

impl TokenProvider {
    /// A token that never changes.
    #[must_use]
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Fixed(token.into()),
            current: RwLock::new(None),
        }
    }

    /// A token persisted in a JSON file with an `access_token` field.
    #[must_use]
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: TokenSource::File(path.into()),
            current: RwLock::new(None),
        }
    }

    /// Token file wins over a fixed token, since it can be refreshed.
    pub fn from_config(config: &SheetsConfig) -> Result<Self> {
        if let Some(path) = &config.token_file {
            return Ok(Self::from_file(path.clone()));
        }
        config
            .access_token
            .as_ref()
            .map(|token| Self::fixed(token.clone()))
            .ok_or_else(|| Error::Config {
                message: "Set SHEETS_ACCESS_TOKEN or SHEETS_TOKEN_FILE for the google backend"
                    .to_string(),
            })
    }

    /// The cached token, loading it on first use.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.current.read().await.clone() {
            return Ok(token);
        }
        self.refresh().await
    }

    /// Reloads the token from its source and caches it.
    pub async fn refresh(&self) -> Result<String> {
        let fresh = match &self.source {
            TokenSource::Fixed(token) => token.trim().to_string(),
            TokenSource::File(path) => read_token_file(path).await?,
        };
        if fresh.is_empty() {
            return Err(Error::TokenExpired);
        }
        debug!("Access token loaded");
        *self.current.write().await = Some(fresh.clone());
        Ok(fresh)
    }
}

async fn read_token_file(path: &Path) -> Result<String> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        warn!("Cannot read token file {}: {e}", path.display());
        Error::TokenExpired
    })?;
    let stored: StoredToken = serde_json::from_str(&contents)?;
    if stored.expires_at.is_some_and(|expiry| expiry <= Utc::now()) {
        warn!("Token file {} holds an expired token", path.display());
        return Err(Error::TokenExpired);
    }
    Ok(stored.access_token.trim().to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn temp_token_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hutang-buddy-{name}-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_fixed_token() -> Result<()> {
        let provider = TokenProvider::fixed("ya29.abc");
        assert_eq!(provider.access_token().await?, "ya29.abc");
        assert_eq!(provider.refresh().await?, "ya29.abc");
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_fixed_token_is_expired() {
        let provider = TokenProvider::fixed("  ");
        assert!(matches!(provider.access_token().await, Err(Error::TokenExpired)));
    }

    #[tokio::test]
    async fn test_refresh_rereads_file() -> Result<()> {
        let path = temp_token_file("refresh", r#"{"access_token":"first"}"#);
        let provider = TokenProvider::from_file(&path);
        assert_eq!(provider.access_token().await?, "first");

        std::fs::write(&path, r#"{"access_token":"second"}"#)?;
        assert_eq!(provider.access_token().await?, "first");
        assert_eq!(provider.refresh().await?, "second");
        assert_eq!(provider.access_token().await?, "second");

        std::fs::remove_file(&path)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_file_token() -> Result<()> {
        let path = temp_token_file(
            "expired",
            r#"{"access_token":"old","expires_at":"2020-01-01T00:00:00Z"}"#,
        );
        let provider = TokenProvider::from_file(&path);
        assert!(matches!(provider.access_token().await, Err(Error::TokenExpired)));
        std::fs::remove_file(&path)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_expired() {
        let provider = TokenProvider::from_file("/nonexistent/hutang-token.json");
        assert!(matches!(provider.refresh().await, Err(Error::TokenExpired)));
    }

    #[test]
    fn test_from_config_requires_a_source() {
        let config = SheetsConfig::default();
        assert!(matches!(
            TokenProvider::from_config(&config),
            Err(Error::Config { .. })
        ));
    }
}
