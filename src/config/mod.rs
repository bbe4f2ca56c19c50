/// Application settings loaded from config.toml and the environment
pub mod app;

/// Local SQLite store connection and table creation
pub mod database;

pub use app::{AppConfig, Backend, load_app_configuration, load_config};
