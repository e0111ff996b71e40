//! Crawl-Hot: recent-post harvester for a list of social accounts
//!
//! This crate drives a browser automation channel to discover the newest posts of each
//! configured account, resolves every post through a primary API with a fallback API, and
//! appends each account's result to disk the moment it completes.

pub mod accounts;
pub mod config;
pub mod crawler;
pub mod gateway;
pub mod output;
pub mod resolver;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Crawl-Hot operations
#[derive(Debug, Error)]
pub enum CrawlHotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Automation channel recovery exhausted after {restarts} restart(s)")]
    RecoveryExhausted { restarts: u32 },

    #[error("Run not found: {0}")]
    RunNotFound(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid account handle: {0:?}")]
    InvalidAccount(String),
}

/// Result type alias for Crawl-Hot operations
pub type Result<T> = std::result::Result<T, CrawlHotError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Orchestrator, RunReport};
pub use state::{Account, CrawlOutcome, PostContent, PostEntry, PostIdentifier, RunProgress};
