//! Configuration module for Crawl-Hot
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crawl_hot::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl-hot.toml")).unwrap();
//! println!("Crawling with {} workers", config.crawler.worker_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, GatewayConfig, OutputConfig, RecoveryConfig, ResolverConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
