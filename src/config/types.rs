use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Crawl-Hot
///
/// Every section and key is optional; missing values fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub recovery: RecoveryConfig,
    pub resolver: ResolverConfig,
    pub gateway: GatewayConfig,
    pub output: OutputConfig,
}

/// Worker pool and per-account crawl behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of accounts crawled concurrently
    pub worker_count: usize,

    /// Hard cap on scroll iterations per account
    pub scroll_max_attempts: u32,

    /// Consecutive iterations without a new post that end scrolling early
    pub scroll_no_new_threshold: u32,

    /// Base pause after each scroll key press (milliseconds)
    pub scroll_interval_ms: u64,

    /// Gateway errors in a row after which scrolling is abandoned
    pub scroll_max_consecutive_errors: u32,

    /// How long to wait for rendered posts after navigation (seconds)
    pub page_load_timeout_secs: u64,

    /// Upper bound on one account's crawl (seconds)
    pub per_account_timeout_secs: u64,

    /// Posts older than this many hours are not collected
    pub recency_window_hours: u32,

    /// Profile pages live at `<profile-base-url>/<account>`
    pub profile_base_url: String,

    /// Concurrent content resolutions inside one account
    pub content_workers: usize,

    /// Attempts per account before a failed crawl is final
    pub account_retry_budget: u32,

    /// Base backoff between account attempts (milliseconds); scaled by the attempt number
    pub account_retry_backoff_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            scroll_max_attempts: 10,
            scroll_no_new_threshold: 3,
            scroll_interval_ms: 500,
            scroll_max_consecutive_errors: 3,
            page_load_timeout_secs: 5,
            per_account_timeout_secs: 120,
            recency_window_hours: 24,
            profile_base_url: "https://x.com".to_string(),
            content_workers: 10,
            account_retry_budget: 5,
            account_retry_backoff_ms: 1000,
        }
    }
}

impl CrawlerConfig {
    pub fn scroll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_interval_ms)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn per_account_timeout(&self) -> Duration {
        Duration::from_secs(self.per_account_timeout_secs)
    }
}

/// Automation service restart policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RecoveryConfig {
    /// Restarts allowed per run before the run is aborted
    pub restart_budget: u32,

    /// Fixed wait after starting the service (seconds)
    pub settle_secs: u64,

    /// Pause between the stop and start commands (seconds)
    pub stop_start_gap_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            restart_budget: 2,
            settle_secs: 30,
            stop_start_gap_secs: 2,
        }
    }
}

impl RecoveryConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn stop_start_gap(&self) -> Duration {
        Duration::from_secs(self.stop_start_gap_secs)
    }
}

/// Remote content API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Attempts per API for transient failures
    pub retry_budget: u32,

    /// Lower bound of the uniform backoff between attempts (milliseconds)
    pub backoff_min_ms: u64,

    /// Upper bound of the uniform backoff between attempts (milliseconds)
    pub backoff_max_ms: u64,

    /// Timeout of a single API request (seconds)
    pub request_timeout_secs: u64,

    /// Rich primary API
    pub primary_base_url: String,

    /// Narrower fallback API
    pub fallback_base_url: String,

    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            retry_budget: 5,
            backoff_min_ms: 500,
            backoff_max_ms: 1500,
            request_timeout_secs: 15,
            primary_base_url: "https://api.fxtwitter.com".to_string(),
            fallback_base_url: "https://cdn.syndication.twimg.com".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36"
                .to_string(),
        }
    }
}

/// Command-line automation channel settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GatewayConfig {
    /// Executable that drives the browser
    pub program: String,

    /// Arguments placed before every subcommand
    pub args: Vec<String>,

    /// Timeout of a single channel command (seconds)
    pub command_timeout_secs: u64,

    /// Output fragments that mean the browser tab is gone
    pub tab_lost_patterns: Vec<String>,

    /// Output fragments that mean a network-level failure
    pub network_patterns: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            program: "openclaw".to_string(),
            args: vec!["browser".to_string()],
            command_timeout_secs: 30,
            tab_lost_patterns: vec![
                "tab not found".to_string(),
                "target closed".to_string(),
                "no such target".to_string(),
            ],
            network_patterns: vec![
                "net::err".to_string(),
                "connection refused".to_string(),
                "econnreset".to_string(),
                "timed out".to_string(),
            ],
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// File holding one account handle per line
    pub accounts_file: PathBuf,

    /// Directory receiving the per-run artifacts
    pub results_dir: PathBuf,

    /// SQLite run journal
    pub database_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            accounts_file: PathBuf::from("users.txt"),
            results_dir: PathBuf::from("results"),
            database_path: PathBuf::from("results/crawl-hot.db"),
        }
    }
}
