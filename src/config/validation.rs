use crate::config::types::{
    Config, CrawlerConfig, GatewayConfig, OutputConfig, RecoveryConfig, ResolverConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_recovery_config(&config.recovery)?;
    validate_resolver_config(&config.resolver)?;
    validate_gateway_config(&config.gateway)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates worker pool and scrolling settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_count < 1 || config.worker_count > 32 {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and 32, got {}",
            config.worker_count
        )));
    }

    if config.scroll_max_attempts < 1 {
        return Err(ConfigError::Validation(
            "scroll_max_attempts must be >= 1".to_string(),
        ));
    }

    if config.scroll_no_new_threshold < 1
        || config.scroll_no_new_threshold > config.scroll_max_attempts
    {
        return Err(ConfigError::Validation(format!(
            "scroll_no_new_threshold must be between 1 and scroll_max_attempts ({}), got {}",
            config.scroll_max_attempts, config.scroll_no_new_threshold
        )));
    }

    if config.scroll_max_consecutive_errors < 1 {
        return Err(ConfigError::Validation(
            "scroll_max_consecutive_errors must be >= 1".to_string(),
        ));
    }

    if config.per_account_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "per_account_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.recency_window_hours < 1 {
        return Err(ConfigError::Validation(
            "recency_window_hours must be >= 1".to_string(),
        ));
    }

    if config.content_workers < 1 {
        return Err(ConfigError::Validation(
            "content_workers must be >= 1".to_string(),
        ));
    }

    if config.account_retry_budget < 1 {
        return Err(ConfigError::Validation(
            "account_retry_budget must be >= 1".to_string(),
        ));
    }

    validate_base_url("profile_base_url", &config.profile_base_url)
}

fn validate_recovery_config(config: &RecoveryConfig) -> Result<(), ConfigError> {
    // A zero budget is legal: the first lost tab aborts the run.
    if config.restart_budget > 100 {
        return Err(ConfigError::Validation(format!(
            "restart_budget must be <= 100, got {}",
            config.restart_budget
        )));
    }
    Ok(())
}

/// Validates remote API settings
fn validate_resolver_config(config: &ResolverConfig) -> Result<(), ConfigError> {
    if config.retry_budget < 1 {
        return Err(ConfigError::Validation(
            "retry_budget must be >= 1".to_string(),
        ));
    }

    if config.backoff_min_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_min_ms ({}) must not exceed backoff_max_ms ({})",
            config.backoff_min_ms, config.backoff_max_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    validate_base_url("primary_base_url", &config.primary_base_url)?;
    validate_base_url("fallback_base_url", &config.fallback_base_url)?;

    Ok(())
}

fn validate_gateway_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    if config.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "gateway program cannot be empty".to_string(),
        ));
    }

    if config.command_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "command_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config
        .tab_lost_patterns
        .iter()
        .chain(config.network_patterns.iter())
        .any(|p| p.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "fault patterns cannot be empty strings".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.accounts_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "accounts_file cannot be empty".to_string(),
        ));
    }

    if config.results_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "results_dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Base URLs must be absolute http(s) URLs
fn validate_base_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}
