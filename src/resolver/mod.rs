//! Content resolution for discovered posts
//!
//! `ContentResolver` turns a `PostIdentifier` into `PostContent`:
//!
//! 1. Ask the primary API, retrying transient failures with uniform random backoff
//! 2. On any primary failure, ask the fallback API with the same retry policy
//! 3. If both fail, report a `ResolveError`; the caller keeps a placeholder
//!
//! The resolver holds no per-post state, so it is shared freely between workers.

mod api;

pub use api::ApiError;

use crate::config::ResolverConfig;
use crate::state::{PostContent, PostIdentifier};
use rand::Rng;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Both APIs failed for one post
#[derive(Debug, Clone, Error)]
#[error("could not resolve {identifier}: primary {primary}; fallback {fallback}")]
pub struct ResolveError {
    pub identifier: PostIdentifier,
    pub primary: ApiError,
    pub fallback: ApiError,
}

/// Bounded retry with uniform random backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            attempts: config.retry_budget.max(1),
            backoff_min: Duration::from_millis(config.backoff_min_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Draws a backoff uniformly from `[backoff_min, backoff_max]`
    pub fn backoff(&self) -> Duration {
        let min = self.backoff_min.as_millis() as u64;
        let max = self.backoff_max.as_millis() as u64;
        if max <= min {
            return self.backoff_min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// Runs `attempt` until it succeeds, fails non-transiently or the attempts are used up
    ///
    /// # Arguments
    ///
    /// * `label` - Name used in retry logs
    /// * `attempt` - Produces one request future per call
    ///
    /// # Returns
    ///
    /// The first success, or the last error
    pub async fn run<T, F, Fut>(&self, label: &str, mut attempt: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut tries = 0;

        loop {
            tries += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && tries < self.attempts => {
                    let wait = self.backoff();
                    tracing::warn!(
                        "{} attempt {}/{} failed ({}), retrying in {:?}",
                        label,
                        tries,
                        self.attempts,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Builds the HTTP client used for both APIs
///
/// # Arguments
///
/// * `config` - The resolver configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ResolverConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Primary-then-fallback post content resolver
#[derive(Debug, Clone)]
pub struct ContentResolver {
    client: Client,
    primary_base: String,
    fallback_base: String,
    policy: RetryPolicy,
}

impl ContentResolver {
    /// Creates a resolver with its own HTTP client
    pub fn new(config: &ResolverConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?, config))
    }

    /// Creates a resolver around an existing HTTP client
    pub fn with_client(client: Client, config: &ResolverConfig) -> Self {
        Self {
            client,
            primary_base: config.primary_base_url.trim_end_matches('/').to_string(),
            fallback_base: config.fallback_base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::from_config(config),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolves one post
    ///
    /// # Arguments
    ///
    /// * `identifier` - The post to resolve
    ///
    /// # Returns
    ///
    /// * `Ok(PostContent)` - Content from the primary or, failing that, the fallback API
    /// * `Err(ResolveError)` - Both APIs failed
    pub async fn resolve(&self, identifier: &PostIdentifier) -> Result<PostContent, ResolveError> {
        let primary = match self.fetch_primary(identifier).await {
            Ok(content) => return Ok(content),
            Err(e) => e,
        };

        tracing::debug!(
            "Primary API failed for {} ({}), using fallback",
            identifier,
            primary
        );

        match self.fetch_fallback(identifier).await {
            Ok(content) => Ok(content),
            Err(fallback) => {
                tracing::warn!("Content unavailable for {}: {}", identifier, fallback);
                Err(ResolveError {
                    identifier: identifier.clone(),
                    primary,
                    fallback,
                })
            }
        }
    }

    async fn fetch_primary(&self, identifier: &PostIdentifier) -> Result<PostContent, ApiError> {
        let url = format!(
            "{}/{}/status/{}",
            self.primary_base,
            identifier.author().unwrap_or("i"),
            identifier.id()
        );

        let url = url.as_str();
        self.policy
            .run("primary", move || async move {
                let body = self.get_body(url).await?;
                api::parse_primary(identifier, &body)
            })
            .await
    }

    async fn fetch_fallback(&self, identifier: &PostIdentifier) -> Result<PostContent, ApiError> {
        let url = format!(
            "{}/tweet-result?id={}&token=0",
            self.fallback_base,
            identifier.id()
        );

        let url = url.as_str();
        self.policy
            .run("fallback", move || async move {
                let body = self.get_body(url).await?;
                api::parse_fallback(identifier, &body)
            })
            .await
    }

    /// One GET request; non-success statuses become errors
    async fn get_body(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::from_status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        Ok(body.to_vec())
    }
}
