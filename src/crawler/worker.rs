//! Per-account crawl worker
//!
//! One invocation crawls one account:
//!
//! 1. Lease the browser page
//! 2. Navigate to the profile page
//! 3. Poll until posts have rendered (bounded by the page-load timeout)
//! 4. Scroll and collect post identifiers inside the recency window
//! 5. Release the page and resolve every identifier, keeping placeholders for the ones that fail
//!
//! A `Failed` attempt is repeated up to the account retry budget with a growing, jittered
//! backoff. The worker never returns an error. Every failure ends up in the `CrawlOutcome`.

use super::gate::{GateError, GatewayGate, PageLease};
use super::scripts::{self, CONTENT_PROBE, SCROLL_KEY};
use crate::config::CrawlerConfig;
use crate::gateway::payload;
use crate::resolver::ContentResolver;
use crate::state::{Account, CrawlOutcome, PostEntry, PostIdentifier};
use futures::stream::{self, StreamExt};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Identifiers collected by the scroll loop
#[derive(Debug, Default)]
struct Discovery {
    /// In discovery order, without duplicates
    identifiers: Vec<PostIdentifier>,

    /// Why scrolling stopped early, if it did
    error: Option<String>,
}

/// Crawls single accounts through the shared gate and resolver
pub struct AccountWorker {
    gate: Arc<GatewayGate>,
    resolver: Arc<ContentResolver>,
    config: CrawlerConfig,
    discovery_script: String,
}

impl AccountWorker {
    pub fn new(
        gate: Arc<GatewayGate>,
        resolver: Arc<ContentResolver>,
        config: CrawlerConfig,
    ) -> Self {
        let discovery_script = scripts::discovery_script(config.recency_window_hours);
        Self {
            gate,
            resolver,
            config,
            discovery_script,
        }
    }

    /// Crawls one account, retrying failed attempts
    ///
    /// # Arguments
    ///
    /// * `account` - The account to crawl
    ///
    /// # Returns
    ///
    /// * `Success` - At least one post was found; entries are in discovery order
    /// * `NoNewPosts` - The page showed nothing inside the recency window
    /// * `Failed` - Every attempt failed, or the automation channel is gone
    pub async fn crawl(&self, account: &Account) -> CrawlOutcome {
        let attempts = self.config.account_retry_budget.max(1);
        let mut attempt = 1;

        loop {
            let outcome = self.crawl_once(account).await;

            // NoNewPosts and Success are final
            let retryable = outcome.failure_reason().is_some() && !self.gate.is_halted();
            if !retryable || attempt >= attempts {
                return outcome;
            }

            let pause = self.retry_pause(attempt);
            tracing::warn!(
                "Attempt {}/{} for {} failed ({}); retrying in {:?}",
                attempt,
                attempts,
                account,
                outcome.failure_reason().unwrap_or_default(),
                pause
            );
            tokio::time::sleep(pause).await;
            attempt += 1;
        }
    }

    /// One attempt at an account
    async fn crawl_once(&self, account: &Account) -> CrawlOutcome {
        let url = account.profile_url(&self.config.profile_base_url);

        let discovery = {
            let page = self.gate.lease().await;
            tracing::info!("Crawling {} ({})", account, url);

            if let Err(e) = page.navigate(&url).await {
                tracing::warn!("Navigation to {} failed: {}", url, e);
                return CrawlOutcome::Failed(format!("navigation failed: {}", e));
            }

            match self.wait_for_content(&page).await {
                Ok(true) => tracing::debug!("Posts rendered for {}", account),
                Ok(false) => tracing::warn!(
                    "No posts rendered for {} after {:?}, proceeding anyway",
                    account,
                    self.config.page_load_timeout()
                ),
                Err(e) => return CrawlOutcome::Failed(e.to_string()),
            }

            self.discover(&page, account).await
        };

        if discovery.identifiers.is_empty() {
            return match discovery.error {
                Some(reason) => CrawlOutcome::Failed(reason),
                None => {
                    tracing::info!("{} has no new posts", account);
                    CrawlOutcome::NoNewPosts
                }
            };
        }

        if let Some(reason) = &discovery.error {
            tracing::warn!(
                "Discovery for {} stopped early ({}); keeping {} post(s)",
                account,
                reason,
                discovery.identifiers.len()
            );
        }

        let entries = self.resolve_all(discovery.identifiers).await;
        CrawlOutcome::Success(entries)
    }

    /// Polls for rendered posts until the page-load timeout
    ///
    /// Only a fatal gate error is returned; other probe failures are retried until the deadline.
    async fn wait_for_content(&self, page: &PageLease) -> Result<bool, GateError> {
        let deadline = Instant::now() + self.config.page_load_timeout();

        loop {
            match page.evaluate(CONTENT_PROBE).await {
                Ok(output) => {
                    if payload::extract_result(&output).is_some_and(|v| payload::as_flag(&v)) {
                        return Ok(true);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::debug!("Content probe failed: {}", e),
            }

            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.config.scroll_interval()).await;
        }
    }

    /// Runs the scroll loop
    async fn discover(&self, page: &PageLease, account: &Account) -> Discovery {
        let mut discovery = Discovery::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut idle_passes = 0;
        let mut consecutive_errors = 0;
        let max_attempts = self.config.scroll_max_attempts;

        for attempt in 1..=max_attempts {
            match page.evaluate(&self.discovery_script).await {
                Ok(output) => {
                    consecutive_errors = 0;

                    let urls = payload::extract_result(&output)
                        .map(|v| payload::as_string_list(&v))
                        .unwrap_or_default();

                    let mut fresh = 0;
                    for raw in urls {
                        match PostIdentifier::parse(&raw) {
                            Some(id) if seen.insert(id.id().to_string()) => {
                                discovery.identifiers.push(id);
                                fresh += 1;
                            }
                            Some(_) => {}
                            None => tracing::trace!("Ignoring non-post link {}", raw),
                        }
                    }

                    tracing::debug!(
                        "{} scroll {}/{}: {} new, {} total",
                        account,
                        attempt,
                        max_attempts,
                        fresh,
                        discovery.identifiers.len()
                    );

                    if fresh == 0 {
                        idle_passes += 1;
                        if idle_passes >= self.config.scroll_no_new_threshold {
                            tracing::debug!(
                                "{}: no new posts for {} scrolls, stopping",
                                account,
                                idle_passes
                            );
                            break;
                        }
                    } else {
                        idle_passes = 0;
                    }
                }
                Err(e) => {
                    if let Some(reason) = self.discovery_error(e, &mut consecutive_errors) {
                        discovery.error = Some(reason);
                        break;
                    }
                }
            }

            if attempt == max_attempts {
                break;
            }

            if let Err(e) = page.send_key(SCROLL_KEY).await {
                if let Some(reason) = self.discovery_error(e, &mut consecutive_errors) {
                    discovery.error = Some(reason);
                    break;
                }
            }

            tokio::time::sleep(self.scroll_pause()).await;
        }

        discovery
    }

    /// Counts a discovery failure; returns the stop reason once scrolling must end
    fn discovery_error(&self, error: GateError, consecutive: &mut u32) -> Option<String> {
        if error.is_fatal() {
            return Some(error.to_string());
        }

        *consecutive += 1;
        tracing::warn!(
            "Discovery error {}/{}: {}",
            consecutive,
            self.config.scroll_max_consecutive_errors,
            error
        );

        if *consecutive >= self.config.scroll_max_consecutive_errors {
            Some(format!(
                "discovery failed {} times in a row: {}",
                consecutive, error
            ))
        } else {
            None
        }
    }

    /// Uniform pause in `[interval, 2 * interval]`
    fn scroll_pause(&self) -> Duration {
        let base = self.config.scroll_interval_ms;
        Duration::from_millis(rand::rng().random_range(base..=base.saturating_mul(2)))
    }

    /// Backoff before the next account attempt: `[base, 3 * base] * attempt`
    fn retry_pause(&self, attempt: u32) -> Duration {
        let base = self.config.account_retry_backoff_ms;
        let jittered = rand::rng().random_range(base..=base.saturating_mul(3));
        Duration::from_millis(jittered.saturating_mul(u64::from(attempt)))
    }

    /// Resolves identifiers concurrently, preserving discovery order
    async fn resolve_all(&self, identifiers: Vec<PostIdentifier>) -> Vec<PostEntry> {
        let resolver = &self.resolver;

        stream::iter(identifiers)
            .map(|identifier| async move {
                match resolver.resolve(&identifier).await {
                    Ok(content) => PostEntry::Resolved(content),
                    Err(_) => PostEntry::Unavailable { identifier },
                }
            })
            .buffered(self.config.content_workers.max(1))
            .collect()
            .await
    }
}
