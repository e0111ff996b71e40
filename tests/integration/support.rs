//! Shared fakes and fixtures for the integration tests

use async_trait::async_trait;
use crawl_hot::config::Config;
use crawl_hot::crawler::scripts::CONTENT_PROBE;
use crawl_hot::CrawlOutcome;
use crawl_hot::gateway::{
    ChannelFault, FaultKind, Gateway, GatewayOp, ServiceControl, ServiceError,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Page state of the fake browser
#[derive(Default)]
struct Page {
    account: Option<String>,
    scrolls: usize,
}

/// In-memory automation channel driven by per-account scroll batches
///
/// Each account page reveals one more batch of post URLs per `PageDown`, and discovery returns
/// everything revealed so far, the way an infinite-scroll timeline does.
#[derive(Default)]
pub struct ScriptedGateway {
    batches: HashMap<String, Vec<Vec<String>>>,
    tab_lost: Mutex<HashMap<String, usize>>,
    network_errors: Mutex<HashMap<String, usize>>,
    slow: HashMap<String, Duration>,
    page: Mutex<Page>,
    navigations: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account page revealing `batches` one scroll at a time
    pub fn with_page(mut self, account: &str, batches: Vec<Vec<String>>) -> Self {
        self.batches.insert(account.to_string(), batches);
        self
    }

    /// The next `times` navigations to `account` lose the tab
    pub fn with_tab_lost(self, account: &str, times: usize) -> Self {
        self.tab_lost
            .lock()
            .unwrap()
            .insert(account.to_string(), times);
        self
    }

    /// The next `times` navigations to `account` fail with a network error
    pub fn with_network_error(self, account: &str, times: usize) -> Self {
        self.network_errors
            .lock()
            .unwrap()
            .insert(account.to_string(), times);
        self
    }

    /// Navigation to `account` takes `delay`
    pub fn with_slow_page(mut self, account: &str, delay: Duration) -> Self {
        self.slow.insert(account.to_string(), delay);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Navigations to `account` so far
    pub fn navigations_to(&self, account: &str) -> usize {
        self.navigations
            .lock()
            .unwrap()
            .iter()
            .filter(|n| *n == account)
            .count()
    }

    fn take_fault(faults: &Mutex<HashMap<String, usize>>, account: &str) -> bool {
        let mut faults = faults.lock().unwrap();
        match faults.get_mut(account) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn revealed(&self) -> Vec<String> {
        let page = self.page.lock().unwrap();
        let Some(account) = page.account.as_ref() else {
            return vec![];
        };
        self.batches
            .get(account)
            .map(|batches| {
                batches
                    .iter()
                    .take(page.scrolls + 1)
                    .flatten()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn navigate(&self, url: &str) -> Result<String, ChannelFault> {
        self.enter();
        let account = url.rsplit('/').next().unwrap_or_default().to_string();
        self.navigations.lock().unwrap().push(account.clone());

        if let Some(delay) = self.slow.get(&account) {
            tokio::time::sleep(*delay).await;
        } else {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        if Self::take_fault(&self.tab_lost, &account) {
            self.leave();
            return Err(ChannelFault::new(
                FaultKind::TabLost,
                GatewayOp::Navigate(url.to_string()),
                "tab not found",
            ));
        }
        if Self::take_fault(&self.network_errors, &account) {
            self.leave();
            return Err(ChannelFault::new(
                FaultKind::NetworkError,
                GatewayOp::Navigate(url.to_string()),
                "net::ERR_CONNECTION_RESET",
            ));
        }

        *self.page.lock().unwrap() = Page {
            account: Some(account),
            scrolls: 0,
        };
        self.leave();
        Ok(json!({"ok": true, "targetId": "T1"}).to_string())
    }

    async fn evaluate(&self, script: &str) -> Result<String, ChannelFault> {
        self.enter();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let output = if script == CONTENT_PROBE {
            json!({"ok": true, "result": true})
        } else {
            json!({"ok": true, "result": self.revealed()})
        };

        self.leave();
        Ok(format!("evaluating...\n{}", output))
    }

    async fn send_key(&self, _key: &str) -> Result<String, ChannelFault> {
        self.enter();
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.page.lock().unwrap().scrolls += 1;
        self.leave();
        Ok(String::new())
    }
}

/// Service control that always succeeds and counts calls
#[derive(Default)]
pub struct CountingService {
    stops: AtomicU32,
    starts: AtomicU32,
}

impl CountingService {
    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceControl for CountingService {
    async fn stop(&self) -> Result<(), ServiceError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Status URL of a post
pub fn post_url(account: &str, id: u64) -> String {
    format!("https://x.com/{}/status/{}", account, id)
}

/// Creates a fast test configuration pointing both APIs at mock servers
pub fn create_test_config(primary: &str, fallback: &str, workers: usize) -> Config {
    let mut config = Config::default();

    config.crawler.worker_count = workers;
    config.crawler.scroll_max_attempts = 6;
    config.crawler.scroll_no_new_threshold = 2;
    config.crawler.scroll_interval_ms = 1; // Very short for testing
    config.crawler.page_load_timeout_secs = 1;
    config.crawler.per_account_timeout_secs = 10;
    config.crawler.content_workers = 4;
    config.crawler.account_retry_budget = 3;
    config.crawler.account_retry_backoff_ms = 1;

    config.recovery.restart_budget = 2;
    config.recovery.settle_secs = 0;
    config.recovery.stop_start_gap_secs = 0;

    config.resolver.primary_base_url = primary.to_string();
    config.resolver.fallback_base_url = fallback.to_string();
    config.resolver.retry_budget = 5;
    config.resolver.backoff_min_ms = 1;
    config.resolver.backoff_max_ms = 2;
    config.resolver.request_timeout_secs = 5;

    config
}

/// Serves a post from the primary API
pub async fn mount_primary(server: &MockServer, account: &str, id: u64, text: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/status/{}", account, id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "tweet": {
                "text": text,
                "created_at": "Sat Oct 17 10:00:00 +0000 2026",
                "author": {"name": account.to_uppercase(), "screen_name": account},
                "media": {"all": [{"url": format!("https://pbs.example/{}.jpg", id)}]},
                "likes": 10,
                "retweets": 2,
                "replies": 1,
                "views": 1500
            }
        })))
        .mount(server)
        .await;
}

/// Serves a post from the fallback API
pub async fn mount_fallback(server: &MockServer, account: &str, id: u64, text: &str) {
    Mock::given(method("GET"))
        .and(path("/tweet-result"))
        .and(query_param("id", id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": text,
            "created_at": "2026-10-17T10:00:00.000Z",
            "user": {"name": account.to_uppercase(), "screen_name": account},
            "favorite_count": 4,
            "retweet_count": 1
        })))
        .mount(server)
        .await;
}

/// Accounts in a reference list, in file order
pub fn accounts_in_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("# @"))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Post URLs listed in a reference list
pub fn urls_in_list(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.starts_with("https://"))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Handles of posts credited to `account` that belong to someone else
pub fn foreign_authors(account: &str, outcome: &CrawlOutcome) -> Vec<String> {
    outcome
        .entries()
        .iter()
        .filter_map(|entry| entry.identifier().author())
        .filter(|author| !author.eq_ignore_ascii_case(account))
        .map(str::to_string)
        .collect()
}

/// Distinct items, for duplicate checks
pub fn distinct<T: std::hash::Hash + Eq + Clone>(items: &[T]) -> usize {
    items.iter().cloned().collect::<HashSet<_>>().len()
}
