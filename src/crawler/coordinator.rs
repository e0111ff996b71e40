//! Crawler coordinator - run orchestration
//!
//! This module drives one crawl run:
//! - Dispatching accounts to a bounded pool of workers
//! - Enforcing the per-account timeout
//! - Handing every outcome to the output handler in completion order
//! - Stopping dispatch once automation channel recovery is exhausted
//! - Finalizing the artifacts with the run status

use crate::config::Config;
use crate::crawler::gate::GatewayGate;
use crate::crawler::recovery::RecoveryController;
use crate::crawler::scheduler::{ScheduledAccount, Scheduler};
use crate::crawler::worker::AccountWorker;
use crate::gateway::{Gateway, ServiceControl};
use crate::output::{ArtifactPaths, OutputError, OutputHandler, RunSummary};
use crate::resolver::ContentResolver;
use crate::state::{Account, CrawlOutcome};
use crate::storage::RunStatus;
use crate::CrawlHotError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Journal run ID, if the output handler journals
    pub run_id: Option<i64>,

    /// Final status written to the artifacts
    pub status: RunStatus,

    /// Accounts the run was asked to crawl
    pub total_accounts: usize,

    /// Written outcomes in completion order
    pub outcomes: Vec<(Account, CrawlOutcome)>,

    /// Automation service restarts performed
    pub restarts: u32,

    /// Where the artifacts were written
    pub paths: ArtifactPaths,
}

impl RunReport {
    /// Totals and per-account lines for display
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::from_outcomes(
            self.total_accounts,
            self.outcomes.iter().map(|(account, outcome)| (account, outcome)),
        );
        summary.run_id = self.run_id;
        summary.status = self.status.to_db_string().to_string();
        summary.restarts = self.restarts;
        summary
    }

    /// Fails when the run was halted by recovery exhaustion
    pub fn check(&self) -> Result<(), CrawlHotError> {
        match self.status {
            RunStatus::RecoveryExhausted => Err(CrawlHotError::RecoveryExhausted {
                restarts: self.restarts,
            }),
            _ => Ok(()),
        }
    }
}

/// Output handler shared by all workers; the lock is the single writer section
struct Sink {
    handler: Box<dyn OutputHandler>,
    outcomes: Vec<(Account, CrawlOutcome)>,
    error: Option<OutputError>,
}

impl Sink {
    fn record(&mut self, account: Account, outcome: CrawlOutcome) {
        match self.handler.record_outcome(&account, &outcome) {
            Ok(progress) => match &outcome {
                CrawlOutcome::Success(entries) => tracing::info!(
                    "{} {}: {} post(s), {} unavailable",
                    progress,
                    account,
                    entries.len(),
                    outcome.unavailable_count()
                ),
                CrawlOutcome::NoNewPosts => tracing::info!("{} {}: no new posts", progress, account),
                CrawlOutcome::Failed(reason) => {
                    tracing::warn!("{} {}: failed ({})", progress, account, reason)
                }
            },
            Err(e) => {
                tracing::error!("Failed to write outcome for {}: {}", account, e);
                self.error.get_or_insert(e);
            }
        }
        self.outcomes.push((account, outcome));
    }
}

/// Orchestrates a crawl run over a list of accounts
pub struct Orchestrator {
    gate: Arc<GatewayGate>,
    worker: Arc<AccountWorker>,
    worker_count: usize,
    per_account_timeout: Duration,
}

impl Orchestrator {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded configuration
    /// * `gateway` - Automation channel used by every worker
    /// * `service` - Control over the service behind the channel, used for recovery
    /// * `resolver` - Content resolver shared by every worker
    pub fn new(
        config: &Config,
        gateway: Arc<dyn Gateway>,
        service: Arc<dyn ServiceControl>,
        resolver: Arc<ContentResolver>,
    ) -> Self {
        let recovery = RecoveryController::new(service, &config.recovery);
        let gate = Arc::new(GatewayGate::new(gateway, recovery));
        let worker = Arc::new(AccountWorker::new(
            Arc::clone(&gate),
            resolver,
            config.crawler.clone(),
        ));

        Self {
            gate,
            worker,
            worker_count: config.crawler.worker_count,
            per_account_timeout: config.crawler.per_account_timeout(),
        }
    }

    /// Crawls every account and writes each outcome as it completes
    ///
    /// A single account is crawled directly; more go through the worker pool. If channel
    /// recovery is exhausted, accounts not yet started are never dispatched and the run is
    /// finalized with `RunStatus::RecoveryExhausted`.
    ///
    /// # Arguments
    ///
    /// * `accounts` - Accounts in list order
    /// * `output` - Handler receiving outcomes in completion order
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - The run ended, possibly halted; see `RunReport::check`
    /// * `Err(CrawlHotError)` - An outcome could not be written
    pub async fn run(
        &self,
        accounts: Vec<Account>,
        output: Box<dyn OutputHandler>,
    ) -> Result<RunReport, CrawlHotError> {
        let total_accounts = accounts.len();
        let run_id = output.run_id();
        let paths = output.paths();
        let sink = Arc::new(Mutex::new(Sink {
            handler: output,
            outcomes: Vec::with_capacity(total_accounts),
            error: None,
        }));

        tracing::info!(
            "Starting crawl of {} account(s) with {} worker(s)",
            total_accounts,
            self.worker_count.min(total_accounts.max(1))
        );

        if let [account] = accounts.as_slice() {
            crawl_one(
                &self.worker,
                &sink,
                account.clone(),
                self.per_account_timeout,
            )
            .await;
        } else {
            self.run_pool(accounts, &sink).await;
        }

        let status = if self.gate.is_halted() {
            RunStatus::RecoveryExhausted
        } else {
            RunStatus::Completed
        };
        let restarts = self.gate.restarts();

        let mut sink = sink.lock().await;
        if let Err(e) = sink.handler.finalize(status) {
            tracing::error!("Failed to finalize output: {}", e);
            sink.error.get_or_insert(e);
        }
        if let Some(e) = sink.error.take() {
            return Err(e.into());
        }

        tracing::info!(
            "Run finished ({}): {}/{} account(s) written, {} restart(s)",
            status.to_db_string(),
            sink.outcomes.len(),
            total_accounts,
            restarts
        );

        Ok(RunReport {
            run_id,
            status,
            total_accounts,
            outcomes: std::mem::take(&mut sink.outcomes),
            restarts,
            paths,
        })
    }

    async fn run_pool(&self, accounts: Vec<Account>, sink: &Arc<Mutex<Sink>>) {
        let mut scheduler = Scheduler::new(accounts, self.worker_count);
        let mut tasks = JoinSet::new();
        let gate = Arc::clone(&self.gate);

        while let Some(scheduled) = scheduler.next_account(|| gate.is_halted()).await {
            let ScheduledAccount {
                account,
                position,
                _permit: permit,
            } = scheduled;
            tracing::debug!("Dispatching {} (list position {})", account, position + 1);

            let worker = Arc::clone(&self.worker);
            let sink = Arc::clone(sink);
            let limit = self.per_account_timeout;

            tasks.spawn(async move {
                crawl_one(&worker, &sink, account, limit).await;
                drop(permit);
            });
        }

        if self.gate.is_halted() && !scheduler.is_empty() {
            tracing::error!(
                "Recovery exhausted; {} account(s) will not be dispatched",
                scheduler.pending()
            );
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Account task ended abnormally: {}", e);
            }
        }
    }
}

/// Crawls one account under the per-account timeout and records its outcome
async fn crawl_one(worker: &AccountWorker, sink: &Mutex<Sink>, account: Account, limit: Duration) {
    let outcome = match tokio::time::timeout(limit, worker.crawl(&account)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!("{} timed out after {}s", account, limit.as_secs());
            CrawlOutcome::Failed(format!("timeout after {}s", limit.as_secs()))
        }
    };

    sink.lock().await.record(account, outcome);
}
