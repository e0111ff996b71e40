//! Crawl-Hot main entry point
//!
//! This is the command-line interface for the Crawl-Hot recent-post harvester.

use anyhow::Context;
use clap::Parser;
use crawl_hot::accounts::load_accounts;
use crawl_hot::config::{load_config_with_hash, Config};
use crawl_hot::gateway::{CliGateway, Gateway, ServiceControl};
use crawl_hot::output::{export_run, load_summary, print_summary, ResultWriter};
use crawl_hot::resolver::ContentResolver;
use crawl_hot::storage::open_storage;
use crawl_hot::{Account, CrawlHotError, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Crawl-Hot: harvests the newest posts of a list of accounts
///
/// Crawl-Hot drives a browser automation channel to discover each account's recent posts,
/// resolves their content through a primary API with a fallback, and appends every account's
/// result to disk as soon as it completes.
#[derive(Parser, Debug)]
#[command(name = "crawl-hot")]
#[command(version = "1.0.0")]
#[command(about = "Recent-post harvester for a list of social accounts", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl only this account instead of the account list
    #[arg(long, value_name = "NAME", conflicts_with = "export")]
    account: Option<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "export")]
    dry_run: bool,

    /// Regenerate a run's output files from the journal (latest run by default) and exit
    #[arg(long, value_name = "RUN_ID", num_args = 0..=1, default_missing_value = "latest")]
    export: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// 2 when the automation channel could not be recovered, 1 for everything else
fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<CrawlHotError>() {
        Some(CrawlHotError::RecoveryExhausted { .. }) => 2,
        _ => 1,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("invalid configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(run_id) = &cli.export {
        return handle_export(&config, run_id);
    }

    let accounts = match &cli.account {
        Some(name) => vec![Account::parse(name).map_err(CrawlHotError::from)?],
        None => load_accounts(&config.output.accounts_file)
            .map_err(CrawlHotError::from)
            .with_context(|| {
                format!(
                    "failed to load accounts from {}",
                    config.output.accounts_file.display()
                )
            })?,
    };

    if cli.dry_run {
        handle_dry_run(&config, &accounts);
        return Ok(());
    }

    handle_crawl(config, config_hash, accounts).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_hot=info,warn"),
            1 => EnvFilter::new("crawl_hot=debug,info"),
            2 => EnvFilter::new("crawl_hot=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, accounts: &[Account]) {
    println!("=== Crawl-Hot Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.worker_count);
    println!(
        "  Scroll: up to {} passes, stop after {} without new posts",
        config.crawler.scroll_max_attempts, config.crawler.scroll_no_new_threshold
    );
    println!(
        "  Recency window: {}h",
        config.crawler.recency_window_hours
    );
    println!(
        "  Per-account timeout: {}s",
        config.crawler.per_account_timeout_secs
    );

    println!("\nRecovery:");
    println!("  Restart budget: {}", config.recovery.restart_budget);
    println!("  Settle delay: {}s", config.recovery.settle_secs);

    println!("\nResolver:");
    println!("  Primary: {}", config.resolver.primary_base_url);
    println!("  Fallback: {}", config.resolver.fallback_base_url);
    println!("  Retry budget: {}", config.resolver.retry_budget);

    println!("\nGateway:");
    println!(
        "  Command: {} {}",
        config.gateway.program,
        config.gateway.args.join(" ")
    );

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_dir.display());
    println!("  Journal: {}", config.output.database_path.display());

    println!("\nAccounts ({}):", accounts.len());
    for account in accounts {
        println!("  - {}", account);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} account(s)", accounts.len());
}

/// Handles the --export mode: regenerates a run's artifacts from the journal
fn handle_export(config: &Config, run_id: &str) -> anyhow::Result<()> {
    let run_id = match run_id {
        "latest" => None,
        raw => Some(
            raw.parse::<i64>()
                .map_err(|_| CrawlHotError::RunNotFound(raw.to_string()))?,
        ),
    };

    println!("=== Exporting Crawl Results ===\n");
    println!("Journal: {}", config.output.database_path.display());

    let storage = open_storage(&config.output.database_path)
        .map_err(CrawlHotError::from)
        .context("failed to open journal")?;
    let (run, paths) = export_run(&storage, run_id, &config.output.results_dir)
        .map_err(CrawlHotError::from)?;

    println!("✓ Run {} exported to:", run.id);
    println!("  {}", paths.reference_list.display());
    println!("  {}\n", paths.document.display());

    let summary = load_summary(&storage, &run).map_err(CrawlHotError::from)?;
    print_summary(&summary);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: String,
    accounts: Vec<Account>,
) -> anyhow::Result<()> {
    let started_at = chrono::Local::now().fixed_offset();
    tracing::info!(
        "Run starting: {} account(s), {} worker(s), config hash {}",
        accounts.len(),
        config.crawler.worker_count,
        config_hash
    );

    let storage = open_storage(&config.output.database_path)
        .map_err(CrawlHotError::from)
        .context("failed to open journal")?;
    let writer = ResultWriter::create(&config.output.results_dir, started_at, accounts.len())
        .and_then(|writer| writer.with_journal(Box::new(storage), &config_hash))
        .map_err(CrawlHotError::from)?;

    let resolver = Arc::new(ContentResolver::new(&config.resolver).map_err(CrawlHotError::from)?);
    let channel = Arc::new(CliGateway::new(&config.gateway));
    let gateway: Arc<dyn Gateway> = channel.clone();
    let service: Arc<dyn ServiceControl> = channel;

    let orchestrator = Orchestrator::new(&config, gateway, service, resolver);
    let report = orchestrator.run(accounts, Box::new(writer)).await?;

    println!();
    print_summary(&report.summary());
    println!("\nResults:");
    println!("  {}", report.paths.reference_list.display());
    println!("  {}", report.paths.document.display());

    report.check()?;
    Ok(())
}
