//! End-to-end crawl runs

use crate::support::{
    accounts_in_list, create_test_config, distinct, foreign_authors, mount_fallback,
    mount_primary, post_url, urls_in_list, CountingService, ScriptedGateway,
};
use chrono::{DateTime, FixedOffset};
use crawl_hot::config::Config;
use crawl_hot::output::{export_run, OutputHandler, ResultWriter};
use crawl_hot::resolver::ContentResolver;
use crawl_hot::state::{ContentSource, PostEntry};
use crawl_hot::storage::{open_storage, RunStatus, Storage};
use crawl_hot::{Account, CrawlHotError, CrawlOutcome, Orchestrator, PostIdentifier, RunReport};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn started_at() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-10-18T07:30:00+08:00").unwrap()
}

fn accounts(names: &[&str]) -> Vec<Account> {
    names.iter().map(|n| Account::parse(n).unwrap()).collect()
}

/// Runs a crawl with a journaled writer in `dir`
async fn run_crawl(
    config: &Config,
    gateway: Arc<ScriptedGateway>,
    service: Arc<CountingService>,
    names: &[&str],
    dir: &Path,
) -> RunReport {
    let storage = open_storage(&dir.join("journal.db")).unwrap();
    let writer = ResultWriter::create(dir, started_at(), names.len())
        .unwrap()
        .with_journal(Box::new(storage), "test-hash")
        .unwrap();
    let resolver = Arc::new(ContentResolver::new(&config.resolver).unwrap());

    let orchestrator = Orchestrator::new(config, gateway, service, resolver);
    orchestrator
        .run(accounts(names), Box::new(writer))
        .await
        .unwrap()
}

fn outcome_of<'a>(report: &'a RunReport, name: &str) -> &'a CrawlOutcome {
    &report
        .outcomes
        .iter()
        .find(|(account, _)| account.handle() == name)
        .unwrap()
        .1
}

#[tokio::test]
async fn test_scenario_success_no_new_posts_and_recovered_fallback() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_primary(&primary, "alpha", 101, "alpha one").await;
    mount_primary(&primary, "alpha", 102, "alpha two").await;
    // No primary answer for gamma's post; the fallback has it
    mount_fallback(&fallback, "gamma", 301, "gamma via fallback").await;

    let gateway = Arc::new(
        ScriptedGateway::new()
            .with_page("alpha", vec![vec![post_url("alpha", 101)], vec![post_url("alpha", 102)]])
            .with_page("beta", vec![])
            .with_page("gamma", vec![vec![post_url("gamma", 301)]])
            .with_tab_lost("gamma", 1),
    );
    let service = Arc::new(CountingService::default());
    let config = create_test_config(&primary.uri(), &fallback.uri(), 1);

    let report = run_crawl(
        &config,
        gateway.clone(),
        service.clone(),
        &["alpha", "beta", "gamma"],
        dir.path(),
    )
    .await;

    assert!(report.check().is_ok());
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.outcomes.len(), 3);

    // A: two posts via primary, in discovery order
    match outcome_of(&report, "alpha") {
        CrawlOutcome::Success(entries) => {
            let ids: Vec<&str> = entries.iter().map(|e| e.identifier().id()).collect();
            assert_eq!(ids, vec!["101", "102"]);
            for entry in entries {
                match entry {
                    PostEntry::Resolved(content) => {
                        assert_eq!(content.source, ContentSource::Primary)
                    }
                    other => panic!("expected resolved post, got {:?}", other),
                }
            }
        }
        other => panic!("expected success for alpha, got {:?}", other),
    }

    // B: nothing to report is not a failure
    assert_eq!(outcome_of(&report, "beta"), &CrawlOutcome::NoNewPosts);

    // C: tab lost once, recovered, resolved through the fallback
    match outcome_of(&report, "gamma") {
        CrawlOutcome::Success(entries) => {
            assert_eq!(entries.len(), 1);
            match &entries[0] {
                PostEntry::Resolved(content) => {
                    assert_eq!(content.source, ContentSource::Fallback);
                    assert_eq!(content.text, "gamma via fallback");
                }
                other => panic!("expected resolved post, got {:?}", other),
            }
        }
        other => panic!("expected success for gamma, got {:?}", other),
    }

    // Exactly one restart cycle, and only the failed navigation was replayed
    assert_eq!(report.restarts, 1);
    assert_eq!(service.stops(), 1);
    assert_eq!(service.starts(), 1);
    assert_eq!(gateway.navigations(), vec!["alpha", "beta", "gamma", "gamma"]);

    // Artifacts follow completion order with progress tags
    let txt = fs::read_to_string(&report.paths.reference_list).unwrap();
    assert_eq!(accounts_in_list(&txt), vec!["alpha", "beta", "gamma"]);
    assert!(txt.contains("# @alpha (2 posts) - [1/3]"));
    assert!(txt.contains("# @beta (no new posts) - [2/3]"));
    assert!(txt.contains("# @gamma (1 posts) - [3/3]"));
    assert!(txt.contains("# Total posts: 3"));

    let md = fs::read_to_string(&report.paths.document).unwrap();
    assert!(md.contains("> alpha one"));
    assert!(md.contains("- **Source**: fallback"));
    assert!(md.contains("## Totals"));

    // Journal holds the same three outcomes
    let storage = open_storage(&dir.path().join("journal.db")).unwrap();
    let run = storage.get_run(report.run_id.unwrap()).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(storage.count_outcomes(run.id).unwrap(), 3);
}

#[tokio::test]
async fn test_primary_timeouts_fall_back_to_secondary() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/delta/status/401"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_millis(500)),
        )
        .expect(5)
        .mount(&primary)
        .await;
    mount_fallback(&fallback, "delta", 401, "served by fallback").await;

    let config = create_test_config(&primary.uri(), &fallback.uri(), 1);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let resolver = ContentResolver::with_client(client, &config.resolver);

    let identifier = PostIdentifier::parse(&post_url("delta", 401)).unwrap();
    let content = resolver.resolve(&identifier).await.unwrap();

    assert_eq!(content.source, ContentSource::Fallback);
    assert_eq!(content.text, "served by fallback");
}

#[tokio::test]
async fn test_unresolvable_post_becomes_placeholder() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_primary(&primary, "eps", 501, "kept").await;
    // Post 502 is unknown to both APIs

    let gateway = Arc::new(
        ScriptedGateway::new()
            .with_page("eps", vec![vec![post_url("eps", 501), post_url("eps", 502)]]),
    );
    let service = Arc::new(CountingService::default());
    let config = create_test_config(&primary.uri(), &fallback.uri(), 1);

    let report = run_crawl(&config, gateway, service, &["eps"], dir.path()).await;

    let outcome = outcome_of(&report, "eps");
    assert!(outcome.is_success());
    assert_eq!(outcome.post_count(), 2);
    assert_eq!(outcome.unavailable_count(), 1);
    assert_eq!(
        outcome.entries()[1],
        PostEntry::Unavailable {
            identifier: PostIdentifier::parse(&post_url("eps", 502)).unwrap()
        }
    );

    let txt = fs::read_to_string(&report.paths.reference_list).unwrap();
    assert_eq!(
        urls_in_list(&txt),
        vec![post_url("eps", 501), post_url("eps", 502)]
    );
    assert!(txt.contains("https://x.com/eps/status/502  # content unavailable"));
    let md = fs::read_to_string(&report.paths.document).unwrap();
    assert!(md.contains("> content unavailable"));
    assert!(md.contains("- URL: https://x.com/eps/status/502"));
}

#[tokio::test]
async fn test_recovery_exhaustion_halts_dispatch() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_primary(&primary, "first", 601, "done before the outage").await;

    let gateway = Arc::new(
        ScriptedGateway::new()
            .with_page("first", vec![vec![post_url("first", 601)]])
            .with_page("broken", vec![vec![post_url("broken", 602)]])
            .with_page("third", vec![vec![post_url("third", 603)]])
            .with_page("fourth", vec![])
            .with_tab_lost("broken", usize::MAX),
    );
    let service = Arc::new(CountingService::default());
    let config = create_test_config(&primary.uri(), &fallback.uri(), 1);

    let report = run_crawl(
        &config,
        gateway.clone(),
        service.clone(),
        &["first", "broken", "third", "fourth"],
        dir.path(),
    )
    .await;

    assert_eq!(report.status, RunStatus::RecoveryExhausted);
    assert!(matches!(
        report.check(),
        Err(CrawlHotError::RecoveryExhausted { restarts: 2 })
    ));
    assert_eq!(service.starts(), 2);

    // Completed work is kept; the account that hit the outage is reported as failed
    assert!(outcome_of(&report, "first").is_success());
    assert!(outcome_of(&report, "broken").failure_reason().is_some());

    // Accounts never started are absent everywhere
    let written: Vec<&str> = report.outcomes.iter().map(|(a, _)| a.handle()).collect();
    assert_eq!(written, vec!["first", "broken"]);
    assert!(!gateway.navigations().iter().any(|n| n == "third" || n == "fourth"));

    let txt = fs::read_to_string(&report.paths.reference_list).unwrap();
    assert_eq!(accounts_in_list(&txt), vec!["first", "broken"]);
    assert!(txt.contains("# Status: recovery_exhausted"));

    let storage = open_storage(&dir.path().join("journal.db")).unwrap();
    let run = storage.get_run(report.run_id.unwrap()).unwrap();
    assert_eq!(run.status, RunStatus::RecoveryExhausted);
    assert_eq!(storage.count_outcomes(run.id).unwrap(), 2);
}

#[tokio::test]
async fn test_concurrent_workers_never_overlap_on_the_channel() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let names = ["a1", "a2", "a3", "a4", "a5", "a6"];
    let mut gateway = ScriptedGateway::new();
    for (i, name) in names.iter().enumerate() {
        let id = 700 + i as u64;
        mount_primary(&primary, name, id, "post").await;
        gateway = gateway.with_page(name, vec![vec![post_url(name, id)]]);
    }
    let gateway = Arc::new(gateway.with_tab_lost("a3", 1));
    let service = Arc::new(CountingService::default());
    let config = create_test_config(&primary.uri(), &fallback.uri(), 3);

    let report = run_crawl(&config, gateway.clone(), service, &names, dir.path()).await;

    assert_eq!(gateway.max_in_flight(), 1);
    assert_eq!(report.status, RunStatus::Completed);

    // Exactly one outcome per account, no duplicates anywhere
    let written: Vec<String> = report
        .outcomes
        .iter()
        .map(|(a, _)| a.handle().to_string())
        .collect();
    assert_eq!(written.len(), names.len());
    assert_eq!(distinct(&written), names.len());

    let txt = fs::read_to_string(&report.paths.reference_list).unwrap();
    let listed = accounts_in_list(&txt);
    assert_eq!(listed, written);
    for (index, name) in listed.iter().enumerate() {
        assert!(txt.contains(&format!("# @{} ", name)));
        assert!(txt.contains(&format!("[{}/{}]", index + 1, names.len())));
    }

    // Every account gets exactly its own post
    for (account, outcome) in &report.outcomes {
        assert!(
            foreign_authors(account.handle(), outcome).is_empty(),
            "{} was credited with {:?}",
            account,
            foreign_authors(account.handle(), outcome)
        );
        assert_eq!(outcome.post_count(), 1, "{}", account);
    }
}

#[tokio::test]
async fn test_concurrent_scrolling_keeps_each_timeline_separate() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let batches = |name: &str, base: u64| -> Vec<Vec<String>> {
        (0..4)
            .map(|batch| {
                vec![
                    post_url(name, base + batch * 2),
                    post_url(name, base + batch * 2 + 1),
                ]
            })
            .collect()
    };
    for (name, base) in [("north", 1000u64), ("south", 2000u64)] {
        for id in base..base + 8 {
            mount_primary(&primary, name, id, "timeline post").await;
        }
    }

    let gateway = Arc::new(
        ScriptedGateway::new()
            .with_page("north", batches("north", 1000))
            .with_page("south", batches("south", 2000)),
    );
    let service = Arc::new(CountingService::default());
    let config = create_test_config(&primary.uri(), &fallback.uri(), 2);

    let report = run_crawl(
        &config,
        gateway.clone(),
        service,
        &["north", "south"],
        dir.path(),
    )
    .await;

    assert_eq!(gateway.max_in_flight(), 1);
    for (name, base) in [("north", 1000u64), ("south", 2000u64)] {
        let outcome = outcome_of(&report, name);
        assert!(foreign_authors(name, outcome).is_empty(), "{:?}", outcome);

        let ids: Vec<String> = outcome
            .entries()
            .iter()
            .map(|e| e.identifier().id().to_string())
            .collect();
        let expected: Vec<String> = (base..base + 8).map(|id| id.to_string()).collect();
        assert_eq!(ids, expected);
    }

    let txt = fs::read_to_string(&report.paths.reference_list).unwrap();
    let listed = urls_in_list(&txt);
    assert_eq!(listed.len(), 16);
    assert_eq!(distinct(&listed), 16);
}

#[tokio::test]
async fn test_transient_navigation_error_is_retried() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_primary(&primary, "shaky", 801, "made it").await;

    let gateway = Arc::new(
        ScriptedGateway::new()
            .with_page("shaky", vec![vec![post_url("shaky", 801)]])
            .with_network_error("shaky", 2)
            .with_page("quiet", vec![]),
    );
    let service = Arc::new(CountingService::default());
    let config = create_test_config(&primary.uri(), &fallback.uri(), 1);

    let report = run_crawl(
        &config,
        gateway.clone(),
        service.clone(),
        &["shaky", "quiet"],
        dir.path(),
    )
    .await;

    // Two failed attempts, then success on the third; no service restart involved
    let shaky = outcome_of(&report, "shaky");
    assert!(shaky.is_success());
    assert_eq!(shaky.post_count(), 1);
    assert_eq!(gateway.navigations_to("shaky"), 3);
    assert_eq!(report.restarts, 0);
    assert_eq!(service.stops(), 0);

    // Nothing to report is final
    assert_eq!(outcome_of(&report, "quiet"), &CrawlOutcome::NoNewPosts);
    assert_eq!(gateway.navigations_to("quiet"), 1);
}

#[tokio::test]
async fn test_account_fails_once_retry_budget_is_spent() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let gateway = Arc::new(
        ScriptedGateway::new()
            .with_page("down", vec![vec![post_url("down", 901)]])
            .with_network_error("down", usize::MAX),
    );
    let service = Arc::new(CountingService::default());
    let config = create_test_config(&primary.uri(), &fallback.uri(), 1);

    let report = run_crawl(&config, gateway.clone(), service, &["down"], dir.path()).await;

    let reason = outcome_of(&report, "down").failure_reason().unwrap().to_string();
    assert!(reason.starts_with("navigation failed"), "{}", reason);
    assert_eq!(gateway.navigations_to("down"), 3);
    assert_eq!(report.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_per_account_timeout_fails_only_that_account() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let gateway = Arc::new(
        ScriptedGateway::new()
            .with_page("sleepy", vec![])
            .with_slow_page("sleepy", Duration::from_millis(1500))
            .with_page("quick", vec![]),
    );
    let service = Arc::new(CountingService::default());
    let mut config = create_test_config(&primary.uri(), &fallback.uri(), 1);
    config.crawler.per_account_timeout_secs = 1;

    let report = run_crawl(
        &config,
        gateway.clone(),
        service,
        &["sleepy", "quick"],
        dir.path(),
    )
    .await;

    assert_eq!(
        outcome_of(&report, "sleepy"),
        &CrawlOutcome::Failed("timeout after 1s".to_string())
    );
    // The next account waits for the abandoned navigation, then crawls normally
    assert_eq!(outcome_of(&report, "quick"), &CrawlOutcome::NoNewPosts);
    assert_eq!(gateway.navigations(), vec!["sleepy", "quick"]);
    assert!(report.check().is_ok());
}

#[tokio::test]
async fn test_repeated_urls_are_listed_once() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_primary(&primary, "rep", 801, "one").await;
    mount_primary(&primary, "rep", 802, "two").await;

    // Later scrolls show earlier posts again, through different URL spellings
    let gateway = Arc::new(ScriptedGateway::new().with_page(
        "rep",
        vec![
            vec![post_url("rep", 801)],
            vec![
                "https://twitter.com/rep/status/801".to_string(),
                post_url("rep", 802),
            ],
            vec![format!("{}/photo/1", post_url("rep", 802))],
        ],
    ));
    let service = Arc::new(CountingService::default());
    let config = create_test_config(&primary.uri(), &fallback.uri(), 1);

    let report = run_crawl(&config, gateway, service, &["rep"], dir.path()).await;

    let ids: Vec<&str> = outcome_of(&report, "rep")
        .entries()
        .iter()
        .map(|e| e.identifier().id())
        .collect();
    assert_eq!(ids, vec!["801", "802"]);
}

#[tokio::test]
async fn test_resolving_twice_gives_identical_content() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    mount_primary(&primary, "same", 901, "stable").await;

    let config = create_test_config(&primary.uri(), &fallback.uri(), 1);
    let resolver = ContentResolver::new(&config.resolver).unwrap();
    let identifier = PostIdentifier::parse(&post_url("same", 901)).unwrap();

    let first = resolver.resolve(&identifier).await.unwrap();
    let second = resolver.resolve(&identifier).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_interrupted_run_keeps_only_completed_accounts() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("journal.db");

    let paths = {
        let storage = open_storage(&db).unwrap();
        let mut writer = ResultWriter::create(dir.path(), started_at(), 3)
            .unwrap()
            .with_journal(Box::new(storage), "hash")
            .unwrap();

        writer
            .record_outcome(&Account::parse("one").unwrap(), &CrawlOutcome::NoNewPosts)
            .unwrap();
        writer
            .record_outcome(
                &Account::parse("two").unwrap(),
                &CrawlOutcome::Failed("navigation failed".into()),
            )
            .unwrap();
        writer.paths()
        // Dropped without finalize, as if the process died here
    };

    let storage = open_storage(&db).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Running);
    let records = storage.load_outcomes(run.id).unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.account.handle()).collect();
    assert_eq!(names, vec!["one", "two"]);

    // Regeneration restores both artifacts from the journal
    fs::remove_file(&paths.reference_list).unwrap();
    fs::remove_file(&paths.document).unwrap();
    let (_, exported) = export_run(&storage, None, dir.path()).unwrap();
    assert_eq!(exported, paths);

    let txt = fs::read_to_string(&exported.reference_list).unwrap();
    assert_eq!(accounts_in_list(&txt), vec!["one", "two"]);
    assert!(txt.contains("# Status: running"));
}

#[tokio::test]
async fn test_export_matches_live_output() {
    let primary = MockServer::start().await;
    let fallback = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_primary(&primary, "live", 1001, "first").await;
    mount_fallback(&fallback, "live", 1002, "second").await;

    let gateway = Arc::new(ScriptedGateway::new().with_page(
        "live",
        vec![vec![post_url("live", 1001), post_url("live", 1002)]],
    ));
    let service = Arc::new(CountingService::default());
    let config = create_test_config(&primary.uri(), &fallback.uri(), 1);

    let report = run_crawl(&config, gateway, service, &["live", "idle"], dir.path()).await;
    let live_txt = fs::read_to_string(&report.paths.reference_list).unwrap();
    let live_md = fs::read_to_string(&report.paths.document).unwrap();

    let export_dir = TempDir::new().unwrap();
    let storage = open_storage(&dir.path().join("journal.db")).unwrap();
    let (_, exported) = export_run(&storage, report.run_id, export_dir.path()).unwrap();

    let export_txt = fs::read_to_string(&exported.reference_list).unwrap();
    let export_md = fs::read_to_string(&exported.document).unwrap();

    // Everything but the completion timestamp is identical
    let strip = |text: &str| -> Vec<String> {
        text.lines()
            .filter(|l| !l.contains("Completed at"))
            .map(str::to_string)
            .collect()
    };
    assert_eq!(strip(&live_txt), strip(&export_txt));
    assert_eq!(strip(&live_md), strip(&export_md));
}
