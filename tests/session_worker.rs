mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeEngine, FakeExchange, FakePage};
use page_fetch_lib::{
    run_job, Config, Disposition, FetchError, InterceptionHandler, Job, RenderingEngine, Reporter,
};
use tempfile::TempDir;
use tokio::time::Instant;

fn config_in(dir: &TempDir) -> Config {
    Config {
        output_dir: dir.path().join("out").to_string_lossy().into_owned(),
        ..Config::default()
    }
}

#[tokio::test]
async fn job_report_tallies_dispositions() {
    let dir = TempDir::new().expect("tempdir");
    let config = Arc::new(Config {
        includes: vec!["text/".into()],
        ..config_in(&dir)
    });
    let engine = FakeEngine::new([(
        "https://example.com/",
        FakePage::with(vec![
            FakeExchange::new("https://example.com/", "text/html", b"page"),
            FakeExchange::new("https://example.com/a.css", "text/css", b"").without_body(),
            FakeExchange::new("https://example.com/a.woff2", "font/woff2", b"font"),
        ]),
    )]);

    let outcome = run_job(
        &engine,
        &Job::new(1, "https://example.com/"),
        &config,
        &Reporter::capture().0,
    )
    .await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.report.exchanges, 3);
    assert_eq!(outcome.report.saved, 1);
    assert_eq!(outcome.report.no_body, 1);
    assert_eq!(outcome.report.filtered, 1);
    assert_eq!(outcome.report.panicked, 0);
}

#[tokio::test]
async fn slow_page_fails_with_deadline_and_still_closes_tab() {
    let dir = TempDir::new().expect("tempdir");
    let timeout = Duration::from_millis(200);
    let config = Arc::new(Config {
        page_timeout: timeout,
        ..config_in(&dir)
    });
    let engine = FakeEngine::new([(
        "https://slow.example/",
        FakePage {
            exchanges: vec![FakeExchange::new("https://slow.example/", "text/html", b"x")],
            delay: Duration::from_secs(30),
            ..FakePage::default()
        },
    )]);

    let outcome = run_job(
        &engine,
        &Job::new(1, "https://slow.example/"),
        &config,
        &Reporter::capture().0,
    )
    .await;

    assert!(matches!(outcome.result, Err(FetchError::DeadlineExceeded(d)) if d == timeout));
    assert_eq!(outcome.report.saved, 1);
    assert_eq!(engine.sessions_closed(), 1);
    assert_eq!(engine.releases().values().sum::<usize>(), 1);
}

#[tokio::test]
async fn handler_saves_and_releases() {
    let dir = TempDir::new().expect("tempdir");
    let config = Arc::new(config_in(&dir));
    let engine = FakeEngine::new([(
        "https://example.com/",
        FakePage::with(vec![FakeExchange::new(
            "https://example.com/feed.json",
            "application/json",
            b"[]",
        )]),
    )]);
    let session = engine.open_session().await.expect("session");
    let mut events = {
        use page_fetch_lib::PageSession;
        session.enable_interception().await.expect("enable");
        let events = session.paused_requests().await.expect("subscribe");
        let nav_session = session.clone();
        tokio::spawn(async move { nav_session.navigate("https://example.com/").await });
        events
    };

    let exchange = futures::StreamExt::next(&mut events)
        .await
        .expect("one paused request");
    let (reporter, captured) = Reporter::capture();
    let handler = InterceptionHandler::new(
        "https://example.com/",
        Arc::clone(&config),
        reporter,
        Instant::now() + config.page_timeout,
    );

    let disposition = handler.handle(&session, exchange.clone()).await;

    let Disposition::Saved(path) = disposition else {
        panic!("expected a saved response, got {disposition:?}");
    };
    assert!(path.ends_with("example.com/feed.json"));
    assert_eq!(std::fs::read(&path).expect("body"), b"[]");
    assert_eq!(engine.releases().get(&exchange.request_id), Some(&1));
    assert_eq!(
        captured.lines(),
        vec!["GET https://example.com/feed.json 200 application/json".to_string()]
    );
}

#[tokio::test]
async fn unvalidated_huge_timeout_still_runs_the_job() {
    let dir = TempDir::new().expect("tempdir");
    let config = Arc::new(Config {
        page_timeout: Duration::from_secs(u64::MAX),
        ..config_in(&dir)
    });
    let engine = FakeEngine::new([("https://example.com/", FakePage::default())]);

    let outcome = run_job(
        &engine,
        &Job::new(1, "https://example.com/"),
        &config,
        &Reporter::capture().0,
    )
    .await;

    assert!(outcome.is_ok());
    assert_eq!(engine.sessions_closed(), 1);
}
