//! One job, one tab.
//!
//! A job opens a fresh session, subscribes to paused requests, enables
//! interception, navigates and evaluates the configured script. Every paused
//! request becomes a handler task on a [`JoinSet`] owned by the job; the set is
//! drained before the tab is closed, so no handler outlives its session.
//!
//! The whole job shares one deadline. Navigation and script evaluation are
//! abandoned when it passes; handler commands issued after that fail with
//! [`FetchError::DeadlineExceeded`] and are logged.

use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use serde_json::Value;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::config::{Config, MAX_PAGE_TIMEOUT};
use crate::engine::{PageSession, RenderingEngine};
use crate::exchange::{InterceptedExchange, Job};
use crate::intercept::{bounded, Disposition, InterceptionHandler};
use crate::report::Reporter;
use crate::{FetchError, Result};

/// How long closing a tab may take once the job is done.
pub const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Tally of the exchanges handled during one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub exchanges: usize,
    pub saved: usize,
    pub filtered: usize,
    pub no_body: usize,
    pub save_failed: usize,
    pub panicked: usize,
}

impl JobReport {
    fn record(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::Saved(_) => self.saved += 1,
            Disposition::Filtered => self.filtered += 1,
            Disposition::NoBody => self.no_body += 1,
            Disposition::SaveFailed => self.save_failed += 1,
        }
    }
}

#[derive(Debug)]
pub struct JobOutcome {
    pub report: JobReport,
    /// Session, navigation or script failure. Handler failures never land here.
    pub result: Result<()>,
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs `job` to completion against a fresh session from `engine`.
///
/// Failures are logged with the job URL and returned in the outcome; they
/// never propagate to the caller as a panic or an `Err`.
pub async fn run_job<E: RenderingEngine>(
    engine: &E,
    job: &Job,
    config: &Arc<Config>,
    reporter: &Reporter,
) -> JobOutcome {
    let deadline = Instant::now() + config.page_timeout.min(MAX_PAGE_TIMEOUT);
    let mut report = JobReport::default();

    debug!(index = job.index, url = %job.url, "starting job");

    let result = match bounded(deadline, config.page_timeout, engine.open_session()).await {
        Ok(session) => {
            let handler = InterceptionHandler::new(
                &job.url,
                Arc::clone(config),
                reporter.clone(),
                deadline,
            );
            let mut tasks = JoinSet::new();

            let driven = drive(&session, &handler, config, deadline, &mut tasks, &mut report).await;
            print_script(config, reporter, &job.url, driven.as_ref().ok());

            join_handlers(&mut tasks, &mut report).await;
            close(session, &job.url).await;
            driven.map(|_| ())
        }
        Err(err) => {
            print_script(config, reporter, &job.url, None);
            Err(err)
        }
    };

    if let Err(err) = &result {
        error!(url = %job.url, "run error: {err}");
    }

    debug!(index = job.index, url = %job.url, ?report, "job finished");
    JobOutcome { report, result }
}

/// Interception setup, navigation and script evaluation, dispatching paused
/// requests while they run.
async fn drive<S: PageSession>(
    session: &S,
    handler: &InterceptionHandler,
    config: &Config,
    deadline: Instant,
    tasks: &mut JoinSet<Disposition>,
    report: &mut JobReport,
) -> Result<Value> {
    let timeout = config.page_timeout;
    let mut events = bounded(deadline, timeout, session.paused_requests()).await?;
    bounded(deadline, timeout, session.enable_interception()).await?;

    let page = async {
        session.navigate(handler.job_url()).await?;
        session.evaluate(config.script_expression()).await
    };
    tokio::pin!(page);

    let expired = tokio::time::sleep_until(deadline);
    tokio::pin!(expired);

    let result = loop {
        tokio::select! {
            result = &mut page => break result,
            Some(exchange) = events.next() => {
                spawn_handler(tasks, handler, session, exchange, report);
            }
            _ = &mut expired => break Err(FetchError::DeadlineExceeded(timeout)),
        }
    };

    // Requests paused before the page settled still need their release.
    while let Some(Some(exchange)) = events.next().now_or_never() {
        spawn_handler(tasks, handler, session, exchange, report);
    }

    result
}

fn spawn_handler<S: PageSession>(
    tasks: &mut JoinSet<Disposition>,
    handler: &InterceptionHandler,
    session: &S,
    exchange: InterceptedExchange,
    report: &mut JobReport,
) {
    report.exchanges += 1;
    let handler = handler.clone();
    let session = session.clone();
    tasks.spawn(async move { handler.handle(&session, exchange).await });
}

async fn join_handlers(tasks: &mut JoinSet<Disposition>, report: &mut JobReport) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(disposition) => report.record(&disposition),
            Err(err) if err.is_panic() => {
                report.panicked += 1;
                error!("interception handler panicked: {err}");
            }
            Err(err) => debug!("interception handler cancelled: {err}"),
        }
    }
}

/// The script line is printed even when the job failed, with `null`.
fn print_script(config: &Config, reporter: &Reporter, job_url: &str, value: Option<&Value>) {
    if config.script.is_some() {
        reporter.script(job_url, value.unwrap_or(&Value::Null));
    }
}

async fn close<S: PageSession>(session: S, job_url: &str) {
    match tokio::time::timeout(CLOSE_GRACE, session.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => debug!(url = %job_url, "failed to close tab: {err}"),
        Err(_) => debug!(url = %job_url, "closing tab timed out"),
    }
}
