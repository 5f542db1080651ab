//! Per-exchange handling: decide, persist, release.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::config::Config;
use crate::engine::RequestControl;
use crate::exchange::InterceptedExchange;
use crate::filter::should_save;
use crate::persist::{save_meta, save_response};
use crate::report::Reporter;
use crate::{FetchError, Result};

/// What happened to one exchange before it was released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Body and sidecar written; the path is the body file.
    Saved(PathBuf),
    /// Rejected by the content-type or party filters.
    Filtered,
    /// The browser had no body to hand out.
    NoBody,
    /// Writing the body or its sidecar failed.
    SaveFailed,
}

/// Handles the paused exchanges of one job. Built once per session.
#[derive(Debug, Clone)]
pub struct InterceptionHandler {
    job_url: Arc<str>,
    config: Arc<Config>,
    reporter: Reporter,
    deadline: Instant,
}

impl InterceptionHandler {
    pub fn new(job_url: &str, config: Arc<Config>, reporter: Reporter, deadline: Instant) -> Self {
        Self {
            job_url: Arc::from(job_url),
            config,
            reporter,
            deadline,
        }
    }

    pub fn job_url(&self) -> &str {
        &self.job_url
    }

    /// Processes `exchange` and releases it exactly once, whatever the
    /// outcome.
    pub async fn handle<C: RequestControl>(
        &self,
        control: &C,
        exchange: InterceptedExchange,
    ) -> Disposition {
        let request_id = exchange.request_id.clone();
        let disposition = with_release(
            control,
            &request_id,
            self.deadline,
            self.config.page_timeout,
            self.process(control, &exchange),
        )
        .await;

        if disposition == Disposition::Filtered {
            debug!(url = %exchange.url, "skipped by filters");
        }
        disposition
    }

    async fn process<C: RequestControl>(
        &self,
        control: &C,
        exchange: &InterceptedExchange,
    ) -> Disposition {
        if !should_save(exchange, &self.job_url, &self.config) {
            return Disposition::Filtered;
        }

        let body = match bounded(
            self.deadline,
            self.config.page_timeout,
            control.fetch_body(&exchange.request_id),
        )
        .await
        {
            Ok(body) => body,
            Err(err) => {
                debug!(url = %exchange.url, "no response body: {err}");
                return Disposition::NoBody;
            }
        };

        let path = match save_response(
            &exchange.url,
            &body,
            &self.config.output_dir,
            self.config.overwrite,
        )
        .await
        {
            Ok(path) => path,
            Err(err) => {
                error!("failed to save response data for {}: {err}", exchange.url);
                return Disposition::SaveFailed;
            }
        };

        if let Err(err) = save_meta(&path, &self.job_url, exchange).await {
            error!("failed to save response meta data for {}: {err}", exchange.url);
            return Disposition::SaveFailed;
        }

        self.reporter.exchange(exchange);
        Disposition::Saved(path)
    }
}

/// Runs `work`, then releases `request_id` exactly once.
///
/// The release happens on every path, including a panic inside `work`; the
/// panic is resumed once the request has been let through. A failed release
/// is logged and not retried.
pub async fn with_release<C, F>(
    control: &C,
    request_id: &str,
    deadline: Instant,
    timeout: Duration,
    work: F,
) -> F::Output
where
    C: RequestControl,
    F: Future,
{
    let outcome = AssertUnwindSafe(work).catch_unwind().await;

    if let Err(err) = bounded(deadline, timeout, control.release(request_id)).await {
        error!("continue request err: {err}");
    }

    match outcome {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Bounds an engine command by the job deadline.
///
/// The command is polled at least once, so a command that completes
/// immediately still succeeds after the deadline.
pub async fn bounded<T>(
    deadline: Instant,
    timeout: Duration,
    command: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout_at(deadline, command)
        .await
        .unwrap_or(Err(FetchError::DeadlineExceeded(timeout)))
}
