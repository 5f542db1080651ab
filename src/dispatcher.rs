//! Job dispatcher and worker pool.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info};

use crate::config::Config;
use crate::engine::RenderingEngine;
use crate::exchange::Job;
use crate::report::Reporter;
use crate::session::{run_job, JobOutcome};

/// Totals for one run over the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Exchanges written to disk across all jobs.
    pub saved: usize,
}

impl PoolSummary {
    fn absorb(&mut self, joined: std::result::Result<JobOutcome, JoinError>) {
        self.jobs += 1;
        match joined {
            Ok(outcome) => {
                self.saved += outcome.report.saved;
                if outcome.is_ok() {
                    self.succeeded += 1;
                } else {
                    self.failed += 1;
                }
            }
            Err(err) => {
                self.failed += 1;
                error!("session worker panicked: {err}");
            }
        }
    }
}

/// Reads URLs line by line from `input` and runs each as a job, with at most
/// `config.concurrency` jobs in flight.
///
/// Blank lines are skipped. Lines are read as bytes, so a line that is not
/// valid UTF-8 is decoded lossily instead of ending the input. A failing job never stops the pool; the call
/// returns once the input is exhausted and every started job has finished.
pub async fn run_pool<E, R>(
    engine: Arc<E>,
    mut input: R,
    config: Arc<Config>,
    reporter: Reporter,
) -> PoolSummary
where
    E: RenderingEngine,
    R: AsyncBufRead + Unpin,
{
    let slots = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut workers = JoinSet::new();
    let mut summary = PoolSummary::default();
    let mut buf = Vec::new();
    let mut index = 0;

    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                error!("failed to read input: {err}");
                break;
            }
        }

        // A line that is not UTF-8 becomes a job with a mangled URL, not the end of input.
        let line = String::from_utf8_lossy(&buf);
        let url = line.trim();
        if url.is_empty() {
            continue;
        }
        index += 1;

        // Wait for a free slot before reading further.
        let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
            break;
        };

        let job = Job::new(index, url);
        let engine = Arc::clone(&engine);
        let config = Arc::clone(&config);
        let reporter = reporter.clone();
        workers.spawn(async move {
            let _permit = permit;
            run_job(engine.as_ref(), &job, &config, &reporter).await
        });

        while let Some(joined) = workers.try_join_next() {
            summary.absorb(joined);
        }
    }

    while let Some(joined) = workers.join_next().await {
        summary.absorb(joined);
    }

    info!(
        "jobs: {}, ok: {}, failed: {}, saved: {}",
        summary.jobs, summary.succeeded, summary.failed, summary.saved
    );
    summary
}
