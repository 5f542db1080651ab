//! Product log lines written to stdout.
//!
//! Diagnostics go through `tracing` to stderr; only the lines below are meant
//! for the operator's pipeline.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::exchange::InterceptedExchange;

/// `<method> <url> <status> <content-type>` for a saved exchange.
pub fn exchange_line(exchange: &InterceptedExchange) -> String {
    format!(
        "{} {} {} {}",
        exchange.method,
        exchange.url,
        exchange.status_code(),
        exchange.content_type()
    )
}

/// `JS (<url>): <value>` for a job's script result.
pub fn script_line(job_url: &str, value: &Value) -> String {
    format!("JS ({}): {}", job_url, display_value(value))
}

/// Strings print bare, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Line writer shared by every worker. Each line is written whole.
#[derive(Clone)]
pub struct Reporter {
    out: SharedWriter,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").finish_non_exhaustive()
    }
}

impl Reporter {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// A reporter writing into memory, plus a handle to read the lines back.
    pub fn capture() -> (Self, CapturedLines) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let reporter = Self::new(CaptureWriter(Arc::clone(&buffer)));
        (reporter, CapturedLines(buffer))
    }

    pub fn exchange(&self, exchange: &InterceptedExchange) {
        self.line(&exchange_line(exchange));
    }

    pub fn script(&self, job_url: &str, value: &Value) {
        self.line(&script_line(job_url, value));
    }

    fn line(&self, line: &str) {
        let mut out = lock(&self.out);
        if let Err(err) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            tracing::debug!("failed to write report line: {err}");
        }
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read side of [`Reporter::capture`].
#[derive(Clone)]
pub struct CapturedLines(Arc<Mutex<Vec<u8>>>);

impl CapturedLines {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&lock(&self.0))
            .lines()
            .map(str::to_string)
            .collect()
    }
}
