//! Paused network exchanges and the jobs that trigger them.

use serde::{Deserialize, Serialize};

/// Content type reported when the response carries no `Content-Type` header.
pub const UNKNOWN_CONTENT_TYPE: &str = "unknown";

/// A single `name: value` header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A request the browser paused at the response stage.
///
/// Lives until it is released; it is never retried or handed to a second
/// handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedExchange {
    /// Opaque id used to release the request or fetch its body.
    pub request_id: String,
    pub url: String,
    pub method: String,
    /// Request headers; order carries no meaning.
    pub request_headers: Vec<HeaderEntry>,
    pub request_body: Option<String>,
    /// Browser resource type tag (`Document`, `Script`, `Image`, ...).
    pub resource_type: String,
    pub status: Option<i64>,
    /// Response headers in the order the browser reported them.
    pub response_headers: Vec<HeaderEntry>,
}

impl InterceptedExchange {
    /// Lower-cased value of the last `Content-Type` response header, or
    /// [`UNKNOWN_CONTENT_TYPE`].
    pub fn content_type(&self) -> String {
        self.response_headers
            .iter()
            .rev()
            .find(|h| h.name.eq_ignore_ascii_case("content-type"))
            .map(|h| h.value.to_lowercase())
            .unwrap_or_else(|| UNKNOWN_CONTENT_TYPE.to_string())
    }

    /// Status code as printed in log lines; `0` when the browser gave none.
    pub fn status_code(&self) -> i64 {
        self.status.unwrap_or_default()
    }
}

/// One input URL, owned by exactly one session worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// 1-based position in the input stream, for logs.
    pub index: usize,
    pub url: String,
}

impl Job {
    pub fn new(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
        }
    }
}
