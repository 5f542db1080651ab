use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("Body fetch error: {0}")]
    BodyFetch(String),

    #[error("Persistence error ({}): {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Release error (request {request_id}): {message}")]
    Release { request_id: String, message: String },

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl FetchError {
    pub fn session(message: impl Into<String>) -> Self {
        FetchError::Session(message.into())
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Persistence {
            path: path.into(),
            source,
        }
    }

    pub fn release(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Release {
            request_id: request_id.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            FetchError::Config(_) | FetchError::InvalidUrl(_) => ErrorCategory::Config,
            FetchError::Session(_) | FetchError::DeadlineExceeded(_) => ErrorCategory::Session,
            FetchError::BodyFetch(_) => ErrorCategory::BodyFetch,
            FetchError::Persistence { .. } | FetchError::Io(_) => ErrorCategory::Persistence,
            FetchError::Release { .. } => ErrorCategory::Release,
            FetchError::Serialization(_) | FetchError::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        let message = self.to_string();
        match self {
            FetchError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("third-party") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        message,
                        "Pass at most one of --third-party and --no-third-party.",
                    )
                } else if lower.contains("concurrency") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        message,
                        "Use a concurrency level of 1 or more (e.g., -c 4).",
                    )
                } else if lower.contains("config") && lower.contains("read") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        message,
                        "Check the --config path and that the file is valid TOML.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        message,
                        "Check flags/paths; run with --help for usage.",
                    )
                }
            }
            FetchError::InvalidUrl(_) => ErrorPayload::new(
                ErrorCategory::Config,
                message,
                "Verify URL/format (e.g., https://example.com).",
            ),
            FetchError::Session(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("executable") || lower.contains("launch") {
                    ErrorPayload::new(
                        ErrorCategory::Session,
                        message,
                        "Install Chrome/Chromium or point --chrome (or CHROMIUM_PATH) at the binary.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Session,
                        message,
                        "Re-run with --verbose to see the browser protocol errors.",
                    )
                }
            }
            FetchError::DeadlineExceeded(_) => ErrorPayload::new(
                ErrorCategory::Session,
                message,
                "Try increasing --timeout, or check that the page finishes loading.",
            ),
            FetchError::BodyFetch(_) => ErrorPayload::new(
                ErrorCategory::BodyFetch,
                message,
                "The browser discarded the body; redirects and aborted requests have none.",
            ),
            FetchError::Persistence { .. } | FetchError::Io(_) => ErrorPayload::new(
                ErrorCategory::Persistence,
                message,
                "Check the output directory exists and is writable, and that the disk is not full.",
            ),
            FetchError::Release { .. } => ErrorPayload::new(
                ErrorCategory::Release,
                message,
                "The tab was probably closed or timed out; try increasing --timeout.",
            ),
            FetchError::Serialization(_) | FetchError::Unknown(_) => ErrorPayload::new(
                ErrorCategory::Unknown,
                message,
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

impl From<chromiumoxide::error::CdpError> for FetchError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        FetchError::Session(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Config,
    Session,
    BodyFetch,
    Persistence,
    Release,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
