//! Chromium rendering engine over the DevTools protocol.
//!
//! - [`launcher`] - browser process lifecycle, one per run
//! - [`page`] - per-job tabs with response-stage request interception
//!
//! # Example
//!
//! ```no_run
//! use page_fetch_lib::browser::{ChromiumEngine, LaunchOptions};
//!
//! # async fn example() -> page_fetch_lib::Result<()> {
//! let engine = ChromiumEngine::launch(&LaunchOptions::default()).await?;
//! // ... run jobs against `engine`
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod launcher;
mod page;

pub use launcher::{ChromiumEngine, LaunchOptions, CHROMIUM_PATH_ENV, DEFAULT_ARGS};
pub use page::ChromiumSession;
