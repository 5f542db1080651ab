//! Page Fetch Library
//!
//! Loads URLs in a headless browser and stores every response the page
//! triggers, together with a `.meta` file describing the exchange.
//!
//! # Module Overview
//!
//! - [`dispatcher`] - Worker pool reading URLs from a line stream
//! - [`session`] - One job: tab lifecycle, deadline, handler task set
//! - [`intercept`] - Per-exchange handling with guaranteed release
//! - [`filter`] - Content-type and first/third-party save decisions
//! - [`persist`] - Response bodies and metadata sidecars on disk
//! - [`sanitize`] - URL to output path mapping
//! - [`engine`] - Rendering engine traits
//! - [`browser`] - Chromium implementation of the engine
//! - [`config`] - Run configuration and config file support
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use page_fetch_lib::browser::{ChromiumEngine, LaunchOptions};
//! use page_fetch_lib::{run_pool, Config, Reporter};
//!
//! # async fn example() -> page_fetch_lib::Result<()> {
//! let config = Config::default();
//! let engine = Arc::new(ChromiumEngine::launch(&LaunchOptions::from_settings(&config.browser)).await?);
//! let input = tokio::io::BufReader::new(&b"https://example.com/\n"[..]);
//! let summary = run_pool(engine, input, Arc::new(config), Reporter::stdout()).await;
//! println!("saved {} responses", summary.saved);
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod filter;
pub mod intercept;
pub mod logging;
pub mod persist;
pub mod report;
pub mod sanitize;
pub mod session;

pub use config::{Config, PartyFilter};
pub use dispatcher::{run_pool, PoolSummary};
pub use engine::{PageSession, RenderingEngine, RequestControl};
pub use error::{ErrorCategory, ErrorPayload, FetchError, Result};
pub use exchange::{HeaderEntry, InterceptedExchange, Job};
pub use filter::{is_third_party, should_save};
pub use intercept::{with_release, Disposition, InterceptionHandler};
pub use persist::{save_meta, save_response, MetadataRecord};
pub use report::Reporter;
pub use sanitize::make_filepath;
pub use session::{run_job, JobOutcome, JobReport};
