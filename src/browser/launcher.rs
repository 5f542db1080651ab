//! Launching the shared Chrome process.
//!
//! One browser is started per run; every job opens its own tab in it.

use std::path::PathBuf;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::page::ChromiumSession;
use crate::config::BrowserSettings;
use crate::engine::RenderingEngine;
use crate::{FetchError, Result};

/// Environment variable consulted when no executable is configured.
pub const CHROMIUM_PATH_ENV: &str = "CHROMIUM_PATH";

/// Flags passed to every launched browser.
pub const DEFAULT_ARGS: &[&str] = &["--ignore-certificate-errors"];

/// Options for launching the browser process.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit Chrome/Chromium binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    pub headless: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
        }
    }
}

impl LaunchOptions {
    /// Builds options from the run settings, falling back to `CHROMIUM_PATH`.
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        let executable = settings.chrome_executable.clone().or_else(|| {
            std::env::var_os(CHROMIUM_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });
        Self {
            executable,
            headless: settings.headless,
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder();
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        for arg in DEFAULT_ARGS {
            builder = builder.arg(*arg);
        }
        builder
            .build()
            .map_err(|e| FetchError::session(format!("Failed to launch browser: {e}")))
    }
}

/// A running Chrome instance acting as the rendering engine.
pub struct ChromiumEngine {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumEngine {
    /// Starts the browser and drives its protocol handler on a background task.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let config = options.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::session(format!("Failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler error: {e}");
                }
            }
            debug!("browser handler finished");
        });

        info!(
            executable = ?options.executable,
            headless = options.headless,
            "browser started"
        );
        Ok(Self { browser, handler })
    }

    /// Closes the browser and waits for the process to exit.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("failed to close browser: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            debug!("failed to wait for browser exit: {e}");
        }
        self.handler.abort();
    }
}

impl RenderingEngine for ChromiumEngine {
    type Session = ChromiumSession;

    async fn open_session(&self) -> Result<ChromiumSession> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(ChromiumSession::new(page))
    }
}
