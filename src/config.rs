use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::{FetchError, Result};

pub const DEFAULT_CONCURRENCY: usize = 2;
pub const DEFAULT_OUTPUT_DIR: &str = "out";
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest accepted per-page deadline (one day).
pub const MAX_PAGE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
/// Expression evaluated on every page when no script is configured.
pub const DEFAULT_SCRIPT: &str = "false";

/// Which requests are saved relative to the job's own site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartyFilter {
    #[default]
    Any,
    FirstPartyOnly,
    ThirdPartyOnly,
}

impl PartyFilter {
    /// Folds the two mutually exclusive flags into one value.
    pub fn from_flags(third_party_only: bool, no_third_party: bool) -> Result<Self> {
        match (third_party_only, no_third_party) {
            (true, true) => Err(FetchError::Config(
                "you cannot specify --third-party *and* --no-third-party".to_string(),
            )),
            (true, false) => Ok(PartyFilter::ThirdPartyOnly),
            (false, true) => Ok(PartyFilter::FirstPartyOnly),
            (false, false) => Ok(PartyFilter::Any),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            headless: true,
        }
    }
}

/// Run configuration. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub concurrency: usize,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub party: PartyFilter,
    pub overwrite: bool,
    pub output_dir: String,
    /// Script evaluated on each page; its result is printed when set.
    pub script: Option<String>,
    pub page_timeout: Duration,
    pub browser: BrowserSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            includes: Vec::new(),
            excludes: Vec::new(),
            party: PartyFilter::Any,
            overwrite: false,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            script: None,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            browser: BrowserSettings::default(),
        }
    }
}

impl Config {
    /// The expression to evaluate on each page.
    pub fn script_expression(&self) -> &str {
        self.script.as_deref().unwrap_or(DEFAULT_SCRIPT)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(FetchError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.page_timeout.is_zero() {
            return Err(FetchError::Config(
                "page timeout must be greater than zero".to_string(),
            ));
        }
        if self.page_timeout > MAX_PAGE_TIMEOUT {
            return Err(FetchError::Config(format!(
                "page timeout must be at most {}s",
                MAX_PAGE_TIMEOUT.as_secs()
            )));
        }
        if self.output_dir.trim().is_empty() {
            return Err(FetchError::Config(
                "output directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads defaults from a TOML file, or built-in defaults without one.
    pub fn load(path: Option<&Path>) -> std::result::Result<Self, ConfigFileError> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let file: ConfigFile = toml::from_str(&text)?;
                file.into_config()
            }
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("cannot read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub third_party: bool,
    #[serde(default)]
    pub no_third_party: bool,
    #[serde(default)]
    pub overwrite: bool,
    pub output: Option<String>,
    pub javascript: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub page_timeout: Option<Duration>,
    pub chrome_executable: Option<PathBuf>,
    pub headless: Option<bool>,
}

impl ConfigFile {
    pub fn into_config(self) -> std::result::Result<Config, ConfigFileError> {
        let defaults = Config::default();
        let party = PartyFilter::from_flags(self.third_party, self.no_third_party)
            .map_err(|e| ConfigFileError::Invalid(e.to_string()))?;

        Ok(Config {
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            includes: self.include,
            excludes: self.exclude,
            party,
            overwrite: self.overwrite,
            output_dir: self.output.unwrap_or(defaults.output_dir),
            script: self.javascript.filter(|js| !js.is_empty()),
            page_timeout: self.page_timeout.unwrap_or(defaults.page_timeout),
            browser: BrowserSettings {
                chrome_executable: self.chrome_executable,
                headless: self.headless.unwrap_or(defaults.browser.headless),
            },
        })
    }
}
