use std::path::Path;
use std::time::Duration;

use page_fetch_lib::config::{BrowserSettings, PartyFilter};
use page_fetch_lib::{Config, FetchError};

use crate::cli::Cli;

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct FlagSources {
    pub concurrency: bool,
    pub output: bool,
    pub timeout: bool,
}

impl FlagSources {
    pub fn from_args(args: &[String]) -> Self {
        let args = args.get(1..).unwrap_or_default();
        Self {
            concurrency: flag_present(args, "--concurrency") || short_flag_present(args, 'c'),
            output: flag_present(args, "--output") || short_flag_present(args, 'o'),
            timeout: flag_present(args, "--timeout"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Short flags that take a value; in a cluster, everything after one of them
/// is that value.
const SHORT_VALUE_FLAGS: &[char] = &['c', 'i', 'e', 'j', 'o'];

/// Checks for a short flag, alone (`-c 4`), with its value attached (`-c4`),
/// or inside a cluster of short flags (`-wc4`).
pub fn short_flag_present(args: &[String], flag: char) -> bool {
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        if arg == "--" {
            return false;
        }
        let Some(cluster) = arg.strip_prefix('-').filter(|rest| !rest.starts_with('-')) else {
            continue;
        };
        for (at, c) in cluster.char_indices() {
            if c == flag {
                return true;
            }
            if SHORT_VALUE_FLAGS.contains(&c) {
                // `-o` alone takes the next argument as its value.
                if at + c.len_utf8() == cluster.len() {
                    args.next();
                }
                break;
            }
        }
    }
    false
}

/// Merge CLI arguments with the config file, preferring CLI when flags are present.
///
/// The party flags are checked first, so a conflicting pair is reported
/// even when the config file is fine.
pub fn resolve_settings(
    cli: &Cli,
    config: Config,
    flags: &FlagSources,
) -> Result<Config, FetchError> {
    let party = if cli.third_party || cli.no_third_party {
        PartyFilter::from_flags(cli.third_party, cli.no_third_party)?
    } else {
        config.party
    };

    let resolved = Config {
        concurrency: if flags.concurrency {
            cli.concurrency
        } else {
            config.concurrency
        },
        includes: if cli.includes.is_empty() {
            config.includes
        } else {
            cli.includes.clone()
        },
        excludes: if cli.excludes.is_empty() {
            config.excludes
        } else {
            cli.excludes.clone()
        },
        party,
        overwrite: cli.overwrite || config.overwrite,
        output_dir: if flags.output {
            cli.output.clone()
        } else {
            config.output_dir
        },
        script: match cli.javascript.as_deref() {
            Some("") => None,
            Some(js) => Some(js.to_string()),
            None => config.script,
        },
        page_timeout: if flags.timeout {
            Duration::from_secs(cli.timeout)
        } else {
            config.page_timeout
        },
        browser: BrowserSettings {
            chrome_executable: cli.chrome.clone().or(config.browser.chrome_executable),
            headless: config.browser.headless,
        },
    };

    resolved.validate()?;
    Ok(resolved)
}

/// Load config from a TOML file, or return defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, FetchError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string());
        FetchError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        FetchError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format effective config as a single-line string.
pub fn format_effective_config(config: &Config, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let party = match config.party {
        PartyFilter::Any => "any",
        PartyFilter::FirstPartyOnly => "first-party",
        PartyFilter::ThirdPartyOnly => "third-party",
    };
    format!(
        "Effective config [{source}]: concurrency={}, output={}, overwrite={}, include={:?}, exclude={:?}, party={}, timeout={}s, script={}, chrome={}",
        config.concurrency,
        config.output_dir,
        config.overwrite,
        config.includes,
        config.excludes,
        party,
        config.page_timeout.as_secs(),
        config.script.is_some(),
        config
            .browser
            .chrome_executable
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "auto".to_string()),
    )
}
