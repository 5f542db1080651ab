use clap::Parser;
use page_fetch_lib::config::{DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "page-fetch")]
#[command(
    version,
    about = "Request URLs using headless Chrome, storing the results",
    long_about = "Page Fetch\n\nReads URLs from stdin, one per line, loads each in headless Chrome and stores every response the page triggers under the output directory, with a .meta file of request and response headers next to each body.",
    after_help = "Usage:\n  page-fetch [options] < urls.txt"
)]
pub struct Cli {
    #[arg(
        short = 'c',
        long,
        default_value_t = DEFAULT_CONCURRENCY,
        help = "Concurrency level"
    )]
    pub concurrency: usize,

    #[arg(
        short = 'i',
        long = "include",
        value_name = "STRING",
        help = "Only save responses whose content type contains this string (can be specified multiple times)"
    )]
    pub includes: Vec<String>,

    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "STRING",
        help = "Do not save responses whose content type contains this string (can be specified multiple times)"
    )]
    pub excludes: Vec<String>,

    #[arg(
        short = 'j',
        long,
        value_name = "STRING",
        help = "JavaScript to run on each page; the result is printed"
    )]
    pub javascript: Option<String>,

    #[arg(
        short = 'o',
        long,
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Output directory name"
    )]
    pub output: String,

    #[arg(short = 'w', long, help = "Overwrite output files when they already exist")]
    pub overwrite: bool,

    #[arg(long, help = "Do not save responses to requests on third-party domains")]
    pub no_third_party: bool,

    #[arg(long, help = "Only save responses to requests on third-party domains")]
    pub third_party: bool,

    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 10,
        help = "Deadline per URL covering navigation, script and response handling (seconds)"
    )]
    pub timeout: u64,

    #[arg(
        long,
        value_name = "PATH",
        help = "Chrome/Chromium executable (defaults to CHROMIUM_PATH, then auto-detection)"
    )]
    pub chrome: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Optional config file (TOML) with defaults for any of these options; CLI flags override config"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
