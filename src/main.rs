mod cli;
mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use page_fetch_lib::browser::{ChromiumEngine, LaunchOptions};
use page_fetch_lib::{logging, run_pool, FetchError, Reporter};
use tokio::io::BufReader;
use tracing::{debug, info};

use settings::{format_effective_config, load_config, resolve_settings, FlagSources};

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    logging::init(args.verbose);

    let flags = FlagSources::from_args(&raw_args);
    let config = match load_config(args.config.as_deref())
        .and_then(|file| resolve_settings(&args, file, &flags))
    {
        Ok(config) => config,
        Err(err) => return render_error(err),
    };

    if args.verbose {
        info!("{}", format_effective_config(&config, args.config.as_deref()));
    }

    let engine = match ChromiumEngine::launch(&LaunchOptions::from_settings(&config.browser)).await
    {
        Ok(engine) => Arc::new(engine),
        Err(err) => return render_error(err),
    };

    let input = BufReader::new(tokio::io::stdin());
    run_pool(Arc::clone(&engine), input, Arc::new(config), Reporter::stdout()).await;

    match Arc::try_unwrap(engine) {
        Ok(engine) => engine.shutdown().await,
        Err(_) => debug!("browser still shared at exit; leaving it to drop"),
    }

    ExitCode::SUCCESS
}

/// Prints a fatal error with its remediation hint and returns the fatal exit code.
fn render_error(err: FetchError) -> ExitCode {
    let payload = err.to_payload();
    eprintln!("error: {}", payload.message);
    if let Some(hint) = payload.remediation {
        eprintln!("hint: {hint}");
    }
    ExitCode::from(2)
}
