use tracing_subscriber::EnvFilter;

/// Installs the stderr diagnostics subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `info`, or `debug` when `verbose`.
/// Calling it twice is harmless.
pub fn init(verbose: bool) {
    let default = if verbose {
        "info,page_fetch_lib=debug,page_fetch=debug"
    } else {
        "info,chromiumoxide=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
