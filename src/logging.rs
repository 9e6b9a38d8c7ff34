use crate::domain::constants::LOG_FILTER_ENV;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so `--json` output on stdout stays parseable.
/// `FEEDGATE_LOG` takes an `EnvFilter` directive, e.g. `feedgate=debug`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "feedgate=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
