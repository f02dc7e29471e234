//! Logging with the [`tracing`] crate.
//!
//! One fmt subscriber with an environment-overridable filter. `--verbose`
//! only changes the default; `RUST_LOG` always wins.

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "keywarp=debug,keywarp_input=debug,keywarp_notify=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
