//! Tracing subscriber initialization.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects debug output for the
/// scanflow crates.
pub fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "scanflow=debug,info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
