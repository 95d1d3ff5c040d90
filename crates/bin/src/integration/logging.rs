//! Log subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directives used when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "regstat=info,regstat_data=info,regstat_output=info";

/// Install the global subscriber, writing formatted events to stderr.
///
/// `RUST_LOG` overrides the default filter. `verbose` raises the pipeline
/// crates to `debug`, which includes every dropped sheet row.
pub(crate) fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(DEFAULT_DIRECTIVES.replace("=info", "=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
