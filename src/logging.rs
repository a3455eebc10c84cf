//! Tracing setup for the release binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "sumatra_release=info,artifact_names=info";
const VERBOSE_LOG_FILTER: &str = "sumatra_release=debug,artifact_names=debug";

pub struct LogConfig {
    pub verbose: bool,
}

/// Initialize tracing with stderr output. `RUST_LOG` overrides the
/// default filter unless `verbose` is set.
pub fn init_logging(config: LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = if config.verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .try_init()
}
