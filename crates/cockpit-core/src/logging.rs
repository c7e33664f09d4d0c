//! Tracing subscriber setup

use crate::config::LogConfig;
use crate::error::{CockpitError, CockpitResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides `config.filter`. Output goes to stderr so command
/// output on stdout stays machine-readable.
///
/// # Errors
/// - `CockpitError::Logging` if the filter is invalid or a subscriber is
///   already installed
pub fn init(config: &LogConfig) -> CockpitResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| CockpitError::Logging(format!("invalid filter '{}': {e}", config.filter)))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    installed.map_err(|e| CockpitError::Logging(e.to_string()))
}
