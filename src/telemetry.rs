//! Tracing subscriber initialisation for the `prdeck` binary.
//!
//! Log lines go to stderr so that rendered markdown written to stdout stays
//! clean. `RUST_LOG` takes precedence over the configured default level.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialises the global tracing subscriber.
///
/// When `json` is true, log lines are emitted as newline-delimited JSON.
/// Subsequent calls are ignored because the global subscriber can only be set
/// once per process.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(env_filter);
    let _already_initialised = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tracing::Level;

    use super::init_tracing;

    #[rstest]
    fn repeated_initialisation_is_harmless() {
        init_tracing(false, Level::WARN);
        init_tracing(true, Level::DEBUG);
        tracing::info!("still logging after a second initialisation");
    }
}
