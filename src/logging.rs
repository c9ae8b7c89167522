use std::env;

use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber. Logs go to stderr so stdout only carries
/// the run summary. `RUST_LOG` overrides the default level and
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = env::var("LOG_FORMAT")
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // try_init: a subscriber installed earlier (tests, embedding callers) wins.
    if json {
        let _ = fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
