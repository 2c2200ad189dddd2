//! Logging initialization using `tracing` and `tracing-subscriber`.
//!
//! Logs go to stderr so command output on stdout stays parseable.
//! `RUST_LOG` takes precedence over the level picked from CLI flags.

use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

/// Default filter directive for the given flags.
pub fn default_level(debug: bool, quiet: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Initialize the global tracing subscriber. Safe to call multiple times;
/// subsequent calls are no-ops.
pub fn init_logging(format: LogFormat, debug: bool, quiet: bool) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(debug, quiet)));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Human => {
            let _ = builder.finish().try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().try_init();
        }
    }
}
