use std::env::var;
use std::io::stderr;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber at `info` unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    init_tracing_with_level(LevelFilter::INFO);
}

/// Install the global subscriber with `level` as the default directive.
///
/// Logs go to stderr so that command output on stdout stays machine-readable.
/// `RUST_LOG_FORMAT=json` switches to one JSON object per line.
pub fn init_tracing_with_level(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_format = var("RUST_LOG_FORMAT").unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(stderr)
            .with_filter(env_filter)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_writer(stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    // A second call (tests, embedding) keeps the first subscriber.
    if tracing_subscriber::registry().with(log_layer).try_init().is_err() {
        return;
    }

    if !matches!(log_format.as_str(), "" | "compact" | "json") {
        warn!("Unknown RUST_LOG_FORMAT {log_format:?}, using compact output");
    }
}
