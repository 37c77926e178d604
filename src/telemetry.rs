//! Logging setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (from `log.filter`)
/// is used. Logs go to stderr so rendered transcripts on stdout stay clean.
/// Calling this twice is harmless.
pub fn init(default_filter: &str) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .compact();

    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if let Err(e) = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
    {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}
