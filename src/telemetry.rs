use std::io::{self, IsTerminal};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// `RUST_LOG` if valid, otherwise [`DEFAULT_FILTER`].
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs the global subscriber: compact single-line events, RFC3339 UTC
/// timestamps, span close timings, ANSI only on a terminal.
///
/// Returns an error if a global subscriber is already set.
pub fn init() -> Result<(), tracing_subscriber::util::TryInitError> {
    let layer = fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_target(true)
        .with_ansi(io::stdout().is_terminal())
        // Span close gives durations for `#[instrument]`ed calls.
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(layer)
        .try_init()
}
