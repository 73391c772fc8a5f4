//! Logging infrastructure for genforge
//!
//! Structured logging via `tracing`; the binary installs a subscriber with
//! [`init_tracing`], library code only emits events and spans.

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if stdout is a terminal and `NO_COLOR` is not set.
#[must_use]
pub fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode enables debug output for
/// genforge crates and records span close events with timings.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("genforge=debug,info")
            } else {
                EnvFilter::try_new("genforge=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_color())
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .compact();

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.with_target(true).with_span_events(FmtSpan::CLOSE))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.with_target(false))
            .try_init()?;
    }

    Ok(())
}

/// Span covering one scheduling layer.
#[must_use]
pub fn layer_span(index: usize, size: usize) -> tracing::Span {
    span!(Level::INFO, "layer", index = index, size = size)
}

/// Span covering the generation of one artifact.
#[must_use]
pub fn artifact_span(path: &str) -> tracing::Span {
    span!(Level::INFO, "artifact", path = %path)
}

/// Span covering one logical executor call.
#[must_use]
pub fn request_span(max_provider_retries: usize) -> tracing::Span {
    span!(
        Level::DEBUG,
        "execute",
        max_provider_retries = max_provider_retries
    )
}
