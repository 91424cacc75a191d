//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when neither `RUST_LOG` nor the configuration names one.
pub const DEFAULT_LOG_FILTER: &str = "info,practices_renderer=debug,practices_rhi=info";

/// Initialize tracing with the default filter.
///
/// `RUST_LOG` takes precedence when set.
///
/// # Example
/// ```
/// practices_core::init_logging();
/// tracing::info!("Renderer initialized");
/// ```
pub fn init_logging() {
    init_logging_with(None);
}

/// Initialize tracing, falling back to `fallback` (or [`DEFAULT_LOG_FILTER`])
/// when `RUST_LOG` is unset or invalid.
///
/// Calling this twice is harmless; the second registration is ignored.
pub fn init_logging_with(fallback: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.unwrap_or(DEFAULT_LOG_FILTER)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}
