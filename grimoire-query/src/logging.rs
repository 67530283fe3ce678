//! Logging setup driven by environment variables.
//!
//! The library itself only emits `tracing` events: preload steps and ignored
//! lock requests at debug, batch sizes at trace, unrecognized persistence
//! errors at warn. Applications without their own subscriber can install one
//! here (requires the `tracing-subscriber` feature).
//!
//! # Environment Variables
//!
//! - `GRIMOIRE_DEBUG=true|1|yes` - enable debug logging
//! - `GRIMOIRE_LOG_LEVEL=trace|debug|info|warn|error` - explicit level
//! - `GRIMOIRE_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! use grimoire_query::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "GRIMOIRE_DEBUG";
const LEVEL_VAR: &str = "GRIMOIRE_LOG_LEVEL";
const FORMAT_VAR: &str = "GRIMOIRE_LOG_FORMAT";

/// Whether `GRIMOIRE_DEBUG` is set to `true`, `1` or `yes`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Level from `GRIMOIRE_LOG_LEVEL`, falling back to `debug` when debugging
/// and `warn` otherwise.
pub fn log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var(LEVEL_VAR) {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Format from `GRIMOIRE_LOG_FORMAT`, `json` by default.
pub fn log_format() -> &'static str {
    env::var(FORMAT_VAR)
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Install a global subscriber once. Later calls do nothing.
///
/// Nothing is installed unless `GRIMOIRE_DEBUG` or `GRIMOIRE_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = log_level();
            let filter = EnvFilter::try_new(format!("grimoire={level},grimoire_query={level}"))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match log_format() {
                "json" => registry.with(fmt::layer().json()).try_init(),
                "compact" => registry.with(fmt::layer().compact()).try_init(),
                _ => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level, format = log_format(), "grimoire logging initialized");
            }
        }
    });
}

/// Set `GRIMOIRE_LOG_LEVEL` and [`init`].
///
/// # Safety
///
/// Modifies the process environment; call before spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: documented as startup-only, before other threads exist.
    unsafe {
        env::set_var(LEVEL_VAR, level);
    }
    init();
}

/// Set `GRIMOIRE_DEBUG=true` and [`init`].
///
/// # Safety
///
/// Modifies the process environment; call before spawning threads.
pub fn init_debug() {
    // SAFETY: documented as startup-only, before other threads exist.
    unsafe {
        env::set_var(DEBUG_VAR, "true");
    }
    init();
}

/// Debug event emitted only when `GRIMOIRE_DEBUG` is enabled.
#[macro_export]
macro_rules! grimoire_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}
