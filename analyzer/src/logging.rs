//! Logging macros for the analyzer with verbosity level control.
//!
//! Messages are forwarded to `tracing`, so the host decides where they go by
//! installing a subscriber. The verbosity gate is checked first, which keeps
//! the macros free when disabled (verbosity=0).
//! - 0: SILENT (warnings only, through `tracing::warn!`)
//! - 1: CHANGES (phase summaries: records accepted, edges inferred, path chosen)
//! - 2: CHECKS (per-record decisions: skips, promotions, rule matches)
//! - 3: DEBUG (full algorithm internals)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// `tracing` target of every gated message, for subscriber filtering.
pub const TARGET: &str = "pipeline_analyzer";

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: phase summaries and final results of each engine.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            ::tracing::info!(target: $crate::logging::TARGET, $($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: record skips, root promotions, edge decisions.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!(target: $crate::logging::TARGET, $($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: DP tables, sweep events, traversal steps.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!(target: $crate::logging::TARGET, $($arg)*);
        }
    };
}
