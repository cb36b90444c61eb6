//! Logging macros for the scheduling pipeline with verbosity level control.
//!
//! Nothing is emitted when verbosity is 0. Levels:
//! - 0: SILENT (only data-quality warnings)
//! - 1: CHANGES (edges added, dates assigned)
//! - 2: CHECKS (skipped references, rule decisions)
//! - 3: DEBUG (full pass internals)
//!
//! Events go through `tracing`, so the host application picks the subscriber.

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: derived edges, scheduled dates, roll-ups.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            ::tracing::info!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: ignored references, grouping decisions.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: topological order, per-task pass values.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering() {
        assert!(VERBOSITY_SILENT < VERBOSITY_CHANGES);
        assert!(VERBOSITY_CHANGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_log_macros_expand_at_every_level() {
        for verbosity in [VERBOSITY_SILENT, VERBOSITY_DEBUG] {
            log_changes!(verbosity, "edge {} -> {}", "1.1.1.2", "1.1.1.1");
            log_checks!(verbosity, "skipped {}", "9.9");
            log_debug!(verbosity, "order {:?}", ["1.1.1.1"]);
        }
    }
}
