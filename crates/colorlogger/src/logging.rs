//! Logging setup.
//!
//! Everything in colorlogger logs through `tracing`; the binary installs a
//! `tracing-subscriber` formatter filtered by verbosity or `RUST_LOG`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much the binary prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only (`-q`).
    Quiet,
    /// State changes and progress.
    #[default]
    Normal,
    /// Per-sample and per-button detail (`-v`).
    Verbose,
    /// Everything, including dropped status events (`-vv`).
    Trace,
}

impl Verbosity {
    /// The most detailed level shown at this verbosity.
    #[must_use]
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

impl From<(u8, bool)> for Verbosity {
    /// Map a `-v` count and a `--quiet` flag to a verbosity.
    fn from((verbose, quiet): (u8, bool)) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Trace,
        }
    }
}

/// The filter directive used when `RUST_LOG` is unset. Covers the library
/// and the `colorlog` binary.
#[must_use]
pub fn default_filter(verbosity: Verbosity) -> String {
    let level = verbosity.level();
    format!("colorlogger={level},colorlog={level}")
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces the verbosity-derived filter. Calling this
/// more than once is harmless.
///
/// # Examples
///
/// ```no_run
/// use colorlogger::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// tracing::debug!(drive = "sd0", "Mounting");
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact())
        .try_init();
}

/// Warn-level logging routed to the test harness.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(Verbosity::Quiet.level(), LevelFilter::ERROR);
        assert_eq!(Verbosity::Normal.level(), LevelFilter::INFO);
        assert_eq!(Verbosity::Verbose.level(), LevelFilter::DEBUG);
        assert_eq!(Verbosity::Trace.level(), LevelFilter::TRACE);
    }

    #[test]
    fn test_verbosity_default() {
        assert_eq!(Verbosity::default(), Verbosity::Normal);
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from((0, false)), Verbosity::Normal);
        assert_eq!(Verbosity::from((1, false)), Verbosity::Verbose);
        assert_eq!(Verbosity::from((3, false)), Verbosity::Trace);
        assert_eq!(Verbosity::from((2, true)), Verbosity::Quiet);
    }

    #[test]
    fn test_default_filter_targets_crate_and_binary() {
        let filter = default_filter(Verbosity::Verbose).to_lowercase();
        assert_eq!(filter, "colorlogger=debug,colorlog=debug");
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Trace);
        init_test_logging();
    }
}
