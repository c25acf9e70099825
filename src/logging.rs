// src/logging.rs

//! `tracing` subscriber setup for the `pvtrigger` binary.
//!
//! The filter comes from, in order:
//! 1. `--log-level`
//! 2. `PVTRIGGER_LOG`, which accepts full filter directives such as
//!    `pvtrigger::engine=trace,info`
//! 3. `info`
//!
//! Everything is written to stderr so stdout stays free for the run summary.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "PVTRIGGER_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Call once, from `main`.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(level.as_directive()));
    }

    match env.map(str::trim) {
        Some(directives) if !directives.is_empty() => EnvFilter::try_new(directives)
            .map_err(|e| anyhow!("invalid {LOG_ENV_VAR} value '{directives}': {e}")),
        _ => Ok(EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn cli_level_wins_over_env() {
        let filter = build_filter(Some(LogLevel::Warn), Some("trace")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn env_directives_are_used_verbatim() {
        let filter = build_filter(None, Some(" pvtrigger=debug ")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn falls_back_to_info() {
        for env in [None, Some("  ")] {
            let filter = build_filter(None, env).unwrap();
            assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
        }
    }

    #[test]
    fn malformed_env_directive_is_an_error() {
        assert!(build_filter(None, Some("pvtrigger=loudest")).is_err());
    }
}
