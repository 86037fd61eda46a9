#![deny(missing_docs)]
//! Shared logging utilities for the auth workspace.
//!
//! This crate provides the `auth_*` logging macros used across the codebase,
//! logger initialization for hosts and tests, and [`redact`] for keeping
//! credentials out of log files.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Number of leading token characters that may appear in a log line.
pub const REDACTED_PREFIX_LEN: usize = 8;

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! auth_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! auth_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! auth_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! auth_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! auth_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Shortens a credential to a loggable prefix, e.g. `a1b2c3d4...`.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(REDACTED_PREFIX_LEN).collect();
    if prefix.len() < token.len() {
        format!("{prefix}...")
    } else {
        prefix
    }
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the given log file only.
    File,
    /// Write to terminal (stdout).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Initialize the global logger with the specified destination.
///
/// `log_path` is only used for `File` and `Both`. A log file that cannot be
/// created is reported on stderr and skipped. Returns `false` if a logger was
/// already installed.
pub fn initialize(destination: LogDestination, log_path: &Path, level: LevelFilter) -> bool {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        if let Some(file_logger) = create_file_logger(log_path, level, config) {
            loggers.push(file_logger);
        }
    }
    if loggers.is_empty() {
        return false;
    }

    CombinedLogger::init(loggers).is_ok()
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    log_path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn long_tokens_keep_only_prefix() {
        assert_eq!(
            redact("0f5c4b52-1b8e-4c6a-9a55-4e1f2b3c4d5e"),
            "0f5c4b52..."
        );
    }

    #[test]
    fn short_tokens_are_not_padded() {
        assert_eq!(redact("abc"), "abc");
        assert_eq!(redact(""), "");
    }
}
