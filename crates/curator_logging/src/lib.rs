#![deny(missing_docs)]
//! Shared logging utilities for the curator workspace.
//!
//! This crate provides the `curator_*` logging macros used across the codebase,
//! the logger initializers used by the binary, and a minimal test initializer.
//! Every line logged through the macros carries the number of the feed pass
//! that was active on the current thread.

use std::cell::Cell;
use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

thread_local! {
    /// Thread-local storage for the feed pass currently being processed.
    static CURRENT_PASS: Cell<u64> = const { Cell::new(0) };
}

/// Sets the feed pass number for the current thread.
/// The curator worker calls this once at the start of every pass.
pub fn set_current_pass(pass: u64) {
    CURRENT_PASS.with(|v| v.set(pass));
}

/// Retrieves the feed pass number for the current thread.
/// Returns 0 before the first pass.
pub fn current_pass() -> u64 {
    CURRENT_PASS.with(|v| v.get())
}

/// Logs a trace-level message tagged with the current pass.
#[macro_export]
macro_rules! curator_trace {
    ($($arg:tt)*) => {{
        log::trace!("[pass {}] {}", $crate::current_pass(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current pass.
#[macro_export]
macro_rules! curator_info {
    ($($arg:tt)*) => {{
        log::info!("[pass {}] {}", $crate::current_pass(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current pass.
#[macro_export]
macro_rules! curator_debug {
    ($($arg:tt)*) => {{
        log::debug!("[pass {}] {}", $crate::current_pass(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current pass.
#[macro_export]
macro_rules! curator_warn {
    ($($arg:tt)*) => {{
        log::warn!("[pass {}] {}", $crate::current_pass(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current pass.
#[macro_export]
macro_rules! curator_error {
    ($($arg:tt)*) => {{
        log::error!("[pass {}] {}", $crate::current_pass(), format_args!($($arg)*));
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to ./curator.log in the current directory.
    File,
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Initializes the global logger with the given destination and level.
///
/// Safely no-ops if a logger is already installed.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File => match create_file_logger(level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => {
            vec![TermLogger::new(
                level,
                config,
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )]
        }
        LogDestination::Both => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from("./curator.log");
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
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

#[cfg(test)]
mod tests {
    use super::{current_pass, set_current_pass};

    #[test]
    fn pass_number_is_thread_local() {
        set_current_pass(7);
        assert_eq!(current_pass(), 7);
        let other = std::thread::spawn(current_pass).join().unwrap();
        assert_eq!(other, 0);
    }
}
