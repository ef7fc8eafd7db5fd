//! Installable backends for the `log` facade.
//!
//! The engine logs through `log::{error, warn, info, debug}` everywhere.
//! Applications that already install their own logger (env_logger etc.) can
//! ignore this module; these helpers exist for embedders that want the
//! engine's stderr default or a callback sink.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        eprintln!("[skylark {}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

/// Message callback invoked for every log record at or above the filter
/// level.
pub type LogCallback = dyn Fn(Level, &str) + Send + Sync;

struct CallbackLogger {
    callback: Box<LogCallback>,
}

impl Log for CallbackLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        (self.callback)(record.level(), &record.args().to_string());
    }

    fn flush(&self) {}
}

/// Installs a logger that writes to stderr. Fails silently if a logger is
/// already installed.
pub fn init_stderr(level: LevelFilter) {
    if log::set_boxed_logger(Box::new(StderrLogger)).is_ok() {
        log::set_max_level(level);
    }
}

/// Installs a logger that forwards every record to `callback`. Fails
/// silently if a logger is already installed.
pub fn init_callback<F>(level: LevelFilter, callback: F)
where
    F: Fn(Level, &str) + Send + Sync + 'static,
{
    let logger = CallbackLogger {
        callback: Box::new(callback),
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
}
