//! A minimal [`log::Log`] sink to stderr.
//!
//! Grounded on `kernel-qemu::logger::QemuLogger`'s shape (a `max_level`
//! filter plus a one-line `[LEVEL] target: message` format), adapted from a
//! QEMU debug-port sink to stderr since this binary isn't bare metal.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Logs every record at or above `max_level` to stderr.
pub struct StderrLogger {
    max_level: LevelFilter,
}

impl StderrLogger {
    /// Builds a logger that passes records at or above `max_level`.
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Installs this logger as the global `log` sink. Call once at startup.
    ///
    /// # Errors
    /// [`SetLoggerError`] if a logger is already installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}
