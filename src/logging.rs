//! Kernel log sink
//!
//! Routes `log` records to the serial console as `[LEVEL] message`
//! lines. Installed once at boot; until then (and in host tests) the
//! `log` macros are no-ops.

use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::kprintln;

static LOGGER: UartLogger = UartLogger;

/// `log` backend writing to the PL011 UART.
pub struct UartLogger;

impl log::Log for UartLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            kprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the UART logger with the given maximum level.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
