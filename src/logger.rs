//! Console Logger
//!
//! Backs the `log` facade with the platform console. Lines are formatted
//! into a fixed stack buffer, so logging never allocates and is usable
//! from any context that may write to the console.

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

use crate::kernel::Console;

/// Longest line emitted; longer messages are truncated.
const LINE_MAX: usize = 256;

/// `log::Log` implementation writing `[LEVEL] target: message` lines.
pub struct ConsoleLogger<C: Console> {
    console: C,
    level: LevelFilter,
}

impl<C: Console> ConsoleLogger<C> {
    pub const fn new(console: C, level: LevelFilter) -> Self {
        Self { console, level }
    }

    pub fn console(&self) -> &C {
        &self.console
    }
}

impl<C: Console> log::Log for ConsoleLogger<C> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let mut line = LineBuffer::new();
        let _ = writeln!(line, "[{}] {}: {}", level, record.target(), record.args());
        self.console.write_bytes(line.as_bytes());
    }

    fn flush(&self) {}
}

/// Install `logger` as the global logger and apply its level.
pub fn init<C: Console + 'static>(logger: &'static ConsoleLogger<C>) -> Result<(), SetLoggerError> {
    log::set_logger(logger)?;
    log::set_max_level(logger.level);
    Ok(())
}

/// Truncating writer over a fixed buffer.
struct LineBuffer {
    buf: [u8; LINE_MAX],
    pos: usize,
}

impl LineBuffer {
    const fn new() -> Self {
        Self {
            buf: [0; LINE_MAX],
            pos: 0,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }
}

impl Write for LineBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let n = bytes.len().min(LINE_MAX - self.pos);
        self.buf[self.pos..self.pos + n].copy_from_slice(&bytes[..n]);
        self.pos += n;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConsole;
    use log::Log;

    #[test]
    fn test_formats_level_target_and_message() {
        let logger = ConsoleLogger::new(MockConsole::new(), LevelFilter::Info);
        logger.log(
            &Record::builder()
                .args(format_args!("[SYSCALL] {}: halt", 4))
                .level(Level::Info)
                .target("usergate::syscall")
                .build(),
        );
        assert_eq!(
            logger.console().output(),
            "[INFO ] usergate::syscall: [SYSCALL] 4: halt\n"
        );
    }

    #[test]
    fn test_filters_below_level() {
        let logger = ConsoleLogger::new(MockConsole::new(), LevelFilter::Warn);
        logger.log(
            &Record::builder()
                .args(format_args!("dropped"))
                .level(Level::Debug)
                .build(),
        );
        assert!(logger.console().output().is_empty());
        assert!(logger.enabled(&Metadata::builder().level(Level::Error).build()));
    }

    #[test]
    fn test_long_lines_are_truncated() {
        let mut line = LineBuffer::new();
        let long = "x".repeat(LINE_MAX * 2);
        let _ = write!(line, "{}", long);
        assert_eq!(line.as_bytes().len(), LINE_MAX);
    }
}
