// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global `log` backend.

use super::output::{LogLevel, Output};
use chrono::format::{Item, StrftimeItems};
use std::io;
use std::sync::{Arc, OnceLock};

pub const DEFAULT_DATE_FORMAT: &str = "%b %d %H:%M:%S";

static LOGGER: OnceLock<Arc<RtcLogger>> = OnceLock::new();

/// Formats records as `<date> <LEVEL>: <target>: <message>`.
pub struct RtcLogger {
    output: Arc<dyn Output>,
    level: LogLevel,
    date_format: String,
    flush_each: bool,
}

impl RtcLogger {
    /// An unparsable `date_format` falls back to [`DEFAULT_DATE_FORMAT`].
    pub fn new(output: Arc<dyn Output>, level: LogLevel, date_format: &str, flush_each: bool) -> Self {
        let valid = !StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error));
        Self {
            output,
            level,
            date_format: if valid { date_format } else { DEFAULT_DATE_FORMAT }.to_string(),
            flush_each,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub(crate) fn format(&self, level: LogLevel, target: &str, message: &str) -> String {
        let date = chrono::Local::now().format(&self.date_format);
        format!("{} {}: {}: {}", date, level.as_str(), target, message)
    }
}

impl log::Log for RtcLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.level != LogLevel::Silent && LogLevel::from_log(metadata.level()) <= self.level
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = self.format(
            LogLevel::from_log(record.level()),
            record.target(),
            &record.args().to_string(),
        );
        // Nowhere to report a failing log sink.
        let _ = self.output.write_line(&line);
        if self.flush_each {
            let _ = self.output.flush();
        }
    }

    fn flush(&self) {
        let _ = self.output.flush();
    }
}

struct Installed(Arc<RtcLogger>);

impl log::Log for Installed {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.0.enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        self.0.log(record)
    }

    fn flush(&self) {
        log::Log::flush(self.0.as_ref())
    }
}

/// Install `logger` as the process-wide `log` backend. Only the first call
/// takes effect; returns `false` for later calls or if another backend is
/// already installed.
pub fn init_logger(logger: RtcLogger) -> bool {
    let mut installed = false;
    let logger = LOGGER.get_or_init(|| {
        installed = true;
        Arc::new(logger)
    });
    if !installed {
        return false;
    }
    let level = logger.level().to_filter();
    match log::set_boxed_logger(Box::new(Installed(Arc::clone(logger)))) {
        Ok(()) => {
            log::set_max_level(level);
            true
        }
        Err(_) => false,
    }
}

pub fn flush_logger() -> io::Result<()> {
    match LOGGER.get() {
        Some(logger) => logger.output.flush(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<String>>);

    impl Output for Capture {
        fn write_line(&self, line: &str) -> io::Result<()> {
            self.0.lock().push(line.to_string());
            Ok(())
        }

        fn flush(&self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_level_filtering() {
        let capture = Arc::new(Capture::default());
        let logger = RtcLogger::new(capture.clone(), LogLevel::Warn, "%H", false);
        log::Log::log(
            &logger,
            &log::Record::builder()
                .level(log::Level::Warn)
                .target("ec")
                .args(format_args!("late pass"))
                .build(),
        );
        log::Log::log(
            &logger,
            &log::Record::builder()
                .level(log::Level::Debug)
                .target("ec")
                .args(format_args!("noise"))
                .build(),
        );

        let lines = capture.0.lock();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("WARN: ec: late pass"), "{}", lines[0]);
    }

    #[test]
    fn test_silent_drops_everything() {
        let capture = Arc::new(Capture::default());
        let logger = RtcLogger::new(capture.clone(), LogLevel::Silent, "%H", false);
        log::Log::log(
            &logger,
            &log::Record::builder()
                .level(log::Level::Error)
                .args(format_args!("boom"))
                .build(),
        );
        assert!(capture.0.lock().is_empty());
    }

    #[test]
    fn test_bad_date_format_falls_back() {
        let logger = RtcLogger::new(Arc::new(Capture::default()), LogLevel::Info, "%Q%", false);
        assert_eq!(logger.date_format, DEFAULT_DATE_FORMAT);
        assert!(logger.format(LogLevel::Info, "t", "m").ends_with("INFO: t: m"));
    }

    #[test]
    fn test_flush_without_logger() {
        assert!(flush_logger().is_ok());
    }
}
