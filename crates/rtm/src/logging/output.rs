// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Log output backends (console and file).

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Runtime log levels, least to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Silent = 0,
    Fatal = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
    Debug = 5,
    Trace = 6,
    Verbose = 7,
    Paranoid = 8,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Silent => "SILENT",
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
            Self::Verbose => "VERBOSE",
            Self::Paranoid => "PARANOID",
        }
    }

    /// Case-insensitive; unknown names give `Info`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "SILENT" => Self::Silent,
            "FATAL" => Self::Fatal,
            "ERROR" => Self::Error,
            "WARN" | "WARNING" => Self::Warn,
            "INFO" => Self::Info,
            "DEBUG" => Self::Debug,
            "TRACE" => Self::Trace,
            "VERBOSE" => Self::Verbose,
            "PARANOID" => Self::Paranoid,
            _ => Self::Info,
        }
    }

    pub fn from_log(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }

    /// Most verbose `log` level this level lets through.
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            Self::Silent => log::LevelFilter::Off,
            Self::Fatal | Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace | Self::Verbose | Self::Paranoid => log::LevelFilter::Trace,
        }
    }
}

/// Destination of formatted log lines.
pub trait Output: Send + Sync {
    fn write_line(&self, line: &str) -> io::Result<()>;

    fn flush(&self) -> io::Result<()>;
}

/// Writes to stderr.
#[derive(Debug, Default)]
pub struct ConsoleOutput {
    stdout: bool,
}

impl ConsoleOutput {
    pub fn stderr() -> Self {
        Self { stdout: false }
    }

    pub fn stdout() -> Self {
        Self { stdout: true }
    }
}

impl Output for ConsoleOutput {
    fn write_line(&self, line: &str) -> io::Result<()> {
        if self.stdout {
            writeln!(io::stdout().lock(), "{}", line)
        } else {
            writeln!(io::stderr().lock(), "{}", line)
        }
    }

    fn flush(&self) -> io::Result<()> {
        if self.stdout {
            io::stdout().flush()
        } else {
            io::stderr().flush()
        }
    }
}

/// Appends to a file.
pub struct FileOutput {
    file: Mutex<File>,
}

impl FileOutput {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl Output for FileOutput {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")
    }

    fn flush(&self) -> io::Result<()> {
        self.file.lock().flush()
    }
}
