// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging backend for the `log` facade, configured from `logger.*` keys.
//!
//! The library itself only emits through `log::debug!` and friends; this
//! module is what a process installs to see them.
//!
//! | key | meaning |
//! |-----|---------|
//! | `logger.enable` | `NO` disables the backend |
//! | `logger.file_name` | `%p` is replaced by the pid; empty, `STDOUT` or `STDERR` log to the console |
//! | `logger.date_format` | strftime format |
//! | `logger.log_level` | `SILENT` .. `PARANOID` |
//! | `logger.stream_lock` | `YES` flushes after every record |

pub mod logger;
mod output;

pub use logger::{flush_logger, init_logger, RtcLogger, DEFAULT_DATE_FORMAT};
pub use output::{ConsoleOutput, FileOutput, LogLevel, Output};

use crate::util::string_util;
use crate::Properties;
use std::io;
use std::sync::Arc;

/// Build the backend described by `config`, or `None` if disabled.
pub fn logger_from_config(config: &Properties) -> io::Result<Option<RtcLogger>> {
    if !string_util::to_bool(&config.get_property("logger.enable"), "YES", "NO", true) {
        return Ok(None);
    }
    let file_name = config
        .get_property("logger.file_name")
        .replace("%p", &std::process::id().to_string());
    let output: Arc<dyn Output> = match file_name.trim() {
        "" => Arc::new(ConsoleOutput::stderr()),
        name if name.eq_ignore_ascii_case("STDERR") => Arc::new(ConsoleOutput::stderr()),
        name if name.eq_ignore_ascii_case("STDOUT") => Arc::new(ConsoleOutput::stdout()),
        name => Arc::new(FileOutput::open(name)?),
    };
    let level = LogLevel::parse(&config.get_property_or("logger.log_level", "INFO"));
    let date_format = config.get_property_or("logger.date_format", DEFAULT_DATE_FORMAT);
    let flush_each = string_util::to_bool(&config.get_property("logger.stream_lock"), "YES", "NO", false);
    Ok(Some(RtcLogger::new(output, level, &date_format, flush_each)))
}

/// Install the backend described by `config`. `Ok(false)` when logging is
/// disabled or a backend is already installed.
pub fn init_from_config(config: &Properties) -> io::Result<bool> {
    match logger_from_config(config)? {
        Some(logger) => Ok(init_logger(logger)),
        None => Ok(false),
    }
}
