// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Manager configuration: built-in defaults, configuration file discovery
//! and command line overlay.
//!
//! Precedence, lowest first: the default table, the configuration file,
//! `-l` preloads, `-o key:value` overrides.

use crate::error::{Error, Result};
use crate::Properties;
use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable naming the configuration file.
pub const CONFIG_FILE_ENV: &str = "RTC_MANAGER_CONFIG";

/// Searched in order when no file is given.
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "./rtc.conf",
    "/etc/rtc.conf",
    "/etc/rtc/rtc.conf",
    "/usr/local/etc/rtc.conf",
    "/usr/local/etc/rtc/rtc.conf",
];

pub const DEFAULT_CONFIG: &[&str] = &[
    "config.version", env!("CARGO_PKG_VERSION"),
    "openrtm.version", concat!("rtm-", env!("CARGO_PKG_VERSION")),
    "manager.name", "manager",
    "manager.naming_formats", "%M.rtc",
    "manager.components.precreate", "",
    "manager.corba_servant", "YES",
    "manager.signal_handlers", "YES",
    "manager.modules.load_path", "./",
    "manager.modules.abs_path_allowed", "YES",
    "manager.modules.preload", "",
    "manager.modules.init_func_suffix", "Init",
    "manager.modules.init_func_prefix", "",
    "naming.enable", "YES",
    "naming.type", "corba",
    "naming.formats", "%h.host/%n.rtc",
    "naming.update.enable", "YES",
    "naming.update.interval", "10.0",
    "timer.enable", "YES",
    "timer.tick", "0.1",
    "logger.enable", "YES",
    "logger.file_name", "./rtc%p.log",
    "logger.date_format", "%b %d %H:%M:%S",
    "logger.log_level", "INFO",
    "logger.stream_lock", "NO",
    "logger.master_logger", "",
    "corba.args", "",
    "corba.endpoint", "",
    "corba.id", "inproc",
    "corba.name_servers", "localhost",
    "exec_cxt.periodic.type", "PeriodicExecutionContext",
    "exec_cxt.periodic.rate", "1000",
    "exec_cxt.evdriven.type", "ExtTrigExecutionContext",
    "module.conf_path", "",
    "module.load_path", "",
    "",
];

/// The default table plus process-specific keys (`manager.pid`).
pub fn default_config() -> Properties {
    let mut config = Properties::from_defaults(DEFAULT_CONFIG);
    config.set_default("manager.pid", std::process::id().to_string());
    config
}

/// Options understood by [`Manager::init`](crate::manager::Manager::init).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    /// `-f <file>`
    pub config_file: Option<PathBuf>,
    /// `-l <module>`
    pub preload: Vec<String>,
    /// `-o <key:value>`
    pub overrides: Vec<(String, String)>,
    /// `-d`: defaults only, skip the file search.
    pub defaults_only: bool,
    /// `-a`: do not create the manager servant.
    pub no_manager_servant: bool,
}

impl CommandLine {
    /// Parse `args` (without the program name). Option values may be
    /// attached (`-fconf`) or separate (`-f conf`). Unknown options are
    /// rejected; bare arguments are ignored.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut cmd = CommandLine::default();
        let mut iter = args.iter().map(AsRef::as_ref);
        while let Some(arg) = iter.next() {
            let Some(opt) = arg.strip_prefix('-') else {
                continue;
            };
            let mut chars = opt.chars();
            let Some(flag) = chars.next() else {
                return Err(Error::InvalidArgument("empty option".to_string()));
            };
            let attached = chars.as_str();
            let mut value = |name: char| -> Result<String> {
                if !attached.is_empty() {
                    return Ok(attached.to_string());
                }
                iter.next()
                    .map(str::to_string)
                    .ok_or_else(|| Error::InvalidArgument(format!("-{} needs a value", name)))
            };
            match flag {
                'f' => cmd.config_file = Some(PathBuf::from(value('f')?)),
                'l' => cmd.preload.push(value('l')?),
                'o' => {
                    let pair = value('o')?;
                    let (key, val) = pair
                        .split_once(':')
                        .ok_or_else(|| Error::InvalidArgument(format!("-o expects key:value, got '{}'", pair)))?;
                    cmd.overrides
                        .push((key.trim().to_string(), val.trim().to_string()));
                }
                'd' => cmd.defaults_only = true,
                'a' => cmd.no_manager_servant = true,
                other => {
                    return Err(Error::InvalidArgument(format!("unknown option -{}", other)));
                }
            }
        }
        Ok(cmd)
    }
}

/// First configuration file found via `$RTC_MANAGER_CONFIG` or the
/// search path.
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
    }
    CONFIG_SEARCH_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Overlay the file at `path` onto `config`.
pub fn load_file(config: &mut Properties, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::ConfigFileNotFound(path.display().to_string()),
        _ => Error::Io(e),
    })?;
    config.load(&text);
    Ok(())
}

/// Build the effective configuration for `cmd`.
pub fn build_config(cmd: &CommandLine) -> Result<Properties> {
    let mut config = default_config();
    if !cmd.defaults_only {
        match &cmd.config_file {
            Some(path) => {
                load_file(&mut config, path)?;
                config.set_property("config_file", path.display().to_string());
            }
            None => {
                if let Some(path) = find_config_file() {
                    log::debug!("[config] using {}", path.display());
                    load_file(&mut config, &path)?;
                    config.set_property("config_file", path.display().to_string());
                }
            }
        }
    }
    if !cmd.preload.is_empty() {
        let mut modules: Vec<String> = crate::util::string_util::split(
            &config.get_property("manager.modules.preload"),
            ",",
        );
        modules.extend(cmd.preload.iter().cloned());
        config.set_property(
            "manager.modules.preload",
            crate::util::string_util::flatten(&crate::util::string_util::unique_sv(modules)),
        );
    }
    for (key, value) in &cmd.overrides {
        config.set_property(key, value.as_str());
    }
    if cmd.no_manager_servant {
        config.set_property("manager.corba_servant", "NO");
    }
    Ok(config)
}

/// Live configuration snapshot. Readers take an `Arc` and never block
/// writers.
pub struct RuntimeConfig {
    current: ArcSwap<Properties>,
}

impl RuntimeConfig {
    pub fn new(config: Properties) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    pub fn snapshot(&self) -> Arc<Properties> {
        self.current.load_full()
    }

    pub fn get(&self, key: &str) -> String {
        self.current.load().get_property(key)
    }

    pub fn set(&self, key: &str, value: &str) {
        self.current.rcu(|config| {
            let mut next = Properties::clone(config);
            next.set_property(key, value);
            next
        });
    }

    pub fn replace(&self, config: Properties) {
        self.current.store(Arc::new(config));
    }
}
