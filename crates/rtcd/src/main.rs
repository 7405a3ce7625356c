// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rtcd - RT-Component manager daemon
//!
//! Hosts a manager process: loads the configuration, preloads modules,
//! publishes the manager on the name service and blocks until Ctrl-C or a
//! remote `shutdown`.
//!
//! # Usage
//!
//! ```bash
//! # Configuration from ./rtc.conf (or the standard search path)
//! rtcd
//!
//! # Explicit file, one preloaded module, one override
//! rtcd -f robot.conf -l MotorComp -o "exec_cxt.periodic.rate:100"
//!
//! # Defaults only, no manager servant
//! rtcd -d -a
//! ```

use anyhow::Context;
use clap::Parser;
use rtm::broker::{InMemoryNamingService, NamingService};
use rtm::util::string_util;
use rtm::Manager;
use std::path::PathBuf;
use std::sync::Arc;

/// RT-Component manager daemon
#[derive(Parser, Debug)]
#[command(name = "rtcd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (key: value per line)
    #[arg(short = 'f', long = "config")]
    config: Option<PathBuf>,

    /// Module to load at startup (repeatable)
    #[arg(short = 'l', long = "load")]
    preload: Vec<String>,

    /// Configuration override as key:value (repeatable)
    #[arg(short = 'o', long = "option")]
    overrides: Vec<String>,

    /// Use the built-in defaults only, skip configuration file search
    #[arg(short = 'd', long)]
    defaults: bool,

    /// Do not create the manager servant
    #[arg(short = 'a', long)]
    no_servant: bool,

    /// Do not start the in-process name service on localhost
    #[arg(long)]
    no_embedded_naming: bool,
}

impl Args {
    /// Render back into the option list understood by [`Manager::init`].
    fn to_manager_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(path) = &self.config {
            args.push("-f".to_string());
            args.push(path.display().to_string());
        }
        for module in &self.preload {
            args.push("-l".to_string());
            args.push(module.clone());
        }
        for item in &self.overrides {
            args.push("-o".to_string());
            args.push(item.clone());
        }
        if self.defaults {
            args.push("-d".to_string());
        }
        if self.no_servant {
            args.push("-a".to_string());
        }
        args
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let manager = Manager::init(&args.to_manager_args()).context("manager initialization failed")?;
    let config = manager.get_config();

    if !args.no_embedded_naming {
        let service: Arc<dyn NamingService> = Arc::new(InMemoryNamingService::new());
        manager.orb().register_name_service("localhost", service);
        log::info!("[rtcd] embedded name service on localhost");
    }

    if string_util::is_yes(&config.get_property("manager.signal_handlers")) {
        let weak = Arc::downgrade(&manager);
        ctrlc::set_handler(move || {
            log::info!("[rtcd] interrupt received, shutting down");
            if let Some(manager) = weak.upgrade() {
                manager.terminate();
            }
        })
        .context("failed to install the signal handler")?;
    }

    manager.activate_manager().context("manager activation failed")?;
    log::info!(
        "[rtcd] {} running (pid {}, config {})",
        manager.name(),
        config.get_property("manager.pid"),
        config.get_property_or("config_file", "<defaults>")
    );

    manager.run_manager(false)?;
    manager.join();
    log::info!("[rtcd] stopped");
    Ok(())
}
