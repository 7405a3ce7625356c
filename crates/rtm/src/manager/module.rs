// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Module loading.
//!
//! Modules are linked into the binary and registered by name with
//! [`register_module`]. Loading `path/to/Name.ext` looks up the module
//! `Name`; its initialization function is then resolved by symbol name
//! (`<init_func_prefix>Name<init_func_suffix>` unless given) and run
//! against the manager.

use super::Manager;
use crate::error::{Error, Result};
use crate::util::string_util;
use crate::Properties;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Module initialization function; typically registers factories.
pub type ModuleInitFn = Arc<dyn Fn(&Manager) -> Result<()> + Send + Sync>;

type SymbolTable = BTreeMap<String, ModuleInitFn>;

static MODULES: OnceLock<Mutex<BTreeMap<String, SymbolTable>>> = OnceLock::new();

fn modules() -> &'static Mutex<BTreeMap<String, SymbolTable>> {
    MODULES.get_or_init(|| Mutex::new(BTreeMap::new()))
}

/// Make module `name` loadable, exporting `init` under `symbol`.
/// Registering the same symbol again replaces it.
pub fn register_module(name: &str, symbol: &str, init: ModuleInitFn) {
    modules()
        .lock()
        .entry(name.to_string())
        .or_default()
        .insert(symbol.to_string(), init);
    log::debug!("[module] registered {}::{}", name, symbol);
}

/// Registered module names.
pub fn registered_modules() -> Vec<String> {
    modules().lock().keys().cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadedModule {
    name: String,
    file_path: String,
}

pub struct ModuleManager {
    load_path: Vec<String>,
    abs_path_allowed: bool,
    init_func_prefix: String,
    init_func_suffix: String,
    loaded: Mutex<Vec<LoadedModule>>,
}

fn normalize_dir(dir: &str) -> String {
    let dir = dir.trim().trim_end_matches('/');
    let dir = dir.strip_prefix("./").unwrap_or(dir);
    if dir.is_empty() || dir == "." {
        String::new()
    } else {
        dir.to_string()
    }
}

impl ModuleManager {
    /// Reads `manager.modules.*`.
    pub fn new(config: &Properties) -> Self {
        let mut load_path = string_util::split(&config.get_property("manager.modules.load_path"), ",");
        load_path.extend(string_util::split(&config.get_property("module.load_path"), ","));
        Self {
            load_path: string_util::unique_sv(load_path.iter().map(|p| normalize_dir(p)).collect()),
            abs_path_allowed: string_util::is_yes(
                &config.get_property_or("manager.modules.abs_path_allowed", "YES"),
            ),
            init_func_prefix: config.get_property("manager.modules.init_func_prefix"),
            init_func_suffix: config.get_property_or("manager.modules.init_func_suffix", "Init"),
            loaded: Mutex::new(Vec::new()),
        }
    }

    /// Record the module behind `path` as loaded and return its name.
    /// Loading an already loaded module is not an error.
    pub fn load(&self, path: &str) -> Result<String> {
        let path = path.trim();
        if path.is_empty() {
            return Err(Error::InvalidArgument("empty module path".to_string()));
        }
        if string_util::is_absolute_path(path) {
            if !self.abs_path_allowed {
                return Err(Error::ModuleNotAllowed(path.to_string()));
            }
        } else {
            let dir = Path::new(path)
                .parent()
                .map(|p| normalize_dir(&p.to_string_lossy()))
                .unwrap_or_default();
            if !dir.is_empty() && !self.load_path.contains(&dir) {
                return Err(Error::ModuleNotFound(path.to_string()));
            }
        }

        let name = module_name(path)?;
        if !modules().lock().contains_key(&name) {
            return Err(Error::ModuleNotFound(path.to_string()));
        }

        let mut loaded = self.loaded.lock();
        if loaded.iter().any(|m| m.name == name) {
            log::debug!("[module] {} already loaded", name);
            return Ok(name);
        }
        loaded.push(LoadedModule {
            name: name.clone(),
            file_path: path.to_string(),
        });
        log::info!("[module] loaded {} ({})", name, path);
        Ok(name)
    }

    /// Initialization function `init_func` of a loaded module; an empty
    /// name selects the default symbol.
    pub fn symbol(&self, name: &str, init_func: &str) -> Result<ModuleInitFn> {
        if !self.is_loaded(name) {
            return Err(Error::ModuleNotFound(name.to_string()));
        }
        let symbol = if init_func.is_empty() {
            format!("{}{}{}", self.init_func_prefix, name, self.init_func_suffix)
        } else {
            init_func.to_string()
        };
        modules()
            .lock()
            .get(name)
            .and_then(|table| table.get(&symbol))
            .cloned()
            .ok_or_else(|| Error::ModuleInitFailed(format!("{}: no symbol {}", name, symbol)))
    }

    pub fn unload(&self, path: &str) -> Result<()> {
        let name = module_name(path)?;
        let mut loaded = self.loaded.lock();
        let idx = loaded
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| Error::ModuleNotFound(path.to_string()))?;
        loaded.remove(idx);
        log::info!("[module] unloaded {}", name);
        Ok(())
    }

    pub fn unload_all(&self) {
        self.loaded.lock().clear();
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.lock().iter().any(|m| m.name == name)
    }

    /// `(name, file path)` of every loaded module, in load order.
    pub fn get_loaded_modules(&self) -> Vec<(String, String)> {
        self.loaded
            .lock()
            .iter()
            .map(|m| (m.name.clone(), m.file_path.clone()))
            .collect()
    }

    /// Registered modules not loaded yet.
    pub fn get_loadable_modules(&self) -> Vec<String> {
        registered_modules()
            .into_iter()
            .filter(|name| !self.is_loaded(name))
            .collect()
    }

    pub fn load_path(&self) -> &[String] {
        &self.load_path
    }
}

fn module_name(path: &str) -> Result<String> {
    Path::new(path.trim())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidArgument(format!("bad module path '{}'", path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    fn noop() -> ModuleInitFn {
        Arc::new(|_: &Manager| Ok(()))
    }

    #[test]
    fn test_load_resolves_default_symbol() {
        register_module("UnitModA", "UnitModAInit", noop());
        let mm = ModuleManager::new(&default_config());

        assert_eq!(mm.load("UnitModA.so").expect("load"), "UnitModA");
        assert_eq!(mm.load("./UnitModA").expect("reload"), "UnitModA");
        assert_eq!(mm.get_loaded_modules().len(), 1);
        assert!(mm.symbol("UnitModA", "").is_ok());
        assert!(matches!(mm.symbol("UnitModA", "Other"), Err(Error::ModuleInitFailed(_))));
        assert!(!mm.get_loadable_modules().contains(&"UnitModA".to_string()));

        mm.unload("UnitModA.so").expect("unload");
        assert!(mm.get_loaded_modules().is_empty());
        assert!(matches!(mm.unload("UnitModA"), Err(Error::ModuleNotFound(_))));
    }

    #[test]
    fn test_unknown_and_disallowed_paths() {
        register_module("UnitModB", "UnitModBInit", noop());
        let mut config = default_config();
        config.set_property("manager.modules.abs_path_allowed", "NO");
        config.set_property("manager.modules.load_path", "./, mods");
        let mm = ModuleManager::new(&config);

        assert!(matches!(mm.load("Missing.so"), Err(Error::ModuleNotFound(_))));
        assert!(matches!(mm.load("/opt/UnitModB.so"), Err(Error::ModuleNotAllowed(_))));
        assert!(matches!(mm.load("elsewhere/UnitModB.so"), Err(Error::ModuleNotFound(_))));
        assert_eq!(mm.load("mods/UnitModB.so").expect("load from load path"), "UnitModB");
    }
}
