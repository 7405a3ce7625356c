// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Name-service registration of components and the manager.
//!
//! Names come from templates (`naming.formats`,
//! `manager.naming_formats`) with these substitutions:
//!
//! | Token | Value |
//! |-------|-------|
//! | `%n` | instance name |
//! | `%t`, `%m` | type name |
//! | `%v` | version |
//! | `%V` | vendor |
//! | `%c` | category |
//! | `%h` | host name |
//! | `%M` | manager name |
//! | `%p` | process id |
//! | `%%` | `%` |
//!
//! Every binding is remembered so [`NamingManager::update`] can put it
//! back after a name service restart.

use crate::broker::{parse_name, BrokerError, ObjectRef, Orb};
use crate::rtc::RtObject;
use crate::util::string_util;
use crate::Properties;
use parking_lot::Mutex;
use std::sync::Arc;

/// Host name of this machine, empty if unavailable.
#[cfg(unix)]
pub fn hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for buf.len() bytes; gethostname writes at most
    // that many and NUL-terminates on success.
    let ret = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if ret != 0 {
        return String::new();
    }
    std::ffi::CStr::from_bytes_until_nul(&buf)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(not(unix))]
pub fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_default()
}

/// Expand `format` for an object described by `props`. Manager-wide
/// tokens (`%M`, `%p`) come from `config`.
pub fn format_name(format: &str, props: &Properties, config: &Properties) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push_str(&props.get_property("instance_name")),
            Some('t') | Some('m') => out.push_str(&props.get_property("type_name")),
            Some('v') => out.push_str(&props.get_property("version")),
            Some('V') => out.push_str(&props.get_property("vendor")),
            Some('c') => out.push_str(&props.get_property("category")),
            Some('h') => out.push_str(&hostname()),
            Some('M') => out.push_str(&config.get_property("manager.name")),
            Some('p') => {
                let pid = config.get_property("manager.pid");
                if pid.is_empty() {
                    out.push_str(&std::process::id().to_string());
                } else {
                    out.push_str(&pid);
                }
            }
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

#[derive(Clone)]
struct NameEntry {
    name: String,
    obj: ObjectRef,
    owner: String,
}

/// Binds objects in every configured name service and keeps them bound.
pub struct NamingManager {
    orb: Arc<Orb>,
    servers: Vec<String>,
    config: Properties,
    entries: Mutex<Vec<NameEntry>>,
}

impl NamingManager {
    /// Servers are taken from `corba.name_servers` when `naming.type`
    /// is `corba`.
    pub fn new(orb: &Arc<Orb>, config: &Properties) -> Self {
        let naming_type = config.get_property("naming.type");
        let servers = if naming_type == "corba" {
            string_util::split(&config.get_property("corba.name_servers"), ",")
        } else {
            log::warn!("[naming] unsupported naming.type '{}'", naming_type);
            Vec::new()
        };
        Self {
            orb: Arc::clone(orb),
            servers,
            config: config.clone(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Bind `obj` at `name` (a `id.kind/id.kind` path) in every server.
    /// The binding is remembered even if no server is reachable now.
    pub fn bind_object(&self, name: &str, obj: &ObjectRef) {
        self.remember(name, obj, "");
        self.bind_everywhere(name, obj);
    }

    /// Bind `comp` under each `naming.formats` template.
    pub fn bind_component(&self, comp: &Arc<RtObject>) {
        let Some(obj) = comp.object_ref() else {
            log::warn!("[naming] {} has no object reference", comp.instance_name());
            return;
        };
        let owner = comp.instance_name();
        for name in self.component_names(comp) {
            self.remember(&name, &obj, &owner);
            self.bind_everywhere(&name, &obj);
        }
    }

    /// Names `comp` is bound under according to `naming.formats`.
    pub fn component_names(&self, comp: &Arc<RtObject>) -> Vec<String> {
        let props = comp.properties();
        string_util::split(&self.config.get_property("naming.formats"), ",")
            .iter()
            .map(|format| format_name(format, &props, &self.config))
            .collect()
    }

    /// Name the manager servant is bound under.
    pub fn manager_names(&self) -> Vec<String> {
        string_util::split(&self.config.get_property("manager.naming_formats"), ",")
            .iter()
            .map(|format| format_name(format, &self.config, &self.config))
            .collect()
    }

    pub fn unbind_object(&self, name: &str) {
        self.entries.lock().retain(|e| e.name != name);
        self.unbind_everywhere(name);
    }

    pub fn unbind_component(&self, comp: &Arc<RtObject>) {
        let owner = comp.instance_name();
        let removed: Vec<NameEntry> = {
            let mut entries = self.entries.lock();
            let (removed, kept) = entries.drain(..).partition(|e| e.owner == owner);
            *entries = kept;
            removed
        };
        for entry in removed {
            self.unbind_everywhere(&entry.name);
        }
    }

    pub fn unbind_all(&self) {
        let removed: Vec<NameEntry> = self.entries.lock().drain(..).collect();
        for entry in removed {
            self.unbind_everywhere(&entry.name);
        }
    }

    /// Names currently remembered.
    pub fn bound_names(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.name.clone()).collect()
    }

    /// Rebind every remembered name that no longer resolves to its
    /// object. Unreachable servers are skipped until the next update.
    pub fn update(&self) {
        let entries = self.entries.lock().clone();
        for server in &self.servers {
            let service = match self.orb.resolve_name_service(server) {
                Ok(service) => service,
                Err(e) => {
                    log::debug!("[naming] {} unreachable: {}", server, e);
                    continue;
                }
            };
            for entry in &entries {
                let Ok(name) = parse_name(&entry.name) else {
                    continue;
                };
                match service.resolve(&name) {
                    Ok(current) if current == entry.obj => {}
                    Ok(_) | Err(BrokerError::NotFound(_)) => {
                        match service.rebind_recursive(&name, entry.obj.clone()) {
                            Ok(()) => log::info!("[naming] rebound {} on {}", entry.name, server),
                            Err(e) => log::warn!("[naming] rebind {} on {} failed: {}", entry.name, server, e),
                        }
                    }
                    Err(e) => {
                        log::debug!("[naming] {} on {}: {}", entry.name, server, e);
                        break;
                    }
                }
            }
        }
    }

    /// First server that resolves `name`.
    pub fn resolve(&self, name: &str) -> Result<ObjectRef, BrokerError> {
        let parsed = parse_name(name)?;
        let mut last = BrokerError::NotFound(name.to_string());
        for server in &self.servers {
            match self
                .orb
                .resolve_name_service(server)
                .and_then(|service| service.resolve(&parsed))
            {
                Ok(obj) => return Ok(obj),
                Err(e) => last = e,
            }
        }
        Err(last)
    }

    fn remember(&self, name: &str, obj: &ObjectRef, owner: &str) {
        let mut entries = self.entries.lock();
        entries.retain(|e| e.name != name);
        entries.push(NameEntry {
            name: name.to_string(),
            obj: obj.clone(),
            owner: owner.to_string(),
        });
    }

    fn bind_everywhere(&self, name: &str, obj: &ObjectRef) {
        let parsed = match parse_name(name) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("[naming] bad name '{}': {}", name, e);
                return;
            }
        };
        for server in &self.servers {
            let result = self
                .orb
                .resolve_name_service(server)
                .and_then(|service| service.rebind_recursive(&parsed, obj.clone()));
            match result {
                Ok(()) => log::debug!("[naming] bound {} on {}", name, server),
                Err(e) => log::warn!("[naming] bind {} on {} failed: {}", name, server, e),
            }
        }
    }

    fn unbind_everywhere(&self, name: &str) {
        let Ok(parsed) = parse_name(name) else {
            return;
        };
        for server in &self.servers {
            let result = self
                .orb
                .resolve_name_service(server)
                .and_then(|service| service.unbind(&parsed));
            if let Err(e) = result {
                log::debug!("[naming] unbind {} on {}: {}", name, server, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{InMemoryNamingService, NamingService};
    use crate::config::default_config;

    fn component(orb: &Arc<Orb>, name: &str) -> Arc<RtObject> {
        RtObject::new(
            orb,
            Properties::from_list(&[
                "instance_name", name,
                "type_name", "Camera",
                "category", "vision",
                "vendor", "acme",
                "version", "1.2",
                "",
            ]),
        )
    }

    #[test]
    fn test_format_substitutions() {
        let orb = Arc::new(Orb::new("fmt"));
        let comp = component(&orb, "Camera0");
        let mut config = default_config();
        config.set_property("manager.pid", "4242");
        let props = comp.properties();

        assert_eq!(format_name("%n.rtc", &props, &config), "Camera0.rtc");
        assert_eq!(format_name("%c/%t/%m", &props, &config), "vision/Camera/Camera");
        assert_eq!(format_name("%V-%v", &props, &config), "acme-1.2");
        assert_eq!(format_name("%M.%p %% %q", &props, &config), "manager.4242 % %q");
        assert_eq!(format_name("%h", &props, &config), hostname());
    }

    #[test]
    fn test_bind_unbind_component() {
        let orb = Arc::new(Orb::new("naming-bind"));
        let service = Arc::new(InMemoryNamingService::new());
        orb.register_name_service("localhost", Arc::clone(&service) as Arc<dyn NamingService>);
        let mut config = default_config();
        config.set_property("naming.formats", "%c.cat/%n.rtc, flat_%n.rtc");
        let naming = NamingManager::new(&orb, &config);
        let comp = component(&orb, "Camera0");

        naming.bind_component(&comp);
        let obj = comp.object_ref().expect("object ref");
        assert_eq!(service.resolve_str("vision.cat/Camera0.rtc").expect("resolve"), obj);
        assert_eq!(naming.resolve("flat_Camera0.rtc").expect("resolve flat"), obj);
        assert_eq!(naming.bound_names().len(), 2);

        naming.unbind_component(&comp);
        assert!(service.resolve_str("vision.cat/Camera0.rtc").is_err());
        assert!(naming.bound_names().is_empty());
    }

    #[test]
    fn test_update_rebinds_after_restart() {
        let orb = Arc::new(Orb::new("naming-update"));
        let service = Arc::new(InMemoryNamingService::new());
        orb.register_name_service("localhost", Arc::clone(&service) as Arc<dyn NamingService>);
        let naming = NamingManager::new(&orb, &default_config());
        let comp = component(&orb, "Camera0");
        naming.bind_component(&comp);
        let name = naming.component_names(&comp).remove(0);

        service.shutdown();
        naming.update();
        assert!(naming.resolve(&name).is_err());

        service.restart();
        assert!(naming.resolve(&name).is_err());
        naming.update();
        assert_eq!(naming.resolve(&name).expect("rebound"), comp.object_ref().expect("ref"));
    }

    #[test]
    fn test_manager_name() {
        let orb = Arc::new(Orb::new("naming-manager"));
        let naming = NamingManager::new(&orb, &default_config());
        assert_eq!(naming.manager_names(), vec!["manager.rtc".to_string()]);
    }
}
