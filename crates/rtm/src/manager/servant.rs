// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote administration interface of a manager.

use super::Manager;
use crate::broker::ObjectRef;
use crate::error::Error;
use crate::rtc::{ComponentProfile, ReturnCode};
use crate::util::nvutil::{self, NVList};
use crate::Properties;
use std::sync::{Arc, Weak};

pub const MANAGER_REPOSITORY_ID: &str = "IDL:RTM/Manager:1.0";

fn to_return_code(err: &Error) -> ReturnCode {
    match err {
        Error::Lifecycle(rc) => *rc,
        Error::InvalidArgument(_)
        | Error::UnknownFactory(_)
        | Error::ComponentNotFound(_)
        | Error::ModuleNotFound(_)
        | Error::ModuleNotAllowed(_) => ReturnCode::BadParameter,
        _ => ReturnCode::Error,
    }
}

/// Servant activated in the broker on behalf of a [`Manager`]. Calls
/// after the manager is gone fail with `Error` or return nothing.
pub struct ManagerServant {
    manager: Weak<Manager>,
}

impl ManagerServant {
    pub(crate) fn new(manager: Weak<Manager>) -> Self {
        Self { manager }
    }

    /// Recover the servant behind a reference.
    pub fn narrow(obj: &ObjectRef) -> Option<Arc<ManagerServant>> {
        obj.narrow::<Arc<ManagerServant>>()
    }

    fn with<R>(&self, fallback: R, f: impl FnOnce(&Arc<Manager>) -> R) -> R {
        match self.manager.upgrade() {
            Some(manager) => f(&manager),
            None => fallback,
        }
    }

    fn status(&self, f: impl FnOnce(&Arc<Manager>) -> crate::Result<()>) -> ReturnCode {
        self.with(ReturnCode::Error, |m| match f(m) {
            Ok(()) => ReturnCode::Ok,
            Err(e) => {
                log::warn!("[manager-servant] {}", e);
                to_return_code(&e)
            }
        })
    }

    pub fn load_module(&self, path: &str, init_func: &str) -> ReturnCode {
        self.status(|m| m.load(path, init_func))
    }

    pub fn unload_module(&self, path: &str) -> ReturnCode {
        self.status(|m| m.unload(path))
    }

    pub fn get_loadable_modules(&self) -> Vec<String> {
        self.with(Vec::new(), |m| m.modules().get_loadable_modules())
    }

    /// Loaded module names.
    pub fn get_loaded_modules(&self) -> Vec<String> {
        self.with(Vec::new(), |m| {
            m.modules()
                .get_loaded_modules()
                .into_iter()
                .map(|(name, _)| name)
                .collect()
        })
    }

    pub fn get_factory_profiles(&self) -> Vec<Properties> {
        self.with(Vec::new(), |m| m.get_factory_profiles())
    }

    /// `type_name` optionally followed by `?key=value&...`.
    pub fn create_component(&self, args: &str) -> Option<ObjectRef> {
        self.with(None, |m| match m.create_component(args) {
            Ok(comp) => comp.object_ref(),
            Err(e) => {
                log::warn!("[manager-servant] create_component({}): {}", args, e);
                None
            }
        })
    }

    pub fn delete_component(&self, instance_name: &str) -> ReturnCode {
        self.status(|m| m.delete_component(instance_name))
    }

    pub fn get_components(&self) -> Vec<ObjectRef> {
        self.with(Vec::new(), |m| {
            m.get_components()
                .iter()
                .filter_map(|c| c.object_ref())
                .collect()
        })
    }

    pub fn get_component_profiles(&self) -> Vec<ComponentProfile> {
        self.with(Vec::new(), |m| {
            m.get_components()
                .iter()
                .map(|c| c.get_component_profile())
                .collect()
        })
    }

    /// Manager identity (`manager.name`, `manager.pid`, ...).
    pub fn get_profile(&self) -> NVList {
        self.with(Vec::new(), |m| nvutil::from_properties(&m.get_config().subtree("manager")))
    }

    pub fn get_configuration(&self) -> NVList {
        self.with(Vec::new(), |m| nvutil::from_properties(&m.get_config()))
    }

    pub fn set_configuration(&self, name: &str, value: &str) -> ReturnCode {
        if name.trim().is_empty() {
            return ReturnCode::BadParameter;
        }
        self.with(ReturnCode::Error, |m| {
            m.set_config(name, value);
            ReturnCode::Ok
        })
    }

    /// Shut the manager down from a separate thread; returns at once.
    pub fn shutdown(&self) -> ReturnCode {
        self.with(ReturnCode::Error, |m| {
            m.terminate();
            ReturnCode::Ok
        })
    }

    /// Accepted without effect.
    pub fn fork(&self) -> ReturnCode {
        ReturnCode::Ok
    }

    /// Accepted without effect.
    pub fn restart(&self) -> ReturnCode {
        ReturnCode::Ok
    }
}
