// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The component object: identity, ports, configuration and the
//! execution contexts it owns or participates in.
//!
//! Lifecycle callbacks are serialized per component. Execution contexts
//! take the callback lock around each state transition and each pass, so
//! two contexts driving the same component never run its callbacks
//! concurrently.

use super::action::NoAction;
use super::configuration::{ConfigAdmin, ConfigParam};
use super::{ComponentAction, ComponentProfile, ExecutionContextHandle, LifeCycleState, ReturnCode};
use crate::broker::{ObjectRef, Orb};
use crate::data::DataType;
use crate::ec::ExecutionContext;
use crate::port::{InPort, OutPort, PortAdmin, PortOps, PortRef};
use crate::util::nvutil;
use crate::Properties;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

pub const RTOBJECT_REPOSITORY_ID: &str = "IDL:RTC/RTObject:1.0";

/// Handles of contexts the component joined but does not own start here.
const PARTICIPATING_HANDLE_BASE: ExecutionContextHandle = 1000;

/// Builds the business logic of a freshly created component.
pub type ComponentCtor = Arc<dyn Fn(&Arc<RtObject>) -> Box<dyn ComponentAction> + Send + Sync>;

/// Exclusive access to a component's callbacks.
pub(crate) struct ActionGuard<'a> {
    owner: &'a RtObject,
    action: MutexGuard<'a, Box<dyn ComponentAction>>,
}

impl ActionGuard<'_> {
    /// Run one callback, mapping a panic to `Error`.
    pub(crate) fn call<F>(&mut self, callback: &str, f: F) -> ReturnCode
    where
        F: FnOnce(&mut dyn ComponentAction) -> ReturnCode,
    {
        let action: &mut dyn ComponentAction = &mut **self.action;
        match panic::catch_unwind(AssertUnwindSafe(|| f(action))) {
            Ok(rc) => rc,
            Err(_) => {
                log::error!(
                    "[rtc] {}: {} panicked",
                    self.owner.instance_name(),
                    callback
                );
                ReturnCode::Error
            }
        }
    }
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        *self.owner.callback_thread.lock() = None;
    }
}

pub struct RtObject {
    orb: Arc<Orb>,
    properties: RwLock<Properties>,
    action: Mutex<Box<dyn ComponentAction>>,
    callback_thread: Mutex<Option<ThreadId>>,
    ports: PortAdmin,
    config: ConfigAdmin,
    owned: RwLock<Vec<Arc<dyn ExecutionContext>>>,
    participating: RwLock<Vec<(ExecutionContextHandle, Arc<dyn ExecutionContext>)>>,
    next_handle: Mutex<ExecutionContextHandle>,
    objref: RwLock<Option<ObjectRef>>,
    initialized: Mutex<Option<ReturnCode>>,
    finalized: AtomicBool,
}

impl RtObject {
    /// Create and activate a component with no behaviour; see
    /// [`set_action`](Self::set_action).
    ///
    /// `properties` carries the identity keys (`type_name`, `instance_name`,
    /// `category`, ...) and configuration sets under `conf.<set>.<param>`.
    pub fn new(orb: &Arc<Orb>, properties: Properties) -> Arc<Self> {
        let config = ConfigAdmin::new(properties.subtree("conf"));
        let rtobj = Arc::new(Self {
            orb: Arc::clone(orb),
            properties: RwLock::new(properties),
            action: Mutex::new(Box::new(NoAction)),
            callback_thread: Mutex::new(None),
            ports: PortAdmin::new(),
            config,
            owned: RwLock::new(Vec::new()),
            participating: RwLock::new(Vec::new()),
            next_handle: Mutex::new(PARTICIPATING_HANDLE_BASE),
            objref: RwLock::new(None),
            initialized: Mutex::new(None),
            finalized: AtomicBool::new(false),
        });
        let obj = orb
            .poa()
            .activate_object(RTOBJECT_REPOSITORY_ID, Arc::clone(&rtobj));
        *rtobj.objref.write() = Some(obj);
        rtobj
    }

    /// Create a component whose behaviour is built by `ctor`. The
    /// constructor may add ports and bind parameters on the new object.
    pub fn with_action<F>(orb: &Arc<Orb>, properties: Properties, ctor: F) -> Arc<Self>
    where
        F: FnOnce(&Arc<RtObject>) -> Box<dyn ComponentAction>,
    {
        let rtobj = Self::new(orb, properties);
        let action = ctor(&rtobj);
        rtobj.set_action(action);
        rtobj
    }

    pub fn set_action(&self, action: Box<dyn ComponentAction>) {
        *self.action.lock() = action;
    }

    /// Recover the component behind a reference.
    pub fn narrow(obj: &ObjectRef) -> Option<Arc<RtObject>> {
        obj.narrow::<Arc<RtObject>>()
    }

    pub fn orb(&self) -> &Arc<Orb> {
        &self.orb
    }

    pub fn object_ref(&self) -> Option<ObjectRef> {
        self.objref.read().clone()
    }

    pub fn instance_name(&self) -> String {
        self.properties.read().get_property("instance_name")
    }

    pub fn set_instance_name(&self, name: &str) {
        self.properties.write().set_property("instance_name", name);
    }

    pub fn type_name(&self) -> String {
        self.properties.read().get_property("type_name")
    }

    pub fn category(&self) -> String {
        self.properties.read().get_property("category")
    }

    pub fn properties(&self) -> Properties {
        self.properties.read().clone()
    }

    pub fn set_property(&self, key: &str, value: &str) {
        self.properties.write().set_property(key, value);
    }

    pub fn get_component_profile(&self) -> ComponentProfile {
        let props = self.properties.read();
        ComponentProfile {
            instance_name: props.get_property("instance_name"),
            type_name: props.get_property("type_name"),
            description: props.get_property("description"),
            version: props.get_property("version"),
            vendor: props.get_property("vendor"),
            category: props.get_property("category"),
            port_profiles: self.ports.get_port_profiles(),
            properties: nvutil::from_properties(&props),
        }
    }

    // ---- callbacks ----------------------------------------------------

    /// Take the callback lock. The calling thread is recorded until the
    /// guard drops so re-entrant requests can be detected.
    pub(crate) fn lock_action(&self) -> ActionGuard<'_> {
        let action = self.action.lock();
        *self.callback_thread.lock() = Some(thread::current().id());
        ActionGuard {
            owner: self,
            action,
        }
    }

    /// `true` if the current thread holds the callback lock, i.e. is
    /// running one of this component's callbacks.
    pub fn in_callback(&self) -> bool {
        *self.callback_thread.lock() == Some(thread::current().id())
    }

    /// Run `on_initialize` once; later calls return the first result.
    pub fn initialize(&self) -> ReturnCode {
        if let Some(rc) = *self.initialized.lock() {
            return rc;
        }
        if self.in_callback() {
            return ReturnCode::PreconditionNotMet;
        }
        let mut action = self.lock_action();
        let mut initialized = self.initialized.lock();
        if let Some(rc) = *initialized {
            return rc;
        }
        let rc = action.call("on_initialize", |a| a.on_initialize());
        if rc.is_ok() {
            self.config.update();
        } else {
            log::warn!("[rtc] {}: on_initialize returned {}", self.instance_name(), rc);
        }
        *initialized = Some(rc);
        rc
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.lock().is_some()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Run `on_finalize`, stop owned contexts, release ports and leave the
    /// broker. `PreconditionNotMet` while any context still lists the
    /// component.
    pub fn finalize(self: &Arc<Self>) -> ReturnCode {
        if self.is_finalized() {
            return ReturnCode::Ok;
        }
        if self.in_callback() || !self.attached_contexts().is_empty() {
            return ReturnCode::PreconditionNotMet;
        }

        let rc = {
            let mut action = self.lock_action();
            action.call("on_finalize", |a| a.on_finalize())
        };
        if !rc.is_ok() {
            log::warn!("[rtc] {}: on_finalize returned {}", self.instance_name(), rc);
        }

        let owned: Vec<Arc<dyn ExecutionContext>> = self.owned.write().drain(..).collect();
        for ec in owned {
            if ec.is_running() {
                ec.stop();
            }
            if let Some(obj) = ec.core().object_ref() {
                self.orb.poa().deactivate_object(obj.id());
            }
        }
        self.participating.write().clear();
        self.ports.finalize_ports();
        let obj = self.objref.write().take();
        if let Some(obj) = obj {
            self.orb.poa().deactivate_object(obj.id());
        }
        self.finalized.store(true, Ordering::Release);
        log::debug!("[rtc] {} finalized", self.instance_name());
        rc
    }

    /// Deactivate in and detach from every context, then finalize.
    pub fn exit(self: &Arc<Self>) -> ReturnCode {
        if self.in_callback() {
            return ReturnCode::PreconditionNotMet;
        }
        for ec in self.attached_contexts() {
            if ec.get_component_state(self) == LifeCycleState::Active {
                let rc = ec.deactivate_component(self);
                if !rc.is_ok() {
                    log::warn!("[rtc] {}: deactivate on exit returned {}", self.instance_name(), rc);
                }
            }
            let rc = ec.remove_component(self);
            if !rc.is_ok() {
                log::warn!("[rtc] {}: detach on exit returned {}", self.instance_name(), rc);
            }
        }
        self.finalize()
    }

    // ---- execution contexts ------------------------------------------

    /// Record `ec` as owned by this component; returns its handle.
    pub fn bind_context(&self, ec: Arc<dyn ExecutionContext>) -> ExecutionContextHandle {
        let mut owned = self.owned.write();
        if let Some(idx) = owned.iter().position(|c| c.id() == ec.id()) {
            return idx as ExecutionContextHandle;
        }
        if let Some(obj) = self.object_ref() {
            ec.core().set_owner(obj);
        }
        owned.push(ec);
        (owned.len() - 1) as ExecutionContextHandle
    }

    /// Record participation in a context owned by someone else.
    pub(crate) fn attach_context(&self, ec: Arc<dyn ExecutionContext>) -> ExecutionContextHandle {
        if let Some(handle) = self.handle_of(ec.id()) {
            return handle;
        }
        let handle = {
            let mut next = self.next_handle.lock();
            let handle = *next;
            *next += 1;
            handle
        };
        self.participating.write().push((handle, ec));
        handle
    }

    pub(crate) fn detach_context(&self, ec_id: u64) {
        self.participating.write().retain(|(_, c)| c.id() != ec_id);
    }

    /// Handle this component uses for the context with id `ec_id`.
    pub fn handle_of(&self, ec_id: u64) -> Option<ExecutionContextHandle> {
        if let Some(idx) = self.owned.read().iter().position(|c| c.id() == ec_id) {
            return Some(idx as ExecutionContextHandle);
        }
        self.participating
            .read()
            .iter()
            .find(|(_, c)| c.id() == ec_id)
            .map(|(h, _)| *h)
    }

    pub fn get_context(&self, handle: ExecutionContextHandle) -> Option<Arc<dyn ExecutionContext>> {
        if handle < PARTICIPATING_HANDLE_BASE {
            return self.owned.read().get(handle as usize).cloned();
        }
        self.participating
            .read()
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, c)| Arc::clone(c))
    }

    pub fn get_owned_contexts(&self) -> Vec<Arc<dyn ExecutionContext>> {
        self.owned.read().clone()
    }

    pub fn get_participating_contexts(&self) -> Vec<Arc<dyn ExecutionContext>> {
        self.participating
            .read()
            .iter()
            .map(|(_, c)| Arc::clone(c))
            .collect()
    }

    /// Contexts that currently list this component.
    fn attached_contexts(self: &Arc<Self>) -> Vec<Arc<dyn ExecutionContext>> {
        self.get_owned_contexts()
            .into_iter()
            .chain(self.get_participating_contexts())
            .filter(|ec| ec.has_component(self))
            .collect()
    }

    /// `true` if `ec` drives this component in a live state.
    pub fn is_alive(self: &Arc<Self>, ec: &dyn ExecutionContext) -> bool {
        ec.has_component(self)
            && matches!(
                ec.get_component_state(self),
                LifeCycleState::Inactive | LifeCycleState::Active | LifeCycleState::Error
            )
    }

    // ---- ports --------------------------------------------------------

    pub fn port_admin(&self) -> &PortAdmin {
        &self.ports
    }

    pub fn get_ports(&self) -> Vec<PortRef> {
        self.ports.get_port_refs()
    }

    /// Register an already built port (e.g. a `CorbaPort`).
    pub fn add_port(&self, port: Arc<dyn PortOps>) -> ReturnCode {
        if let Some(obj) = self.object_ref() {
            port.base().set_owner(obj);
        }
        let rc = self.ports.add_port(Arc::clone(&port));
        if !rc.is_ok() {
            port.release_endpoints();
            port.base().deactivate();
        }
        rc
    }

    pub fn add_in_port<T: DataType>(
        &self,
        name: &str,
        props: &Properties,
    ) -> Result<Arc<InPort<T>>, ReturnCode> {
        if self.ports.get_port(name).is_some() {
            return Err(ReturnCode::PreconditionNotMet);
        }
        let port = InPort::<T>::new(name, &self.orb, props);
        match self.add_port(port.clone()) {
            ReturnCode::Ok => Ok(port),
            rc => Err(rc),
        }
    }

    pub fn add_out_port<T: DataType>(
        &self,
        name: &str,
        props: &Properties,
    ) -> Result<Arc<OutPort<T>>, ReturnCode> {
        if self.ports.get_port(name).is_some() {
            return Err(ReturnCode::PreconditionNotMet);
        }
        let port = OutPort::<T>::new(name, &self.orb, props);
        match self.add_port(port.clone()) {
            ReturnCode::Ok => Ok(port),
            rc => Err(rc),
        }
    }

    /// Disconnect and drop the named port.
    pub fn remove_port(&self, name: &str) -> ReturnCode {
        self.ports.remove_port(name)
    }

    // ---- configuration ------------------------------------------------

    pub fn config(&self) -> &ConfigAdmin {
        &self.config
    }

    pub fn bind_parameter<T>(&self, name: &str, default: &str) -> Option<ConfigParam<T>>
    where
        T: FromStr + Send + Sync + 'static,
    {
        self.config.bind_parameter(name, default)
    }

    pub fn activate_configuration_set(&self, name: &str) -> ReturnCode {
        if self.config.activate_configuration_set(name) {
            ReturnCode::Ok
        } else {
            ReturnCode::BadParameter
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimedLong;
    use crate::port::CorbaPort;

    struct Counting {
        init: Arc<parking_lot::Mutex<u32>>,
    }

    impl ComponentAction for Counting {
        fn on_initialize(&mut self) -> ReturnCode {
            *self.init.lock() += 1;
            ReturnCode::Ok
        }
    }

    fn props(name: &str) -> Properties {
        Properties::from_list(&[
            "instance_name", name,
            "type_name", "Counter",
            "category", "test",
            "conf.default.gain", "2",
            "",
        ])
    }

    #[test]
    fn test_initialize_runs_once() {
        let orb = Arc::new(Orb::new("test"));
        let count = Arc::new(parking_lot::Mutex::new(0));
        let init = Arc::clone(&count);
        let rtobj = RtObject::with_action(&orb, props("c0"), move |_| Box::new(Counting { init }));
        assert_eq!(rtobj.initialize(), ReturnCode::Ok);
        assert_eq!(rtobj.initialize(), ReturnCode::Ok);
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_ports_and_profile() {
        let orb = Arc::new(Orb::new("test"));
        let rtobj = RtObject::new(&orb, props("c1"));
        let out = rtobj
            .add_out_port::<TimedLong>("out", &Properties::new())
            .expect("add out");
        assert!(rtobj.add_in_port::<TimedLong>("out", &Properties::new()).is_err());
        rtobj
            .add_in_port::<TimedLong>("in", &Properties::new())
            .expect("add in");
        assert_eq!(rtobj.add_port(CorbaPort::new("svc", &orb)), ReturnCode::Ok);

        assert_eq!(out.base().owner(), rtobj.object_ref());
        let profile = rtobj.get_component_profile();
        assert_eq!(profile.instance_name, "c1");
        assert_eq!(profile.type_name, "Counter");
        assert_eq!(profile.port_profiles.len(), 3);

        assert_eq!(rtobj.remove_port("in"), ReturnCode::Ok);
        assert_eq!(rtobj.remove_port("in"), ReturnCode::BadParameter);
        assert_eq!(rtobj.get_ports().len(), 2);
    }

    #[test]
    fn test_config_from_properties() {
        let orb = Arc::new(Orb::new("test"));
        let rtobj = RtObject::new(&orb, props("c2"));
        let gain = rtobj.bind_parameter::<i32>("gain", "0").expect("bind gain");
        assert_eq!(gain.get(), 2);
        assert_eq!(rtobj.activate_configuration_set("nope"), ReturnCode::BadParameter);
    }

    #[test]
    fn test_finalize_leaves_broker() {
        let orb = Arc::new(Orb::new("test"));
        let rtobj = RtObject::new(&orb, props("c3"));
        let out = rtobj
            .add_out_port::<TimedLong>("out", &Properties::new())
            .expect("add out");
        let obj = rtobj.object_ref().expect("activated");
        assert!(RtObject::narrow(&obj).is_some());

        assert_eq!(rtobj.finalize(), ReturnCode::Ok);
        assert!(rtobj.is_finalized());
        assert!(!obj.is_active());
        assert!(out.base().object_ref().is_none());
        assert!(rtobj.get_ports().is_empty());
    }
}
