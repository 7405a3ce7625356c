// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-level orchestration: factories, component registry, naming,
//! modules and the broker event loop.
//!
//! # Lifecycle
//!
//! ```text
//! Manager::init(args) / Manager::new(config)
//!   +-- broker (Orb), timer, naming, module manager, EC factories
//!   +-- manager servant (unless -a / manager.corba_servant: NO)
//! activate_manager()
//!   +-- preload modules, bind the servant, start the timer,
//!       schedule naming refresh, pre-create components
//! run_manager(no_block)
//! shutdown()
//!   +-- exit and destroy components, unbind names, stop the timer,
//!       stop the broker, release join()
//! ```
//!
//! A manager is an ordinary value passed to whoever needs it;
//! [`Manager::instance`] is only an accessor for the one created by
//! [`Manager::init`].

mod factory;
mod module;
mod naming;
mod numbering;
mod object_manager;
mod servant;

pub use factory::{ComponentDtor, ComponentFactory, FactoryBase};
pub use module::{register_module, registered_modules, ModuleInitFn, ModuleManager};
pub use naming::{format_name, hostname, NamingManager};
pub use numbering::{DefaultNumberingPolicy, NumberingPolicy};
pub use object_manager::ObjectManager;
pub use servant::{ManagerServant, MANAGER_REPOSITORY_ID};

use crate::broker::{ObjectRef, Orb};
use crate::config::{build_config, CommandLine, RuntimeConfig};
use crate::ec::{builtin_factories, ExecutionContext, ExecutionContextCtor, EXECUTION_CONTEXT_REPOSITORY_ID};
use crate::error::{Error, Result};
use crate::rtc::{ComponentCtor, ReturnCode, RtObject};
use crate::time::{ListenerId, TimeValue, Timer};
use crate::util::string_util;
use crate::Properties;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, JoinHandle};

static INSTANCE: OnceLock<Mutex<Weak<Manager>>> = OnceLock::new();

fn instance_slot() -> &'static Mutex<Weak<Manager>> {
    INSTANCE.get_or_init(|| Mutex::new(Weak::new()))
}

/// Split `Type?key=value&key=value` into the type name and overrides.
pub fn parse_component_args(args: &str) -> Result<(String, Properties)> {
    let (type_name, query) = match args.split_once('?') {
        Some((type_name, query)) => (type_name.trim(), query),
        None => (args.trim(), ""),
    };
    if type_name.is_empty() {
        return Err(Error::InvalidArgument(format!("no component type in '{}'", args)));
    }
    let mut overrides = Properties::new();
    for pair in query.split('&').filter(|p| !p.trim().is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::InvalidArgument(format!("expected key=value, got '{}'", pair)))?;
        overrides.set_property(key.trim(), value.trim());
    }
    Ok((type_name.to_string(), overrides))
}

pub struct Manager {
    config: RuntimeConfig,
    orb: Arc<Orb>,
    timer: Option<Timer>,
    naming: Option<NamingManager>,
    modules: ModuleManager,
    factories: ObjectManager<Arc<dyn FactoryBase>>,
    ec_factories: ObjectManager<(String, ExecutionContextCtor)>,
    components: ObjectManager<Arc<RtObject>>,
    servant: Mutex<Option<ObjectRef>>,
    naming_listener: Mutex<Option<ListenerId>>,
    orb_thread: Mutex<Option<JoinHandle<()>>>,
    terminate_tx: Mutex<Option<Sender<()>>>,
    terminated: Receiver<()>,
    shutting_down: AtomicBool,
    this: Weak<Manager>,
}

impl Manager {
    /// Process entry point: parse `args` (without the program name),
    /// build the configuration, install the logger and create the
    /// process manager. Returns the existing one if it is still alive.
    pub fn init<S: AsRef<str>>(args: &[S]) -> Result<Arc<Manager>> {
        let mut slot = instance_slot().lock();
        if let Some(manager) = slot.upgrade() {
            return Ok(manager);
        }
        let cmd = CommandLine::parse(args)?;
        let config = build_config(&cmd)?;
        if let Err(e) = crate::logging::init_from_config(&config) {
            eprintln!("rtm: logger setup failed: {}", e);
        }
        let manager = Manager::new(config)?;
        *slot = Arc::downgrade(&manager);
        log::info!("[manager] {} initialized", manager.name());
        Ok(manager)
    }

    /// The manager created by [`init`](Self::init), while it lives.
    pub fn instance() -> Option<Arc<Manager>> {
        instance_slot().lock().upgrade()
    }

    /// Create a manager from a complete configuration (see
    /// [`config::default_config`](crate::config::default_config)).
    pub fn new(config: Properties) -> Result<Arc<Manager>> {
        let orb = Arc::new(Orb::new(&config.get_property_or("corba.id", "inproc")));

        let timer = if string_util::is_yes(&config.get_property("timer.enable")) {
            let tick = parse_seconds(&config, "timer.tick")?;
            Some(Timer::new(TimeValue::from_secs_f64(tick)))
        } else {
            None
        };
        let naming = if string_util::is_yes(&config.get_property("naming.enable")) {
            Some(NamingManager::new(&orb, &config))
        } else {
            None
        };
        let modules = ModuleManager::new(&config);
        let with_servant = string_util::to_bool(&config.get_property("manager.corba_servant"), "YES", "NO", true);
        let (terminate_tx, terminated) = channel::bounded(1);

        let manager = Arc::new_cyclic(|this| Manager {
            config: RuntimeConfig::new(config),
            orb,
            timer,
            naming,
            modules,
            factories: ObjectManager::new(|f: &Arc<dyn FactoryBase>| f.type_name()),
            ec_factories: ObjectManager::new(|e: &(String, ExecutionContextCtor)| e.0.clone()),
            components: ObjectManager::new(|c: &Arc<RtObject>| c.instance_name()),
            servant: Mutex::new(None),
            naming_listener: Mutex::new(None),
            orb_thread: Mutex::new(None),
            terminate_tx: Mutex::new(Some(terminate_tx)),
            terminated,
            shutting_down: AtomicBool::new(false),
            this: this.clone(),
        });

        for (name, ctor) in builtin_factories() {
            manager.ec_factories.register((name.to_string(), ctor));
        }
        if with_servant {
            let servant = Arc::new(ManagerServant::new(Arc::downgrade(&manager)));
            let obj = manager.orb.poa().activate_object(MANAGER_REPOSITORY_ID, servant);
            *manager.servant.lock() = Some(obj);
        }
        Ok(manager)
    }

    /// Preload modules, publish the manager servant, start the timer and
    /// the naming refresh, then pre-create components. Module and
    /// component failures are logged and skipped.
    pub fn activate_manager(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::ManagerShutdown);
        }
        let config = self.config.snapshot();

        for module in string_util::split(&config.get_property("manager.modules.preload"), ",") {
            if let Err(e) = self.load(&module, "") {
                log::error!("[manager] preload {} failed: {}", module, e);
            }
        }

        if let (Some(naming), Some(obj)) = (&self.naming, self.servant_ref()) {
            for name in naming.manager_names() {
                naming.bind_object(&name, &obj);
            }
        }

        if let Some(timer) = &self.timer {
            timer.start();
        }
        if string_util::is_yes(&config.get_property("naming.update.enable")) && self.naming.is_some() {
            match &self.timer {
                Some(timer) => {
                    let interval = parse_seconds(&config, "naming.update.interval")?;
                    let this = self.this.clone();
                    let id = timer.register_fn(TimeValue::from_secs_f64(interval), move || {
                        if let Some(manager) = this.upgrade() {
                            if let Some(naming) = manager.naming() {
                                naming.update();
                            }
                        }
                    });
                    *self.naming_listener.lock() = Some(id);
                }
                None => log::warn!("[manager] naming.update.enable needs timer.enable"),
            }
        }

        for args in string_util::split(&config.get_property("manager.components.precreate"), ",") {
            if let Err(e) = self.create_component(&args) {
                log::error!("[manager] precreate {} failed: {}", args, e);
            }
        }
        log::info!("[manager] {} active", self.name());
        Ok(())
    }

    /// Run the broker event loop. Blocks until [`shutdown`](Self::shutdown)
    /// unless `no_block`, in which case the loop gets its own thread.
    pub fn run_manager(&self, no_block: bool) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::ManagerShutdown);
        }
        if !no_block {
            self.orb.run();
            return Ok(());
        }
        let mut slot = self.orb_thread.lock();
        if slot.is_some() {
            return Ok(());
        }
        let orb = Arc::clone(&self.orb);
        let handle = thread::Builder::new()
            .name("rtm-orb".to_string())
            .spawn(move || orb.run())?;
        *slot = Some(handle);
        Ok(())
    }

    /// Exit and destroy every component, unbind names, stop the timer and
    /// the broker. Idempotent. Must not be called from a component
    /// callback; use [`terminate`](Self::terminate) there.
    pub fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        log::info!("[manager] {} shutting down", self.name());

        if let (Some(timer), Some(id)) = (&self.timer, self.naming_listener.lock().take()) {
            timer.unregister_listener(id);
        }

        let mut components = self.components.objects();
        components.reverse();
        for comp in components {
            if let Err(e) = self.cleanup_component(&comp) {
                log::warn!("[manager] {}: {}", comp.instance_name(), e);
            }
        }

        if let Some(naming) = &self.naming {
            naming.unbind_all();
        }
        if let Some(obj) = self.servant.lock().take() {
            self.orb.poa().deactivate_object(obj.id());
        }
        if let Some(timer) = &self.timer {
            timer.stop();
        }
        self.modules.unload_all();
        self.orb.shutdown();

        let handle = self.orb_thread.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        self.terminate_tx.lock().take();
        log::info!("[manager] {} shut down", self.name());
    }

    /// Shut down from a new thread; returns at once.
    pub fn terminate(&self) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let spawned = thread::Builder::new()
            .name("rtm-terminator".to_string())
            .spawn(move || this.shutdown());
        if let Err(e) = spawned {
            log::error!("[manager] failed to spawn terminator: {}", e);
        }
    }

    /// Block until [`shutdown`](Self::shutdown) has completed.
    pub fn join(&self) {
        let _ = self.terminated.recv();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    // ---- factories ----------------------------------------------------

    /// Register a [`ComponentFactory`] for `profile.type_name`.
    pub fn register_factory(&self, profile: Properties, ctor: ComponentCtor) -> Result<()> {
        self.register_factory_with(Arc::new(ComponentFactory::new(profile, ctor)))
    }

    pub fn register_factory_with(&self, factory: Arc<dyn FactoryBase>) -> Result<()> {
        let type_name = factory.type_name();
        if type_name.is_empty() {
            return Err(Error::InvalidArgument("factory profile has no type_name".to_string()));
        }
        if !self.factories.register(factory) {
            return Err(Error::FactoryExists(type_name));
        }
        log::debug!("[manager] factory {} registered", type_name);
        Ok(())
    }

    pub fn unregister_factory(&self, type_name: &str) -> Result<()> {
        self.factories
            .unregister(type_name)
            .map(|_| ())
            .ok_or_else(|| Error::UnknownFactory(type_name.to_string()))
    }

    pub fn get_factory_profiles(&self) -> Vec<Properties> {
        self.factories
            .objects()
            .iter()
            .map(|f| f.profile().clone())
            .collect()
    }

    pub fn register_ec_factory(&self, type_name: &str, ctor: ExecutionContextCtor) -> Result<()> {
        if !self.ec_factories.register((type_name.to_string(), ctor)) {
            return Err(Error::FactoryExists(type_name.to_string()));
        }
        Ok(())
    }

    pub fn get_ec_factory_names(&self) -> Vec<String> {
        self.ec_factories.objects().into_iter().map(|(name, _)| name).collect()
    }

    /// Build a context of `type_name` and activate it in the broker.
    pub fn create_context(&self, type_name: &str, props: &Properties) -> Result<Arc<dyn ExecutionContext>> {
        let (_, ctor) = self
            .ec_factories
            .find(type_name)
            .ok_or_else(|| Error::UnknownFactory(type_name.to_string()))?;
        let ec = ctor(props);
        let obj = self
            .orb
            .poa()
            .activate_object(EXECUTION_CONTEXT_REPOSITORY_ID, Arc::clone(&ec));
        ec.core().set_object(obj);
        Ok(ec)
    }

    // ---- components ---------------------------------------------------

    /// Create, initialize, attach to a fresh owned context and register a
    /// component. `args` is a type name optionally followed by
    /// `?key=value&...` property overrides.
    pub fn create_component(&self, args: &str) -> Result<Arc<RtObject>> {
        if self.is_shut_down() {
            return Err(Error::ManagerShutdown);
        }
        let (type_name, overrides) = parse_component_args(args)?;
        let factory = self
            .factories
            .find(&type_name)
            .ok_or_else(|| Error::UnknownFactory(type_name.clone()))?;
        let wanted = overrides.get_property("instance_name");
        if !wanted.is_empty() && self.components.contains(&wanted) {
            return Err(Error::InvalidArgument(format!("instance name '{}' in use", wanted)));
        }

        let comp = factory
            .create(self, &overrides)
            .ok_or(Error::Lifecycle(ReturnCode::Error))?;

        let rc = self.bind_execution_context(&comp);
        if !rc.is_ok() {
            log::error!("[manager] {}: startup failed ({})", comp.instance_name(), rc);
            comp.exit();
            factory.destroy(&comp);
            return Err(Error::Lifecycle(rc));
        }
        if !self.register_component(&comp) {
            comp.exit();
            factory.destroy(&comp);
            return Err(Error::InvalidArgument(format!(
                "instance name '{}' in use",
                comp.instance_name()
            )));
        }
        log::info!("[manager] component {} created", comp.instance_name());
        Ok(comp)
    }

    /// Create the component's own context (`exec_cxt.periodic.type` and
    /// `exec_cxt.periodic.rate`, component properties first), attach the
    /// component and start the context.
    pub fn bind_execution_context(&self, comp: &Arc<RtObject>) -> ReturnCode {
        let props = comp.properties();
        let config = self.config.snapshot();
        let pick = |key: &str| {
            let own = props.get_property(key);
            if own.is_empty() {
                config.get_property(key)
            } else {
                own
            }
        };
        let ec_type = pick("exec_cxt.periodic.type");
        let mut ec_props = Properties::new();
        ec_props.set_property("rate", pick("exec_cxt.periodic.rate"));

        let ec = match self.create_context(&ec_type, &ec_props) {
            Ok(ec) => ec,
            Err(e) => {
                log::error!("[manager] {}: {}", comp.instance_name(), e);
                return ReturnCode::BadParameter;
            }
        };
        comp.bind_context(Arc::clone(&ec));
        let rc = ec.add_component(comp);
        if !rc.is_ok() {
            return rc;
        }
        ec.start()
    }

    /// Exit, unregister and destroy the component.
    pub fn delete_component(&self, instance_name: &str) -> Result<()> {
        let comp = self
            .components
            .find(instance_name)
            .ok_or_else(|| Error::ComponentNotFound(instance_name.to_string()))?;
        self.cleanup_component(&comp)?;
        log::info!("[manager] component {} deleted", instance_name);
        Ok(())
    }

    fn cleanup_component(&self, comp: &Arc<RtObject>) -> Result<()> {
        let rc = comp.exit();
        if !rc.is_ok() {
            return Err(Error::Lifecycle(rc));
        }
        self.unregister_component(comp);
        if let Some(factory) = self.factories.find(&comp.type_name()) {
            factory.destroy(comp);
        }
        Ok(())
    }

    /// Add to the registry and bind in the name services. `false` if the
    /// instance name is taken.
    pub fn register_component(&self, comp: &Arc<RtObject>) -> bool {
        if !self.components.register(Arc::clone(comp)) {
            return false;
        }
        if let Some(naming) = &self.naming {
            naming.bind_component(comp);
        }
        true
    }

    pub fn unregister_component(&self, comp: &Arc<RtObject>) -> bool {
        if self.components.unregister(&comp.instance_name()).is_none() {
            return false;
        }
        if let Some(naming) = &self.naming {
            naming.unbind_component(comp);
        }
        true
    }

    pub fn get_component(&self, instance_name: &str) -> Option<Arc<RtObject>> {
        self.components.find(instance_name)
    }

    pub fn get_components(&self) -> Vec<Arc<RtObject>> {
        self.components.objects()
    }

    // ---- configuration and modules -----------------------------------

    pub fn get_config(&self) -> Arc<Properties> {
        self.config.snapshot()
    }

    pub fn set_config(&self, key: &str, value: &str) {
        self.config.set(key, value);
    }

    pub fn name(&self) -> String {
        self.config.get("manager.name")
    }

    /// Load a module and run its initialization function. An empty
    /// `init_func` selects the default symbol.
    pub fn load(&self, path: &str, init_func: &str) -> Result<()> {
        let name = self.modules.load(path)?;
        let init = self.modules.symbol(&name, init_func)?;
        if let Err(e) = init(self) {
            log::error!("[manager] module {} init failed: {}", name, e);
            let _ = self.modules.unload(&name);
            return Err(Error::ModuleInitFailed(format!("{}: {}", name, e)));
        }
        Ok(())
    }

    pub fn unload(&self, path: &str) -> Result<()> {
        self.modules.unload(path)
    }

    pub fn modules(&self) -> &ModuleManager {
        &self.modules
    }

    // ---- services -----------------------------------------------------

    pub fn orb(&self) -> &Arc<Orb> {
        &self.orb
    }

    pub fn timer(&self) -> Option<&Timer> {
        self.timer.as_ref()
    }

    pub fn naming(&self) -> Option<&NamingManager> {
        self.naming.as_ref()
    }

    /// Reference to the manager servant, unless disabled.
    pub fn servant_ref(&self) -> Option<ObjectRef> {
        self.servant.lock().clone()
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn parse_seconds(config: &Properties, key: &str) -> Result<f64> {
    let raw = config.get_property(key);
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs > 0.0 && secs.is_finite() => Ok(secs),
        _ => Err(Error::InvalidArgument(format!("{}: '{}' is not a positive number of seconds", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::ec::EXT_TRIG_EC_TYPE;
    use crate::rtc::{ComponentAction, LifeCycleState};

    struct Idle;
    impl ComponentAction for Idle {}

    struct FailingInit;
    impl ComponentAction for FailingInit {
        fn on_initialize(&mut self) -> ReturnCode {
            ReturnCode::Error
        }
    }

    fn quiet_config() -> Properties {
        let mut config = default_config();
        config.set_property("naming.enable", "NO");
        config.set_property("timer.enable", "NO");
        config.set_property("exec_cxt.periodic.type", EXT_TRIG_EC_TYPE);
        config
    }

    fn idle_ctor() -> ComponentCtor {
        Arc::new(|_: &Arc<RtObject>| Box::new(Idle) as Box<dyn ComponentAction>)
    }

    #[test]
    fn test_parse_component_args() {
        let (type_name, props) = parse_component_args("Motor?instance_name=left&exec_cxt.periodic.rate=50")
            .expect("parse");
        assert_eq!(type_name, "Motor");
        assert_eq!(props.get_property("instance_name"), "left");
        assert_eq!(props.get_property("exec_cxt.periodic.rate"), "50");
        assert!(parse_component_args("?a=b").is_err());
        assert!(parse_component_args("Motor?novalue").is_err());
    }

    #[test]
    fn test_create_and_delete_component() {
        let manager = Manager::new(quiet_config()).expect("manager");
        manager
            .register_factory(Properties::from_list(&["type_name", "Motor", ""]), idle_ctor())
            .expect("register");
        assert!(matches!(
            manager.register_factory(Properties::from_list(&["type_name", "Motor", ""]), idle_ctor()),
            Err(Error::FactoryExists(_))
        ));

        let comp = manager.create_component("Motor").expect("create");
        assert_eq!(comp.instance_name(), "Motor0");
        let ec = comp.get_context(0).expect("owned context");
        assert!(ec.is_running());
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);
        assert!(manager.get_component("Motor0").is_some());

        manager.delete_component("Motor0").expect("delete");
        assert!(comp.is_finalized());
        assert!(!ec.is_running());
        assert!(manager.get_components().is_empty());
        assert!(matches!(manager.delete_component("Motor0"), Err(Error::ComponentNotFound(_))));
        manager.shutdown();
    }

    #[test]
    fn test_failed_initialize_is_rolled_back() {
        let manager = Manager::new(quiet_config()).expect("manager");
        manager
            .register_factory(
                Properties::from_list(&["type_name", "Broken", ""]),
                Arc::new(|_: &Arc<RtObject>| Box::new(FailingInit) as Box<dyn ComponentAction>),
            )
            .expect("register");
        assert!(matches!(
            manager.create_component("Broken"),
            Err(Error::Lifecycle(ReturnCode::Error))
        ));
        assert!(manager.get_components().is_empty());
        assert!(matches!(manager.create_component("Nope"), Err(Error::UnknownFactory(_))));
        manager.shutdown();
    }

    #[test]
    fn test_unknown_context_type() {
        let mut config = quiet_config();
        config.set_property("exec_cxt.periodic.type", "NoSuchContext");
        let manager = Manager::new(config).expect("manager");
        manager
            .register_factory(Properties::from_list(&["type_name", "Motor", ""]), idle_ctor())
            .expect("register");
        assert!(matches!(
            manager.create_component("Motor"),
            Err(Error::Lifecycle(ReturnCode::BadParameter))
        ));
        manager.shutdown();
    }

    #[test]
    fn test_run_manager_non_blocking_and_join() {
        let manager = Manager::new(quiet_config()).expect("manager");
        manager.activate_manager().expect("activate");
        manager.run_manager(true).expect("run");
        assert!(manager.orb().is_running());

        manager.terminate();
        manager.join();
        assert!(manager.is_shut_down());
        assert!(!manager.orb().is_running());
        assert!(manager.create_component("Motor").is_err());
    }

    #[test]
    fn test_invalid_timer_tick() {
        let mut config = default_config();
        config.set_property("timer.tick", "fast");
        assert!(matches!(Manager::new(config), Err(Error::InvalidArgument(_))));
    }
}
