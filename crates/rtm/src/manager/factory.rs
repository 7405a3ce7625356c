// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Component factories.

use super::numbering::{DefaultNumberingPolicy, NumberingPolicy};
use super::Manager;
use crate::rtc::{ComponentCtor, RtObject};
use crate::Properties;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Called on a component before the factory forgets it.
pub type ComponentDtor = Arc<dyn Fn(&Arc<RtObject>) + Send + Sync>;

/// Creates and destroys components of one type.
pub trait FactoryBase: Send + Sync {
    /// Type description: `type_name`, `description`, `version`, `vendor`,
    /// `category`, plus default configuration under `conf.*`.
    fn profile(&self) -> &Properties;

    /// Build a component. `overrides` are merged over the profile before
    /// construction. The instance name is `<type_name><suffix>` unless
    /// `overrides` sets `instance_name`.
    fn create(&self, manager: &Manager, overrides: &Properties) -> Option<Arc<RtObject>>;

    /// Release the numbering slot and run the destructor.
    fn destroy(&self, comp: &Arc<RtObject>);

    /// Live components created by this factory.
    fn number(&self) -> usize;

    fn type_name(&self) -> String {
        self.profile().get_property("type_name")
    }
}

pub struct ComponentFactory {
    profile: Properties,
    ctor: ComponentCtor,
    dtor: Option<ComponentDtor>,
    policy: Box<dyn NumberingPolicy>,
    number: AtomicUsize,
}

impl ComponentFactory {
    pub fn new(profile: Properties, ctor: ComponentCtor) -> Self {
        Self {
            profile,
            ctor,
            dtor: None,
            policy: Box::new(DefaultNumberingPolicy::new()),
            number: AtomicUsize::new(0),
        }
    }

    pub fn with_destructor(mut self, dtor: ComponentDtor) -> Self {
        self.dtor = Some(dtor);
        self
    }

    pub fn with_numbering_policy(mut self, policy: Box<dyn NumberingPolicy>) -> Self {
        self.policy = policy;
        self
    }
}

impl FactoryBase for ComponentFactory {
    fn profile(&self) -> &Properties {
        &self.profile
    }

    fn create(&self, manager: &Manager, overrides: &Properties) -> Option<Arc<RtObject>> {
        let mut props = self.profile.clone();
        props.merge(overrides);
        let explicit_name = props.get_property("instance_name");

        let ctor = Arc::clone(&self.ctor);
        let comp = RtObject::with_action(manager.orb(), props, |rtobj| ctor(rtobj));
        let suffix = self.policy.on_create(&comp);
        if explicit_name.is_empty() {
            comp.set_instance_name(&format!("{}{}", self.type_name(), suffix));
        }
        self.number.fetch_add(1, Ordering::AcqRel);
        log::debug!("[factory] created {}", comp.instance_name());
        Some(comp)
    }

    fn destroy(&self, comp: &Arc<RtObject>) {
        self.policy.on_delete(comp);
        if let Some(dtor) = &self.dtor {
            dtor(comp);
        }
        let _ = self
            .number
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        log::debug!("[factory] destroyed {}", comp.instance_name());
    }

    fn number(&self) -> usize {
        self.number.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::rtc::ComponentAction;

    struct Idle;
    impl ComponentAction for Idle {}

    fn factory() -> ComponentFactory {
        let profile = Properties::from_list(&["type_name", "Sensor", "category", "test", ""]);
        ComponentFactory::new(profile, Arc::new(|_: &Arc<RtObject>| Box::new(Idle) as Box<dyn ComponentAction>))
    }

    #[test]
    fn test_instance_names_follow_numbering() {
        let mut config = default_config();
        config.set_property("naming.enable", "NO");
        config.set_property("timer.enable", "NO");
        let manager = Manager::new(config).expect("manager");
        let factory = factory();

        let a = factory.create(&manager, &Properties::new()).expect("create a");
        let b = factory.create(&manager, &Properties::new()).expect("create b");
        assert_eq!(a.instance_name(), "Sensor0");
        assert_eq!(b.instance_name(), "Sensor1");
        assert_eq!(a.category(), "test");
        assert_eq!(factory.number(), 2);

        factory.destroy(&a);
        assert_eq!(factory.number(), 1);
        let c = factory.create(&manager, &Properties::new()).expect("create c");
        assert_eq!(c.instance_name(), "Sensor0");

        let named = factory
            .create(&manager, &Properties::from_list(&["instance_name", "front", ""]))
            .expect("create named");
        assert_eq!(named.instance_name(), "front");
        manager.shutdown();
    }
}
