//! [`ModuleResources`]: the resources a module's code registered during
//! its own initialization, tracked so the manager can unload them in the
//! right order when the module is unloaded.

use crate::module_info::ModuleInfo;
use crate::resource::{Resource, RuntimeHandles};
use libloading::Library;

/// Where a module currently sits in its own lifecycle. Registration is
/// only legal during `Initializing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleStatus {
    Uninitialized,
    Initializing,
    Initialized,
    ShuttingDown,
}

/// A module's resources plus the open handle to its shared library, if
/// any (modules loaded statically into the host binary have none).
pub struct ModuleResources {
    status: ModuleStatus,
    info: ModuleInfo,
    resources: Vec<Box<dyn Resource>>,
    library: Option<Library>,
}

impl ModuleResources {
    pub fn new(info: ModuleInfo) -> Self {
        Self {
            status: ModuleStatus::Uninitialized,
            info,
            resources: Vec::new(),
            library: None,
        }
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    pub fn status(&self) -> ModuleStatus {
        self.status
    }

    /// Registers a resource which will receive the load/unload callbacks.
    /// Only legal while the module is `Initializing`.
    pub fn register(&mut self, resource: Box<dyn Resource>) {
        assert_eq!(
            self.status,
            ModuleStatus::Initializing,
            "module {} resources may only be registered while it is initializing",
            self.info.name
        );
        self.resources.push(resource);
    }

    pub(crate) fn set_library(&mut self, library: Library) {
        self.library = Some(library);
    }

    pub(crate) fn take_library(&mut self) -> Option<Library> {
        self.library.take()
    }

    pub(crate) fn begin_initializing(&mut self) {
        self.status = ModuleStatus::Initializing;
    }

    pub(crate) fn finish_initializing(&mut self) {
        self.status = ModuleStatus::Initialized;
    }

    pub(crate) fn begin_shutting_down(&mut self) {
        self.status = ModuleStatus::ShuttingDown;
    }

    /// Runs the load pass across every registered resource: all `on_load`
    /// calls, highest priority first, then all `on_initialize_after_load`
    /// calls in the same order.
    pub(crate) fn run_load(&mut self, runtime: &RuntimeHandles) {
        self.resources.sort_by_key(|r| std::cmp::Reverse(r.priority()));
        for resource in self.resources.iter_mut() {
            resource.on_load(runtime);
        }
        for resource in self.resources.iter_mut() {
            resource.on_initialize_after_load(runtime);
        }
    }

    /// Runs the unload pass across every registered resource: all
    /// `on_shutdown_before_unload` calls, lowest priority first, then all
    /// `on_unload` calls in the same order. The reverse of [`Self::run_load`]'s
    /// ordering.
    pub(crate) fn run_unload(&mut self, runtime: &RuntimeHandles) {
        self.resources.sort_by_key(|r| r.priority());
        for resource in self.resources.iter_mut() {
            resource.on_shutdown_before_unload(runtime);
        }
        for resource in self.resources.iter_mut() {
            resource.on_unload(runtime);
        }
        self.resources.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::Version;

    fn info() -> ModuleInfo {
        ModuleInfo {
            name: "Physics".into(),
            guid: "11111111-1111-1111-1111-111111111111".into(),
            description: String::new(),
            authors: String::new(),
            version: crate::module_info::VersionString(Version::new(0, 1, 0)),
            initialize_function_override: String::new(),
            shutdown_function_override: String::new(),
            dependencies: Vec::new(),
        }
    }

    #[test]
    #[should_panic]
    fn registering_outside_initializing_panics() {
        let mut resources = ModuleResources::new(info());
        struct Noop;
        impl Resource for Noop {
            fn priority(&self) -> i32 {
                0
            }
        }
        resources.register(Box::new(Noop));
    }

    #[test]
    fn registering_while_initializing_succeeds() {
        let mut resources = ModuleResources::new(info());
        resources.begin_initializing();
        struct Noop;
        impl Resource for Noop {
            fn priority(&self) -> i32 {
                0
            }
        }
        resources.register(Box::new(Noop));
        resources.finish_initializing();
        assert_eq!(resources.status(), ModuleStatus::Initialized);
    }

    #[test]
    fn load_runs_highest_priority_first() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let order: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));

        struct Recording {
            priority: i32,
            order: Rc<RefCell<Vec<i32>>>,
        }
        impl Resource for Recording {
            fn priority(&self) -> i32 {
                self.priority
            }
            fn on_load(&mut self, _runtime: &RuntimeHandles) {
                self.order.borrow_mut().push(self.priority);
            }
        }

        let mut resources = ModuleResources::new(info());
        resources.begin_initializing();
        resources.register(Box::new(Recording {
            priority: 1,
            order: order.clone(),
        }));
        resources.register(Box::new(Recording {
            priority: 5,
            order: order.clone(),
        }));
        resources.register(Box::new(Recording {
            priority: 3,
            order: order.clone(),
        }));
        resources.finish_initializing();

        let runtime = RuntimeHandles {
            context: Rc::new(RefCell::new(loom_context::Context::new(loom_context::Profiler::new()))),
            components: Rc::new(RefCell::new(loom_ecs::ComponentRegistry::new())),
            entities: Rc::new(RefCell::new(loom_ecs::EntityManager::new())),
            systems: Rc::new(RefCell::new(loom_systems::SystemsGroupRegistry::new())),
            serializers: Rc::new(RefCell::new(loom_serialize::SerializationRegistry::new())),
        };
        resources.run_load(&runtime);
        assert_eq!(*order.borrow(), vec![5, 3, 1]);
    }
}
