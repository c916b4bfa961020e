//! [`Resource`] and the standard wrappers a module's init function
//! attaches to its [`crate::module_resources::ModuleResources`].
//!
//! Each wrapper bundles one concrete registration (a subcontext, some
//! component descriptors, a systems group, a system, a serializer) with
//! the fixed priority from the resource-framework table; the module
//! manager only ever deals with them through the [`Resource`] trait.

use loom_context::{Context, Subcontext};
use loom_ecs::{ComponentDescriptor, ComponentIndex, ComponentRegistry, EntityManager};
use loom_serialize::{DynamicSerializer, SerializationRegistry};
use loom_systems::{System, SystemsGroup, SystemsGroupRegistry};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handles to every process-wide registry a [`Resource`]'s
/// callbacks may touch. Threaded explicitly through the module manager
/// rather than reached through ambient global state (see the runtime's
/// design notes on the Context singleton: passing a root handle is
/// observationally equivalent).
#[derive(Clone)]
pub struct RuntimeHandles {
    pub context: Rc<RefCell<Context>>,
    pub components: Rc<RefCell<ComponentRegistry>>,
    pub entities: Rc<RefCell<EntityManager>>,
    pub systems: Rc<RefCell<SystemsGroupRegistry>>,
    pub serializers: Rc<RefCell<SerializationRegistry>>,
}

/// A priority-ordered scoped bundle attached to a module. See the
/// resource-framework load/unload ordering in
/// [`crate::module_resources::ModuleResources`].
pub trait Resource {
    fn priority(&self) -> i32;
    fn on_load(&mut self, runtime: &RuntimeHandles) {
        let _ = runtime;
    }
    fn on_initialize_after_load(&mut self, runtime: &RuntimeHandles) {
        let _ = runtime;
    }
    fn on_shutdown_before_unload(&mut self, runtime: &RuntimeHandles) {
        let _ = runtime;
    }
    fn on_unload(&mut self, runtime: &RuntimeHandles) {
        let _ = runtime;
    }
}

/// Registers a subcontext of type `T` in the [`Context`]. Priority 5:
/// subcontexts exist before every other resource kind.
pub struct SubcontextResource<T> {
    subcontext: Rc<RefCell<T>>,
}

impl<T: Subcontext + 'static> SubcontextResource<T> {
    pub fn new(subcontext: T) -> Self {
        Self {
            subcontext: Rc::new(RefCell::new(subcontext)),
        }
    }
}

impl<T: Subcontext + 'static> Resource for SubcontextResource<T> {
    fn priority(&self) -> i32 {
        5
    }

    fn on_load(&mut self, runtime: &RuntimeHandles) {
        runtime.context.borrow_mut().register(self.subcontext.clone());
    }

    fn on_shutdown_before_unload(&mut self, runtime: &RuntimeHandles) {
        runtime.context.borrow_mut().deregister::<T>();
    }
}

/// Registers one or more [`ComponentDescriptor`]s in the
/// [`ComponentRegistry`]. Priority 3.
pub struct ComponentResource {
    descriptors: Vec<ComponentDescriptor>,
    registered: Vec<ComponentIndex>,
}

impl ComponentResource {
    pub fn new(descriptors: Vec<ComponentDescriptor>) -> Self {
        Self {
            descriptors,
            registered: Vec::new(),
        }
    }
}

impl Resource for ComponentResource {
    fn priority(&self) -> i32 {
        3
    }

    fn on_load(&mut self, runtime: &RuntimeHandles) {
        let mut registry = runtime.components.borrow_mut();
        self.registered = self
            .descriptors
            .iter()
            .cloned()
            .map(|d| registry.register(d))
            .collect();
    }

    fn on_unload(&mut self, runtime: &RuntimeHandles) {
        let mut registry = runtime.components.borrow_mut();
        for index in self.registered.drain(..) {
            registry.deregister(index);
        }
    }
}

/// Registers a [`SystemsGroup`] under key type `G`. Priority 2.
pub struct SystemsGroupResource<G> {
    group: Option<SystemsGroup>,
    _marker: std::marker::PhantomData<G>,
}

impl<G: 'static> SystemsGroupResource<G> {
    pub fn new(group: SystemsGroup) -> Self {
        Self {
            group: Some(group),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<G: 'static> Resource for SystemsGroupResource<G> {
    fn priority(&self) -> i32 {
        2
    }

    fn on_load(&mut self, runtime: &RuntimeHandles) {
        let group = self.group.take().expect("systems group resource loaded twice");
        runtime.systems.borrow_mut().register_group::<G>(group);
    }

    fn on_unload(&mut self, runtime: &RuntimeHandles) {
        runtime.systems.borrow_mut().deregister_group::<G>();
    }
}

/// Registers a [`System`] of type `T` in the group keyed by type `G`.
/// Priority 1: systems come up last, after their group and its components.
/// Within-group ordering edges between two already-registered systems are
/// added separately through `SystemsGroupRegistry::register_system_dependency`.
pub struct SystemResource<G, T> {
    system: Option<T>,
    _marker: std::marker::PhantomData<G>,
}

impl<G: 'static, T: System + 'static> SystemResource<G, T> {
    pub fn new(system: T) -> Self {
        Self {
            system: Some(system),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<G: 'static, T: System + 'static> Resource for SystemResource<G, T> {
    fn priority(&self) -> i32 {
        1
    }

    fn on_load(&mut self, runtime: &RuntimeHandles) {
        let system = self.system.take().expect("system resource loaded twice");
        runtime.systems.borrow_mut().register_system::<G, T>(system);
    }

    fn on_unload(&mut self, runtime: &RuntimeHandles) {
        runtime.systems.borrow_mut().deregister_system::<T>();
    }
}

/// Registers a [`DynamicSerializer`] for type `T`. Priority 2: serializers
/// come up alongside systems groups, ahead of the components and systems
/// that may be constructed and immediately (de)serialized during load.
pub struct SerializerResource<T> {
    serializer: Option<Box<dyn DynamicSerializer>>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: 'static> SerializerResource<T> {
    pub fn new(serializer: impl DynamicSerializer + 'static) -> Self {
        Self {
            serializer: Some(Box::new(serializer)),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: 'static> Resource for SerializerResource<T> {
    fn priority(&self) -> i32 {
        2
    }

    fn on_load(&mut self, runtime: &RuntimeHandles) {
        let serializer = self.serializer.take().expect("serializer resource loaded twice");
        runtime.serializers.borrow_mut().register_for::<T>(serializer);
    }

    fn on_unload(&mut self, runtime: &RuntimeHandles) {
        runtime.serializers.borrow_mut().deregister_for::<T>();
    }
}
