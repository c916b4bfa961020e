//! [`SystemsGroup`]: a named bucket of systems with a within-group
//! execution-order DAG.

use crate::system::{Phase, System};
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use core::any::Any;
use loom_core::type_registry::TypeHandle;
use loom_graph::DependencyGraph;

/// Blanket conversion to `&dyn Any` so a `Box<dyn System>` can be
/// downcast back to its concrete type by [`SystemsGroup::try_get_system`].
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A named bucket of systems. Within-group ordering is a
/// [`DependencyGraph`] keyed by each system's [`TypeHandle`]; cross-group
/// ordering is the job of [`crate::registry::SystemsGroupRegistry`].
pub struct SystemsGroup {
    name: String,
    order: DependencyGraph<TypeHandle>,
    systems: BTreeMap<TypeHandle, Box<dyn SystemObject>>,
}

/// Object-safe union of [`System`] and [`AsAny`]; implemented for every
/// `T: System`.
pub trait SystemObject: System + AsAny {}
impl<T: System + AsAny> SystemObject for T {}

impl SystemsGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: DependencyGraph::new(),
            systems: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.systems.contains_key(&TypeHandle::of::<T>())
    }

    /// Registers `system` in this group. Panics if a system of type `T` is
    /// already registered.
    pub fn register_system<T: System>(&mut self, system: T) -> TypeHandle {
        let handle = TypeHandle::of::<T>();
        assert!(
            !self.systems.contains_key(&handle),
            "system already registered in group {}",
            self.name
        );
        self.systems.insert(handle, Box::new(system));
        self.order.add(handle);
        handle
    }

    /// Deregisters the system of type `T`. Panics if absent. Removes any
    /// ordering edges to or from it.
    pub fn deregister_system<T: 'static>(&mut self) {
        let handle = TypeHandle::of::<T>();
        assert!(
            self.systems.remove(&handle).is_some(),
            "system not registered in group {}",
            self.name
        );
        self.order.remove(&handle);
    }

    /// Registers an ordering edge `before -> after`. Both must already be
    /// registered in this group; a would-be cycle panics.
    pub fn register_dependency(&mut self, before: TypeHandle, after: TypeHandle) {
        assert!(
            self.systems.contains_key(&before) && self.systems.contains_key(&after),
            "both systems in an execution-order dependency must belong to group {}",
            self.name
        );
        self.order.add_edge(&before, &after);
    }

    pub fn try_get_system<T: 'static>(&self) -> Option<&T> {
        self.systems
            .get(&TypeHandle::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<T>())
    }

    pub fn try_get_system_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.systems
            .get_mut(&TypeHandle::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Runs `phase` on every registered system, in topological order.
    pub fn run_phase(&mut self, phase: Phase) {
        for handle in self.order.all_nodes_start_to_end() {
            if let Some(system) = self.systems.get_mut(&handle) {
                phase.dispatch(system.as_mut());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A {
        log: alloc::vec::Vec<&'static str>,
    }
    impl System for A {
        fn name(&self) -> &str {
            "A"
        }
        fn update(&mut self, _: f32) {
            self.log.push("A");
        }
    }

    struct B;
    impl System for B {
        fn name(&self) -> &str {
            "B"
        }
    }

    #[test]
    fn register_and_lookup_by_type() {
        let mut group = SystemsGroup::new("demo");
        group.register_system(A { log: alloc::vec::Vec::new() });
        group.register_system(B);
        assert!(group.try_get_system::<A>().is_some());
        assert!(group.try_get_system::<B>().is_some());
    }

    #[test]
    #[should_panic]
    fn registering_the_same_type_twice_panics() {
        let mut group = SystemsGroup::new("demo");
        group.register_system(B);
        group.register_system(B);
    }

    #[test]
    fn dependency_orders_execution() {
        let mut group = SystemsGroup::new("demo");
        let a = group.register_system(A { log: alloc::vec::Vec::new() });
        let b = group.register_system(B);
        group.register_dependency(b, a);
        group.run_phase(Phase::Update(0.0));
        // A ran (B has no observable state, just confirms no panic/order violation).
        assert!(group.try_get_system::<A>().unwrap().log.contains(&"A"));
    }
}
