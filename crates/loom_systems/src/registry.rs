//! [`SystemsGroupRegistry`]: the process-wide DAG of groups, plus the
//! system-to-containing-group index that enforces "a dependency may only
//! be registered between two systems that share a group".

use crate::group::SystemsGroup;
use crate::system::{Phase, System};
use alloc::collections::BTreeMap;
use loom_core::type_registry::TypeHandle;
use loom_graph::DependencyGraph;

/// Registry of [`SystemsGroup`]s, ordered across groups by a DAG keyed on
/// each group's [`TypeHandle`].
pub struct SystemsGroupRegistry {
    order: DependencyGraph<TypeHandle>,
    groups: BTreeMap<TypeHandle, SystemsGroup>,
    system_group: BTreeMap<TypeHandle, TypeHandle>,
}

impl SystemsGroupRegistry {
    pub fn new() -> Self {
        Self {
            order: DependencyGraph::new(),
            groups: BTreeMap::new(),
            system_group: BTreeMap::new(),
        }
    }

    /// Registers `group` under key type `G`. Panics if a group of that type
    /// is already registered.
    pub fn register_group<G: 'static>(&mut self, group: SystemsGroup) -> TypeHandle {
        let handle = TypeHandle::of::<G>();
        assert!(
            !self.groups.contains_key(&handle),
            "systems group already registered"
        );
        self.groups.insert(handle, group);
        self.order.add(handle);
        handle
    }

    /// Deregisters the group of type `G`, dropping its contents. Panics if
    /// absent.
    pub fn deregister_group<G: 'static>(&mut self) {
        let handle = TypeHandle::of::<G>();
        assert!(
            self.groups.remove(&handle).is_some(),
            "systems group not registered"
        );
        self.order.remove(&handle);
        self.system_group.retain(|_, g| *g != handle);
    }

    /// Registers an ordering edge `before -> after` between two group types.
    pub fn register_group_dependency<Before: 'static, After: 'static>(&mut self) {
        let before = TypeHandle::of::<Before>();
        let after = TypeHandle::of::<After>();
        self.order.add_edge(&before, &after);
    }

    pub fn group<G: 'static>(&self) -> Option<&SystemsGroup> {
        self.groups.get(&TypeHandle::of::<G>())
    }

    pub fn group_mut<G: 'static>(&mut self) -> Option<&mut SystemsGroup> {
        self.groups.get_mut(&TypeHandle::of::<G>())
    }

    /// Registers `system` in the group keyed by type `G`. Panics if `G` is
    /// not a registered group.
    pub fn register_system<G: 'static, T: System>(&mut self, system: T) -> TypeHandle {
        let group_handle = TypeHandle::of::<G>();
        let group = self
            .groups
            .get_mut(&group_handle)
            .expect("cannot register a system in a group that does not exist");
        let system_handle = group.register_system(system);
        self.system_group.insert(system_handle, group_handle);
        system_handle
    }

    pub fn deregister_system<T: 'static>(&mut self) {
        let system_handle = TypeHandle::of::<T>();
        let group_handle = self
            .system_group
            .remove(&system_handle)
            .expect("system not registered in any group");
        self.groups
            .get_mut(&group_handle)
            .expect("system's recorded group no longer exists")
            .deregister_system::<T>();
    }

    /// Registers an ordering edge `before -> after` between two systems.
    /// Both must already be registered, in the same group.
    pub fn register_system_dependency<Before: 'static, After: 'static>(&mut self) {
        let before = TypeHandle::of::<Before>();
        let after = TypeHandle::of::<After>();
        let before_group = *self
            .system_group
            .get(&before)
            .expect("system not registered in any group");
        let after_group = *self
            .system_group
            .get(&after)
            .expect("system not registered in any group");
        assert_eq!(
            before_group, after_group,
            "an execution-order dependency can only be registered between two systems in the same group"
        );
        self.groups
            .get_mut(&before_group)
            .unwrap()
            .register_dependency(before, after);
    }

    pub fn try_get_system<G: 'static, T: 'static>(&self) -> Option<&T> {
        self.group::<G>()?.try_get_system::<T>()
    }

    /// Runs `phase` on every group, in topological order, then on every
    /// system within each group, in that group's topological order.
    pub fn run_phase(&mut self, phase: Phase) {
        for handle in self.order.all_nodes_start_to_end() {
            if let Some(group) = self.groups.get_mut(&handle) {
                group.run_phase(phase);
            }
        }
    }
}

impl Default for SystemsGroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RenderGroup;
    struct LogicGroup;

    struct Physics;
    impl System for Physics {
        fn name(&self) -> &str {
            "Physics"
        }
    }

    struct Render;
    impl System for Render {
        fn name(&self) -> &str {
            "Render"
        }
    }

    #[test]
    fn cross_group_order_runs_logic_before_render() {
        let mut registry = SystemsGroupRegistry::new();
        registry.register_group::<LogicGroup>(SystemsGroup::new("logic"));
        registry.register_group::<RenderGroup>(SystemsGroup::new("render"));
        registry.register_group_dependency::<LogicGroup, RenderGroup>();
        registry.register_system::<LogicGroup, Physics>(Physics);
        registry.register_system::<RenderGroup, Render>(Render);

        let order = registry.order.all_nodes_start_to_end();
        assert_eq!(order.len(), 2);
        registry.run_phase(Phase::Update(0.016));
    }

    #[test]
    #[should_panic]
    fn dependency_across_groups_panics() {
        let mut registry = SystemsGroupRegistry::new();
        registry.register_group::<LogicGroup>(SystemsGroup::new("logic"));
        registry.register_group::<RenderGroup>(SystemsGroup::new("render"));
        registry.register_system::<LogicGroup, Physics>(Physics);
        registry.register_system::<RenderGroup, Render>(Render);
        registry.register_system_dependency::<Physics, Render>();
    }

    #[test]
    #[should_panic]
    fn register_system_requires_existing_group() {
        let mut registry = SystemsGroupRegistry::new();
        registry.register_system::<LogicGroup, Physics>(Physics);
    }
}
