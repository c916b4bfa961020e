//! Scene graph helpers: parent/child linkage and transform propagation.
//!
//! These are ordinary components and a plain propagation function, not a
//! privileged part of the entity manager; a [`crate::System`]-like caller
//! (wired up by `loom_systems` once a module registers these components)
//! drives `propagate_transforms` once per frame.

use crate::component::ComponentIndex;
use crate::entity::Entity;
use crate::entity_manager::EntityManager;
use crate::query::QueryFilter;
use alloc::vec::Vec;
use loom_math::transform::Transform;

/// A single parent link. An entity with no `Parent` is a scene root.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parent(pub Entity);

/// The (possibly empty) ordered list of child entities, kept in sync with
/// `Parent` by whichever collaborator adds/removes the link.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Children(pub Vec<Entity>);

/// Transform relative to `Parent`, or to the world if there is none.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalTransform(pub Transform);

/// World-space transform, recomputed each frame by
/// [`propagate_transforms`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalTransform(pub Transform);

/// How deep in the hierarchy an entity sits; roots are depth 0. Used to
/// order propagation so a parent's `GlobalTransform` is always computed
/// before its children's.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HierarchyDepth(pub u32);

/// Component dense indices the propagation pass needs looked up once by
/// the caller (typically at module-init time).
pub struct SceneGraphTypes {
    pub parent: ComponentIndex,
    pub local: ComponentIndex,
    pub global: ComponentIndex,
    pub depth: ComponentIndex,
}

/// Recomputes every entity's `GlobalTransform` from its `LocalTransform`
/// and its parent chain, visiting roots first and walking outward by
/// increasing `HierarchyDepth` so a parent is always resolved before its
/// children.
///
/// Depth-0 (root) entities: `global = local`. Deeper entities: `global =
/// parent.global * local`.
pub fn propagate_transforms(manager: &mut EntityManager, types: &SceneGraphTypes) {
    let mut order: Vec<(Entity, u32)> = Vec::new();
    let filter = QueryFilter::new().each(types.local).each(types.global).each(types.depth);
    manager.query_all(&filter, |entity, each, _, _| {
        let depth = unsafe { &*(each[2].as_ptr() as *const HierarchyDepth) };
        order.push((entity, depth.0));
    });
    order.sort_by_key(|(_, depth)| *depth);

    for (entity, _) in order {
        let local = unsafe {
            &*(manager.get(entity, types.local).unwrap().as_ptr() as *const LocalTransform)
        };
        let world = match manager.get(entity, types.parent) {
            Some(ptr) => {
                let parent = unsafe { &*(ptr.as_ptr() as *const Parent) }.0;
                match manager.get(parent, types.global) {
                    Some(parent_global) => {
                        let parent_transform =
                            unsafe { &*(parent_global.as_ptr() as *const GlobalTransform) }.0;
                        parent_transform.combine(&local.0)
                    }
                    None => local.0,
                }
            }
            None => local.0,
        };
        let global_ptr = manager.get(entity, types.global).unwrap();
        unsafe {
            (global_ptr.as_ptr() as *mut GlobalTransform).write(GlobalTransform(world));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{descriptor_of, with_copy, ComponentRegistry};
    use loom_math::vector::Vec3;

    #[test]
    fn root_global_equals_local() {
        let mut registry = ComponentRegistry::new();
        let local_idx = registry.register(with_copy::<LocalTransform>(descriptor_of::<LocalTransform>(
            "core::LocalTransform",
        )));
        let global_idx = registry.register(with_copy::<GlobalTransform>(descriptor_of::<GlobalTransform>(
            "core::GlobalTransform",
        )));
        let depth_idx =
            registry.register(with_copy::<HierarchyDepth>(descriptor_of::<HierarchyDepth>("core::HierarchyDepth")));
        let parent_idx =
            registry.register(with_copy::<Parent>(descriptor_of::<Parent>("core::Parent")));

        let mut manager = EntityManager::new();
        let root = manager.create(&registry);
        manager.add(root, local_idx, &registry);
        manager.add(root, global_idx, &registry);
        manager.add(root, depth_idx, &registry);
        unsafe {
            let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
            (manager.get(root, local_idx).unwrap().as_ptr() as *mut LocalTransform)
                .write(LocalTransform(t));
            (manager.get(root, depth_idx).unwrap().as_ptr() as *mut HierarchyDepth)
                .write(HierarchyDepth(0));
        }

        let types = SceneGraphTypes {
            parent: parent_idx,
            local: local_idx,
            global: global_idx,
            depth: depth_idx,
        };
        propagate_transforms(&mut manager, &types);

        let global = unsafe { &*(manager.get(root, global_idx).unwrap().as_ptr() as *const GlobalTransform) };
        let local = unsafe { &*(manager.get(root, local_idx).unwrap().as_ptr() as *const LocalTransform) };
        assert_eq!(global.0, local.0);
    }
}
