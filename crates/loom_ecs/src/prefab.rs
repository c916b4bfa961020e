//! Prefabs: reusable, signature-shaped byte buffers that instantiate into
//! fresh entities without being consumed.

use crate::component::{ComponentIndex, ComponentRegistry};
use crate::entity::Entity;
use crate::entity_manager::EntityManager;
use crate::scene_graph::LocalTransform;
use alloc::vec;
use alloc::vec::Vec;
use core::ptr::NonNull;
use loom_math::quaternion::Quat;
use loom_math::transform::Transform;
use loom_math::vector::Vec3;

/// A contiguous buffer holding one value per component in `signature_set`,
/// laid out back to back in signature order (no entity header, unlike a
/// chunk row).
pub struct Prefab {
    signature_set: Vec<ComponentIndex>,
    offsets: Vec<usize>,
    buffer: Vec<u8>,
}

impl Prefab {
    /// Builds an empty prefab for `signature_set` (sorted, deduplicated),
    /// with every slot zero-initialized. Callers fill slots in via
    /// [`Self::slot_mut`] before use.
    pub fn new(signature_set: Vec<ComponentIndex>, registry: &ComponentRegistry) -> Self {
        let mut offsets = Vec::with_capacity(signature_set.len());
        let mut size = 0usize;
        for index in &signature_set {
            let descriptor = registry
                .get(*index)
                .expect("prefab references an unregistered component");
            assert!(
                descriptor.is_copyable(),
                "prefab component {} is not copyable",
                descriptor.full_name
            );
            offsets.push(size);
            size += descriptor.size;
        }
        Self {
            signature_set,
            offsets,
            buffer: vec![0u8; size],
        }
    }

    /// Deep-copies every component of `entity` into a new prefab.
    pub fn from_entity(
        entity: Entity,
        signature_set: Vec<ComponentIndex>,
        manager: &EntityManager,
        registry: &ComponentRegistry,
    ) -> Self {
        let mut prefab = Self::new(signature_set.clone(), registry);
        for index in &signature_set {
            let src = manager
                .get(entity, *index)
                .expect("entity missing a component named in its own signature");
            let descriptor = registry.get(*index).unwrap();
            let dst = prefab.slot_mut(*index);
            unsafe { descriptor.copy(dst, src) };
        }
        prefab
    }

    fn offset_of(&self, index: ComponentIndex) -> Option<usize> {
        let pos = self.signature_set.binary_search(&index).ok()?;
        Some(self.offsets[pos])
    }

    fn slot_mut(&mut self, index: ComponentIndex) -> NonNull<u8> {
        let offset = self
            .offset_of(index)
            .expect("component not part of this prefab's signature");
        unsafe { NonNull::new_unchecked(self.buffer.as_mut_ptr().add(offset)) }
    }

    pub fn slot(&self, index: ComponentIndex) -> Option<NonNull<u8>> {
        let offset = self.offset_of(index)?;
        Some(unsafe { NonNull::new_unchecked(self.buffer.as_ptr().add(offset) as *mut u8) })
    }

    pub fn signature_set(&self) -> &[ComponentIndex] {
        &self.signature_set
    }

    /// Creates a fresh entity in a chunk matching this prefab's
    /// signature and copies every component value in. The prefab is
    /// unaffected and remains reusable.
    pub fn instantiate(&self, manager: &mut EntityManager, registry: &ComponentRegistry) -> Entity {
        let entity = manager.create_with_signature(self.signature_set.clone(), registry);
        for (pos, &index) in self.signature_set.iter().enumerate() {
            let descriptor = registry.get(index).unwrap();
            let src = unsafe {
                NonNull::new_unchecked(self.buffer.as_ptr().add(self.offsets[pos]) as *mut u8)
            };
            let dst = manager.get(entity, index).unwrap();
            unsafe { descriptor.copy(dst, src) };
        }
        entity
    }

    /// Like [`Self::instantiate`], then adds or overwrites the resulting
    /// entity's `LocalTransform` with `position`/`rotation` (scale is left
    /// at identity). `local_transform` is the prefab's own registered
    /// index for [`LocalTransform`], looked up once by the caller at
    /// module-init time, matching [`crate::scene_graph::SceneGraphTypes`].
    pub fn instantiate_at(
        &self,
        manager: &mut EntityManager,
        registry: &ComponentRegistry,
        local_transform: ComponentIndex,
        position: Vec3,
        rotation: Quat,
    ) -> Entity {
        let entity = self.instantiate(manager, registry);
        let transform = LocalTransform(Transform::from_position_rotation(position, rotation));
        let ptr = match manager.get(entity, local_transform) {
            Some(ptr) => ptr,
            None => manager.add(entity, local_transform, registry),
        };
        unsafe { (ptr.as_ptr() as *mut LocalTransform).write(transform) };
        entity
    }
}

impl Drop for Prefab {
    fn drop(&mut self) {
        // Destructor invocation needs the component registry, which a
        // bare `Prefab` doesn't hold; callers must call
        // `destroy(registry)` before dropping a prefab whose components
        // need drop glue. Leaking trivially-droppable bytes here is safe.
    }
}

impl Prefab {
    /// Invokes every component's destructor on the prefab buffer. Must be
    /// called before the prefab is dropped if any component type needs
    /// drop glue.
    pub fn destroy(mut self, registry: &ComponentRegistry) {
        for (pos, &index) in self.signature_set.iter().enumerate() {
            let descriptor = registry.get(index).unwrap();
            let ptr = unsafe {
                NonNull::new_unchecked(self.buffer.as_mut_ptr().add(self.offsets[pos]))
            };
            unsafe { descriptor.drop(ptr) };
        }
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{descriptor_of, with_copy};

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[test]
    fn instantiate_copies_values_and_is_reusable() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register(with_copy::<Position>(descriptor_of::<Position>("core::Position")));
        let mut prefab = Prefab::new(vec![pos], &registry);
        unsafe {
            (prefab.slot_mut(pos).as_ptr() as *mut Position).write(Position { x: 1.0, y: 2.0 });
        }

        let mut manager = EntityManager::new();
        let e1 = prefab.instantiate(&mut manager, &registry);
        let e2 = prefab.instantiate(&mut manager, &registry);
        assert_ne!(e1, e2);

        for e in [e1, e2] {
            let ptr = manager.get(e, pos).unwrap();
            let value = unsafe { &*(ptr.as_ptr() as *const Position) };
            assert_eq!(*value, Position { x: 1.0, y: 2.0 });
        }
    }

    #[test]
    fn instantiate_at_adds_local_transform() {
        use crate::scene_graph::LocalTransform;
        use loom_math::quaternion::Quat;
        use loom_math::vector::Vec3;

        let mut registry = ComponentRegistry::new();
        let pos = registry.register(with_copy::<Position>(descriptor_of::<Position>("core::Position")));
        let local_transform =
            registry.register(descriptor_of::<LocalTransform>("core::LocalTransform"));

        let mut prefab = Prefab::new(vec![pos], &registry);
        unsafe {
            (prefab.slot_mut(pos).as_ptr() as *mut Position).write(Position { x: 1.0, y: 2.0 });
        }

        let mut manager = EntityManager::new();
        let spawn_at = Vec3::new(3.0, 4.0, 5.0);
        let entity = prefab.instantiate_at(
            &mut manager,
            &registry,
            local_transform,
            spawn_at,
            Quat::IDENTITY,
        );

        let ptr = manager.get(entity, local_transform).unwrap();
        let transform = unsafe { &*(ptr.as_ptr() as *const LocalTransform) };
        assert_eq!(transform.0.position, spawn_at);

        // The prefab's own components are still present and untouched.
        let pos_ptr = manager.get(entity, pos).unwrap();
        let value = unsafe { &*(pos_ptr.as_ptr() as *const Position) };
        assert_eq!(*value, Position { x: 1.0, y: 2.0 });
    }
}
