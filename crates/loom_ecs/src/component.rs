//! Component registry and type-erased component descriptors.
//!
//! A component type is registered once and assigned a dense index in
//! `[0, MaxComponentTypes)`; that index is what backs a chunk's
//! [`crate::query::Signature`] bitset. Destructor, copy and box/unbox are
//! plain function pointers recovered from the concrete Rust type at
//! registration time, so storage and chunks can stay fully type-erased.

use crate::value::Value;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::ptr::NonNull;
use loom_core::type_registry::{PortableHash, TypeHandle};

/// Maximum number of distinct component types live at once. Bounds the
/// width of a chunk [`crate::query::Signature`] bitset.
pub const MAX_COMPONENT_TYPES: usize = 512;

/// Dense index assigned to a registered component type.
///
/// Stable for the lifetime of the registration; recycled only once its
/// descriptor has been deregistered and no chunk still references it
/// (see [`ComponentRegistry::deregister`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentIndex(u32);

impl ComponentIndex {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(&self) -> u32 {
        self.0
    }
}

/// A registered component type. Process-local identity is [`TypeHandle`];
/// [`PortableHash`] is stable across dynamic-library boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeId(TypeHandle);

impl ComponentTypeId {
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self(TypeHandle::of::<T>())
    }

    #[inline]
    pub fn handle(&self) -> TypeHandle {
        self.0
    }
}

/// Drop/copy/box/unbox function pointers for a type-erased component.
///
/// `copy` and `box_fn`/`unbox_fn` are only present for copyable,
/// serializable types respectively; a descriptor with both `box_fn` and
/// `unbox_fn` present is serializable.
#[derive(Clone)]
pub struct ComponentDescriptor {
    pub type_id: ComponentTypeId,
    /// "<module>::<component>", used for name-based lookups and
    /// serialized-tree subobject tagging.
    pub full_name: String,
    pub size: usize,
    pub align: usize,
    pub portable_hash: PortableHash,
    pub dense_index: ComponentIndex,
    drop_fn: fn(NonNull<u8>),
    copy_fn: Option<fn(NonNull<u8>, NonNull<u8>)>,
    box_fn: Option<fn(NonNull<u8>) -> Value>,
    unbox_fn: Option<fn(Value, NonNull<u8>) -> bool>,
}

impl ComponentDescriptor {
    #[inline]
    pub fn is_copyable(&self) -> bool {
        self.copy_fn.is_some()
    }

    #[inline]
    pub fn is_serializable(&self) -> bool {
        self.box_fn.is_some() && self.unbox_fn.is_some()
    }

    /// # Safety
    /// `ptr` must point to a live, initialized value of the registered type.
    #[inline]
    pub unsafe fn drop(&self, ptr: NonNull<u8>) {
        (self.drop_fn)(ptr)
    }

    /// # Safety
    /// `dst` must be a writable row slot for this component type; `src`
    /// must point to a live, initialized value of it. Requires
    /// [`Self::is_copyable`].
    #[inline]
    pub unsafe fn copy(&self, dst: NonNull<u8>, src: NonNull<u8>) {
        (self.copy_fn.expect("component type is not copyable"))(dst, src)
    }

    /// Boxes the value at `src` into a dynamic [`Value`]. Requires
    /// [`Self::is_serializable`].
    ///
    /// # Safety
    /// `src` must point to a live, initialized value of the registered type.
    #[inline]
    pub unsafe fn box_value(&self, src: NonNull<u8>) -> Value {
        (self.box_fn.expect("component type is not serializable"))(src)
    }

    /// Unboxes `value` into the row slot at `dst`, returning whether the
    /// value matched the expected shape. Requires [`Self::is_serializable`].
    ///
    /// # Safety
    /// `dst` must be a writable, zero-initialized row slot for this
    /// component type.
    #[inline]
    pub unsafe fn unbox_value(&self, value: Value, dst: NonNull<u8>) -> bool {
        (self.unbox_fn.expect("component type is not serializable"))(value, dst)
    }
}

/// Builds a [`ComponentDescriptor`] for a concrete Rust type. `T` must be
/// `Send + Sync + 'static`; drop is wired automatically, copy/box/unbox
/// are opt-in via [`with_copy`]/[`with_box_unbox`].
pub fn descriptor_of<T: Send + Sync + 'static>(full_name: impl Into<String>) -> ComponentDescriptor {
    let full_name = full_name.into();
    ComponentDescriptor {
        type_id: ComponentTypeId::of::<T>(),
        portable_hash: PortableHash::of_name(&full_name),
        full_name,
        size: core::mem::size_of::<T>(),
        align: core::mem::align_of::<T>(),
        dense_index: ComponentIndex::new(0),
        drop_fn: |ptr| unsafe {
            if core::mem::needs_drop::<T>() {
                core::ptr::drop_in_place(ptr.as_ptr() as *mut T);
            }
        },
        copy_fn: None,
        box_fn: None,
        unbox_fn: None,
    }
}

/// Extends a descriptor with a copy function for a `Clone` type.
pub fn with_copy<T: Clone + 'static>(mut d: ComponentDescriptor) -> ComponentDescriptor {
    d.copy_fn = Some(|dst, src| unsafe {
        let value = (src.as_ptr() as *const T).read();
        let cloned = value.clone();
        core::mem::forget(value);
        (dst.as_ptr() as *mut T).write(cloned);
    });
    d
}

/// Extends a descriptor with box/unbox functions built from monomorphic fn
/// items (closures can't coerce to the `fn` pointers a type-erased
/// descriptor stores). `loom_serialize`'s registration helpers are the
/// intended caller.
pub fn with_box_unbox(
    mut d: ComponentDescriptor,
    box_fn: fn(NonNull<u8>) -> Value,
    unbox_fn: fn(Value, NonNull<u8>) -> bool,
) -> ComponentDescriptor {
    d.box_fn = Some(box_fn);
    d.unbox_fn = Some(unbox_fn);
    d
}

/// Registers [`ComponentDescriptor`]s, assigning each a dense index and
/// rejecting double-registration of the same type.
pub struct ComponentRegistry {
    by_index: Vec<Option<ComponentDescriptor>>,
    free_indices: Vec<ComponentIndex>,
    by_handle: BTreeMap<TypeHandle, ComponentIndex>,
    by_hash: BTreeMap<PortableHash, ComponentIndex>,
    by_name: BTreeMap<String, ComponentIndex>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            by_index: Vec::new(),
            free_indices: Vec::new(),
            by_handle: BTreeMap::new(),
            by_hash: BTreeMap::new(),
            by_name: BTreeMap::new(),
        }
    }

    /// Registers a descriptor, assigning it a dense index. Panics if the
    /// type handle is already registered: double-registration is a
    /// programmer error.
    pub fn register(&mut self, mut descriptor: ComponentDescriptor) -> ComponentIndex {
        assert!(
            !self.by_handle.contains_key(&descriptor.type_id.handle()),
            "component type {} already registered",
            descriptor.full_name
        );
        let index = match self.free_indices.pop() {
            Some(i) => i,
            None => {
                let i = ComponentIndex::new(self.by_index.len() as u32);
                self.by_index.push(None);
                i
            }
        };
        descriptor.dense_index = index;
        self.by_handle.insert(descriptor.type_id.handle(), index);
        self.by_hash.insert(descriptor.portable_hash, index);
        self.by_name.insert(descriptor.full_name.clone(), index);
        self.by_index[index.index() as usize] = Some(descriptor);
        index
    }

    /// Drops a descriptor and recycles its dense index.
    ///
    /// Recycling is only sound once no chunk's signature retains a bit
    /// for this index; callers must only deregister between module
    /// unload steps, after the owning entities have been wiped (see the
    /// entity manager's module-unload cleanup).
    pub fn deregister(&mut self, index: ComponentIndex) {
        if let Some(slot) = self.by_index.get_mut(index.index() as usize) {
            if let Some(descriptor) = slot.take() {
                self.by_handle.remove(&descriptor.type_id.handle());
                self.by_hash.remove(&descriptor.portable_hash);
                self.by_name.remove(&descriptor.full_name);
                self.free_indices.push(index);
            }
        }
    }

    pub fn get(&self, index: ComponentIndex) -> Option<&ComponentDescriptor> {
        self.by_index.get(index.index() as usize)?.as_ref()
    }

    pub fn index_of(&self, handle: TypeHandle) -> Option<ComponentIndex> {
        self.by_handle.get(&handle).copied()
    }

    pub fn index_of_type<T: 'static>(&self) -> Option<ComponentIndex> {
        self.index_of(TypeHandle::of::<T>())
    }

    pub fn index_by_hash(&self, hash: PortableHash) -> Option<ComponentIndex> {
        self.by_hash.get(&hash).copied()
    }

    pub fn index_by_name(&self, full_name: &str) -> Option<ComponentIndex> {
        self.by_name.get(full_name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.by_index.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn len(&self) -> usize {
        self.by_index.len() - self.free_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[test]
    fn register_assigns_distinct_dense_indices() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register(with_copy::<Position>(descriptor_of::<Position>("core::Position")));
        let vel = registry.register(with_copy::<Velocity>(descriptor_of::<Velocity>("core::Velocity")));
        assert_ne!(pos, vel);
        assert_eq!(registry.index_of_type::<Position>(), Some(pos));
        assert_eq!(registry.index_by_name("core::Velocity"), Some(vel));
    }

    #[test]
    #[should_panic]
    fn double_registration_panics() {
        let mut registry = ComponentRegistry::new();
        registry.register(descriptor_of::<Position>("core::Position"));
        registry.register(descriptor_of::<Position>("core::Position"));
    }

    #[test]
    fn deregister_recycles_the_dense_index() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register(descriptor_of::<Position>("core::Position"));
        registry.deregister(pos);
        assert!(registry.get(pos).is_none());
        let vel = registry.register(descriptor_of::<Velocity>("core::Velocity"));
        assert_eq!(vel, pos, "recycled index should be reused");
    }

    #[test]
    fn copy_function_clones_the_value() {
        let mut registry = ComponentRegistry::new();
        let idx = registry.register(with_copy::<Position>(descriptor_of::<Position>("core::Position")));
        let descriptor = registry.get(idx).unwrap();
        assert!(descriptor.is_copyable());

        let src = Position { x: 1.0, y: 2.0 };
        let mut dst = core::mem::MaybeUninit::<Position>::uninit();
        unsafe {
            let src_ptr = NonNull::new_unchecked(&src as *const Position as *mut u8);
            let dst_ptr = NonNull::new_unchecked(dst.as_mut_ptr() as *mut u8);
            descriptor.copy(dst_ptr, src_ptr);
            assert_eq!(dst.assume_init(), src);
        }
    }
}
