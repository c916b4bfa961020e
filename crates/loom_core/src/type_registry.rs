//! Type Registry - stable, process-local type identity plus a portable hash
//! that is identical across dynamic-library boundaries for the same type.
//!
//! Each dynamically loaded module has its own static storage for
//! `core::any::TypeId`, so a [`TypeHandle`] minted in one module does not
//! compare equal to one minted in another for "the same" Rust type. The
//! [`PortableHash`] is computed purely from the type's full name and is the
//! identity that survives a module load/unload cycle; callers that need to
//! alias a type across libraries should key on the hash instead of the
//! handle.

use alloc::collections::BTreeMap;
use alloc::string::String;
use core::any::TypeId;
use core::fmt;

/// Process-local type identity. Two handles compare equal only within the
/// same dynamic-library instance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeHandle(TypeId);

impl TypeHandle {
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self(TypeId::of::<T>())
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({:?})", self.0)
    }
}

/// A 64-bit FNV-1a hash of a type's fully qualified name. Identical for the
/// same logical type regardless of which shared library computed it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortableHash(u64);

impl PortableHash {
    /// Hash an arbitrary stable name (e.g. `"<module>::<component>"`).
    pub fn of_name(name: &str) -> Self {
        let mut hash = 0xcbf29ce484222325u64;
        for byte in name.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        Self(hash)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PortableHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortableHash({:#018x})", self.0)
    }
}

/// A registered type's identity record.
#[derive(Clone, Debug)]
pub struct TypeEntry {
    pub handle: TypeHandle,
    pub portable_hash: PortableHash,
    pub name: String,
}

/// Process-wide map between Rust's local type identity and the portable
/// hash used to alias the same type across shared-library boundaries.
pub struct TypeRegistry {
    by_handle: BTreeMap<TypeHandle, TypeEntry>,
    by_hash: BTreeMap<PortableHash, TypeHandle>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            by_handle: BTreeMap::new(),
            by_hash: BTreeMap::new(),
        }
    }

    /// Register `T` under `full_name`, returning its entry. Re-registering
    /// the same `TypeHandle` refreshes the name and hash in place.
    pub fn register<T: 'static>(&mut self, full_name: &str) -> TypeEntry {
        let handle = TypeHandle::of::<T>();
        let portable_hash = PortableHash::of_name(full_name);
        let entry = TypeEntry {
            handle,
            portable_hash,
            name: full_name.into(),
        };
        self.by_hash.insert(portable_hash, handle);
        self.by_handle.insert(handle, entry.clone());
        entry
    }

    pub fn get(&self, handle: TypeHandle) -> Option<&TypeEntry> {
        self.by_handle.get(&handle)
    }

    pub fn get_by_hash(&self, hash: PortableHash) -> Option<&TypeEntry> {
        self.by_hash.get(&hash).and_then(|h| self.by_handle.get(h))
    }

    pub fn contains(&self, handle: TypeHandle) -> bool {
        self.by_handle.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeEntry> {
        self.by_handle.values()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    struct Velocity;

    #[test]
    fn register_and_lookup() {
        let mut reg = TypeRegistry::new();
        let entry = reg.register::<Position>("demo::Position");

        assert!(reg.contains(entry.handle));
        assert_eq!(reg.get(entry.handle).unwrap().name, "demo::Position");
        assert_eq!(
            reg.get_by_hash(entry.portable_hash).unwrap().handle,
            entry.handle
        );
    }

    #[test]
    fn portable_hash_independent_of_local_handle() {
        // Two distinct process-local handles for differently-named types
        // must not collide in the hash space under normal operation.
        let a = PortableHash::of_name("demo::Position");
        let b = PortableHash::of_name("demo::Velocity");
        assert_ne!(a, b);

        // But the same full name always yields the same portable hash,
        // which is the property that lets it alias across dylib boundaries.
        let a2 = PortableHash::of_name("demo::Position");
        assert_eq!(a, a2);
        let _ = TypeHandle::of::<Velocity>();
    }
}
