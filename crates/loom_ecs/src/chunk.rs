//! Fixed-size entity chunk storage.
//!
//! Every chunk backing one signature is a single byte buffer sized to the
//! chunk budget (16 KiB), sliced into fixed-stride rows. Row `i`'s first
//! bytes hold the entity id; component data follows at per-type offsets
//! derived from the signature's sorted iteration order. One extra row
//! beyond `capacity` is reserved as a swap scratchpad.

use crate::component::{ComponentIndex, ComponentRegistry};
use crate::entity::Entity;
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::ptr::NonNull;

/// Upper bound on a chunk's raw buffer size.
pub const CHUNK_SIZE: usize = 16 * 1024;

const ENTITY_HEADER_SIZE: usize = core::mem::size_of::<u32>();

/// A fixed-stride slab of rows, all sharing one component signature.
pub struct EntityChunk {
    signature_set: Vec<ComponentIndex>,
    /// Byte offset of each signature-set entry's component data within a
    /// row, parallel to `signature_set`.
    offsets: Vec<usize>,
    stride: usize,
    capacity: usize,
    alive: usize,
    dead: usize,
    buffer: Vec<u8>,
    row_of: BTreeMap<Entity, usize>,
    entity_of_row: Vec<Entity>,
}

impl EntityChunk {
    /// Builds a chunk for `signature_set` (must already be sorted and
    /// deduplicated). Returns `None` if the per-row stride leaves fewer
    /// than 2 usable rows in the chunk budget.
    pub fn new(signature_set: Vec<ComponentIndex>, registry: &ComponentRegistry) -> Option<Self> {
        let mut offsets = Vec::with_capacity(signature_set.len());
        let mut stride = ENTITY_HEADER_SIZE;
        for index in &signature_set {
            let descriptor = registry
                .get(*index)
                .expect("chunk signature references an unregistered component");
            offsets.push(stride);
            stride += descriptor.size;
        }
        if stride == 0 {
            stride = ENTITY_HEADER_SIZE;
        }
        let capacity = CHUNK_SIZE / stride;
        if capacity < 3 {
            // capacity must be >= 2 usable rows, plus the swap row.
            return None;
        }
        let capacity = capacity - 1;
        let buffer_rows = capacity + 1;
        Some(Self {
            signature_set,
            offsets,
            stride,
            capacity,
            alive: 0,
            dead: 0,
            buffer: vec![0u8; buffer_rows * stride],
            row_of: BTreeMap::new(),
            entity_of_row: vec![Entity::INVALID; buffer_rows],
        })
    }

    pub fn signature_set(&self) -> &[ComponentIndex] {
        &self.signature_set
    }

    pub fn contains_type(&self, index: ComponentIndex) -> bool {
        self.signature_set.binary_search(&index).is_ok()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn alive_count(&self) -> usize {
        self.alive
    }

    pub fn dead_count(&self) -> usize {
        self.dead
    }

    pub fn is_empty(&self) -> bool {
        self.alive == 0 && self.dead == 0
    }

    pub fn contains_entity(&self, entity: Entity) -> bool {
        self.row_of.contains_key(&entity)
    }

    fn row_ptr(&self, row: usize) -> NonNull<u8> {
        let offset = row * self.stride;
        unsafe { NonNull::new_unchecked(self.buffer.as_ptr().add(offset) as *mut u8) }
    }

    fn component_offset(&self, index: ComponentIndex) -> Option<usize> {
        let pos = self.signature_set.binary_search(&index).ok()?;
        Some(self.offsets[pos])
    }

    /// Zero-fills a new row for `entity` and indexes it. Requires the
    /// entity is not already present and the chunk has spare capacity.
    pub fn allocate(&mut self, entity: Entity) -> NonNull<u8> {
        assert!(
            !self.row_of.contains_key(&entity),
            "chunk: entity already present"
        );
        assert!(
            self.alive + self.dead < self.capacity,
            "chunk: no free rows for allocate"
        );
        let row = self.alive;
        // Dead rows occupy [alive, alive+dead); shift the first dead row
        // out of the way so the new alive row lands contiguously.
        if self.dead > 0 {
            self.move_row(row, self.alive + self.dead);
        }
        let offset = row * self.stride;
        self.buffer[offset..offset + self.stride].fill(0);
        self.write_entity_header(row, entity);
        self.row_of.insert(entity, row);
        self.entity_of_row[row] = entity;
        self.alive += 1;
        self.row_ptr(row)
    }

    fn write_entity_header(&mut self, row: usize, entity: Entity) {
        let offset = row * self.stride;
        self.buffer[offset..offset + ENTITY_HEADER_SIZE]
            .copy_from_slice(&entity.id().to_ne_bytes());
    }

    fn move_row(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let stride = self.stride;
        let src_offset = from * stride;
        let mut tmp = vec![0u8; stride];
        tmp.copy_from_slice(&self.buffer[src_offset..src_offset + stride]);
        let dst_offset = to * stride;
        self.buffer[dst_offset..dst_offset + stride].copy_from_slice(&tmp);

        let moved_entity = self.entity_of_row[from];
        self.entity_of_row[to] = moved_entity;
        if !moved_entity.is_invalid() {
            self.row_of.insert(moved_entity, to);
        }
    }

    /// Exchanges the full contents (bytes and index entries) of two rows,
    /// unlike [`Self::move_row`] which discards whatever was at `to`.
    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let stride = self.stride;
        let (a_offset, b_offset) = (a * stride, b * stride);
        let mut tmp_a = vec![0u8; stride];
        tmp_a.copy_from_slice(&self.buffer[a_offset..a_offset + stride]);
        let mut tmp_b = vec![0u8; stride];
        tmp_b.copy_from_slice(&self.buffer[b_offset..b_offset + stride]);
        self.buffer[a_offset..a_offset + stride].copy_from_slice(&tmp_b);
        self.buffer[b_offset..b_offset + stride].copy_from_slice(&tmp_a);

        let entity_a = self.entity_of_row[a];
        let entity_b = self.entity_of_row[b];
        self.entity_of_row[a] = entity_b;
        self.entity_of_row[b] = entity_a;
        if !entity_a.is_invalid() {
            self.row_of.insert(entity_a, b);
        }
        if !entity_b.is_invalid() {
            self.row_of.insert(entity_b, a);
        }
    }

    pub fn component_ptr(&self, entity: Entity, index: ComponentIndex) -> Option<NonNull<u8>> {
        let row = *self.row_of.get(&entity)?;
        let offset = self.component_offset(index)?;
        let base = row * self.stride + offset;
        NonNull::new(unsafe { self.buffer.as_ptr().add(base) as *mut u8 })
    }

    /// Swaps `entity`'s row with the last alive row and removes it from
    /// the index, without destructing anything in the vacated row.
    pub fn free_immediately(&mut self, entity: Entity) {
        let row = self
            .row_of
            .remove(&entity)
            .expect("chunk: free_immediately on absent entity");
        let last_alive = self.alive - 1;
        if row != last_alive {
            self.move_row(last_alive, row);
        }
        self.entity_of_row[last_alive] = Entity::INVALID;
        self.alive -= 1;
    }

    /// Swaps `entity`'s row into the dead region; it stays indexed and
    /// readable until [`Self::cleanup_end_of_frame`].
    pub fn free_deferred(&mut self, entity: Entity) {
        let row = *self
            .row_of
            .get(&entity)
            .expect("chunk: free_deferred on absent entity");
        let last_alive = self.alive - 1;
        self.swap_rows(row, last_alive);
        self.alive -= 1;
        self.dead += 1;
    }

    /// Moves `entity` from `src` to `dst`, byte-copying `moved_types` and
    /// then freeing the row in `src` without destructing it.
    pub fn move_entity(
        src: &mut Self,
        dst: &mut Self,
        entity: Entity,
        moved_types: &[ComponentIndex],
    ) {
        assert!(
            src.contains_entity(entity),
            "chunk: move_entity source missing entity"
        );
        assert!(
            !dst.contains_entity(entity),
            "chunk: move_entity destination already has entity"
        );
        dst.allocate(entity);
        for &index in moved_types {
            let src_ptr = src
                .component_ptr(entity, index)
                .expect("chunk: moved type not present in source");
            let dst_ptr = dst
                .component_ptr(entity, index)
                .expect("chunk: moved type not present in destination");
            let len = src_component_len(src, index);
            unsafe {
                core::ptr::copy_nonoverlapping(src_ptr.as_ptr(), dst_ptr.as_ptr(), len);
            }
        }
        src.free_immediately(entity);
    }

    /// Destructs and drops every dead row, returning the finalized
    /// entities. Resets the dead count to 0.
    pub fn cleanup_end_of_frame(&mut self, registry: &ComponentRegistry) -> Vec<Entity> {
        let mut finalized = Vec::with_capacity(self.dead);
        for row in self.alive..self.alive + self.dead {
            let entity = self.entity_of_row[row];
            for (pos, &index) in self.signature_set.iter().enumerate() {
                let descriptor = registry.get(index).expect("chunk: stale component index");
                let offset = row * self.stride + self.offsets[pos];
                let ptr =
                    unsafe { NonNull::new_unchecked(self.buffer.as_mut_ptr().add(offset)) };
                unsafe { descriptor.drop(ptr) };
            }
            self.row_of.remove(&entity);
            self.entity_of_row[row] = Entity::INVALID;
            finalized.push(entity);
        }
        self.dead = 0;
        finalized
    }

    /// Row-by-row iteration over the alive rows, calling `f(entity,
    /// each_ptrs, any_ptrs_or_null, has_flags)`.
    pub fn query<F>(
        &self,
        each: &[ComponentIndex],
        any: &[ComponentIndex],
        has: &[ComponentIndex],
        mut f: F,
    ) where
        F: FnMut(Entity, &[NonNull<u8>], &[Option<NonNull<u8>>], &[bool]),
    {
        let has_flags: Vec<bool> = has.iter().map(|i| self.contains_type(*i)).collect();
        for row in 0..self.alive {
            let entity = self.entity_of_row[row];
            let each_ptrs: Vec<NonNull<u8>> = each
                .iter()
                .map(|i| {
                    let offset = self.component_offset(*i).expect("row missing each-type");
                    unsafe {
                        NonNull::new_unchecked(
                            self.buffer.as_ptr().add(row * self.stride + offset) as *mut u8,
                        )
                    }
                })
                .collect();
            let any_ptrs: Vec<Option<NonNull<u8>>> = any
                .iter()
                .map(|i| {
                    self.component_offset(*i).map(|offset| unsafe {
                        NonNull::new_unchecked(
                            self.buffer.as_ptr().add(row * self.stride + offset) as *mut u8,
                        )
                    })
                })
                .collect();
            f(entity, &each_ptrs, &any_ptrs, &has_flags);
        }
    }
}

fn src_component_len(chunk: &EntityChunk, index: ComponentIndex) -> usize {
    let pos = chunk
        .signature_set
        .binary_search(&index)
        .expect("chunk: component not in signature");
    let next_offset = chunk
        .offsets
        .get(pos + 1)
        .copied()
        .unwrap_or(chunk.stride);
    next_offset - chunk.offsets[pos]
}

impl Drop for EntityChunk {
    fn drop(&mut self) {
        // Destructors for the remaining rows are the caller's
        // responsibility via the component registry; a bare `EntityChunk`
        // has no registry handle to call back into. The entity manager
        // always calls `cleanup_end_of_frame` before dropping a chunk.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::descriptor_of;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    fn registry_with_position() -> (ComponentRegistry, ComponentIndex) {
        let mut registry = ComponentRegistry::new();
        let idx = registry.register(descriptor_of::<Position>("core::Position"));
        (registry, idx)
    }

    #[test]
    fn allocate_zero_fills_and_indexes() {
        let (registry, idx) = registry_with_position();
        let mut chunk = EntityChunk::new(vec![idx], &registry).unwrap();
        let entity = Entity::from_raw(1);
        let ptr = chunk.allocate(entity);
        let pos = unsafe { &*(ptr.as_ptr() as *const Position) };
        assert_eq!(*pos, Position { x: 0.0, y: 0.0 });
        assert_eq!(chunk.alive_count(), 1);
        assert!(chunk.contains_entity(entity));
    }

    #[test]
    fn free_immediately_swaps_with_last_alive() {
        let (registry, idx) = registry_with_position();
        let mut chunk = EntityChunk::new(vec![idx], &registry).unwrap();
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        chunk.allocate(a);
        let ptr_b = chunk.allocate(b);
        unsafe {
            (ptr_b.as_ptr() as *mut Position).write(Position { x: 9.0, y: 9.0 });
        }
        chunk.free_immediately(a);
        assert_eq!(chunk.alive_count(), 1);
        assert!(!chunk.contains_entity(a));
        let ptr = chunk.component_ptr(b, idx).unwrap();
        let pos = unsafe { &*(ptr.as_ptr() as *const Position) };
        assert_eq!(*pos, Position { x: 9.0, y: 9.0 });
    }

    #[test]
    fn free_deferred_then_cleanup_destructs_and_drops() {
        let (registry, idx) = registry_with_position();
        let mut chunk = EntityChunk::new(vec![idx], &registry).unwrap();
        let a = Entity::from_raw(1);
        chunk.allocate(a);
        chunk.free_deferred(a);
        assert_eq!(chunk.alive_count(), 0);
        assert_eq!(chunk.dead_count(), 1);
        assert!(chunk.contains_entity(a));
        let finalized = chunk.cleanup_end_of_frame(&registry);
        assert_eq!(finalized, vec![a]);
        assert_eq!(chunk.dead_count(), 0);
        assert!(!chunk.contains_entity(a));
    }

    #[test]
    fn free_deferred_of_non_last_row_preserves_survivor_and_drops_once() {
        use std::sync::Arc;

        struct Counted(Arc<()>);

        let mut registry = ComponentRegistry::new();
        let idx = registry.register(descriptor_of::<Counted>("core::Counted"));
        let mut chunk = EntityChunk::new(vec![idx], &registry).unwrap();

        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let c = Entity::from_raw(3);

        let handle_a = Arc::new(());
        let handle_b = Arc::new(());
        let handle_c = Arc::new(());

        unsafe {
            (chunk.allocate(a).as_ptr() as *mut Counted).write(Counted(handle_a.clone()));
            (chunk.allocate(b).as_ptr() as *mut Counted).write(Counted(handle_b.clone()));
            (chunk.allocate(c).as_ptr() as *mut Counted).write(Counted(handle_c.clone()));
        }

        // b is neither the victim-adjacent nor the last-alive row: freeing
        // a (row 0, not last_alive == row 2) exercises the row != last_alive
        // swap path.
        chunk.free_deferred(a);

        assert_eq!(chunk.alive_count(), 2);
        assert_eq!(chunk.dead_count(), 1);

        // b and c must still read back their own, unaliased payloads.
        let ptr_b = chunk.component_ptr(b, idx).unwrap();
        assert!(Arc::ptr_eq(
            &unsafe { &*(ptr_b.as_ptr() as *const Counted) }.0,
            &handle_b
        ));
        let ptr_c = chunk.component_ptr(c, idx).unwrap();
        assert!(Arc::ptr_eq(
            &unsafe { &*(ptr_c.as_ptr() as *const Counted) }.0,
            &handle_c
        ));

        let finalized = chunk.cleanup_end_of_frame(&registry);
        assert_eq!(finalized, vec![a]);

        // Exactly a's handle was dropped; b and c survive untouched.
        assert_eq!(Arc::strong_count(&handle_a), 1);
        assert_eq!(Arc::strong_count(&handle_b), 2);
        assert_eq!(Arc::strong_count(&handle_c), 2);
    }

    #[test]
    fn refuses_to_create_when_stride_leaves_too_few_rows() {
        let mut registry = ComponentRegistry::new();
        // A component spanning most of the chunk budget leaves fewer
        // than 2 usable rows.
        struct Huge([u8; CHUNK_SIZE]);
        unsafe impl Send for Huge {}
        unsafe impl Sync for Huge {}
        let idx = registry.register(descriptor_of::<Huge>("core::Huge"));
        assert!(EntityChunk::new(vec![idx], &registry).is_none());
    }
}
