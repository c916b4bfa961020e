//! Signatures and query filters.
//!
//! A [`Signature`] is the bitset form of a chunk's component set; chunk
//! lookup itself is keyed by the sorted `Vec<ComponentIndex>` form (see
//! `entity_manager`), with the bitset reserved for the cheap mask tests a
//! [`QueryFilter`] runs per chunk.

use crate::component::ComponentIndex;
use alloc::vec::Vec;
use loom_structures::BitSet;

/// Bitset over dense component indices, one bit per registered type.
#[derive(Clone, Debug)]
pub struct Signature {
    bits: BitSet,
}

impl Signature {
    pub fn empty(capacity: usize) -> Self {
        Self {
            bits: BitSet::new(capacity),
        }
    }

    /// Builds a signature from an unordered set of component indices.
    pub fn from_set(capacity: usize, indices: &[ComponentIndex]) -> Self {
        let mut bits = BitSet::new(capacity);
        for i in indices {
            bits.set(i.index() as usize);
        }
        Self { bits }
    }

    pub fn contains(&self, index: ComponentIndex) -> bool {
        let bit = index.index() as usize;
        bit < self.bits.len() && self.bits.get(bit)
    }

    /// `(self & mask) == mask`: every bit in `mask` is set in `self`.
    pub fn contains_all(&self, mask: &Signature) -> bool {
        mask.bits.iter_ones().all(|bit| bit < self.bits.len() && self.bits.get(bit))
    }

    /// `mask` is empty, or `(self & mask) != 0`.
    pub fn contains_any(&self, mask: &Signature) -> bool {
        mask.bits.iter_ones().next().is_none()
            || mask
                .bits
                .iter_ones()
                .any(|bit| bit < self.bits.len() && self.bits.get(bit))
    }

    /// `(self & mask) == 0`: no bit in `mask` is set in `self`.
    pub fn contains_none(&self, mask: &Signature) -> bool {
        mask.bits.iter_ones().all(|bit| bit >= self.bits.len() || !self.bits.get(bit))
    }
}

/// A component-set filter over four independent clauses, matching the
/// ECS's Each/Any/None/Has query semantics.
///
/// - `each`: every listed type must be present (and is iterated by value).
/// - `any`: at least one listed type must be present, if non-empty
///   (pointers handed to the callback are null for absent types).
/// - `none`: no listed type may be present.
/// - `has`: presence-only booleans, constant across one chunk's rows.
#[derive(Clone, Debug, Default)]
pub struct QueryFilter {
    pub each: Vec<ComponentIndex>,
    pub any: Vec<ComponentIndex>,
    pub none: Vec<ComponentIndex>,
    pub has: Vec<ComponentIndex>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn each(mut self, index: ComponentIndex) -> Self {
        self.each.push(index);
        self
    }

    pub fn any(mut self, index: ComponentIndex) -> Self {
        self.any.push(index);
        self
    }

    pub fn none(mut self, index: ComponentIndex) -> Self {
        self.none.push(index);
        self
    }

    pub fn has(mut self, index: ComponentIndex) -> Self {
        self.has.push(index);
        self
    }

    /// Whether a chunk with this bitset signature should be visited.
    pub fn matches(&self, signature: &Signature, capacity: usize) -> bool {
        let each_mask = Signature::from_set(capacity, &self.each);
        let any_mask = Signature::from_set(capacity, &self.any);
        let none_mask = Signature::from_set(capacity, &self.none);
        signature.contains_all(&each_mask)
            && signature.contains_any(&any_mask)
            && signature.contains_none(&none_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_requires_all_listed_types() {
        let sig = Signature::from_set(8, &[ComponentIndex::new(1), ComponentIndex::new(3)]);
        let filter = QueryFilter::new().each(ComponentIndex::new(1)).each(ComponentIndex::new(3));
        assert!(filter.matches(&sig, 8));
        let filter_missing = QueryFilter::new().each(ComponentIndex::new(2));
        assert!(!filter_missing.matches(&sig, 8));
    }

    #[test]
    fn none_rejects_any_listed_type() {
        let sig = Signature::from_set(8, &[ComponentIndex::new(1)]);
        let filter = QueryFilter::new().none(ComponentIndex::new(1));
        assert!(!filter.matches(&sig, 8));
        let filter_ok = QueryFilter::new().none(ComponentIndex::new(5));
        assert!(filter_ok.matches(&sig, 8));
    }

    #[test]
    fn empty_any_mask_always_matches() {
        let sig = Signature::from_set(8, &[]);
        let filter = QueryFilter::new();
        assert!(filter.matches(&sig, 8));
    }

    #[test]
    fn any_requires_at_least_one_listed_type() {
        let sig = Signature::from_set(8, &[ComponentIndex::new(4)]);
        let filter = QueryFilter::new().any(ComponentIndex::new(4)).any(ComponentIndex::new(5));
        assert!(filter.matches(&sig, 8));
        let filter_none_present = QueryFilter::new().any(ComponentIndex::new(6)).any(ComponentIndex::new(7));
        assert!(!filter_none_present.matches(&sig, 8));
    }
}
