//! # loom_structures - Fixed-width data structures shared by the runtime
//!
//! - BitSet: fixed-capacity bitset backing component Signatures.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod bitset;

pub use bitset::BitSet;

pub mod prelude {
    pub use crate::bitset::BitSet;
}
