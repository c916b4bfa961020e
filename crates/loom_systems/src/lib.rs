//! # loom_systems - Named systems and systems-groups
//!
//! A [`System`] is a per-frame callback object; a [`SystemsGroup`] holds a
//! DAG of system keys plus a table from key to system, giving within-group
//! ordering. The [`SystemsGroupRegistry`] is the process-wide collection of
//! groups, itself ordered by a DAG, with a system-to-group index that
//! enforces ordering dependencies only within a shared group.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod group;
pub mod registry;
pub mod system;

pub use group::{AsAny, SystemsGroup};
pub use registry::SystemsGroupRegistry;
pub use system::{Phase, System};

pub mod prelude {
    pub use crate::group::SystemsGroup;
    pub use crate::registry::SystemsGroupRegistry;
    pub use crate::system::{Phase, System};
}
