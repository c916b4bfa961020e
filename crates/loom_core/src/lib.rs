//! # loom_core - Loom Engine Core
//!
//! Zero-dependency primitives shared by every other crate in the runtime:
//! stable identifiers, a portable-hash type registry, semantic versions and
//! the tiered error model described by the rest of the workspace.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod error;
pub mod id;
pub mod module;
pub mod type_registry;
pub mod version;

pub use error::*;
pub use id::*;
pub use module::Module;
pub use type_registry::*;
pub use version::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::{Id, IdGenerator, NamedId};
    pub use crate::module::Module;
    pub use crate::type_registry::{PortableHash, TypeHandle, TypeRegistry};
    pub use crate::version::Version;
}
