//! # loom_ecs - Archetype-based Entity Component System
//!
//! Entities are plain indices; components live in fixed-size chunks keyed
//! by their owner's exact component signature. A [`component::ComponentRegistry`]
//! assigns each registered type a dense index and the type-erased
//! destructor/copy/box/unbox glue a chunk needs to stay generic; an
//! [`entity_manager::EntityManager`] owns the chunks themselves and the
//! entity-to-chunk bookkeeping, including cross-chunk migration on
//! add/remove and a deferred-mutation queue for structural changes raised
//! mid-query. [`prefab::Prefab`] and [`scene_graph`] build on top of that
//! public surface; neither needs privileged access to it.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod entity;
pub mod value;
pub mod component;
pub mod chunk;
pub mod query;
pub mod entity_manager;
pub mod prefab;
pub mod scene_graph;

pub use entity::{Entity, EntityAllocator};
pub use value::Value;
pub use component::{
    descriptor_of, with_box_unbox, with_copy, ComponentDescriptor, ComponentIndex,
    ComponentRegistry, ComponentTypeId, MAX_COMPONENT_TYPES,
};
pub use chunk::EntityChunk;
pub use query::{QueryFilter, Signature};
pub use entity_manager::EntityManager;
pub use prefab::Prefab;
pub use scene_graph::{
    propagate_transforms, Children, GlobalTransform, HierarchyDepth, LocalTransform, Parent,
    SceneGraphTypes,
};

/// Commonly used types, re-exported for `use loom_ecs::prelude::*;`.
pub mod prelude {
    pub use crate::component::{
        descriptor_of, with_box_unbox, with_copy, ComponentDescriptor, ComponentIndex,
        ComponentRegistry, ComponentTypeId,
    };
    pub use crate::entity::{Entity, EntityAllocator};
    pub use crate::entity_manager::EntityManager;
    pub use crate::prefab::Prefab;
    pub use crate::query::{QueryFilter, Signature};
    pub use crate::scene_graph::{
        propagate_transforms, Children, GlobalTransform, HierarchyDepth, LocalTransform, Parent,
        SceneGraphTypes,
    };
    pub use crate::value::Value;
}
