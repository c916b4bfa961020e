//! # loom_graph - Generic acyclic dependency graph
//!
//! Shared by the module manager (dependency-ordered load/unload), the
//! systems-group registry (cross-group ordering) and systems groups
//! themselves (within-group ordering). A single, reusable DAG keyed by any
//! `Ord + Clone` value.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod dependency_graph;

pub use dependency_graph::DependencyGraph;
