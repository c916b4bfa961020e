//! The type-erased live value a component boxes itself into and unboxes
//! itself from.
//!
//! `Value` only needs to carry an owned, concrete component value across
//! the component/serialization boundary; the property-tree shape used on
//! the wire (`SerializedObject`, in `loom_serialize`) is a separate,
//! always-`'static`-safe representation built on top of it via a type's
//! registered `DynamicSerializer`.

use alloc::boxed::Box;
use core::any::Any;

/// An owned, type-erased component value. Produced by
/// [`crate::component::ComponentDescriptor::box_value`], consumed by
/// [`crate::component::ComponentDescriptor::unbox_value`].
pub type Value = Box<dyn Any>;
