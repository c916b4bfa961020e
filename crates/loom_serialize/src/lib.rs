//! # loom_serialize - Tagged property tree serialization
//!
//! Components cross a module boundary or touch disk as a
//! [`SerializedObject`]: a named tree of [`SerializedValue`]s built and read
//! back by a per-type [`DynamicSerializer`], registered in a
//! [`SerializationRegistry`]. [`wire`] converts the tree to and from the
//! YAML wire format.

pub mod registry;
pub mod serialized_object;
pub mod serializer;
pub mod wire;

pub use registry::SerializationRegistry;
pub use serialized_object::{SerializedObject, SerializedSubObjects, SerializedValue};
pub use serializer::{trivial_serializer, DynamicSerializer, TypedSerializer};

pub mod prelude {
    pub use crate::registry::SerializationRegistry;
    pub use crate::serialized_object::{SerializedObject, SerializedSubObjects, SerializedValue};
    pub use crate::serializer::{trivial_serializer, DynamicSerializer, TypedSerializer};
    pub use crate::wire::{from_yaml_str, from_yaml_value, to_yaml_string, to_yaml_value};
}
