//! Dynamic, type-erased serializers built from a strongly-typed
//! construct/encode/decode triple.
//!
//! A [`TypedSerializer<T>`] is registered once per component type and
//! reached afterwards only through the type-erased [`DynamicSerializer`]
//! trait object, since the [`crate::registry::SerializationRegistry`] that
//! holds it is keyed on a runtime [`loom_ecs::ComponentTypeId`], not a
//! generic parameter.

use crate::serialized_object::{SerializedObject, SerializedSubObjects};
use loom_ecs::Value;

/// Type-erased construct/encode/decode for one component type.
pub trait DynamicSerializer {
    /// Builds a default instance of the described type.
    fn construct(&self) -> Value;
    /// Encodes a boxed instance into its property tree. Panics if `value`
    /// does not hold the type this serializer was built for.
    fn encode(&self, value: &Value) -> SerializedObject;
    /// Tries to decode a property tree back into a boxed instance. Absence,
    /// not a panic, is how malformed input is reported.
    fn decode(&self, object: &SerializedObject) -> Option<Value>;
}

/// A [`DynamicSerializer`] built from three plain function pointers
/// describing exactly one concrete type `T`.
pub struct TypedSerializer<T> {
    construct: fn() -> T,
    encode: fn(&T) -> SerializedObject,
    decode: fn(&SerializedObject) -> Option<T>,
}

impl<T> TypedSerializer<T> {
    pub fn new(
        construct: fn() -> T,
        encode: fn(&T) -> SerializedObject,
        decode: fn(&SerializedObject) -> Option<T>,
    ) -> Self {
        Self {
            construct,
            encode,
            decode,
        }
    }
}

impl<T: 'static> DynamicSerializer for TypedSerializer<T> {
    fn construct(&self) -> Value {
        Box::new((self.construct)())
    }

    fn encode(&self, value: &Value) -> SerializedObject {
        let concrete = value
            .downcast_ref::<T>()
            .expect("DynamicSerializer::encode called with a value of the wrong type");
        (self.encode)(concrete)
    }

    fn decode(&self, object: &SerializedObject) -> Option<Value> {
        (self.decode)(object).map(|v| Box::new(v) as Value)
    }
}

/// Lets a boxed trait object stand in for `impl DynamicSerializer`, so code
/// that only knows it has *some* serializer (not its concrete type) can
/// still hand one to [`crate::registry::SerializationRegistry::register_for`].
impl DynamicSerializer for Box<dyn DynamicSerializer> {
    fn construct(&self) -> Value {
        (**self).construct()
    }

    fn encode(&self, value: &Value) -> SerializedObject {
        (**self).encode(value)
    }

    fn decode(&self, object: &SerializedObject) -> Option<Value> {
        (**self).decode(object)
    }
}

/// A [`TypedSerializer`] for types that are trivially constructable and
/// have no fields worth serializing (tag components). Encodes to an empty
/// `"Root"` sub-object tree; decodes successfully only from one.
pub fn trivial_serializer<T: Default + 'static>() -> TypedSerializer<T> {
    TypedSerializer::new(
        || T::default(),
        |_component: &T| SerializedObject::composed("Root", SerializedSubObjects::new()),
        |object: &SerializedObject| {
            let subs = object.sub_objects()?;
            if subs.is_empty() {
                Some(T::default())
            } else {
                None
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialized_object::SerializedValue;

    #[derive(Default, PartialEq, Debug)]
    struct TagComponent;

    #[derive(PartialEq, Debug)]
    struct Health {
        value: f32,
    }

    fn serialize_health(h: &Health) -> SerializedObject {
        SerializedObject::composed(
            "Root",
            SerializedSubObjects::from_items(vec![SerializedObject::new(
                "value",
                SerializedValue::Float(h.value),
            )]),
        )
    }

    fn deserialize_health(object: &SerializedObject) -> Option<Health> {
        Some(Health {
            value: match object.try_get("value")?.value() {
                SerializedValue::Float(v) => *v,
                _ => return None,
            },
        })
    }

    #[test]
    fn trivial_serializer_round_trips_through_type_erasure() {
        let serializer: TypedSerializer<TagComponent> = trivial_serializer();
        let dynamic: &dyn DynamicSerializer = &serializer;
        let boxed = dynamic.construct();
        let encoded = dynamic.encode(&boxed);
        let decoded = dynamic.decode(&encoded).unwrap();
        assert!(decoded.downcast_ref::<TagComponent>().is_some());
    }

    #[test]
    fn trivial_serializer_rejects_a_non_empty_tree() {
        let serializer: TypedSerializer<TagComponent> = trivial_serializer();
        let non_empty = SerializedObject::composed(
            "Root",
            SerializedSubObjects::from_items(vec![SerializedObject::new(
                "stray",
                SerializedValue::Bool(true),
            )]),
        );
        assert!(serializer.decode(&non_empty).is_none());
    }

    #[test]
    fn typed_serializer_round_trips_a_field() {
        let serializer = TypedSerializer::new(
            || Health { value: 100.0 },
            serialize_health,
            deserialize_health,
        );
        let dynamic: &dyn DynamicSerializer = &serializer;
        let boxed: Value = Box::new(Health { value: 42.0 });
        let encoded = dynamic.encode(&boxed);
        let decoded = dynamic.decode(&encoded).unwrap();
        assert_eq!(*decoded.downcast_ref::<Health>().unwrap(), Health { value: 42.0 });
    }
}
