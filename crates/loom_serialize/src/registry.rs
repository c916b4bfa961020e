//! [`SerializationRegistry`]: associates component types with the
//! [`DynamicSerializer`] that can construct, encode and decode them.

use crate::serializer::DynamicSerializer;
use loom_context::Subcontext;
use loom_ecs::ComponentTypeId;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A [`Subcontext`] mapping each registered [`ComponentTypeId`] to the
/// [`DynamicSerializer`] that knows how to construct, encode and decode it.
/// Itself a `Subcontext` so modules can reach it through the same
/// [`loom_context::Context`] every other process-wide service lives in.
#[derive(Default)]
pub struct SerializationRegistry {
    serializers: BTreeMap<ComponentTypeId, Rc<dyn DynamicSerializer>>,
}

impl SerializationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `serializer` for type `T`. Panics if one is already
    /// registered for `T`.
    pub fn register_for<T: 'static>(&mut self, serializer: impl DynamicSerializer + 'static) {
        let type_id = ComponentTypeId::of::<T>();
        assert!(
            !self.serializers.contains_key(&type_id),
            "a serializer for this type is already registered"
        );
        self.serializers.insert(type_id, Rc::new(serializer));
    }

    /// Deregisters the serializer for `T`. Panics if none is registered.
    pub fn deregister_for<T: 'static>(&mut self) {
        let type_id = ComponentTypeId::of::<T>();
        assert!(
            self.serializers.remove(&type_id).is_some(),
            "no serializer registered for this type"
        );
    }

    pub fn try_get_for(&self, type_id: ComponentTypeId) -> Option<Rc<dyn DynamicSerializer>> {
        self.serializers.get(&type_id).cloned()
    }

    pub fn has_serializer(&self, type_id: ComponentTypeId) -> bool {
        self.serializers.contains_key(&type_id)
    }

    /// All currently registered `(type, serializer)` pairs. Iteration order
    /// carries no meaning.
    pub fn all_registered(&self) -> impl Iterator<Item = (ComponentTypeId, &Rc<dyn DynamicSerializer>)> {
        self.serializers.iter().map(|(id, s)| (*id, s))
    }
}

impl Subcontext for SerializationRegistry {
    fn name(&self) -> &str {
        "Serialization Registry"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::trivial_serializer;

    #[derive(Default)]
    struct TagComponent;

    #[test]
    fn register_get_and_deregister_round_trip() {
        let mut registry = SerializationRegistry::new();
        let type_id = ComponentTypeId::of::<TagComponent>();
        assert!(!registry.has_serializer(type_id));

        registry.register_for::<TagComponent>(trivial_serializer::<TagComponent>());
        assert!(registry.has_serializer(type_id));
        assert!(registry.try_get_for(type_id).is_some());

        registry.deregister_for::<TagComponent>();
        assert!(!registry.has_serializer(type_id));
        assert!(registry.try_get_for(type_id).is_none());
    }

    #[test]
    #[should_panic]
    fn registering_the_same_type_twice_panics() {
        let mut registry = SerializationRegistry::new();
        registry.register_for::<TagComponent>(trivial_serializer::<TagComponent>());
        registry.register_for::<TagComponent>(trivial_serializer::<TagComponent>());
    }

    #[test]
    fn all_registered_lists_every_entry() {
        #[derive(Default)]
        struct OtherTag;
        let mut registry = SerializationRegistry::new();
        registry.register_for::<TagComponent>(trivial_serializer::<TagComponent>());
        registry.register_for::<OtherTag>(trivial_serializer::<OtherTag>());
        assert_eq!(registry.all_registered().count(), 2);
    }
}
