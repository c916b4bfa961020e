//! The tagged property tree: [`SerializedObject`], [`SerializedValue`] and
//! [`SerializedSubObjects`].
//!
//! A component (or any other serializable value) is reduced to a named tree
//! of these before it crosses a module boundary or touches disk; only the
//! variants listed in [`SerializedValue`] ever appear on the wire.

use loom_ecs::Entity;
use loom_math::{Color3, Color4, IVec2, IVec3, IVec4, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

/// One of the values a [`SerializedObject`] can hold. The discriminant order
/// here is load-bearing: it is exactly the `type` tag used on the wire (see
/// [`crate::wire`]), 0 through 17.
#[derive(Clone, Debug, PartialEq)]
pub enum SerializedValue {
    Invalid,
    Int(i32),
    Int2(IVec2),
    Int3(IVec3),
    Int4(IVec4),
    Float(f32),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Bool(bool),
    Color3(Color3),
    Color4(Color4),
    Quat(Quat),
    Entity(Entity),
    String(String),
    SubObjects(SerializedSubObjects),
}

impl SerializedValue {
    /// The wire `type` tag for this variant, 0..=17.
    pub fn type_tag(&self) -> u8 {
        match self {
            SerializedValue::Invalid => 0,
            SerializedValue::Int(_) => 1,
            SerializedValue::Int2(_) => 2,
            SerializedValue::Int3(_) => 3,
            SerializedValue::Int4(_) => 4,
            SerializedValue::Float(_) => 5,
            SerializedValue::Float2(_) => 6,
            SerializedValue::Float3(_) => 7,
            SerializedValue::Float4(_) => 8,
            SerializedValue::Mat3(_) => 9,
            SerializedValue::Mat4(_) => 10,
            SerializedValue::Bool(_) => 11,
            SerializedValue::Color3(_) => 12,
            SerializedValue::Color4(_) => 13,
            SerializedValue::Quat(_) => 14,
            SerializedValue::Entity(_) => 15,
            SerializedValue::String(_) => 16,
            SerializedValue::SubObjects(_) => 17,
        }
    }
}

/// An ordered, uniquely-keyed list of named sub-objects. Insertion order is
/// preserved and is what output iterates in; lookup is by linear scan, which
/// is fine at the small widths a component's field tree actually reaches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SerializedSubObjects(Vec<SerializedObject>);

impl SerializedSubObjects {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_items(items: Vec<SerializedObject>) -> Self {
        Self(items)
    }

    /// Appends `object`. Panics if its name collides with an existing entry,
    /// mirroring the "keys within one subobject are unique" invariant.
    pub fn push(&mut self, object: SerializedObject) {
        assert!(
            self.try_get(&object.name).is_none(),
            "duplicate sub-object name {:?}",
            object.name
        );
        self.0.push(object);
    }

    pub fn try_get(&self, name: &str) -> Option<&SerializedObject> {
        self.0.iter().find(|o| o.name == name)
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn items(&self) -> &[SerializedObject] {
        &self.0
    }

    pub fn into_items(self) -> Vec<SerializedObject> {
        self.0
    }
}

impl FromIterator<SerializedObject> for SerializedSubObjects {
    fn from_iter<I: IntoIterator<Item = SerializedObject>>(iter: I) -> Self {
        let mut subs = Self::new();
        for item in iter {
            subs.push(item);
        }
        subs
    }
}

/// A named node in the property tree. The root of a serialized component is
/// conventionally named `"Root"`.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedObject {
    name: String,
    value: SerializedValue,
}

impl SerializedObject {
    pub fn new(name: impl Into<String>, value: SerializedValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// An invalid placeholder object, named `"Invalid"`.
    pub fn invalid() -> Self {
        Self::new("Invalid", SerializedValue::Invalid)
    }

    pub fn composed(name: impl Into<String>, sub_objects: SerializedSubObjects) -> Self {
        Self::new(name, SerializedValue::SubObjects(sub_objects))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &SerializedValue {
        &self.value
    }

    pub fn into_value(self) -> SerializedValue {
        self.value
    }

    pub fn is_composed(&self) -> bool {
        matches!(self.value, SerializedValue::SubObjects(_))
    }

    /// The sub-object tree, if this object [`Self::is_composed`].
    pub fn sub_objects(&self) -> Option<&SerializedSubObjects> {
        match &self.value {
            SerializedValue::SubObjects(subs) => Some(subs),
            _ => None,
        }
    }

    /// Looks up a named sub-object. `None` if this object isn't composed or
    /// has no sub-object of that name.
    pub fn try_get(&self, sub_object_name: &str) -> Option<&SerializedObject> {
        self.sub_objects()?.try_get(sub_object_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_match_the_wire_ordering() {
        assert_eq!(SerializedValue::Invalid.type_tag(), 0);
        assert_eq!(SerializedValue::Int(0).type_tag(), 1);
        assert_eq!(SerializedValue::Float3(Vec3::ZERO).type_tag(), 7);
        assert_eq!(SerializedValue::Mat4(Mat4::IDENTITY).type_tag(), 10);
        assert_eq!(SerializedValue::Color4(Color4::BLACK).type_tag(), 13);
        assert_eq!(SerializedValue::Entity(Entity::INVALID).type_tag(), 15);
        assert_eq!(
            SerializedValue::SubObjects(SerializedSubObjects::new()).type_tag(),
            17
        );
    }

    #[test]
    fn sub_objects_preserve_insertion_order() {
        let mut subs = SerializedSubObjects::new();
        subs.push(SerializedObject::new("b", SerializedValue::Int(1)));
        subs.push(SerializedObject::new("a", SerializedValue::Int(2)));
        let names: Vec<_> = subs.items().iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    #[should_panic]
    fn duplicate_sub_object_name_panics() {
        let mut subs = SerializedSubObjects::new();
        subs.push(SerializedObject::new("a", SerializedValue::Int(1)));
        subs.push(SerializedObject::new("a", SerializedValue::Int(2)));
    }

    #[test]
    fn try_get_recurses_into_sub_objects() {
        let inner = SerializedObject::new("x", SerializedValue::Float(1.0));
        let root = SerializedObject::composed("Root", SerializedSubObjects::from_items(vec![inner]));
        assert_eq!(root.try_get("x").unwrap().value(), &SerializedValue::Float(1.0));
        assert!(root.try_get("missing").is_none());
    }
}
