//! The YAML wire format: every [`SerializedObject`] becomes a map with
//! `name`, `type` (the tag from [`SerializedValue::type_tag`]) and `value`.
//! Matrices flatten their rows into field pairs (`x0..x3`, `y0..y3`, ...);
//! `SubObjects` becomes a YAML sequence of nested maps.

use crate::serialized_object::{SerializedObject, SerializedSubObjects, SerializedValue};
use loom_ecs::Entity;
use loom_math::{Color3, Color4, IVec2, IVec3, IVec4, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
use serde_yaml::{Mapping, Value};

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

/// Looks up a string-keyed field without relying on a particular
/// `Mapping::get` key-type signature across `serde_yaml` versions.
fn get_field<'a>(map: &'a Mapping, field: &str) -> Option<&'a Value> {
    map.iter().find(|(k, _)| k.as_str() == Some(field)).map(|(_, v)| v)
}

fn mat3_to_value(m: &Mat3) -> Value {
    let mut map = Mapping::new();
    let rows = [
        ("x", [m.cols[0].x, m.cols[1].x, m.cols[2].x]),
        ("y", [m.cols[0].y, m.cols[1].y, m.cols[2].y]),
        ("z", [m.cols[0].z, m.cols[1].z, m.cols[2].z]),
    ];
    for (row_name, components) in rows {
        for (i, c) in components.into_iter().enumerate() {
            map.insert(key(&format!("{row_name}{i}")), Value::from(c as f64));
        }
    }
    Value::Mapping(map)
}

fn mat3_from_value(v: &Value) -> Option<Mat3> {
    let map = v.as_mapping()?;
    let get = |row: &str, i: usize| -> Option<f32> {
        get_field(map, &format!("{row}{i}"))?.as_f64().map(|f| f as f32)
    };
    let row = |name: &str| -> Option<[f32; 3]> {
        Some([get(name, 0)?, get(name, 1)?, get(name, 2)?])
    };
    let x = row("x")?;
    let y = row("y")?;
    let z = row("z")?;
    Some(Mat3::from_cols(
        Vec3::new(x[0], y[0], z[0]),
        Vec3::new(x[1], y[1], z[1]),
        Vec3::new(x[2], y[2], z[2]),
    ))
}

fn mat4_to_value(m: &Mat4) -> Value {
    let mut map = Mapping::new();
    let rows = [
        ("x", [m.cols[0].x, m.cols[1].x, m.cols[2].x, m.cols[3].x]),
        ("y", [m.cols[0].y, m.cols[1].y, m.cols[2].y, m.cols[3].y]),
        ("z", [m.cols[0].z, m.cols[1].z, m.cols[2].z, m.cols[3].z]),
        ("w", [m.cols[0].w, m.cols[1].w, m.cols[2].w, m.cols[3].w]),
    ];
    for (row_name, components) in rows {
        for (i, c) in components.into_iter().enumerate() {
            map.insert(key(&format!("{row_name}{i}")), Value::from(c as f64));
        }
    }
    Value::Mapping(map)
}

fn mat4_from_value(v: &Value) -> Option<Mat4> {
    let map = v.as_mapping()?;
    let get = |row: &str, i: usize| -> Option<f32> {
        get_field(map, &format!("{row}{i}"))?.as_f64().map(|f| f as f32)
    };
    let row = |name: &str| -> Option<[f32; 4]> {
        Some([get(name, 0)?, get(name, 1)?, get(name, 2)?, get(name, 3)?])
    };
    let x = row("x")?;
    let y = row("y")?;
    let z = row("z")?;
    let w = row("w")?;
    Some(Mat4::from_cols(
        Vec4::new(x[0], y[0], z[0], w[0]),
        Vec4::new(x[1], y[1], z[1], w[1]),
        Vec4::new(x[2], y[2], z[2], w[2]),
        Vec4::new(x[3], y[3], z[3], w[3]),
    ))
}

fn value_payload(value: &SerializedValue) -> Value {
    match value {
        SerializedValue::Invalid => Value::Null,
        SerializedValue::Int(v) => Value::from(*v),
        SerializedValue::Int2(v) => {
            let mut m = Mapping::new();
            m.insert(key("x"), Value::from(v.x));
            m.insert(key("y"), Value::from(v.y));
            Value::Mapping(m)
        }
        SerializedValue::Int3(v) => {
            let mut m = Mapping::new();
            m.insert(key("x"), Value::from(v.x));
            m.insert(key("y"), Value::from(v.y));
            m.insert(key("z"), Value::from(v.z));
            Value::Mapping(m)
        }
        SerializedValue::Int4(v) => {
            let mut m = Mapping::new();
            m.insert(key("x"), Value::from(v.x));
            m.insert(key("y"), Value::from(v.y));
            m.insert(key("z"), Value::from(v.z));
            m.insert(key("w"), Value::from(v.w));
            Value::Mapping(m)
        }
        SerializedValue::Float(v) => Value::from(*v as f64),
        SerializedValue::Float2(v) => {
            let mut m = Mapping::new();
            m.insert(key("x"), Value::from(v.x as f64));
            m.insert(key("y"), Value::from(v.y as f64));
            Value::Mapping(m)
        }
        SerializedValue::Float3(v) => {
            let mut m = Mapping::new();
            m.insert(key("x"), Value::from(v.x as f64));
            m.insert(key("y"), Value::from(v.y as f64));
            m.insert(key("z"), Value::from(v.z as f64));
            Value::Mapping(m)
        }
        SerializedValue::Float4(v) => {
            let mut m = Mapping::new();
            m.insert(key("x"), Value::from(v.x as f64));
            m.insert(key("y"), Value::from(v.y as f64));
            m.insert(key("z"), Value::from(v.z as f64));
            m.insert(key("w"), Value::from(v.w as f64));
            Value::Mapping(m)
        }
        SerializedValue::Mat3(m) => mat3_to_value(m),
        SerializedValue::Mat4(m) => mat4_to_value(m),
        SerializedValue::Bool(v) => Value::from(*v),
        SerializedValue::Color3(c) => {
            let mut m = Mapping::new();
            m.insert(key("r"), Value::from(c.r as f64));
            m.insert(key("g"), Value::from(c.g as f64));
            m.insert(key("b"), Value::from(c.b as f64));
            Value::Mapping(m)
        }
        SerializedValue::Color4(c) => {
            let mut m = Mapping::new();
            m.insert(key("r"), Value::from(c.r as f64));
            m.insert(key("g"), Value::from(c.g as f64));
            m.insert(key("b"), Value::from(c.b as f64));
            m.insert(key("a"), Value::from(c.a as f64));
            Value::Mapping(m)
        }
        SerializedValue::Quat(q) => {
            let mut m = Mapping::new();
            m.insert(key("x"), Value::from(q.x as f64));
            m.insert(key("y"), Value::from(q.y as f64));
            m.insert(key("z"), Value::from(q.z as f64));
            m.insert(key("w"), Value::from(q.w as f64));
            Value::Mapping(m)
        }
        SerializedValue::Entity(e) => Value::from(e.id()),
        SerializedValue::String(s) => Value::from(s.clone()),
        SerializedValue::SubObjects(subs) => {
            Value::Sequence(subs.items().iter().map(to_yaml_value).collect())
        }
    }
}

/// Encodes a [`SerializedObject`] into the `{name, type, value}` YAML map.
pub fn to_yaml_value(object: &SerializedObject) -> Value {
    let mut map = Mapping::new();
    map.insert(key("name"), Value::from(object.name().to_string()));
    map.insert(key("type"), Value::from(object.value().type_tag()));
    map.insert(key("value"), value_payload(object.value()));
    Value::Mapping(map)
}

pub fn to_yaml_string(object: &SerializedObject) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&to_yaml_value(object))
}

fn int_field(m: &Mapping, field: &str) -> Option<i32> {
    get_field(m, field)?.as_i64().map(|v| v as i32)
}

fn float_field(m: &Mapping, field: &str) -> Option<f32> {
    get_field(m, field)?.as_f64().map(|v| v as f32)
}

/// Decodes a YAML `{name, type, value}` map back into a [`SerializedObject`].
/// Malformed input yields `None` rather than panicking.
pub fn from_yaml_value(node: &Value) -> Option<SerializedObject> {
    let map = node.as_mapping()?;
    let name = get_field(map, "name")?.as_str()?.to_string();
    let type_tag = get_field(map, "type")?.as_u64()?;
    let value = get_field(map, "value")?;

    let parsed = match type_tag {
        0 => SerializedValue::Invalid,
        1 => SerializedValue::Int(value.as_i64()? as i32),
        2 => {
            let m = value.as_mapping()?;
            SerializedValue::Int2(IVec2::new(int_field(m, "x")?, int_field(m, "y")?))
        }
        3 => {
            let m = value.as_mapping()?;
            SerializedValue::Int3(IVec3::new(
                int_field(m, "x")?,
                int_field(m, "y")?,
                int_field(m, "z")?,
            ))
        }
        4 => {
            let m = value.as_mapping()?;
            SerializedValue::Int4(IVec4::new(
                int_field(m, "x")?,
                int_field(m, "y")?,
                int_field(m, "z")?,
                int_field(m, "w")?,
            ))
        }
        5 => SerializedValue::Float(value.as_f64()? as f32),
        6 => {
            let m = value.as_mapping()?;
            SerializedValue::Float2(Vec2::new(float_field(m, "x")?, float_field(m, "y")?))
        }
        7 => {
            let m = value.as_mapping()?;
            SerializedValue::Float3(Vec3::new(
                float_field(m, "x")?,
                float_field(m, "y")?,
                float_field(m, "z")?,
            ))
        }
        8 => {
            let m = value.as_mapping()?;
            SerializedValue::Float4(Vec4::new(
                float_field(m, "x")?,
                float_field(m, "y")?,
                float_field(m, "z")?,
                float_field(m, "w")?,
            ))
        }
        9 => SerializedValue::Mat3(mat3_from_value(value)?),
        10 => SerializedValue::Mat4(mat4_from_value(value)?),
        11 => SerializedValue::Bool(value.as_bool()?),
        12 => {
            let m = value.as_mapping()?;
            SerializedValue::Color3(Color3::new(
                float_field(m, "r")?,
                float_field(m, "g")?,
                float_field(m, "b")?,
            ))
        }
        13 => {
            let m = value.as_mapping()?;
            SerializedValue::Color4(Color4::new(
                float_field(m, "r")?,
                float_field(m, "g")?,
                float_field(m, "b")?,
                float_field(m, "a")?,
            ))
        }
        14 => {
            let m = value.as_mapping()?;
            SerializedValue::Quat(Quat::new(
                float_field(m, "x")?,
                float_field(m, "y")?,
                float_field(m, "z")?,
                float_field(m, "w")?,
            ))
        }
        15 => SerializedValue::Entity(Entity::from_raw(value.as_u64()? as u32)),
        16 => SerializedValue::String(value.as_str()?.to_string()),
        17 => {
            let seq = value.as_sequence()?;
            let mut subs = SerializedSubObjects::new();
            for item in seq {
                subs.push(from_yaml_value(item)?);
            }
            SerializedValue::SubObjects(subs)
        }
        _ => return None,
    };

    Some(SerializedObject::new(name, parsed))
}

pub fn from_yaml_str(text: &str) -> Option<SerializedObject> {
    let value: Value = serde_yaml::from_str(text).ok()?;
    from_yaml_value(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialized_object::SerializedObject;

    #[test]
    fn round_trips_a_composed_float3_field() {
        let original = SerializedObject::composed(
            "Root",
            SerializedSubObjects::from_items(vec![SerializedObject::new(
                "Value",
                SerializedValue::Float3(Vec3::new(1.0, 2.0, 3.0)),
            )]),
        );
        let yaml = to_yaml_string(&original).unwrap();
        let decoded = from_yaml_str(&yaml).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn round_trips_a_mat4() {
        let original = SerializedObject::new("m", SerializedValue::Mat4(Mat4::IDENTITY));
        let decoded = from_yaml_value(&to_yaml_value(&original)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn malformed_input_yields_none() {
        let bogus: Value = serde_yaml::from_str("name: x").unwrap();
        assert!(from_yaml_value(&bogus).is_none());
    }

    #[test]
    fn entity_round_trips_by_raw_id() {
        let original = SerializedObject::new("e", SerializedValue::Entity(Entity::from_raw(7)));
        let decoded = from_yaml_value(&to_yaml_value(&original)).unwrap();
        assert_eq!(decoded, original);
    }
}
