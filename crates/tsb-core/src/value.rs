//! # Runtime Values
//!
//! The dynamically-typed values handed to the validator before they are
//! encoded, or produced by the decoder. The model keeps the distinctions the
//! wire format cares about: `undefined` vs `null`, floating-point numbers vs
//! big integers, raw byte buffers vs typed arrays.
//!
//! Objects keep insertion order, which is also the order the validator
//! enumerates keys in when it looks for excess fields.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::schema::TypedArrayKind;

/// A runtime value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    /// An ordered sequence; holes are `Undefined`.
    Array(Vec<Value>),
    Object(Object),
    /// A raw byte buffer.
    Buffer(Vec<u8>),
    /// A typed view over bytes.
    TypedArray { kind: TypedArrayKind, bytes: Vec<u8> },
}

/// An insertion-ordered string-keyed map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    entries: IndexMap<String, Value>,
}

impl Value {
    /// Type name used in `WrongType` diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Buffer(_) => "ArrayBuffer",
            Value::TypedArray { kind, .. } => kind.as_str(),
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// A typed array of `kind` with `len` zeroed elements.
    pub fn typed_array(kind: TypedArrayKind, len: usize) -> Self {
        let width = match kind {
            TypedArrayKind::Int8Array | TypedArrayKind::Uint8Array => 1,
            TypedArrayKind::Int16Array | TypedArrayKind::Uint16Array => 2,
            TypedArrayKind::Int32Array
            | TypedArrayKind::Uint32Array
            | TypedArrayKind::Float32Array => 4,
            TypedArrayKind::BigInt64Array
            | TypedArrayKind::BigUint64Array
            | TypedArrayKind::Float64Array => 8,
        };
        Value::TypedArray {
            kind,
            bytes: vec![0; len * width],
        }
    }
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Object {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_conversion_preserves_shape() {
        let value = Value::from(json!({ "name": "a", "list": [1, null, true] }));
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("name"), Some(&Value::from("a")));
        assert_eq!(
            obj.get("list"),
            Some(&Value::Array(vec![
                Value::Number(1.0),
                Value::Null,
                Value::Boolean(true)
            ]))
        );
    }

    #[test]
    fn object_replaces_in_place() {
        let mut obj = Object::new();
        obj.insert("a", Value::from(1i64));
        obj.insert("b", Value::from(2i64));
        obj.insert("a", Value::from(3i64));
        assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(obj.get("a"), Some(&Value::Number(3.0)));
        assert_eq!(obj.len(), 2);
    }

    #[test]
    fn wide_objects_convert_and_look_up_by_key() {
        let map: serde_json::Map<String, JsonValue> =
            (0..50_000).map(|i| (format!("k{i}"), json!(i))).collect();
        let value = Value::from(JsonValue::Object(map));
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 50_000);
        assert_eq!(obj.keys().next(), Some("k0"));
        assert_eq!(obj.keys().last(), Some("k49999"));
        assert_eq!(obj.get("k31337"), Some(&Value::Number(31337.0)));
        assert!(!obj.contains_key("k50000"));
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Undefined.type_name(), "undefined");
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::BigInt(1).type_name(), "bigint");
        assert_eq!(Value::Object(Object::new()).type_name(), "Object");
        assert_eq!(Value::Buffer(vec![]).type_name(), "ArrayBuffer");
        assert_eq!(
            Value::typed_array(TypedArrayKind::Uint16Array, 2).type_name(),
            "Uint16Array"
        );
    }

    #[test]
    fn typed_array_byte_width() {
        let Value::TypedArray { bytes, .. } = Value::typed_array(TypedArrayKind::Float64Array, 3)
        else {
            panic!("expected TypedArray");
        };
        assert_eq!(bytes.len(), 24);
    }
}
