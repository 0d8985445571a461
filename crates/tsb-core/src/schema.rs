//! # Schema Grammar
//!
//! The closed set of type descriptors a proto is made of. Every schema is a
//! JSON object tagged by `type`:
//!
//! ```json
//! { "type": "Interface",
//!   "properties": [ { "id": 0, "name": "x", "type": { "type": "Number" } } ] }
//! ```
//!
//! Primitives (`Boolean`, `Number`, `String`, `Literal`, ...) describe leaf
//! values. `Interface` and the four field-mapping combinators (`Pick`,
//! `Partial`, `Omit`, `Overwrite`) describe object shapes. `Union` and
//! `Intersection` are the logical combinators. `Reference` and
//! `IndexedAccess` point elsewhere and are never terminal: resolving them
//! always yields one of the other variants.
//!
//! The grammar is data only. Resolution, flattening and validation live in
//! the `tsb-validator` crate.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A type descriptor from the proto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Schema {
    Boolean,
    String,
    Any,
    /// Any non-null object value.
    NonPrimitive,
    Number {
        /// Numeric family; absent means `double`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scalar_type: Option<ScalarType>,
    },
    Literal {
        /// An absent `literal` field is the literal `undefined`.
        #[serde(default, skip_serializing_if = "LiteralValue::is_undefined")]
        literal: LiteralValue,
    },
    Enum {
        members: Vec<EnumMember>,
    },
    Array {
        element_type: Box<Schema>,
    },
    Tuple {
        element_types: Vec<Schema>,
        /// Elements at or after this index may be `undefined`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        optional_start_index: Option<usize>,
    },
    Buffer {
        /// Without an array type the value must be a raw byte buffer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        array_type: Option<TypedArrayKind>,
    },
    Interface {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        properties: Vec<Property>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index_signature: Option<IndexSignature>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        extends: Vec<Extends>,
    },
    /// Alias to another symbol, addressed as `<module path>/<symbol name>`.
    Reference {
        target: String,
    },
    /// `ObjectType[index]`: the type of one property of an interface.
    IndexedAccess {
        object_type: Box<Schema>,
        index: String,
    },
    Union {
        members: Vec<Member>,
    },
    Intersection {
        members: Vec<Member>,
    },
    Pick {
        target: Box<Schema>,
        keys: Vec<String>,
    },
    Partial {
        target: Box<Schema>,
    },
    Omit {
        target: Box<Schema>,
        keys: Vec<String>,
    },
    Overwrite {
        target: Box<Schema>,
        overwrite: Box<Schema>,
    },
}

/// Numeric family of a `Number` schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Int,
    Uint,
    Double,
    Float,
    Byte,
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Fixed32,
    Sfixed32,
    Bigint,
    Bigint64,
    Biguint64,
}

/// Literal payload. `Undefined` and `Null` are distinct values.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LiteralValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

/// A single enum member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    #[serde(default)]
    pub id: u32,
    pub value: EnumValue,
}

/// Enum member values are strings or numbers; matching never coerces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    Number(f64),
    String(String),
}

/// Element kind of a typed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypedArrayKind {
    Int8Array,
    Int16Array,
    Int32Array,
    BigInt64Array,
    Uint8Array,
    Uint16Array,
    Uint32Array,
    BigUint64Array,
    Float32Array,
    Float64Array,
}

/// A declared interface property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(rename = "type")]
    pub ty: Schema,
}

/// Key type of an index signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKeyType {
    String,
    Number,
}

/// `[key: string]: T` or `[key: number]: T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSignature {
    pub key_type: IndexKeyType,
    #[serde(rename = "type")]
    pub ty: Box<Schema>,
}

/// One `extends` entry of an interface; `ty` is normally a `Reference`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extends {
    #[serde(default)]
    pub id: u32,
    #[serde(rename = "type")]
    pub ty: Schema,
}

/// One branch of a `Union` or `Intersection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub id: u32,
    #[serde(rename = "type")]
    pub ty: Schema,
}

impl Schema {
    /// The `type` tag of this schema.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Schema::Boolean => "Boolean",
            Schema::String => "String",
            Schema::Any => "Any",
            Schema::NonPrimitive => "NonPrimitive",
            Schema::Number { .. } => "Number",
            Schema::Literal { .. } => "Literal",
            Schema::Enum { .. } => "Enum",
            Schema::Array { .. } => "Array",
            Schema::Tuple { .. } => "Tuple",
            Schema::Buffer { .. } => "Buffer",
            Schema::Interface { .. } => "Interface",
            Schema::Reference { .. } => "Reference",
            Schema::IndexedAccess { .. } => "IndexedAccess",
            Schema::Union { .. } => "Union",
            Schema::Intersection { .. } => "Intersection",
            Schema::Pick { .. } => "Pick",
            Schema::Partial { .. } => "Partial",
            Schema::Omit { .. } => "Omit",
            Schema::Overwrite { .. } => "Overwrite",
        }
    }

    pub fn number(scalar_type: ScalarType) -> Self {
        Schema::Number {
            scalar_type: Some(scalar_type),
        }
    }

    pub fn literal(literal: impl Into<LiteralValue>) -> Self {
        Schema::Literal {
            literal: literal.into(),
        }
    }

    pub fn array(element_type: Schema) -> Self {
        Schema::Array {
            element_type: Box::new(element_type),
        }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Schema::Reference {
            target: target.into(),
        }
    }

    /// A plain interface with the given properties and nothing else.
    pub fn interface(properties: Vec<Property>) -> Self {
        Schema::Interface {
            properties,
            index_signature: None,
            extends: Vec::new(),
        }
    }

    pub fn union(members: Vec<Schema>) -> Self {
        Schema::Union {
            members: Member::numbered(members),
        }
    }

    pub fn intersection(members: Vec<Schema>) -> Self {
        Schema::Intersection {
            members: Member::numbered(members),
        }
    }

    pub fn pick(target: Schema, keys: &[&str]) -> Self {
        Schema::Pick {
            target: Box::new(target),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn omit(target: Schema, keys: &[&str]) -> Self {
        Schema::Omit {
            target: Box::new(target),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn partial(target: Schema) -> Self {
        Schema::Partial {
            target: Box::new(target),
        }
    }

    pub fn overwrite(target: Schema, overwrite: Schema) -> Self {
        Schema::Overwrite {
            target: Box::new(target),
            overwrite: Box::new(overwrite),
        }
    }
}

impl ScalarType {
    /// Lowercase name as it appears in a proto.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::Uint => "uint",
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Byte => "byte",
            ScalarType::Int8 => "int8",
            ScalarType::Int16 => "int16",
            ScalarType::Int32 => "int32",
            ScalarType::Uint8 => "uint8",
            ScalarType::Uint16 => "uint16",
            ScalarType::Uint32 => "uint32",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Bigint => "bigint",
            ScalarType::Bigint64 => "bigint64",
            ScalarType::Biguint64 => "biguint64",
        }
    }

    /// Every family except `float` and `double` rejects fractional input.
    pub fn is_integral(&self) -> bool {
        !matches!(self, ScalarType::Float | ScalarType::Double)
    }

    /// Families named `u*`, `fixed*` or `biguint*` reject negative input.
    pub fn is_unsigned(&self) -> bool {
        let name = self.as_str();
        name.starts_with('u') || name.starts_with("fixed") || name.starts_with("biguint")
    }

    /// 64-bit-wide families, which require a big-integer value.
    pub fn is_big(&self) -> bool {
        self.as_str().starts_with("big")
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LiteralValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, LiteralValue::Undefined)
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        LiteralValue::Boolean(b)
    }
}

impl From<f64> for LiteralValue {
    fn from(n: f64) -> Self {
        LiteralValue::Number(n)
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        LiteralValue::String(s.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(s: String) -> Self {
        LiteralValue::String(s)
    }
}

impl Serialize for LiteralValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LiteralValue::Undefined => serializer.serialize_unit(),
            LiteralValue::Null => serializer.serialize_none(),
            LiteralValue::Boolean(b) => serializer.serialize_bool(*b),
            LiteralValue::Number(n) => serializer.serialize_f64(*n),
            LiteralValue::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for LiteralValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(LiteralValue::Null),
            serde_json::Value::Bool(b) => Ok(LiteralValue::Boolean(b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(LiteralValue::Number)
                .ok_or_else(|| de::Error::custom(format!("literal {n} is not representable"))),
            serde_json::Value::String(s) => Ok(LiteralValue::String(s)),
            other => Err(de::Error::custom(format!(
                "literal must be a primitive, found {other}"
            ))),
        }
    }
}

impl TypedArrayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypedArrayKind::Int8Array => "Int8Array",
            TypedArrayKind::Int16Array => "Int16Array",
            TypedArrayKind::Int32Array => "Int32Array",
            TypedArrayKind::BigInt64Array => "BigInt64Array",
            TypedArrayKind::Uint8Array => "Uint8Array",
            TypedArrayKind::Uint16Array => "Uint16Array",
            TypedArrayKind::Uint32Array => "Uint32Array",
            TypedArrayKind::BigUint64Array => "BigUint64Array",
            TypedArrayKind::Float32Array => "Float32Array",
            TypedArrayKind::Float64Array => "Float64Array",
        }
    }
}

impl fmt::Display for TypedArrayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Property {
    pub fn required(name: impl Into<String>, ty: Schema) -> Self {
        Self {
            id: 0,
            name: name.into(),
            optional: false,
            ty,
        }
    }

    pub fn optional(name: impl Into<String>, ty: Schema) -> Self {
        Self {
            id: 0,
            name: name.into(),
            optional: true,
            ty,
        }
    }
}

impl IndexSignature {
    pub fn new(key_type: IndexKeyType, ty: Schema) -> Self {
        Self {
            key_type,
            ty: Box::new(ty),
        }
    }
}

impl Extends {
    /// An `extends` entry pointing at `<path>/<symbol>`.
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            id: 0,
            ty: Schema::reference(target),
        }
    }
}

impl Member {
    fn numbered(types: Vec<Schema>) -> Vec<Member> {
        types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| Member { id: i as u32, ty })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitive_tags_round_trip() {
        let schema: Schema = serde_json::from_value(json!({ "type": "Boolean" })).unwrap();
        assert_eq!(schema, Schema::Boolean);
        assert_eq!(serde_json::to_value(&schema).unwrap(), json!({ "type": "Boolean" }));
    }

    #[test]
    fn number_scalar_type_defaults_to_none() {
        let schema: Schema = serde_json::from_value(json!({ "type": "Number" })).unwrap();
        assert_eq!(schema, Schema::Number { scalar_type: None });

        let schema: Schema =
            serde_json::from_value(json!({ "type": "Number", "scalarType": "biguint64" })).unwrap();
        assert_eq!(schema, Schema::number(ScalarType::Biguint64));
    }

    #[test]
    fn literal_absent_is_undefined_and_null_is_null() {
        let undefined: Schema = serde_json::from_value(json!({ "type": "Literal" })).unwrap();
        assert_eq!(undefined, Schema::literal(LiteralValue::Undefined));

        let null: Schema =
            serde_json::from_value(json!({ "type": "Literal", "literal": null })).unwrap();
        assert_eq!(null, Schema::literal(LiteralValue::Null));

        assert_eq!(
            serde_json::to_value(&null).unwrap(),
            json!({ "type": "Literal", "literal": null })
        );
        assert_eq!(
            serde_json::to_value(&undefined).unwrap(),
            json!({ "type": "Literal" })
        );
    }

    #[test]
    fn literal_rejects_composite_payload() {
        let result: Result<Schema, _> =
            serde_json::from_value(json!({ "type": "Literal", "literal": [1, 2] }));
        assert!(result.is_err());
    }

    #[test]
    fn camel_case_fields() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "Tuple",
            "elementTypes": [{ "type": "Number" }, { "type": "String" }],
            "optionalStartIndex": 1
        }))
        .unwrap();
        match schema {
            Schema::Tuple {
                element_types,
                optional_start_index,
            } => {
                assert_eq!(element_types.len(), 2);
                assert_eq!(optional_start_index, Some(1));
            }
            other => panic!("expected Tuple, got {other:?}"),
        }
    }

    #[test]
    fn interface_with_index_signature_and_extends() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "Interface",
            "properties": [
                { "id": 0, "name": "y", "type": { "type": "String" } },
                { "id": 1, "name": "z", "optional": true, "type": { "type": "Boolean" } }
            ],
            "indexSignature": { "keyType": "Number", "type": { "type": "Any" } },
            "extends": [ { "id": 0, "type": { "type": "Reference", "target": "a/A" } } ]
        }))
        .unwrap();
        let Schema::Interface {
            properties,
            index_signature,
            extends,
        } = schema
        else {
            panic!("expected Interface");
        };
        assert_eq!(properties.len(), 2);
        assert!(!properties[0].optional);
        assert!(properties[1].optional);
        assert_eq!(index_signature.unwrap().key_type, IndexKeyType::Number);
        assert_eq!(extends[0].ty, Schema::reference("a/A"));
    }

    #[test]
    fn unknown_buffer_array_type_is_rejected() {
        let result: Result<Schema, _> =
            serde_json::from_value(json!({ "type": "Buffer", "arrayType": "xxx" }));
        assert!(result.is_err());

        let ok: Schema =
            serde_json::from_value(json!({ "type": "Buffer", "arrayType": "BigInt64Array" }))
                .unwrap();
        assert_eq!(
            ok,
            Schema::Buffer {
                array_type: Some(TypedArrayKind::BigInt64Array)
            }
        );
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let result: Result<Schema, _> = serde_json::from_value(json!({ "type": "xxx" }));
        assert!(result.is_err());
    }

    #[test]
    fn enum_members_keep_string_and_number_apart() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "Enum",
            "members": [ { "id": 0, "value": 0 }, { "id": 1, "value": "0" } ]
        }))
        .unwrap();
        let Schema::Enum { members } = schema else {
            panic!("expected Enum");
        };
        assert_eq!(members[0].value, EnumValue::Number(0.0));
        assert_eq!(members[1].value, EnumValue::String("0".into()));
    }

    #[test]
    fn scalar_type_families() {
        assert!(!ScalarType::Double.is_integral());
        assert!(!ScalarType::Float.is_integral());
        assert!(ScalarType::Int.is_integral());
        assert!(ScalarType::Byte.is_integral());

        assert!(ScalarType::Uint.is_unsigned());
        assert!(ScalarType::Uint16.is_unsigned());
        assert!(ScalarType::Fixed32.is_unsigned());
        assert!(ScalarType::Biguint64.is_unsigned());
        assert!(!ScalarType::Sfixed32.is_unsigned());
        assert!(!ScalarType::Bigint64.is_unsigned());

        assert!(ScalarType::Bigint.is_big());
        assert!(ScalarType::Biguint64.is_big());
        assert!(!ScalarType::Int32.is_big());
    }

    #[test]
    fn builders_number_union_members() {
        let union = Schema::union(vec![Schema::String, Schema::Boolean]);
        let Schema::Union { members } = union else {
            panic!("expected Union");
        };
        assert_eq!(members[0].id, 0);
        assert_eq!(members[1].id, 1);
        assert_eq!(members[1].ty, Schema::Boolean);
    }
}
