//! # Flattened Shapes
//!
//! [`FlatInterface`] is what every interface-like schema reduces to once
//! inheritance and field-mapping combinators are applied: an ordered list of
//! properties plus at most one index signature.
//!
//! [`ForeignFields`] is the set of fields declared by any branch of a union
//! or intersection. A branch being validated tolerates these fields even if
//! it does not declare them itself.

use std::collections::BTreeSet;

use tsb_core::IndexKeyType;

use crate::arena::{IndexSignatureNode, PropertyNode};

/// An interface-like schema with inheritance and combinators applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatInterface {
    /// Own properties first, then inherited ones, in declaration order.
    pub properties: Vec<PropertyNode>,
    pub index_signature: Option<IndexSignatureNode>,
}

impl FlatInterface {
    pub fn property(&self, name: &str) -> Option<&PropertyNode> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// Add `property` unless a property of the same name is already present.
    pub(crate) fn inherit(&mut self, property: &PropertyNode) {
        if !self.has_property(&property.name) {
            self.properties.push(property.clone());
        }
    }
}

impl IndexSignatureNode {
    /// Whether this signature covers `key`.
    pub fn accepts_key(&self, key: &str) -> bool {
        match self.key_type {
            IndexKeyType::String => true,
            IndexKeyType::Number => is_number_key(key),
        }
    }
}

/// Fields declared by at least one branch of a logical combinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignFields {
    names: BTreeSet<String>,
    string_keys: bool,
    number_keys: bool,
}

impl ForeignFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every property name and index-signature key type of `flat`.
    pub fn absorb(&mut self, flat: &FlatInterface) {
        for property in &flat.properties {
            self.names.insert(property.name.clone());
        }
        match flat.index_signature.map(|sig| sig.key_type) {
            Some(IndexKeyType::String) => self.string_keys = true,
            Some(IndexKeyType::Number) => self.number_keys = true,
            None => {}
        }
    }

    /// Whether `name` is a declared property of some branch.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether some branch would accept `key`, either as a declared property
    /// or through an index signature.
    pub fn permits(&self, key: &str) -> bool {
        self.string_keys || self.contains(key) || (self.number_keys && is_number_key(key))
    }

    pub fn has_string_keys(&self) -> bool {
        self.string_keys
    }

    pub fn has_number_keys(&self) -> bool {
        self.number_keys
    }

    /// Declared names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && !self.string_keys && !self.number_keys
    }
}

/// `key` is the canonical decimal form of a non-negative integer: it parses
/// and prints back unchanged, so `"01"`, `"+1"`, `" 1"` and `"1.0"` are all
/// rejected.
pub fn is_number_key(key: &str) -> bool {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    key.parse::<u64>()
        .map(|n| n.to_string() == key)
        .unwrap_or(false)
}
