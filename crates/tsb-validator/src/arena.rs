//! # Schema Arena
//!
//! Every schema node reachable from the proto is interned once into an
//! append-only arena and addressed by a [`SchemaId`]. Resolver caches key on
//! these identities, so two structurally equal schemas declared in different
//! places are still memoized separately, and nothing in the caller's proto
//! is ever mutated.
//!
//! Children are stored as ids. References stay symbolic and are looked up in
//! the symbol table lazily, which lets protos contain forward references
//! and recursive types.
//!
//! Nodes synthesized during resolution (the `T | undefined` union of an
//! indexed access on an optional property, the redistributed union of a
//! mapped type over a union) are appended here too. Ids are never reused.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tsb_core::{
    EnumValue, IndexKeyType, LiteralValue, Proto, ScalarType, Schema, TypedArrayKind,
};

use crate::error::SchemaError;

/// Stable identity of a node in a [`SchemaArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u32);

impl SchemaId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A declared property, with its type interned.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNode {
    pub name: String,
    pub optional: bool,
    pub ty: SchemaId,
}

/// An index signature, with its value type interned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexSignatureNode {
    pub key_type: IndexKeyType,
    pub ty: SchemaId,
}

/// Arena form of [`Schema`]: same variants, children replaced by ids.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Boolean,
    String,
    Any,
    NonPrimitive,
    Number {
        scalar_type: Option<ScalarType>,
    },
    Literal {
        literal: LiteralValue,
    },
    Enum {
        values: Vec<EnumValue>,
    },
    Array {
        element: SchemaId,
    },
    Tuple {
        elements: Vec<SchemaId>,
        optional_start: Option<usize>,
    },
    Buffer {
        array_type: Option<TypedArrayKind>,
    },
    Interface {
        properties: Vec<PropertyNode>,
        index_signature: Option<IndexSignatureNode>,
        extends: Vec<SchemaId>,
    },
    Reference {
        target: String,
    },
    IndexedAccess {
        object: SchemaId,
        index: String,
    },
    Union {
        members: Vec<SchemaId>,
    },
    Intersection {
        members: Vec<SchemaId>,
    },
    Pick {
        target: SchemaId,
        keys: Vec<String>,
    },
    Partial {
        target: SchemaId,
    },
    Omit {
        target: SchemaId,
        keys: Vec<String>,
    },
    Overwrite {
        target: SchemaId,
        overwrite: SchemaId,
    },
}

impl SchemaNode {
    /// The `type` tag of the schema this node was interned from.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaNode::Boolean => "Boolean",
            SchemaNode::String => "String",
            SchemaNode::Any => "Any",
            SchemaNode::NonPrimitive => "NonPrimitive",
            SchemaNode::Number { .. } => "Number",
            SchemaNode::Literal { .. } => "Literal",
            SchemaNode::Enum { .. } => "Enum",
            SchemaNode::Array { .. } => "Array",
            SchemaNode::Tuple { .. } => "Tuple",
            SchemaNode::Buffer { .. } => "Buffer",
            SchemaNode::Interface { .. } => "Interface",
            SchemaNode::Reference { .. } => "Reference",
            SchemaNode::IndexedAccess { .. } => "IndexedAccess",
            SchemaNode::Union { .. } => "Union",
            SchemaNode::Intersection { .. } => "Intersection",
            SchemaNode::Pick { .. } => "Pick",
            SchemaNode::Partial { .. } => "Partial",
            SchemaNode::Omit { .. } => "Omit",
            SchemaNode::Overwrite { .. } => "Overwrite",
        }
    }

    /// `Interface` or one of the four field-mapping combinators.
    pub fn is_interface_like(&self) -> bool {
        matches!(
            self,
            SchemaNode::Interface { .. }
                | SchemaNode::Pick { .. }
                | SchemaNode::Partial { .. }
                | SchemaNode::Omit { .. }
                | SchemaNode::Overwrite { .. }
        )
    }

    /// The `target` of a field-mapping combinator.
    pub fn mapped_target(&self) -> Option<SchemaId> {
        match self {
            SchemaNode::Pick { target, .. }
            | SchemaNode::Partial { target }
            | SchemaNode::Omit { target, .. }
            | SchemaNode::Overwrite { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// A copy of this combinator applied to a different target.
    pub fn with_target(&self, target: SchemaId) -> Option<SchemaNode> {
        let node = match self {
            SchemaNode::Pick { keys, .. } => SchemaNode::Pick {
                target,
                keys: keys.clone(),
            },
            SchemaNode::Partial { .. } => SchemaNode::Partial { target },
            SchemaNode::Omit { keys, .. } => SchemaNode::Omit {
                target,
                keys: keys.clone(),
            },
            SchemaNode::Overwrite { overwrite, .. } => SchemaNode::Overwrite {
                target,
                overwrite: *overwrite,
            },
            _ => return None,
        };
        Some(node)
    }
}

/// Append-only store of interned schema nodes plus the proto's symbol table.
#[derive(Debug)]
pub struct SchemaArena {
    nodes: RwLock<Vec<Arc<SchemaNode>>>,
    symbols: HashMap<String, HashMap<String, SchemaId>>,
    any: SchemaId,
    undefined: SchemaId,
}

impl SchemaArena {
    /// Intern every symbol of `proto`.
    pub fn from_proto(proto: &Proto) -> Self {
        let mut nodes = Vec::new();
        let any = push(&mut nodes, SchemaNode::Any);
        let undefined = push(
            &mut nodes,
            SchemaNode::Literal {
                literal: LiteralValue::Undefined,
            },
        );

        let mut symbols = HashMap::with_capacity(proto.module_count());
        for (path, table) in proto.modules() {
            let ids = table
                .iter()
                .map(|(symbol, schema)| (symbol.clone(), intern_into(&mut nodes, schema)))
                .collect();
            symbols.insert(path.to_string(), ids);
        }

        Self {
            nodes: RwLock::new(nodes),
            symbols,
            any,
            undefined,
        }
    }

    pub fn get(&self, id: SchemaId) -> Result<Arc<SchemaNode>, SchemaError> {
        self.nodes
            .read()
            .get(id.index())
            .cloned()
            .ok_or(SchemaError::UnknownSchemaId { id })
    }

    /// Append a node and return its fresh identity.
    pub fn alloc(&self, node: SchemaNode) -> SchemaId {
        push(&mut self.nodes.write(), node)
    }

    /// Intern an ad-hoc schema tree. Every call yields fresh identities and
    /// the nodes live as long as the arena.
    pub fn intern(&self, schema: &Schema) -> SchemaId {
        intern_into(&mut self.nodes.write(), schema)
    }

    pub fn symbol(&self, path: &str, symbol: &str) -> Option<SchemaId> {
        self.symbols.get(path)?.get(symbol).copied()
    }

    pub fn has_module(&self, path: &str) -> bool {
        self.symbols.contains_key(path)
    }

    pub fn module_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.values().map(HashMap::len).sum()
    }

    /// Number of interned nodes, synthesized ones included.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The shared `Any` node, used for fields contributed by foreign branches.
    pub fn any(&self) -> SchemaId {
        self.any
    }

    /// The shared `Literal(undefined)` node.
    pub fn undefined(&self) -> SchemaId {
        self.undefined
    }
}

fn push(nodes: &mut Vec<Arc<SchemaNode>>, node: SchemaNode) -> SchemaId {
    let id = SchemaId(nodes.len() as u32);
    nodes.push(Arc::new(node));
    id
}

fn intern_into(nodes: &mut Vec<Arc<SchemaNode>>, schema: &Schema) -> SchemaId {
    let node = match schema {
        Schema::Boolean => SchemaNode::Boolean,
        Schema::String => SchemaNode::String,
        Schema::Any => SchemaNode::Any,
        Schema::NonPrimitive => SchemaNode::NonPrimitive,
        Schema::Number { scalar_type } => SchemaNode::Number {
            scalar_type: *scalar_type,
        },
        Schema::Literal { literal } => SchemaNode::Literal {
            literal: literal.clone(),
        },
        Schema::Enum { members } => SchemaNode::Enum {
            values: members.iter().map(|m| m.value.clone()).collect(),
        },
        Schema::Array { element_type } => SchemaNode::Array {
            element: intern_into(nodes, element_type),
        },
        Schema::Tuple {
            element_types,
            optional_start_index,
        } => SchemaNode::Tuple {
            elements: element_types.iter().map(|t| intern_into(nodes, t)).collect(),
            optional_start: *optional_start_index,
        },
        Schema::Buffer { array_type } => SchemaNode::Buffer {
            array_type: *array_type,
        },
        Schema::Interface {
            properties,
            index_signature,
            extends,
        } => SchemaNode::Interface {
            properties: properties
                .iter()
                .map(|p| PropertyNode {
                    name: p.name.clone(),
                    optional: p.optional,
                    ty: intern_into(nodes, &p.ty),
                })
                .collect(),
            index_signature: index_signature.as_ref().map(|sig| IndexSignatureNode {
                key_type: sig.key_type,
                ty: intern_into(nodes, &sig.ty),
            }),
            extends: extends.iter().map(|e| intern_into(nodes, &e.ty)).collect(),
        },
        Schema::Reference { target } => SchemaNode::Reference {
            target: target.clone(),
        },
        Schema::IndexedAccess { object_type, index } => SchemaNode::IndexedAccess {
            object: intern_into(nodes, object_type),
            index: index.clone(),
        },
        Schema::Union { members } => SchemaNode::Union {
            members: members.iter().map(|m| intern_into(nodes, &m.ty)).collect(),
        },
        Schema::Intersection { members } => SchemaNode::Intersection {
            members: members.iter().map(|m| intern_into(nodes, &m.ty)).collect(),
        },
        Schema::Pick { target, keys } => SchemaNode::Pick {
            target: intern_into(nodes, target),
            keys: keys.clone(),
        },
        Schema::Partial { target } => SchemaNode::Partial {
            target: intern_into(nodes, target),
        },
        Schema::Omit { target, keys } => SchemaNode::Omit {
            target: intern_into(nodes, target),
            keys: keys.clone(),
        },
        Schema::Overwrite { target, overwrite } => SchemaNode::Overwrite {
            target: intern_into(nodes, target),
            overwrite: intern_into(nodes, overwrite),
        },
    };
    push(nodes, node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsb_core::Property;

    fn proto() -> Proto {
        Proto::new()
            .with("a/b", "Flag", Schema::Boolean)
            .with(
                "a/b",
                "Point",
                Schema::interface(vec![
                    Property::required("x", Schema::number(ScalarType::Int)),
                    Property::optional("label", Schema::String),
                ]),
            )
            .with("a/c", "Alias", Schema::reference("a/b/Point"))
    }

    #[test]
    fn symbols_are_interned() {
        let arena = SchemaArena::from_proto(&proto());
        assert_eq!(arena.module_count(), 2);
        assert_eq!(arena.symbol_count(), 3);
        assert!(arena.has_module("a/c"));
        assert!(arena.symbol("a/b", "Missing").is_none());

        let id = arena.symbol("a/b", "Point").unwrap();
        let node = arena.get(id).unwrap();
        let SchemaNode::Interface { properties, .. } = &*node else {
            panic!("expected Interface, got {}", node.kind_name());
        };
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].name, "x");
        assert!(properties[1].optional);
        assert_eq!(
            *arena.get(properties[0].ty).unwrap(),
            SchemaNode::Number {
                scalar_type: Some(ScalarType::Int)
            }
        );
    }

    #[test]
    fn references_stay_symbolic() {
        let arena = SchemaArena::from_proto(&proto());
        let id = arena.symbol("a/c", "Alias").unwrap();
        assert_eq!(
            *arena.get(id).unwrap(),
            SchemaNode::Reference {
                target: "a/b/Point".into()
            }
        );
    }

    #[test]
    fn intern_yields_fresh_ids() {
        let arena = SchemaArena::from_proto(&Proto::new());
        let a = arena.intern(&Schema::Boolean);
        let b = arena.intern(&Schema::Boolean);
        assert_ne!(a, b);
        assert_eq!(arena.get(a).unwrap(), arena.get(b).unwrap());

        let before = arena.len();
        arena.intern(&Schema::array(Schema::String));
        assert_eq!(arena.len(), before + 2);
    }

    #[test]
    fn builtins_are_preallocated() {
        let arena = SchemaArena::from_proto(&Proto::new());
        assert_eq!(arena.len(), 2);
        assert_eq!(*arena.get(arena.any()).unwrap(), SchemaNode::Any);
        assert_eq!(
            *arena.get(arena.undefined()).unwrap(),
            SchemaNode::Literal {
                literal: LiteralValue::Undefined
            }
        );
    }

    #[test]
    fn unknown_id_is_an_error() {
        let arena = SchemaArena::from_proto(&Proto::new());
        let foreign = SchemaId(99);
        assert_eq!(
            arena.get(foreign).unwrap_err(),
            SchemaError::UnknownSchemaId { id: foreign }
        );
    }

    #[test]
    fn combinators_retarget() {
        let node = SchemaNode::Pick {
            target: SchemaId(3),
            keys: vec!["x".into()],
        };
        assert_eq!(node.mapped_target(), Some(SchemaId(3)));
        assert_eq!(
            node.with_target(SchemaId(7)),
            Some(SchemaNode::Pick {
                target: SchemaId(7),
                keys: vec!["x".into()]
            })
        );
        assert!(SchemaNode::Boolean.with_target(SchemaId(7)).is_none());
    }
}
