//! # Schema Resolver
//!
//! Turns the symbolic parts of a proto into concrete shapes:
//!
//! - **Resolution.** `Reference` and `IndexedAccess` nodes are followed
//!   until a concrete node is reached. An indexed access on an optional
//!   property yields the synthesized union `T | undefined`.
//! - **Flattening.** Interfaces with `extends`, and the `Pick`, `Partial`,
//!   `Omit` and `Overwrite` combinators, are reduced to a [`FlatInterface`].
//!   Own fields win over inherited ones; earlier `extends` entries win over
//!   later ones.
//! - **Distribution.** A combinator whose target is a union is rewritten as
//!   a union of the combinator applied to each member
//!   (`Pick<A | B, K>` becomes `Pick<A, K> | Pick<B, K>`).
//! - **Foreign fields.** The fields declared by any branch of a union or
//!   intersection, so a branch under test can tolerate its siblings' fields.
//!
//! ## Caching
//!
//! Every derived result is memoized by the [`SchemaId`] of the node it was
//! derived from. Caches sit behind `parking_lot` mutexes. A lock is held only
//! for a lookup or an insert, never while computing, so recursive resolution
//! cannot deadlock. When two threads race on the same node the first insert
//! wins and both callers observe it.
//!
//! ## Failure
//!
//! Every error here is a [`SchemaError`]: the proto is malformed and no
//! input value can succeed against it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tsb_core::{split_target, LiteralValue};

use crate::arena::{IndexSignatureNode, PropertyNode, SchemaArena, SchemaId, SchemaNode};
use crate::error::SchemaError;
use crate::flat::{FlatInterface, ForeignFields};

/// Resolves, flattens and distributes the schemas of one arena.
#[derive(Debug)]
pub struct SchemaResolver {
    arena: SchemaArena,
    max_depth: usize,
    flat_cache: Mutex<HashMap<SchemaId, Arc<FlatInterface>>>,
    foreign_cache: Mutex<HashMap<SchemaId, Arc<ForeignFields>>>,
    /// Indexed-access node → the node it projects to.
    indexed_cache: Mutex<HashMap<SchemaId, SchemaId>>,
    /// Mapped node over a union → the distributed union.
    distributed_cache: Mutex<HashMap<SchemaId, SchemaId>>,
}

impl SchemaResolver {
    pub fn new(arena: SchemaArena, max_depth: usize) -> Self {
        Self {
            arena,
            max_depth,
            flat_cache: Mutex::new(HashMap::new()),
            foreign_cache: Mutex::new(HashMap::new()),
            indexed_cache: Mutex::new(HashMap::new()),
            distributed_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn arena(&self) -> &SchemaArena {
        &self.arena
    }

    pub fn node(&self, id: SchemaId) -> Result<Arc<SchemaNode>, SchemaError> {
        self.arena.get(id)
    }

    /// The root node of `symbol` in module `path`.
    pub fn lookup(&self, path: &str, symbol: &str) -> Result<SchemaId, SchemaError> {
        if !self.arena.has_module(path) {
            return Err(SchemaError::UnknownPath {
                path: path.to_string(),
            });
        }
        self.arena
            .symbol(path, symbol)
            .ok_or_else(|| SchemaError::UnknownSymbol {
                path: path.to_string(),
                symbol: symbol.to_string(),
            })
    }

    /// Follow references and indexed accesses until a concrete node.
    /// Every other node resolves to itself.
    pub fn resolve(&self, id: SchemaId) -> Result<SchemaId, SchemaError> {
        self.resolve_at(id, 0)
    }

    /// Whether `id` resolves to an interface or a field-mapping combinator.
    pub fn is_interface_like(&self, id: SchemaId) -> Result<bool, SchemaError> {
        let resolved = self.resolve(id)?;
        Ok(self.arena.get(resolved)?.is_interface_like())
    }

    /// The flattened shape of an interface-like schema, memoized by identity.
    ///
    /// A combinator whose target is a union has no single shape; call
    /// [`SchemaResolver::resolve_mapped`] first.
    pub fn flatten(&self, id: SchemaId) -> Result<Arc<FlatInterface>, SchemaError> {
        self.flatten_at(id, 0)
    }

    /// For a combinator chain ending in a union, the union of the chain
    /// applied to each member. `None` when the chain ends in an interface or
    /// `id` is not a combinator at all. The result is memoized, so repeated
    /// calls return the same identity.
    pub fn resolve_mapped(&self, id: SchemaId) -> Result<Option<SchemaId>, SchemaError> {
        self.resolve_mapped_at(id, 0)
    }

    /// Fields declared by any interface-like branch reachable from `id`
    /// through unions, intersections and distributed combinators.
    pub fn foreign_fields(&self, id: SchemaId) -> Result<Arc<ForeignFields>, SchemaError> {
        if let Some(hit) = self.foreign_cache.lock().get(&id).cloned() {
            return Ok(hit);
        }
        let mut fields = ForeignFields::new();
        self.collect_foreign(&[id], &mut fields, &mut Vec::new(), 0)?;
        let fields = Arc::new(fields);

        let mut cache = self.foreign_cache.lock();
        Ok(Arc::clone(cache.entry(id).or_insert(fields)))
    }

    fn descend(&self, depth: usize) -> Result<usize, SchemaError> {
        if depth >= self.max_depth {
            tracing::warn!(limit = self.max_depth, "schema resolution recursion limit exceeded");
            return Err(SchemaError::RecursionLimitExceeded {
                limit: self.max_depth,
            });
        }
        Ok(depth + 1)
    }

    fn resolve_at(&self, id: SchemaId, depth: usize) -> Result<SchemaId, SchemaError> {
        let depth = self.descend(depth)?;
        let mut visited = Vec::new();
        let mut current = id;
        loop {
            let node = self.arena.get(current)?;
            let next = match &*node {
                SchemaNode::Reference { target } => {
                    check_cycle(current, &visited, target)?;
                    self.lookup_target(target)?
                }
                SchemaNode::IndexedAccess { object, index } => {
                    check_cycle(current, &visited, index)?;
                    self.resolve_indexed_access(current, *object, index, depth)?
                }
                _ => return Ok(current),
            };
            visited.push(current);
            current = next;
        }
    }

    fn lookup_target(&self, target: &str) -> Result<SchemaId, SchemaError> {
        let (path, symbol) =
            split_target(target).ok_or_else(|| SchemaError::InvalidReferenceTarget {
                target: target.to_string(),
            })?;
        self.arena.symbol(path, symbol).ok_or_else(|| {
            tracing::warn!(reference = target, "unresolved reference");
            SchemaError::UnresolvedReference {
                target: target.to_string(),
            }
        })
    }

    fn resolve_indexed_access(
        &self,
        id: SchemaId,
        object: SchemaId,
        index: &str,
        depth: usize,
    ) -> Result<SchemaId, SchemaError> {
        if let Some(hit) = self.indexed_cache.lock().get(&id).copied() {
            return Ok(hit);
        }

        let target = self.resolve_at(object, depth)?;
        let node = self.arena.get(target)?;
        if !node.is_interface_like() {
            return Err(SchemaError::InvalidIndexedAccessTarget {
                kind: node.kind_name(),
            });
        }

        let flat = self.flatten_at(target, depth)?;
        let projected = match flat.property(index) {
            Some(prop) if prop.optional => {
                if self.includes_undefined(prop.ty)? {
                    prop.ty
                } else {
                    let union = self.arena.alloc(SchemaNode::Union {
                        members: vec![prop.ty, self.arena.undefined()],
                    });
                    tracing::trace!(%id, %union, index, "synthesized optional indexed access");
                    union
                }
            }
            Some(prop) => prop.ty,
            None => match flat.index_signature {
                Some(sig) => sig.ty,
                None => {
                    return Err(SchemaError::UnknownIndex {
                        index: index.to_string(),
                    })
                }
            },
        };

        let mut cache = self.indexed_cache.lock();
        Ok(*cache.entry(id).or_insert(projected))
    }

    /// `ty` is a union with a literal `undefined` member.
    fn includes_undefined(&self, ty: SchemaId) -> Result<bool, SchemaError> {
        let SchemaNode::Union { members } = &*self.arena.get(ty)? else {
            return Ok(false);
        };
        for &member in members {
            if let SchemaNode::Literal {
                literal: LiteralValue::Undefined,
            } = &*self.arena.get(member)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn flatten_at(&self, id: SchemaId, depth: usize) -> Result<Arc<FlatInterface>, SchemaError> {
        self.flatten_in(id, &mut Vec::new(), depth)
    }

    /// `chain` holds the nodes whose flattening is in progress on this call
    /// path; meeting one again means the schema inherits from itself.
    fn flatten_in(
        &self,
        id: SchemaId,
        chain: &mut Vec<SchemaId>,
        depth: usize,
    ) -> Result<Arc<FlatInterface>, SchemaError> {
        if let Some(hit) = self.flat_cache.lock().get(&id).cloned() {
            return Ok(hit);
        }
        if chain.contains(&id) {
            tracing::warn!(%id, "cyclic inheritance");
            return Err(SchemaError::CyclicExtends { id });
        }
        let depth = self.descend(depth)?;

        chain.push(id);
        let flat = self.flatten_uncached(id, chain, depth);
        chain.pop();
        let flat = Arc::new(flat?);
        tracing::trace!(%id, properties = flat.properties.len(), "flattened");

        let mut cache = self.flat_cache.lock();
        Ok(Arc::clone(cache.entry(id).or_insert(flat)))
    }

    fn flatten_uncached(
        &self,
        id: SchemaId,
        chain: &mut Vec<SchemaId>,
        depth: usize,
    ) -> Result<FlatInterface, SchemaError> {
        let node = self.arena.get(id)?;
        match &*node {
            SchemaNode::Reference { .. } | SchemaNode::IndexedAccess { .. } => {
                let target = self.resolve_at(id, depth)?;
                let resolved = self.arena.get(target)?;
                if !resolved.is_interface_like() {
                    return Err(SchemaError::NotInterfaceLike {
                        kind: resolved.kind_name(),
                    });
                }
                let flat = self.flatten_in(target, chain, depth)?;
                Ok(FlatInterface::clone(&flat))
            }
            SchemaNode::Interface {
                properties,
                index_signature,
                extends,
            } => self.flatten_interface(properties, *index_signature, extends, chain, depth),
            SchemaNode::Pick { target, keys } => {
                let base = self.flatten_mapped_target("Pick", *target, chain, depth)?;
                pick(&base, keys)
            }
            SchemaNode::Partial { target } => {
                let base = self.flatten_mapped_target("Partial", *target, chain, depth)?;
                let mut flat = FlatInterface::clone(&base);
                for prop in &mut flat.properties {
                    prop.optional = true;
                }
                Ok(flat)
            }
            SchemaNode::Omit { target, keys } => {
                let base = self.flatten_mapped_target("Omit", *target, chain, depth)?;
                let mut flat = FlatInterface::clone(&base);
                flat.properties.retain(|p| !keys.contains(&p.name));
                Ok(flat)
            }
            SchemaNode::Overwrite { target, overwrite } => {
                let base = self.flatten_mapped_target("Overwrite", *target, chain, depth)?;
                let mut flat = FlatInterface::clone(&base);
                let over = self.flatten_in(*overwrite, chain, depth)?;
                if over.index_signature.is_some() {
                    flat.index_signature = over.index_signature;
                }
                for prop in &over.properties {
                    match flat.properties.iter_mut().find(|p| p.name == prop.name) {
                        Some(slot) => *slot = prop.clone(),
                        None => flat.properties.push(prop.clone()),
                    }
                }
                Ok(flat)
            }
            other => Err(SchemaError::NotInterfaceLike {
                kind: other.kind_name(),
            }),
        }
    }

    fn flatten_interface(
        &self,
        properties: &[PropertyNode],
        index_signature: Option<IndexSignatureNode>,
        extends: &[SchemaId],
        chain: &mut Vec<SchemaId>,
        depth: usize,
    ) -> Result<FlatInterface, SchemaError> {
        let mut flat = FlatInterface {
            properties: Vec::with_capacity(properties.len()),
            index_signature,
        };
        for prop in properties {
            flat.inherit(prop);
        }

        for &parent in extends {
            let resolved = self.resolve_at(parent, depth)?;
            let node = self.arena.get(resolved)?;
            if !matches!(&*node, SchemaNode::Interface { .. }) {
                return Err(SchemaError::InvalidExtendsTarget {
                    kind: node.kind_name(),
                });
            }
            let inherited = self.flatten_in(resolved, chain, depth)?;
            for prop in &inherited.properties {
                flat.inherit(prop);
            }
            if flat.index_signature.is_none() {
                flat.index_signature = inherited.index_signature;
            }
        }
        Ok(flat)
    }

    fn flatten_mapped_target(
        &self,
        combinator: &'static str,
        target: SchemaId,
        chain: &mut Vec<SchemaId>,
        depth: usize,
    ) -> Result<Arc<FlatInterface>, SchemaError> {
        let resolved = self.resolve_at(target, depth)?;
        let node = self.arena.get(resolved)?;
        if !node.is_interface_like() {
            return Err(SchemaError::InvalidMappedTarget {
                combinator,
                kind: node.kind_name(),
            });
        }
        self.flatten_in(resolved, chain, depth)
    }

    fn resolve_mapped_at(&self, id: SchemaId, depth: usize) -> Result<Option<SchemaId>, SchemaError> {
        if let Some(hit) = self.distributed_cache.lock().get(&id).copied() {
            return Ok(Some(hit));
        }
        let depth = self.descend(depth)?;

        let node = self.arena.get(id)?;
        let Some(mut next) = node.mapped_target() else {
            return Ok(None);
        };
        let mut combinator = node.kind_name();
        let mut chain = vec![node];

        // Walk down nested combinators until the chain bottoms out.
        let members = loop {
            if chain.len() > self.max_depth {
                return Err(SchemaError::RecursionLimitExceeded {
                    limit: self.max_depth,
                });
            }
            let target = self.resolve_at(next, depth)?;
            let target_node = self.arena.get(target)?;
            match &*target_node {
                SchemaNode::Union { members } => break members.clone(),
                SchemaNode::Interface { .. } => return Ok(None),
                other => match other.mapped_target() {
                    Some(inner) => {
                        next = inner;
                        combinator = other.kind_name();
                        chain.push(Arc::clone(&target_node));
                    }
                    None => {
                        return Err(SchemaError::InvalidMappedTarget {
                            combinator,
                            kind: other.kind_name(),
                        })
                    }
                },
            }
        };

        // Re-apply the chain, innermost combinator first, to every member.
        let mut distributed = Vec::with_capacity(members.len());
        for member in members {
            let mut current = member;
            for step in chain.iter().rev() {
                if let Some(node) = step.with_target(current) {
                    current = self.arena.alloc(node);
                }
            }
            distributed.push(current);
        }
        let count = distributed.len();
        let union = self.arena.alloc(SchemaNode::Union {
            members: distributed,
        });
        tracing::debug!(%id, %union, members = count, "distributed mapped type over union");

        let mut cache = self.distributed_cache.lock();
        Ok(Some(*cache.entry(id).or_insert(union)))
    }

    fn collect_foreign(
        &self,
        ids: &[SchemaId],
        out: &mut ForeignFields,
        visited: &mut Vec<SchemaId>,
        depth: usize,
    ) -> Result<(), SchemaError> {
        let depth = self.descend(depth)?;
        for &id in ids {
            let resolved = self.resolve_at(id, depth)?;
            if visited.contains(&resolved) {
                continue;
            }
            visited.push(resolved);

            let node = self.arena.get(resolved)?;
            match &*node {
                SchemaNode::Union { members } | SchemaNode::Intersection { members } => {
                    self.collect_foreign(members, out, visited, depth)?;
                }
                n if n.is_interface_like() => match self.resolve_mapped_at(resolved, depth)? {
                    Some(union) => self.collect_foreign(&[union], out, visited, depth)?,
                    None => {
                        let flat = self.flatten_at(resolved, depth)?;
                        out.absorb(&flat);
                    }
                },
                _ => {}
            }
        }
        Ok(())
    }
}

fn check_cycle(current: SchemaId, visited: &[SchemaId], label: &str) -> Result<(), SchemaError> {
    if visited.contains(&current) {
        tracing::warn!(reference = label, "reference cycle");
        return Err(SchemaError::ReferenceCycle {
            target: label.to_string(),
        });
    }
    Ok(())
}

/// Project `base` onto `keys`, in key order. Keys absent from the declared
/// properties may still be picked through a compatible index signature.
fn pick(base: &FlatInterface, keys: &[String]) -> Result<FlatInterface, SchemaError> {
    let mut flat = FlatInterface::default();
    for key in keys {
        if flat.has_property(key) {
            continue;
        }
        if let Some(prop) = base.property(key) {
            flat.properties.push(prop.clone());
        } else if let Some(sig) = base.index_signature.filter(|sig| sig.accepts_key(key)) {
            flat.properties.push(PropertyNode {
                name: key.clone(),
                optional: false,
                ty: sig.ty,
            });
        } else {
            return Err(SchemaError::UnknownPickKey { key: key.clone() });
        }
    }
    Ok(flat)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use tsb_core::{Property, Proto, Schema};

    fn arb_properties() -> impl Strategy<Value = Vec<(String, bool)>> {
        prop::collection::vec(("[a-f]", any::<bool>()), 0..8)
    }

    fn properties(props: &[(String, bool)]) -> Vec<Property> {
        props
            .iter()
            .map(|(name, optional)| {
                if *optional {
                    Property::optional(name.clone(), Schema::String)
                } else {
                    Property::required(name.clone(), Schema::String)
                }
            })
            .collect()
    }

    proptest! {
        /// Re-flattening a flattened shape, as a plain interface, is a no-op.
        #[test]
        fn flatten_is_idempotent(own in arb_properties(), parent in arb_properties()) {
            let proto = Proto::new()
                .with("m", "Parent", Schema::interface(properties(&parent)))
                .with("m", "Child", Schema::Interface {
                    properties: properties(&own),
                    index_signature: None,
                    extends: vec![tsb_core::Extends::reference("m/Parent")],
                });
            let r = SchemaResolver::new(SchemaArena::from_proto(&proto), 64);
            let flat = r.flatten(r.lookup("m", "Child").unwrap()).unwrap();

            let again = r.arena().alloc(SchemaNode::Interface {
                properties: flat.properties.clone(),
                index_signature: flat.index_signature,
                extends: vec![],
            });
            prop_assert_eq!(&*r.flatten(again).unwrap(), &*flat);
        }

        /// Partial keeps the property set and makes every property optional.
        #[test]
        fn partial_shape(props in arb_properties()) {
            let proto = Proto::new()
                .with("m", "S", Schema::interface(properties(&props)))
                .with("m", "P", Schema::partial(Schema::reference("m/S")));
            let r = SchemaResolver::new(SchemaArena::from_proto(&proto), 64);
            let full = r.flatten(r.lookup("m", "S").unwrap()).unwrap();
            let part = r.flatten(r.lookup("m", "P").unwrap()).unwrap();

            prop_assert_eq!(part.properties.len(), full.properties.len());
            for (p, f) in part.properties.iter().zip(&full.properties) {
                prop_assert_eq!(&p.name, &f.name);
                prop_assert_eq!(p.ty, f.ty);
                prop_assert!(p.optional);
            }
            prop_assert_eq!(part.index_signature, full.index_signature);
        }
    }
}
