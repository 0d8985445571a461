//! # Error Types — Schema Configuration
//!
//! A `SchemaError` means the proto itself is broken: a dangling reference, a
//! combinator pointed at something that has no fields, a `Pick` key that does
//! not exist. These errors are fatal. They abort the validation call that hit
//! them and are never folded into a [`ValidateResult`](crate::ValidateResult),
//! because no input value can make them go away.

use thiserror::Error;

use crate::arena::SchemaId;

/// Fatal configuration error raised while resolving or validating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No module is registered under the requested path.
    #[error("unknown path '{path}'")]
    UnknownPath {
        /// Module path that was looked up.
        path: String,
    },

    /// The module exists but does not define the requested symbol.
    #[error("unknown symbol '{symbol}' in path '{path}'")]
    UnknownSymbol {
        /// Module path that was looked up.
        path: String,
        /// Symbol name that was looked up.
        symbol: String,
    },

    /// A reference target is not of the form `<path>/<symbol>`.
    #[error("invalid reference target '{target}'")]
    InvalidReferenceTarget {
        /// The malformed target string.
        target: String,
    },

    /// A reference points at a path or symbol that is not in the proto.
    #[error("cannot find reference target '{target}'")]
    UnresolvedReference {
        /// The dangling target string.
        target: String,
    },

    /// Following references came back to a node already visited.
    #[error("reference cycle through '{target}'")]
    ReferenceCycle {
        /// The reference (or indexed access) at which the cycle closed.
        target: String,
    },

    /// The object type of an indexed access is not interface-like.
    #[error("indexed access on non-interface type {kind}")]
    InvalidIndexedAccessTarget {
        /// Kind of the resolved object type.
        kind: &'static str,
    },

    /// The index of an indexed access names no property and no index
    /// signature can satisfy it.
    #[error("unknown index '{index}'")]
    UnknownIndex {
        /// The requested property name.
        index: String,
    },

    /// An `extends` entry resolved to something other than an interface.
    #[error("interface extends non-interface type {kind}")]
    InvalidExtendsTarget {
        /// Kind of the resolved extends target.
        kind: &'static str,
    },

    /// An interface or combinator (transitively) inherits from itself.
    #[error("schema {id} inherits from itself")]
    CyclicExtends {
        /// Arena identity of the interface where the cycle closed.
        id: SchemaId,
    },

    /// A mapped combinator targets something that is neither interface-like
    /// nor a union of interface-likes.
    #[error("{combinator} target must be an interface or union, got {kind}")]
    InvalidMappedTarget {
        /// The combinator being flattened (`Pick`, `Partial`, ...).
        combinator: &'static str,
        /// Kind of the resolved target.
        kind: &'static str,
    },

    /// A `Pick` key exists neither as a property nor via the index signature.
    #[error("cannot pick unknown key '{key}'")]
    UnknownPickKey {
        /// The key that could not be picked.
        key: String,
    },

    /// A flatten was requested for a schema that has no field set.
    #[error("cannot flatten non-interface type {kind}")]
    NotInterfaceLike {
        /// Kind of the offending schema.
        kind: &'static str,
    },

    /// A [`SchemaId`] that this validator's arena never issued.
    #[error("unknown schema id {id}")]
    UnknownSchemaId {
        /// The foreign identity.
        id: SchemaId,
    },

    /// Recursion went deeper than the configured limit, usually because a
    /// schema refers to itself without any structural progress.
    #[error("recursion limit of {limit} exceeded")]
    RecursionLimitExceeded {
        /// The configured `max_depth`.
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_symbol_display() {
        let err = SchemaError::UnknownSymbol {
            path: "a/b".into(),
            symbol: "Point".into(),
        };
        assert_eq!(format!("{err}"), "unknown symbol 'Point' in path 'a/b'");
    }

    #[test]
    fn unresolved_reference_display() {
        let err = SchemaError::UnresolvedReference {
            target: "a/b/Missing".into(),
        };
        assert!(format!("{err}").contains("a/b/Missing"));
    }

    #[test]
    fn invalid_mapped_target_display() {
        let err = SchemaError::InvalidMappedTarget {
            combinator: "Pick",
            kind: "String",
        };
        assert_eq!(
            format!("{err}"),
            "Pick target must be an interface or union, got String"
        );
    }

    #[test]
    fn recursion_limit_display() {
        let err = SchemaError::RecursionLimitExceeded { limit: 64 };
        assert!(format!("{err}").contains("64"));
    }
}
