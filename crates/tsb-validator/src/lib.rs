//! # tsb-validator — Schema Resolution & Runtime Validation
//!
//! Decides whether a runtime [`Value`](tsb_core::Value) conforms to a schema
//! from a [`Proto`](tsb_core::Proto), and if not, says where and why.
//!
//! ## Architecture
//!
//! - **Arena** (`arena`). The proto is interned once into an append-only
//!   arena. Every node gets a stable [`SchemaId`]; all caches key on it.
//!
//! - **Resolver** (`resolver`). [`SchemaResolver`] follows references and
//!   indexed accesses, flattens interfaces and the `Pick` / `Partial` /
//!   `Omit` / `Overwrite` combinators into a [`FlatInterface`], distributes
//!   combinators over unions, and computes the [`ForeignFields`] of logical
//!   combinators.
//!
//! - **Validator** (`validator`). [`Validator`] walks value and schema
//!   together and returns a [`ValidateResult`].
//!
//! ## Two Failure Classes
//!
//! A value that does not match is an ordinary outcome:
//! `Ok(ValidateResult::Failure(..))` with a structured [`ValidateError`].
//! A schema that cannot be resolved (dangling reference, bad `Pick` key,
//! `extends` of a non-interface) is a [`SchemaError`] returned as `Err`.
//! It aborts the call, because no input could ever satisfy it.
//!
//! ## Example
//!
//! ```
//! use tsb_core::{Property, Proto, ScalarType, Schema, Value};
//! use tsb_validator::Validator;
//!
//! let proto = Proto::new().with(
//!     "shared/User",
//!     "User",
//!     Schema::interface(vec![
//!         Property::required("id", Schema::number(ScalarType::Uint)),
//!         Property::optional("name", Schema::String),
//!     ]),
//! );
//! let validator = Validator::new(&proto);
//!
//! let ok = Value::from(serde_json::json!({ "id": 7 }));
//! assert!(validator.validate(&ok, "shared/User", "User")?.is_success());
//!
//! let bad = Value::from(serde_json::json!({ "id": -1 }));
//! assert!(!validator.validate(&bad, "shared/User", "User")?.is_success());
//! # Ok::<(), tsb_validator::SchemaError>(())
//! ```
//!
//! ## Crate Policy
//!
//! - Depends only on `tsb-core` internally.
//! - Never mutates the caller's proto; derived schemas live in the arena.
//! - No locks are held across recursive calls.
//! - No `unsafe` code, no `.unwrap()` outside tests.

pub mod arena;
pub mod error;
pub mod flat;
pub mod options;
pub mod resolver;
pub mod result;
pub mod validator;

pub use arena::{IndexSignatureNode, PropertyNode, SchemaArena, SchemaId, SchemaNode};
pub use error::SchemaError;
pub use flat::{is_number_key, FlatInterface, ForeignFields};
pub use options::ValidatorOptions;
pub use resolver::SchemaResolver;
pub use result::{ErrorCode, PathSegment, ValidateError, ValidateResult};
pub use validator::Validator;
