//! # tsb-core — Foundational Types for TSBuffer Validation
//!
//! This crate is the leaf of the workspace. It defines the data the
//! validation engine consumes and depends on nothing internal.
//!
//! ## Contents
//!
//! 1. **Schema grammar** (`schema`). The closed tagged union of type
//!    descriptors, deserialized from the JSON the schema compiler emits.
//!    Tags and field names match the wire format exactly.
//!
//! 2. **Runtime values** (`value`). `Value` keeps every distinction the
//!    binary format cares about: `undefined` vs `null`, `number` vs
//!    `bigint`, raw buffers vs typed arrays.
//!
//! 3. **Proto registry** (`proto`). Module path → symbol name → schema,
//!    loadable from JSON or YAML.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tsb-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod proto;
pub mod schema;
pub mod value;

pub use error::ProtoError;
pub use proto::{split_target, Proto};
pub use schema::{
    EnumMember, EnumValue, Extends, IndexKeyType, IndexSignature, LiteralValue, Member, Property,
    ScalarType, Schema, TypedArrayKind,
};
pub use value::{Object, Value};
