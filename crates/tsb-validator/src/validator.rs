//! # Validator
//!
//! Recursive descent over a value and a schema. Each schema kind has one
//! rule; structured failures propagate outward wrapped in one
//! [`ValidateError::Inner`] per level, and the first failure found in
//! declaration order is the one reported.
//!
//! ## Foreign fields
//!
//! When a union or intersection is checked, the fields declared by any of
//! its interface-like branches are computed once and threaded into every
//! branch. A branch then tolerates those fields instead of rejecting them as
//! excess, so `{ name, age }` matches `{ name } | { age }`. Nested unions and
//! intersections inherit the outer set rather than computing their own.
//!
//! ## Depth
//!
//! Steps that stay on the same value (reference hops, union and
//! intersection members) count against [`ValidatorOptions::max_depth`]. A
//! schema that recurses without consuming any of the value (a union that
//! contains itself) fails with [`SchemaError::RecursionLimitExceeded`]
//! instead of overflowing the stack. Stepping into an element or a property
//! starts the count again, so deeply nested valid data is never a schema
//! error.

use tsb_core::{
    EnumValue, IndexKeyType, LiteralValue, Object, Proto, ScalarType, Schema, TypedArrayKind,
    Value,
};

use crate::arena::{SchemaArena, SchemaId, SchemaNode};
use crate::error::SchemaError;
use crate::flat::{is_number_key, FlatInterface, ForeignFields};
use crate::options::ValidatorOptions;
use crate::resolver::SchemaResolver;
use crate::result::{PathSegment, ValidateError, ValidateResult};

/// Validates runtime values against the schemas of one proto.
///
/// A `Validator` is `Send + Sync`; share it behind an `Arc` to validate from
/// several threads at once.
#[derive(Debug)]
pub struct Validator {
    resolver: SchemaResolver,
    options: ValidatorOptions,
}

impl Validator {
    pub fn new(proto: &Proto) -> Self {
        Self::with_options(proto, ValidatorOptions::default())
    }

    pub fn with_options(proto: &Proto, options: ValidatorOptions) -> Self {
        let arena = SchemaArena::from_proto(proto);
        tracing::debug!(
            modules = arena.module_count(),
            symbols = arena.symbol_count(),
            strict_null_checks = options.strict_null_checks,
            "validator built"
        );
        Self {
            resolver: SchemaResolver::new(arena, options.max_depth),
            options,
        }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    pub fn resolver(&self) -> &SchemaResolver {
        &self.resolver
    }

    /// The root schema of `symbol` in module `path`.
    pub fn lookup(&self, path: &str, symbol: &str) -> Result<SchemaId, SchemaError> {
        self.resolver.lookup(path, symbol)
    }

    /// Intern an ad-hoc schema so it can be passed to
    /// [`Validator::validate_by_schema`]. References inside it resolve
    /// against this validator's proto.
    ///
    /// Every call appends new nodes to the arena and nothing is ever freed,
    /// so intern a schema once and reuse the returned [`SchemaId`] rather
    /// than interning per validation.
    pub fn intern(&self, schema: &Schema) -> SchemaId {
        self.resolver.arena().intern(schema)
    }

    /// Validate `value` against `symbol` in module `path`.
    ///
    /// # Errors
    ///
    /// `UnknownPath` / `UnknownSymbol` if the schema does not exist, and any
    /// other [`SchemaError`] the schema raises while resolving. A value that
    /// does not conform is `Ok(ValidateResult::Failure(..))`.
    pub fn validate(
        &self,
        value: &Value,
        path: &str,
        symbol: &str,
    ) -> Result<ValidateResult, SchemaError> {
        let id = self.lookup(path, symbol)?;
        self.validate_by_schema(value, id)
    }

    /// Validate `value` against an already-known schema.
    pub fn validate_by_schema(
        &self,
        value: &Value,
        schema: SchemaId,
    ) -> Result<ValidateResult, SchemaError> {
        self.check(value, schema, 0)
    }

    fn descend(&self, depth: usize) -> Result<usize, SchemaError> {
        if depth >= self.options.max_depth {
            tracing::warn!(limit = self.options.max_depth, "validation recursion limit exceeded");
            return Err(SchemaError::RecursionLimitExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(depth + 1)
    }

    fn check(&self, value: &Value, id: SchemaId, depth: usize) -> Result<ValidateResult, SchemaError> {
        let depth = self.descend(depth)?;
        let node = self.resolver.node(id)?;
        let result = match &*node {
            SchemaNode::Boolean => expect_type(matches!(value, Value::Boolean(_)), "boolean", value),
            SchemaNode::String => expect_type(matches!(value, Value::String(_)), "string", value),
            SchemaNode::Any => ValidateResult::Success,
            SchemaNode::NonPrimitive => expect_type(
                matches!(
                    value,
                    Value::Object(_) | Value::Buffer(_) | Value::TypedArray { .. }
                ),
                "Object",
                value,
            ),
            SchemaNode::Number { scalar_type } => {
                check_number(value, scalar_type.unwrap_or(ScalarType::Double))
            }
            SchemaNode::Literal { literal } => {
                if self.literal_matches(literal, value) {
                    ValidateResult::Success
                } else {
                    ValidateResult::fail(ValidateError::InvalidLiteralValue)
                }
            }
            SchemaNode::Enum { values } => check_enum(values, value),
            SchemaNode::Array { element } => self.check_array(value, *element)?,
            SchemaNode::Tuple {
                elements,
                optional_start,
            } => self.check_tuple(value, elements, *optional_start)?,
            SchemaNode::Buffer { array_type } => check_buffer(value, *array_type),
            SchemaNode::Reference { .. } | SchemaNode::IndexedAccess { .. } => {
                let target = self.resolver.resolve(id)?;
                self.check(value, target, depth)?
            }
            SchemaNode::Union { members } => self.check_union(value, id, members, None, depth)?,
            SchemaNode::Intersection { members } => {
                self.check_intersection(value, id, members, None, depth)?
            }
            SchemaNode::Interface { .. }
            | SchemaNode::Pick { .. }
            | SchemaNode::Partial { .. }
            | SchemaNode::Omit { .. }
            | SchemaNode::Overwrite { .. } => self.check_interface_like(value, id, None, depth)?,
        };
        Ok(result)
    }

    fn literal_matches(&self, literal: &LiteralValue, value: &Value) -> bool {
        match (literal, value) {
            (LiteralValue::Undefined, Value::Undefined) | (LiteralValue::Null, Value::Null) => true,
            (LiteralValue::Undefined, Value::Null) | (LiteralValue::Null, Value::Undefined) => {
                !self.options.strict_null_checks
            }
            (LiteralValue::Boolean(a), Value::Boolean(b)) => a == b,
            (LiteralValue::Number(a), Value::Number(b)) => a == b,
            (LiteralValue::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    fn check_array(
        &self,
        value: &Value,
        element: SchemaId,
    ) -> Result<ValidateResult, SchemaError> {
        let Value::Array(items) = value else {
            return Ok(wrong_type("Array", value));
        };
        for (i, item) in items.iter().enumerate() {
            let result = self.check(item, element, 0)?;
            if !result.is_success() {
                return Ok(result.within(PathSegment::Index(i)));
            }
        }
        Ok(ValidateResult::Success)
    }

    fn check_tuple(
        &self,
        value: &Value,
        elements: &[SchemaId],
        optional_start: Option<usize>,
    ) -> Result<ValidateResult, SchemaError> {
        let Value::Array(items) = value else {
            return Ok(wrong_type("Array", value));
        };
        if items.len() > elements.len() {
            return Ok(ValidateResult::fail(ValidateError::TupleOverlength {
                length: items.len(),
                max: elements.len(),
            }));
        }

        let required = optional_start.unwrap_or(elements.len());
        for (i, &ty) in elements.iter().enumerate() {
            match items.get(i) {
                None | Some(Value::Undefined) if i < required => {
                    return Ok(ValidateResult::fail(ValidateError::MissingRequiredMember)
                        .within(PathSegment::Index(i)));
                }
                None | Some(Value::Undefined) => {}
                Some(item) => {
                    let result = self.check(item, ty, 0)?;
                    if !result.is_success() {
                        return Ok(result.within(PathSegment::Index(i)));
                    }
                }
            }
        }
        Ok(ValidateResult::Success)
    }

    fn check_union(
        &self,
        value: &Value,
        id: SchemaId,
        members: &[SchemaId],
        inherited: Option<&ForeignFields>,
        depth: usize,
    ) -> Result<ValidateResult, SchemaError> {
        let computed;
        let foreign = match inherited {
            Some(foreign) => foreign,
            None => {
                computed = self.resolver.foreign_fields(id)?;
                &*computed
            }
        };

        let mut member_errors = Vec::with_capacity(members.len());
        for &member in members {
            match self.check_member(value, member, foreign, depth)? {
                ValidateResult::Success => return Ok(ValidateResult::Success),
                ValidateResult::Failure(err) => member_errors.push(err),
            }
        }
        Ok(ValidateResult::fail(ValidateError::NoMatchingUnionMember {
            member_errors,
        }))
    }

    fn check_intersection(
        &self,
        value: &Value,
        id: SchemaId,
        members: &[SchemaId],
        inherited: Option<&ForeignFields>,
        depth: usize,
    ) -> Result<ValidateResult, SchemaError> {
        let computed;
        let foreign = match inherited {
            Some(foreign) => foreign,
            None => {
                computed = self.resolver.foreign_fields(id)?;
                &*computed
            }
        };

        for (i, &member) in members.iter().enumerate() {
            let result = self.check_member(value, member, foreign, depth)?;
            if !result.is_success() {
                return Ok(result.within(PathSegment::Member(i)));
            }
        }
        Ok(ValidateResult::Success)
    }

    /// Check one branch of a union or intersection with the combinator's
    /// foreign fields in scope.
    fn check_member(
        &self,
        value: &Value,
        member: SchemaId,
        foreign: &ForeignFields,
        depth: usize,
    ) -> Result<ValidateResult, SchemaError> {
        let depth = self.descend(depth)?;
        let resolved = self.resolver.resolve(member)?;
        let node = self.resolver.node(resolved)?;
        match &*node {
            SchemaNode::Union { members } => {
                self.check_union(value, resolved, members, Some(foreign), depth)
            }
            SchemaNode::Intersection { members } => {
                self.check_intersection(value, resolved, members, Some(foreign), depth)
            }
            n if n.is_interface_like() => {
                self.check_interface_like(value, resolved, Some(foreign), depth)
            }
            _ => self.check(value, resolved, depth),
        }
    }

    fn check_interface_like(
        &self,
        value: &Value,
        id: SchemaId,
        foreign: Option<&ForeignFields>,
        depth: usize,
    ) -> Result<ValidateResult, SchemaError> {
        // A combinator over a union is checked as the distributed union.
        if let Some(union) = self.resolver.resolve_mapped(id)? {
            return match foreign {
                Some(foreign) => self.check_member(value, union, foreign, depth),
                None => self.check(value, union, depth),
            };
        }

        let flat = self.resolver.flatten(id)?;
        let Value::Object(obj) = value else {
            return Ok(wrong_type("Object", value));
        };
        self.check_flat(obj, &flat, foreign)
    }

    fn check_flat(
        &self,
        obj: &Object,
        flat: &FlatInterface,
        foreign: Option<&ForeignFields>,
    ) -> Result<ValidateResult, SchemaError> {
        if flat.index_signature.map(|sig| sig.key_type) == Some(IndexKeyType::Number) {
            if let Some(key) = obj.keys().find(|key| !is_number_key(key)) {
                return Ok(ValidateResult::fail(ValidateError::InvalidNumberKey)
                    .within(PathSegment::Field(key.to_string())));
            }
        }

        for prop in &flat.properties {
            let value = match obj.get(&prop.name) {
                Some(value) if !self.is_absent(value, prop.optional) => value,
                _ if prop.optional => continue,
                _ => {
                    return Ok(ValidateResult::fail(ValidateError::MissingRequiredMember)
                        .within(PathSegment::Field(prop.name.clone())));
                }
            };
            let result = self.check(value, prop.ty, 0)?;
            if !result.is_success() {
                return Ok(result.within(PathSegment::Field(prop.name.clone())));
            }
        }

        match flat.index_signature {
            Some(sig) => {
                for (key, value) in obj.iter() {
                    if flat.has_property(key) || foreign.is_some_and(|f| f.contains(key)) {
                        continue;
                    }
                    let result = self.check(value, sig.ty, 0)?;
                    if !result.is_success() {
                        return Ok(result.within(PathSegment::Field(key.to_string())));
                    }
                }
            }
            None => {
                let excess = obj.keys().find(|key| {
                    !flat.has_property(key) && !foreign.is_some_and(|f| f.permits(key))
                });
                if let Some(key) = excess {
                    return Ok(ValidateResult::fail(ValidateError::UnexpectedField)
                        .within(PathSegment::Field(key.to_string())));
                }
            }
        }
        Ok(ValidateResult::Success)
    }

    /// A present property value that still counts as "not given".
    fn is_absent(&self, value: &Value, optional: bool) -> bool {
        match value {
            Value::Undefined => true,
            Value::Null => optional && !self.options.strict_null_checks,
            _ => false,
        }
    }
}

fn wrong_type(expected: &'static str, value: &Value) -> ValidateResult {
    ValidateResult::fail(ValidateError::WrongType {
        expected,
        actual: value.type_name(),
    })
}

fn expect_type(ok: bool, expected: &'static str, value: &Value) -> ValidateResult {
    if ok {
        ValidateResult::Success
    } else {
        wrong_type(expected, value)
    }
}

fn wrong_scalar(scalar_type: ScalarType, value: String) -> ValidateResult {
    ValidateResult::fail(ValidateError::WrongScalarType { scalar_type, value })
}

fn check_number(value: &Value, scalar: ScalarType) -> ValidateResult {
    match value {
        Value::Number(_) if scalar.is_big() => wrong_type("bigint", value),
        Value::Number(n) => {
            if scalar.is_integral() && !(n.is_finite() && n.fract() == 0.0) {
                return wrong_scalar(scalar, n.to_string());
            }
            if scalar.is_unsigned() && *n < 0.0 {
                return wrong_scalar(scalar, n.to_string());
            }
            ValidateResult::Success
        }
        Value::BigInt(_) if !scalar.is_big() => wrong_type("number", value),
        Value::BigInt(n) => {
            if scalar.is_unsigned() && *n < 0 {
                return wrong_scalar(scalar, n.to_string());
            }
            ValidateResult::Success
        }
        _ if scalar.is_big() => wrong_type("bigint", value),
        _ => wrong_type("number", value),
    }
}

fn check_enum(values: &[EnumValue], value: &Value) -> ValidateResult {
    let found = match value {
        Value::String(s) => values
            .iter()
            .any(|v| matches!(v, EnumValue::String(m) if m == s)),
        Value::Number(n) => values
            .iter()
            .any(|v| matches!(v, EnumValue::Number(m) if m == n)),
        _ => return wrong_type("string | number", value),
    };
    if found {
        ValidateResult::Success
    } else {
        ValidateResult::fail(ValidateError::InvalidEnumValue)
    }
}

fn check_buffer(value: &Value, array_type: Option<TypedArrayKind>) -> ValidateResult {
    match array_type {
        None => expect_type(matches!(value, Value::Buffer(_)), "ArrayBuffer", value),
        Some(kind) => expect_type(
            matches!(value, Value::TypedArray { kind: actual, .. } if *actual == kind),
            kind.as_str(),
            value,
        ),
    }
}
