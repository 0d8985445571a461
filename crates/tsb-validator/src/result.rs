//! # Validation Results
//!
//! A value that does not match its schema is an expected outcome, so it is
//! returned as data rather than raised. [`ValidateResult::Failure`] carries a
//! [`ValidateError`]; nested failures are wrapped in
//! [`ValidateError::Inner`] once per level, each wrapper naming the field,
//! element or intersection branch it descended through.
//!
//! The engine never renders messages. A caller that wants a string such as
//! `value.list[2].name` walks [`ValidateError::path`] and formats it.

use std::fmt;

use thiserror::Error;
use tsb_core::ScalarType;

/// Outcome of validating one value.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum ValidateResult {
    Success,
    Failure(ValidateError),
}

impl ValidateResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ValidateResult::Success)
    }

    pub fn error(&self) -> Option<&ValidateError> {
        match self {
            ValidateResult::Success => None,
            ValidateResult::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<(), ValidateError> {
        match self {
            ValidateResult::Success => Ok(()),
            ValidateResult::Failure(err) => Err(err),
        }
    }

    pub(crate) fn fail(error: ValidateError) -> Self {
        ValidateResult::Failure(error)
    }

    /// Wrap a failure one level deeper under `segment`.
    pub(crate) fn within(self, segment: PathSegment) -> Self {
        match self {
            ValidateResult::Success => ValidateResult::Success,
            ValidateResult::Failure(cause) => ValidateResult::Failure(ValidateError::Inner {
                segment,
                cause: Box::new(cause),
            }),
        }
    }
}

/// One step of the path from the validated value to the failing part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A named property of an object.
    Field(String),
    /// An element of an array or tuple.
    Index(usize),
    /// A branch of an intersection.
    Member(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Member(i) => write!(f, "<Condition{i}>"),
        }
    }
}

/// Why a value failed validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidateError {
    /// The value has the wrong JavaScript-level type.
    #[error("expected {expected}, actually {actual}")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },

    /// The value is a number but outside its scalar family (fractional for
    /// an integer family, negative for an unsigned one).
    #[error("{value} is not a valid {scalar_type}")]
    WrongScalarType {
        scalar_type: ScalarType,
        value: String,
    },

    /// A tuple has more elements than it declares.
    #[error("tuple length {length} exceeds maximum {max}")]
    TupleOverlength { length: usize, max: usize },

    #[error("value is not a member of the enum")]
    InvalidEnumValue,

    #[error("value does not equal the literal")]
    InvalidLiteralValue,

    #[error("missing required member")]
    MissingRequiredMember,

    /// Excess property on an interface without an index signature.
    #[error("unexpected field")]
    UnexpectedField,

    /// A key of a numeric-keyed object is not a canonical non-negative
    /// integer.
    #[error("invalid number key")]
    InvalidNumberKey,

    /// Every member of a union failed. Member failures are kept in member
    /// order.
    #[error("value matches no member of the union")]
    NoMatchingUnionMember { member_errors: Vec<ValidateError> },

    /// A nested failure under `segment`.
    #[error("{segment}: {cause}")]
    Inner {
        segment: PathSegment,
        cause: Box<ValidateError>,
    },
}

/// Stable discriminant of a [`ValidateError`], for callers that key message
/// templates on the failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    WrongType,
    WrongScalarType,
    TupleOverlength,
    InvalidEnumValue,
    InvalidLiteralValue,
    MissingRequiredMember,
    UnexpectedField,
    InvalidNumberKey,
    NoMatchingUnionMember,
    InnerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::WrongType => "WRONG_TYPE",
            ErrorCode::WrongScalarType => "WRONG_SCALAR_TYPE",
            ErrorCode::TupleOverlength => "TUPLE_OVERLENGTH",
            ErrorCode::InvalidEnumValue => "INVALID_ENUM_VALUE",
            ErrorCode::InvalidLiteralValue => "INVALID_LITERAL_VALUE",
            ErrorCode::MissingRequiredMember => "MISSING_REQUIRED_MEMBER",
            ErrorCode::UnexpectedField => "UNEXPECTED_FIELD",
            ErrorCode::InvalidNumberKey => "INVALID_NUMBER_KEY",
            ErrorCode::NoMatchingUnionMember => "NO_MATCHING_UNION_MEMBER",
            ErrorCode::InnerError => "INNER_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValidateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ValidateError::WrongType { .. } => ErrorCode::WrongType,
            ValidateError::WrongScalarType { .. } => ErrorCode::WrongScalarType,
            ValidateError::TupleOverlength { .. } => ErrorCode::TupleOverlength,
            ValidateError::InvalidEnumValue => ErrorCode::InvalidEnumValue,
            ValidateError::InvalidLiteralValue => ErrorCode::InvalidLiteralValue,
            ValidateError::MissingRequiredMember => ErrorCode::MissingRequiredMember,
            ValidateError::UnexpectedField => ErrorCode::UnexpectedField,
            ValidateError::InvalidNumberKey => ErrorCode::InvalidNumberKey,
            ValidateError::NoMatchingUnionMember { .. } => ErrorCode::NoMatchingUnionMember,
            ValidateError::Inner { .. } => ErrorCode::InnerError,
        }
    }

    /// Path segments from the outermost wrapper to the innermost.
    pub fn path(&self) -> Vec<&PathSegment> {
        let mut segments = Vec::new();
        let mut current = self;
        while let ValidateError::Inner { segment, cause } = current {
            segments.push(segment);
            current = cause;
        }
        segments
    }

    /// The innermost failure, below every `Inner` wrapper.
    pub fn root_cause(&self) -> &ValidateError {
        let mut current = self;
        while let ValidateError::Inner { cause, .. } = current {
            current = cause;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> ValidateError {
        ValidateError::Inner {
            segment: PathSegment::Field("list".into()),
            cause: Box::new(ValidateError::Inner {
                segment: PathSegment::Index(2),
                cause: Box::new(ValidateError::MissingRequiredMember),
            }),
        }
    }

    #[test]
    fn path_walks_outermost_first() {
        let err = nested();
        assert_eq!(
            err.path(),
            vec![&PathSegment::Field("list".into()), &PathSegment::Index(2)]
        );
        assert_eq!(err.root_cause(), &ValidateError::MissingRequiredMember);
        assert_eq!(err.code(), ErrorCode::InnerError);
        assert_eq!(err.root_cause().code().as_str(), "MISSING_REQUIRED_MEMBER");
    }

    #[test]
    fn flat_error_has_empty_path() {
        let err = ValidateError::UnexpectedField;
        assert!(err.path().is_empty());
        assert_eq!(err.root_cause(), &err);
    }

    #[test]
    fn within_wraps_only_failures() {
        assert_eq!(
            ValidateResult::Success.within(PathSegment::Index(0)),
            ValidateResult::Success
        );
        let wrapped = ValidateResult::fail(ValidateError::InvalidEnumValue)
            .within(PathSegment::Member(1));
        assert_eq!(
            wrapped.error().map(ValidateError::path),
            Some(vec![&PathSegment::Member(1)])
        );
    }

    #[test]
    fn display_renders_chain() {
        assert_eq!(format!("{}", nested()), "list: [2]: missing required member");
        let err = ValidateError::WrongType {
            expected: "boolean",
            actual: "number",
        };
        assert_eq!(format!("{err}"), "expected boolean, actually number");
    }

    #[test]
    fn scalar_error_display() {
        let err = ValidateError::WrongScalarType {
            scalar_type: ScalarType::Uint,
            value: "-5".into(),
        };
        assert_eq!(format!("{err}"), "-5 is not a valid uint");
    }

    #[test]
    fn into_result() {
        assert!(ValidateResult::Success.into_result().is_ok());
        assert_eq!(
            ValidateResult::fail(ValidateError::InvalidNumberKey).into_result(),
            Err(ValidateError::InvalidNumberKey)
        );
    }
}
