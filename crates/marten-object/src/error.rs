//! Engine error types

use crate::value::Value;
use thiserror::Error;

/// Errors raised by object-model operations.
///
/// Everything except [`VmError::Internal`] is script-visible and may be caught by
/// script-level handlers. `Internal` marks a broken engine invariant (a catalog
/// initializer that did not populate its id, invalid attribute bits, a malformed
/// descriptor built by engine code) and must never reach a script `catch`.
#[derive(Debug, Error)]
pub enum VmError {
    /// Type error (e.g., calling a non-function, redefining a frozen property)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Range error (e.g., invalid array length)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Reference error (unresolvable binding)
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Syntax error (JSON text, mostly)
    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    /// Internal invariant violation
    #[error("InternalError: {0}")]
    Internal(String),

    /// Thrown script value
    #[error("Uncaught exception: {0}")]
    Exception(Box<ThrownValue>),
}

/// A thrown script value
#[derive(Debug)]
pub struct ThrownValue {
    /// The thrown value
    pub value: Value,
    /// Printable form of the value
    pub message: String,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Named error kind, as seen by script `catch` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `TypeError`
    TypeError,
    /// `RangeError`
    RangeError,
    /// `ReferenceError`
    ReferenceError,
    /// `SyntaxError`
    SyntaxError,
    /// Fatal engine error
    Internal,
    /// An arbitrary thrown value
    Thrown,
}

impl ErrorKind {
    /// Constructor name of the error kind.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::Internal => "InternalError",
            ErrorKind::Thrown => "Error",
        }
    }
}

impl VmError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create a reference error
    pub fn reference_error(msg: impl Into<String>) -> Self {
        Self::ReferenceError(msg.into())
    }

    /// Create a syntax error
    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError(msg.into())
    }

    /// Create an internal (fatal) error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an exception from a thrown value
    pub fn exception(value: Value) -> Self {
        let message = match &value {
            Value::String(s) => s.to_string(),
            other => format!("{:?}", other),
        };
        Self::Exception(Box::new(ThrownValue { value, message }))
    }

    /// The named kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VmError::TypeError(_) => ErrorKind::TypeError,
            VmError::RangeError(_) => ErrorKind::RangeError,
            VmError::ReferenceError(_) => ErrorKind::ReferenceError,
            VmError::SyntaxError(_) => ErrorKind::SyntaxError,
            VmError::Internal(_) => ErrorKind::Internal,
            VmError::Exception(_) => ErrorKind::Thrown,
        }
    }

    /// Whether a script-level handler may observe this error.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, VmError::Internal(_))
    }
}

/// Result type for object-model operations
pub type VmResult<T> = std::result::Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_are_not_catchable() {
        assert!(!VmError::internal("uninitialized id").is_catchable());
        assert!(VmError::type_error("x").is_catchable());
        assert!(VmError::exception(Value::Number(1.0)).is_catchable());
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(VmError::range_error("bad").kind().name(), "RangeError");
        assert_eq!(
            VmError::type_error("Cannot redefine property: x").to_string(),
            "TypeError: Cannot redefine property: x"
        );
    }
}
