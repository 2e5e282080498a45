//! Error types for type-juggling decoding.

use std::fmt::{self, Display};

use crate::parse::ParseError;

/// Error type for a decode call.
///
/// `struct_ident`/`field` carry the error context active when the error was
/// raised: the structure and field being decoded, if any. The first error
/// aborts the call; mutations to the target made before the failing point
/// are kept (decoding is explicitly not atomic).
#[derive(Debug)]
pub struct Error {
    /// The specific kind of error.
    pub kind: ErrorKind,
    /// Name of the structure being decoded when the error was raised.
    pub struct_ident: Option<String>,
    /// Resolved name of the field being decoded when the error was raised.
    pub field: Option<String>,
}

impl Error {
    /// Create an error without field context.
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind,
            struct_ident: None,
            field: None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let (Some(s), Some(field)) = (&self.struct_ident, &self.field) {
            write!(f, " (struct {s}, field {field})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::new(ErrorKind::Parse(err))
    }
}

/// Specific error kinds for decoding.
#[derive(Debug)]
pub enum ErrorKind {
    /// The source value's kind cannot be coerced into the destination.
    TypeMismatch {
        /// Ident of the destination shape.
        expected: String,
        /// Kind of the source value, plus the literal for numbers.
        got: String,
    },
    /// An object key matched no field of a struct target (strict mode only).
    UnknownField {
        /// The unmatched key.
        field: String,
        /// Ident of the struct shape.
        struct_ident: String,
    },
    /// A forced-object array key that is not a non-negative base-10 index,
    /// or a map key that does not parse as its integer key type.
    MalformedKey {
        /// The offending key text.
        key: String,
    },
    /// A numeric value whose exact value does not fit the destination width.
    NumberOutOfRange {
        /// The literal text.
        value: String,
        /// Ident of the destination shape.
        target: String,
    },
    /// The top-level target was null or did not match its shape. Raised
    /// before any input is consumed.
    InvalidTarget {
        /// Ident of the target shape.
        shape: String,
    },
    /// A raw or text decode hook failed; the message is the hook's,
    /// verbatim.
    Hook(String),
    /// Input nesting exceeded the configured depth limit.
    DepthLimit {
        /// The configured limit.
        limit: usize,
    },
    /// The input was not valid JSON.
    Parse(ParseError),
}

impl ErrorKind {
    /// Stable error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch { .. } => "juggle::type_mismatch",
            ErrorKind::UnknownField { .. } => "juggle::unknown_field",
            ErrorKind::MalformedKey { .. } => "juggle::malformed_key",
            ErrorKind::NumberOutOfRange { .. } => "juggle::number_out_of_range",
            ErrorKind::InvalidTarget { .. } => "juggle::invalid_target",
            ErrorKind::Hook(_) => "juggle::hook",
            ErrorKind::DepthLimit { .. } => "juggle::depth_limit",
            ErrorKind::Parse(_) => "juggle::parse",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::TypeMismatch { expected, got } => {
                write!(f, "cannot decode {got} into {expected}")
            }
            ErrorKind::UnknownField {
                field,
                struct_ident,
            } => {
                write!(f, "unknown field `{field}` for struct {struct_ident}")
            }
            ErrorKind::MalformedKey { key } => {
                write!(f, "key `{key}` is not a valid index")
            }
            ErrorKind::NumberOutOfRange { value, target } => {
                write!(f, "number `{value}` out of range for {target}")
            }
            ErrorKind::InvalidTarget { shape } => {
                write!(f, "invalid decode target for shape {shape}")
            }
            ErrorKind::Hook(msg) => write!(f, "decode hook failed: {msg}"),
            ErrorKind::DepthLimit { limit } => {
                write!(f, "input nesting exceeds the depth limit of {limit}")
            }
            ErrorKind::Parse(e) => write!(f, "{e}"),
        }
    }
}

/// Result type for decoding.
pub type Result<T> = std::result::Result<T, Error>;
