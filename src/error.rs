//! Error types for form-data deserialization.

use facet_core::Shape;
use facet_reflect::ReflectError;

/// A hard failure of a whole `from_form` call.
///
/// Per-key failures never produce a `FormError`: a submission legitimately
/// carries keys unrelated to the destination (CSRF tokens, unrelated
/// widgets), so those are dropped (see [`BindError`]) and binding of the
/// remaining keys continues. A `FormError` means either the request body
/// itself could not be turned into a [`FormData`](crate::FormData), or the
/// destination shape could not be allocated or completed at all.
pub struct FormError {
    /// Type of error
    pub kind: FormErrorKind,
}

impl FormError {
    /// Create a new error.
    pub fn new(kind: FormErrorKind) -> Self {
        Self { kind }
    }

    /// The message for this specific error.
    pub fn message(&self) -> String {
        match &self.kind {
            FormErrorKind::PayloadTooLarge { size, limit } => {
                format!("Request body of {size} bytes exceeds the accepted limit of {limit} bytes")
            }
            FormErrorKind::UnsupportedMediaType { content_type } => {
                format!(
                    "Unsupported media type {content_type:?}: expected \
                     `application/x-www-form-urlencoded` or `multipart/form-data`"
                )
            }
            FormErrorKind::Multipart(err) => {
                format!("Failed to decode multipart body: {err}")
            }
            FormErrorKind::Reflect(err) => {
                format!("Error while reflecting destination type: {err}")
            }
        }
    }
}

impl core::fmt::Display for FormError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl core::fmt::Debug for FormError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

impl core::error::Error for FormError {}

impl From<ReflectError> for FormError {
    fn from(err: ReflectError) -> Self {
        FormError::new(FormErrorKind::Reflect(err))
    }
}

/// Type of hard error.
#[derive(Debug)]
pub enum FormErrorKind {
    /// The request body is larger than the accepted payload size.
    PayloadTooLarge {
        /// Size of the submitted body, in bytes.
        size: usize,
        /// The accepted limit, in bytes.
        limit: usize,
    },
    /// The content type is neither urlencoded nor multipart.
    UnsupportedMediaType {
        /// The content type that was submitted.
        content_type: String,
    },
    /// The multipart body could not be decoded.
    Multipart(multer::Error),
    /// The destination could not be allocated, completed or built.
    Reflect(ReflectError),
}

/// A per-assignment failure: one key/value pair that could not be bound.
///
/// These are detected while folding keys into the submission tree and while
/// depositing the tree into the destination. They abort only the one
/// assignment they belong to; the surrounding call logs them at debug level
/// and carries on.
#[derive(Debug, PartialEq)]
pub struct BindError {
    /// Type of error
    pub kind: BindErrorKind,
}

impl BindError {
    pub(crate) fn new(kind: BindErrorKind) -> Self {
        Self { kind }
    }
}

impl core::fmt::Display for BindError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            BindErrorKind::PathParse(err) => write!(f, "{err}"),
            BindErrorKind::FieldNotFound { field, shape } => {
                write!(f, "Shape {shape} has no field named {field:?}")
            }
            BindErrorKind::IndexOnNonSequence { index, shape } => {
                write!(f, "Index [{index}] applied to non-sequence shape {shape}")
            }
            BindErrorKind::TypeMismatch { wanted, shape } => {
                write!(f, "Type mismatch: payload wants {wanted}, leaf shape is {shape}")
            }
            BindErrorKind::Coercion { value, shape } => {
                write!(f, "Cannot coerce {value:?} into {shape}")
            }
            BindErrorKind::KeyConflict { segment } => {
                write!(
                    f,
                    "Key conflict at segment {segment:?}: addressed both as a leaf and as a container"
                )
            }
        }
    }
}

impl core::error::Error for BindError {}

/// Type of per-assignment error.
#[derive(Debug, PartialEq)]
pub enum BindErrorKind {
    /// The key's path syntax is malformed.
    PathParse(PathParseError),
    /// A named step does not match any field of the struct it lands on.
    FieldNotFound {
        /// The field name that was looked up.
        field: String,
        /// The struct shape it was looked up in.
        shape: &'static Shape,
    },
    /// An indexed step landed on a shape that is neither a sequence nor a map.
    IndexOnNonSequence {
        /// The index that was applied.
        index: usize,
        /// The shape it was applied to.
        shape: &'static Shape,
    },
    /// The payload kind and the leaf shape do not go together, e.g. a file
    /// part assigned to a non-file field.
    TypeMismatch {
        /// What the payload requires of the leaf.
        wanted: &'static str,
        /// The leaf shape that was found instead.
        shape: &'static Shape,
    },
    /// A string payload could not be converted into the leaf's scalar type.
    Coercion {
        /// The payload that failed to convert.
        value: String,
        /// The leaf shape it was converted into.
        shape: &'static Shape,
    },
    /// Two keys disagree about the kind of one intermediate node.
    KeyConflict {
        /// The path segment where the disagreement occurred.
        segment: String,
    },
}

impl From<PathParseError> for BindError {
    fn from(err: PathParseError) -> Self {
        BindError::new(BindErrorKind::PathParse(err))
    }
}

/// A malformed path expression in one submitted key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParseError {
    /// Type of error
    pub kind: PathParseErrorKind,
    /// Byte offset into the routed key where parsing failed.
    pub offset: usize,
}

impl PathParseError {
    pub(crate) fn new(kind: PathParseErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

impl core::fmt::Display for PathParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let offset = self.offset;
        match &self.kind {
            PathParseErrorKind::EmptySegment => {
                write!(f, "Empty path segment at offset {offset}")
            }
            PathParseErrorKind::UnterminatedBracket => {
                write!(f, "Unterminated `[` at offset {offset}")
            }
            PathParseErrorKind::InvalidIndex => {
                write!(f, "Invalid sequence index at offset {offset}: expected base-10 digits")
            }
            PathParseErrorKind::TrailingCharacters => {
                write!(f, "Unexpected characters after `]` at offset {offset}")
            }
        }
    }
}

impl core::error::Error for PathParseError {}

/// Type of path syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathParseErrorKind {
    /// A segment between dots (or before a bracket) is empty.
    EmptySegment,
    /// A `[` with no matching `]`.
    UnterminatedBracket,
    /// Bracket content that is not a plain base-10 non-negative integer.
    InvalidIndex,
    /// A segment continues after its closing `]` without a `.` separator.
    TrailingCharacters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_errors_carry_through_bind_errors() {
        let err = BindError::from(PathParseError::new(PathParseErrorKind::InvalidIndex, 9));
        assert!(matches!(err.kind, BindErrorKind::PathParse(_)));
        assert_eq!(
            err.to_string(),
            "Invalid sequence index at offset 9: expected base-10 digits"
        );
    }
}
