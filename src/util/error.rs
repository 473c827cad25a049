//! Error types for the geometry codec.

use thiserror::Error;

/// Structural violations that make a geometry document un-interpretable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// A required key is absent from a key/value block
    #[error("Missing required field '{field}' in {context}")]
    MissingField { context: String, field: String },

    /// A key is present but holds the wrong kind of value
    #[error("Field '{field}' in {context} has the wrong type: expected {expected}")]
    WrongType {
        context: String,
        field: String,
        expected: &'static str,
    },

    /// A block that should be a key/value record is not one
    #[error("Expected a key/value block for {0}")]
    NotARecord(String),

    /// The vertex -> point map is missing or malformed
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Group selection carries neither a known mask encoding nor an order
    #[error("Unknown element group encoding for group '{0}'")]
    UnknownGroupEncoding(String),

    /// Paged data did not expand to the declared number of tuples
    #[error("Paged data decoded to {actual} tuples, expected {expected}")]
    PageCount { expected: usize, actual: usize },

    /// Paged data ran out in the middle of a page
    #[error("Paged data truncated on page {page}")]
    TruncatedPage { page: usize },

    /// The single-column "arrays" form was used with a wider tuple
    #[error("Single-column array form requires tuple size 1, got {0}")]
    TupleWidth(usize),

    /// No value encoding was found for an attribute
    #[error("No values found for attribute '{0}'")]
    MissingValues(String),

    /// A per-element array does not match its domain's element count
    #[error("{context} has {actual} elements, expected {expected}")]
    ElementCount {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// An element offset points outside its index space
    #[error("Index {index} in {context} is out of range (count: {count})")]
    IndexOutOfRange {
        context: String,
        index: i64,
        count: usize,
    },

    /// Nested profile documents exceed the configured depth
    #[error("Nested documents exceed the depth limit of {0}")]
    NestingTooDeep(usize),

    /// Any other malformed structure
    #[error("Invalid structure: {0}")]
    Invalid(String),
}

impl FormatError {
    /// Create a missing-field error.
    pub fn missing(context: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            context: context.into(),
            field: field.into(),
        }
    }

    /// Create a wrong-type error.
    pub fn wrong_type(
        context: impl Into<String>,
        field: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::WrongType {
            context: context.into(),
            field: field.into(),
            expected,
        }
    }

    /// Create a generic invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Main error type for geometry operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The document structure is malformed
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True when the failure is a structural violation of the document.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }

    /// The wrapped format error, if any.
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            Self::Format(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for geometry operations.
pub type Result<T> = std::result::Result<T, Error>;
