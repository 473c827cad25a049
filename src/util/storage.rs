//! Storage kinds - how attribute components are typed on disk.

use serde_json::Value;
use std::fmt;

/// Storage kind of an attribute's components.
///
/// Storage is advisory: values are always decoded to `f64` (numeric)
/// or `i64` (string indices). The kind only decides how values are
/// written back, so integer attributes stay integers on save.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Storage {
    /// Unsigned 8-bit integer
    Uint8,
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 16-bit float
    Fpreal16,
    /// 32-bit float
    #[default]
    Fpreal32,
    /// 64-bit float
    Fpreal64,
    /// Any storage name this crate does not know, kept verbatim
    Other(String),
}

impl Storage {
    /// Returns the name of this storage as written in documents.
    pub fn name(&self) -> &str {
        match self {
            Self::Uint8 => "uint8",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Fpreal16 => "fpreal16",
            Self::Fpreal32 => "fpreal32",
            Self::Fpreal64 => "fpreal64",
            Self::Other(name) => name,
        }
    }

    /// Parse a storage name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "uint8" => Self::Uint8,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "fpreal16" => Self::Fpreal16,
            "fpreal32" => Self::Fpreal32,
            "fpreal64" => Self::Fpreal64,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns true if this is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Uint8 | Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64
        )
    }

    /// Returns true if this is a floating point type.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Fpreal16 | Self::Fpreal32 | Self::Fpreal64)
    }

    /// Encode one component for this storage.
    pub fn encode(&self, v: f64) -> Value {
        if self.is_integer() && v.is_finite() {
            Value::from(v as i64)
        } else {
            Value::from(v)
        }
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
