//! Geometry document model.
//!
//! - [`Detail`] - A whole document: topology, attributes, primitives, groups
//! - [`Attribute`] - Typed per-element values
//! - [`Primitive`] / [`PrimitiveKind`] - Primitive registry and payloads
//! - [`ElementGroup`] - Named element sets
//! - [`Basis`] / [`TrimRegion`] - Spline bases and profile trims
//! - [`DetailSummary`] - Text report of a document

pub mod attribute;
pub mod basis;
pub mod detail;
pub mod group;
pub mod primitive;
pub mod summary;

// Re-export document types
pub use detail::{AttributeMap, Detail, GroupMap, LoadOptions, FILE_VERSION, MAX_NESTING_DEPTH};

// Re-export element types
pub use attribute::{AttribValue, Attribute, AttributeData, SemanticType};
pub use basis::{Basis, BasisType, TrimFace, TrimRegion};
pub use group::{unpack_rle, ElementGroup};
pub use primitive::{Primitive, PrimitiveData, PrimitiveKind, Transform};
pub use summary::{AttributeInfo, DetailSummary, GroupInfo};
