//! Utility types for the geometry codec.
//!
//! - [`Storage`] - On-disk component storage kinds
//! - [`Error`] / [`FormatError`] / [`Result`] - Error handling

mod error;
mod storage;

pub use error::*;
pub use storage::*;
