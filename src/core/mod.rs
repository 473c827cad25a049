//! Core layer - document plumbing shared by every loader.
//!
//! This module provides:
//! - [`Record`] / [`RecordBuilder`] - Flat key/value list normalization
//! - [`decode_pages`] - Paged raw-data expansion
//! - [`Domain`] - Element domains
//! - Gzip helpers for compressed documents

mod record;
mod paged;
mod domain;
pub mod compression;

pub use record::{Record, RecordBuilder, as_bool, as_index, as_int};
pub use paged::{PageLayout, decode_pages};
pub use domain::Domain;
pub use compression::{compress, decompress, is_compressed};
