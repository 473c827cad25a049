//! # hgeo
//!
//! Reader and writer for JSON geometry "detail" documents.
//!
//! A document stores a point cloud, the vertices that reference it, typed
//! attributes on each element domain, a list of primitives built from the
//! vertices, and named element groups. Values may be stored compactly (paged
//! raw data, run-length masks, primitive runs); loading expands them and
//! saving always writes the explicit form.
//!
//! ## Modules
//!
//! - [`util`] - Errors and component storage kinds
//! - [`core`] - Key/value normalization, page decoding, domains, gzip
//! - [`geo`] - Document model: detail, attributes, primitives, groups
//! - [`io`] - File and stream reading/writing
//!
//! ## Example
//!
//! ```ignore
//! use hgeo::prelude::*;
//!
//! let detail = Detail::open("box.geo")?;
//! println!("{}", detail.summary());
//! if let Some(p) = detail.vertex_point(0).and_then(|pt| detail.point_position(pt)) {
//!     println!("first vertex at {}", p);
//! }
//! detail.save("box.geo.gz", &SaveOptions::for_path("box.geo.gz"))?;
//! ```

pub mod util;
pub mod core;
pub mod geo;
pub mod io;

// Re-export commonly used types
pub use util::{Error, FormatError, Result};
pub use geo::Detail;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, FormatError, Result, Storage};
    pub use crate::core::Domain;
    pub use crate::geo::*;
    pub use crate::io::{read_document, write_document, SaveOptions};
}
