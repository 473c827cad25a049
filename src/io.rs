//! Reading and writing documents on disk.
//!
//! Files are JSON, optionally gzip-compressed. Compression is detected from
//! the content on read, so `*.geo` and `*.geo.gz` open the same way.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::core::{compress, decompress};
use crate::geo::{Detail, LoadOptions};
use crate::util::Result;

/// Default gzip level used for `*.gz` output.
pub const DEFAULT_COMPRESSION: u32 = 6;

/// Options for writing a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Indent the JSON output.
    pub pretty: bool,
    /// Gzip level, 0 writes plain JSON.
    pub compression: u32,
}

impl SaveOptions {
    /// Options suited to a file name: gzip for `.gz`, plain otherwise.
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        let gz = path
            .as_ref()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
        Self {
            pretty: false,
            compression: if gz { DEFAULT_COMPRESSION } else { 0 },
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = level;
        self
    }
}

/// Parse a document from raw bytes, gunzipping if needed.
pub fn parse_document(bytes: &[u8]) -> Result<Value> {
    let data = decompress(bytes)?;
    Ok(serde_json::from_slice(&data)?)
}

/// Serialize a document to bytes.
pub fn encode_document(doc: &Value, options: &SaveOptions) -> Result<Vec<u8>> {
    let json = if options.pretty {
        serde_json::to_vec_pretty(doc)?
    } else {
        serde_json::to_vec(doc)?
    };
    compress(&json, options.compression)
}

/// Read and parse a document file.
pub fn read_document(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read document");
    parse_document(&bytes)
}

/// Serialize and write a document file.
pub fn write_document(path: impl AsRef<Path>, doc: &Value, options: &SaveOptions) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_document(doc, options)?;
    fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote document");
    Ok(())
}

impl Detail {
    /// Load a document file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &LoadOptions::default())
    }

    /// Load a document file.
    pub fn open_with(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        Self::from_value_with(&read_document(path)?, options)
    }

    /// Load a document from any reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_value(&parse_document(&bytes)?)
    }

    /// Write the document to a file.
    pub fn save(&self, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
        write_document(path, &self.to_value(), options)
    }

    /// Write the document to any writer.
    pub fn to_writer<W: Write>(&self, mut writer: W, options: &SaveOptions) -> Result<()> {
        writer.write_all(&encode_document(&self.to_value(), options)?)?;
        Ok(())
    }
}
