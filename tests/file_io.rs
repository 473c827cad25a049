//! Integration tests for reading and writing document files.

use hgeo::core::is_compressed;
use hgeo::io::{read_document, write_document, SaveOptions};
use hgeo::prelude::*;

use tempfile::{tempdir, NamedTempFile};

fn quad() -> Detail {
    let mut d = Detail::new();
    d.vertex_to_point = vec![0, 1, 2, 3];
    d.add_attribute(Attribute::numeric(
        "P",
        Domain::Point,
        3,
        Storage::Fpreal32,
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
    ));
    d.primitives.push(Primitive::poly(vec![0, 1, 2, 3]));
    d
}

#[test]
fn test_save_and_open_plain() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();

    let d = quad();
    d.save(path, &SaveOptions::default()).expect("Failed to save");

    let bytes = std::fs::read(path).expect("Failed to read back");
    assert!(!is_compressed(&bytes));
    assert_eq!(bytes.first(), Some(&b'['));

    let back = Detail::open(path).expect("Failed to open");
    assert_eq!(back, d);
}

#[test]
fn test_save_and_open_gzip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("quad.geo.gz");

    let d = quad();
    d.save(&path, &SaveOptions::for_path(&path)).expect("Failed to save");

    let bytes = std::fs::read(&path).expect("Failed to read back");
    assert!(is_compressed(&bytes), "*.gz output should be gzip");

    let back = Detail::open(&path).expect("Failed to open gzip document");
    assert_eq!(back, d);
    assert_eq!(back.point_position(2), Some(glam::DVec3::new(1.0, 1.0, 0.0)));
}

#[test]
fn test_pretty_output_parses() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("quad.geo");

    let doc = quad().to_value();
    write_document(&path, &doc, &SaveOptions::default().with_pretty(true)).expect("Failed to write");

    let text = std::fs::read_to_string(&path).expect("Failed to read back");
    assert!(text.contains('\n'));
    assert_eq!(read_document(&path).expect("Failed to parse"), doc);
}

#[test]
fn test_open_missing_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let err = Detail::open(dir.path().join("missing.geo")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!err.is_format());
}

#[test]
fn test_open_malformed_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("bad.geo");
    std::fs::write(&path, br#"["pointcount", 1, "topology""#).expect("Failed to write");
    let err = Detail::open(&path).unwrap_err();
    assert!(matches!(err, Error::Json(_)));

    std::fs::write(&path, br#"["pointcount", 1]"#).expect("Failed to write");
    let err = Detail::open(&path).unwrap_err();
    assert!(err.is_format());
}
