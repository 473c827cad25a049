//! Integration tests for loading compact documents and saving them back expanded.

use hgeo::prelude::*;
use serde_json::{json, Value};

const IDENTITY: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

fn attr_def(kind: &str, name: &str) -> Value {
    json!(["scope", "public", "type", kind, "name", name, "options", {}])
}

/// Two triangles stored as a primitive run plus a sphere, with paged,
/// constant-page, single-column and string attributes.
fn compact_document() -> Value {
    json!([
        "fileversion", "12.0.0",
        "info", ["software", "hgeo tests", "date", "2026-01-01"],
        "pointcount", 4,
        "vertexcount", 7,
        "primitivecount", 3,
        "topology", ["pointref", ["indices", [0, 1, 2, 2, 3, 0, 1]]],
        "attributes", [
            "pointattributes", [
                [attr_def("numeric", "P"),
                 ["size", 3, "storage", "fpreal32",
                  "values", ["size", 3, "storage", "fpreal32",
                             "packing", [3], "pagesize", 2,
                             "rawpagedata", [0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 1, 0.5]]]],
                [attr_def("numeric", "Cd"),
                 ["size", 3, "storage", "fpreal32",
                  "values", ["size", 3, "storage", "fpreal32",
                             "packing", [3], "pagesize", 4,
                             "constantpageflags", [[true]],
                             "rawpagedata", [1, 0.5, 0]]]],
                [attr_def("blob", "capture"), {"anything": [1, 2, 3]}]
            ],
            "vertexattributes", [
                [attr_def("numeric", "uv"),
                 ["size", 2, "storage", "fpreal32",
                  "values", ["size", 2, "storage", "fpreal32",
                             "tuples", [[0, 0], [1, 0], [1, 1], [1, 1], [0, 1], [0, 0], [0.5, 0.5]]]]]
            ],
            "primitiveattributes", [
                [attr_def("string", "name"),
                 ["size", 1, "storage", "int32",
                  "strings", ["left", "right"],
                  "indices", ["size", 1, "storage", "int32", "arrays", [[0, 1, 7]]]]]
            ],
            "globalattributes", [
                [attr_def("numeric", "frame"),
                 ["size", 1, "storage", "int32",
                  "values", ["size", 1, "storage", "int32", "arrays", [[24]]]]]
            ]
        ],
        "primitives", [
            [["type", "run", "runtype", "Poly",
              "varyingfields", ["vertex"],
              "uniformfields", ["closed", true]],
             [[[0, 1, 2]], [[3, 4, 5]]]],
            [["type", "Sphere"], ["vertex", 6, "transform", IDENTITY]]
        ],
        "pointgroups", [
            [["name", "ends", "type", "point"],
             ["selection", ["defaults", null, "ordered", [3, 0]]]]
        ],
        "vertexgroups", [
            [["name", "none", "type", "vertex"],
             ["selection", ["defaults", null, "ordered", []]]]
        ],
        "primitivegroups", [
            [["name", "tris", "type", "primitive"],
             ["selection", ["defaults", null, "unordered", ["boolRLE", [2, 1, 1, 0]]]]]
        ]
    ])
}

#[test]
fn test_load_compact_document() {
    let d = Detail::from_value(&compact_document()).expect("Failed to load document");

    assert_eq!(d.point_count(), 4);
    assert_eq!(d.vertex_count(), 7);
    assert_eq!(d.primitive_count(), 3);

    // Paged positions
    let p = &d.point_attributes["P"];
    assert_eq!(p.tuple_size, 3);
    assert_eq!(p.tuple(1), Some(&[1.0, 0.0, 0.0][..]));
    assert_eq!(d.point_position(3), Some(glam::DVec3::new(0.0, 1.0, 0.5)));

    // Single constant page replicated over every point
    let cd = &d.point_attributes["Cd"];
    for pt in 0..4 {
        assert_eq!(cd.tuple(pt), Some(&[1.0, 0.5, 0.0][..]));
    }

    let blob = &d.point_attributes["capture"];
    assert_eq!(blob.semantic_type(), SemanticType::Opaque);
    assert_eq!(blob.type_name(), "blob");

    assert_eq!(d.vertex_attributes["uv"].tuple(6), Some(&[0.5, 0.5][..]));

    let name = &d.primitive_attributes["name"];
    assert_eq!(name.get_value(0), Some(AttribValue::String("left")));
    assert_eq!(name.string_at(1, 0), Some("right"));
    assert_eq!(name.string_at(2, 0), Some(""));

    assert_eq!(d.global_attributes["frame"].tuple(0), Some(&[24.0][..]));

    // Run expanded into two polygons
    assert_eq!(d.primitives[0].kind, PrimitiveKind::Poly);
    assert_eq!(d.primitives[0].vertices, vec![0, 1, 2]);
    assert_eq!(d.primitives[1].vertices, vec![3, 4, 5]);
    assert_eq!(d.primitives[1].data, PrimitiveData::Poly { closed: true });
    assert_eq!(d.primitives[2].kind, PrimitiveKind::Sphere);
    assert_eq!(d.primitives[2].vertex_offset(0), Some(6));

    // Vertex -> point chain
    let v = d.primitives[1].vertices[1];
    assert_eq!(d.vertex_point(v), Some(3));

    let ends = &d.point_groups["ends"];
    assert_eq!(ends.order, Some(vec![3, 0]));
    assert!(ends.contains(0) && ends.contains(3) && !ends.contains(1));

    let none = &d.vertex_groups["none"];
    assert!(none.is_ordered());
    assert_eq!(none.count(), 0);

    let tris = &d.primitive_groups["tris"];
    assert_eq!(tris.selection, vec![true, true, false]);
}

#[test]
fn test_save_writes_expanded_form() {
    let d = Detail::from_value(&compact_document()).expect("Failed to load document");
    let saved = d.to_value();
    let text = serde_json::to_string(&saved).expect("Failed to serialize");

    assert!(!text.contains("rawpagedata"), "paged data must be expanded");
    assert!(!text.contains("boolRLE"), "masks must be written per element");
    assert!(!text.contains("\"run\""), "runs must be expanded");

    let file = hgeo::core::Record::from_value(&saved, "saved").expect("Saved document is a record");
    assert_eq!(file.require_str("fileversion").unwrap(), FILE_VERSION);
    assert_eq!(file.require_usize("primitivecount").unwrap(), 3);
    assert_eq!(
        file.get("info"),
        Some(&json!(["software", "hgeo tests", "date", "2026-01-01"]))
    );
    assert_eq!(file.require_array("primitives").unwrap().len(), 3);

    // Integer storage stays integral
    assert!(text.contains("[[24]]"));

    // Empty ordered group stays ordered
    assert!(text.contains(r#"["selection",["defaults",null,"ordered",[]]]"#));
}

#[test]
fn test_reload_is_identical() {
    let d = Detail::from_value(&compact_document()).expect("Failed to load document");
    let saved = d.to_value();
    let again = Detail::from_value(&saved).expect("Failed to reload saved document");

    assert_eq!(again, d);
    assert_eq!(again.to_value(), saved, "save must be idempotent");
}

#[test]
fn test_empty_document() {
    let doc = json!([
        "pointcount", 0, "vertexcount", 0, "primitivecount", 0,
        "topology", ["pointref", ["indices", []]],
        "primitives", []
    ]);
    let d = Detail::from_value(&doc).expect("Empty document should load");
    assert_eq!(d, Detail::new());
    assert_eq!(d.summary().primitive_count, 0);

    let saved = d.to_value();
    assert_eq!(
        saved,
        json!([
            "fileversion", "12.0.0",
            "pointcount", 0, "vertexcount", 0, "primitivecount", 0,
            "topology", ["pointref", ["indices", []]],
            "primitives", []
        ])
    );
}

#[test]
fn test_build_and_save() {
    let mut d = Detail::new();
    d.vertex_to_point = vec![0, 1, 2, 0, 2, 3];
    d.add_attribute(Attribute::numeric(
        "P",
        Domain::Point,
        3,
        Storage::Fpreal32,
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
    ));
    d.add_attribute(Attribute::string(
        "shop",
        Domain::Primitive,
        vec!["/mat/a".into()],
        vec![0, 0],
    ));
    d.primitives.push(Primitive::poly(vec![0, 1, 2]));
    d.primitives.push(Primitive::poly(vec![3, 4, 5]));
    d.add_group(ElementGroup::ordered("first", Domain::Primitive, vec![0], 2).unwrap());

    let again = Detail::from_value(&d.to_value()).expect("Built document should load");
    assert_eq!(again, d);
    assert_eq!(again.point_count(), 4);
    assert_eq!(again.primitive_attributes["shop"].strings_at(1), vec!["/mat/a"]);
}

#[test]
fn test_summary_lists_everything() {
    let d = Detail::from_value(&compact_document()).expect("Failed to load document");
    let s = d.summary();
    assert_eq!(s.primitive_kinds.get("Poly"), Some(&2));
    assert_eq!(s.primitive_kinds.get("Sphere"), Some(&1));
    assert_eq!(s.attributes.len(), 6);
    assert_eq!(s.groups.len(), 3);

    let text = s.to_string();
    println!("{}", text);
    assert!(text.contains("Primitives: 3"));
    assert!(text.contains("uv[2]"));
    assert!(text.contains("tris (2 members)"));
}
