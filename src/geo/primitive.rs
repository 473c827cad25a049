//! Geometric primitives.
//!
//! Each primitive is stored as `[["type", kind], data]`. Known kinds are
//! decoded through a closed registry; any other kind keeps its data block
//! verbatim so it survives a load/save cycle unchanged.
//!
//! A definition of type `"run"` packs many primitives of one `runtype`:
//! fields shared by the whole run sit in `uniformfields`, and each row of
//! the data block holds the values of `varyingfields`, in order. Runs are
//! expanded when loaded and never rebuilt on save.

use serde_json::Value;
use tracing::trace;

use crate::core::{as_index, Record, RecordBuilder};
use crate::util::{FormatError, Result};

use super::basis::Basis;
use super::detail::{Detail, LoadContext};

/// 3x3 transform, stored row by row.
pub type Transform = [f64; 9];

/// Primitive kind tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Poly,
    Mesh,
    MetaBall,
    MetaSQuad,
    Circle,
    Sphere,
    Tube,
    BezierCurve,
    NurbCurve,
    BezierMesh,
    NurbMesh,
    Particle,
    Volume,
    /// Kind this crate does not interpret; data is passed through.
    Opaque(String),
}

/// Loader signature of the registry.
type LoadFn = fn(PrimitiveKind, &Record<'_>, &mut LoadContext) -> Result<Primitive>;

impl PrimitiveKind {
    /// Parse a kind tag. Unknown tags become [`PrimitiveKind::Opaque`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "Poly" => Self::Poly,
            "Mesh" => Self::Mesh,
            "MetaBall" => Self::MetaBall,
            "MetaSQuad" => Self::MetaSQuad,
            "Circle" => Self::Circle,
            "Sphere" => Self::Sphere,
            "Tube" => Self::Tube,
            "BezierCurve" => Self::BezierCurve,
            "NURBCurve" => Self::NurbCurve,
            "BezierMesh" => Self::BezierMesh,
            "NURBMesh" => Self::NurbMesh,
            "Part" => Self::Particle,
            "Volume" => Self::Volume,
            other => Self::Opaque(other.to_string()),
        }
    }

    /// Tag as written in documents.
    pub fn name(&self) -> &str {
        match self {
            Self::Poly => "Poly",
            Self::Mesh => "Mesh",
            Self::MetaBall => "MetaBall",
            Self::MetaSQuad => "MetaSQuad",
            Self::Circle => "Circle",
            Self::Sphere => "Sphere",
            Self::Tube => "Tube",
            Self::BezierCurve => "BezierCurve",
            Self::NurbCurve => "NURBCurve",
            Self::BezierMesh => "BezierMesh",
            Self::NurbMesh => "NURBMesh",
            Self::Particle => "Part",
            Self::Volume => "Volume",
            Self::Opaque(name) => name,
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque(_))
    }

    fn loader(&self) -> Option<LoadFn> {
        let f: LoadFn = match self {
            Self::Poly => load_poly,
            Self::Mesh => load_mesh,
            Self::MetaBall => load_metaball,
            Self::MetaSQuad => load_metasquad,
            Self::Circle | Self::Sphere => load_quadric,
            Self::Tube => load_tube,
            Self::BezierCurve | Self::NurbCurve => load_spline_curve,
            Self::BezierMesh | Self::NurbMesh => load_spline_mesh,
            Self::Particle => load_particle,
            Self::Volume => load_volume,
            Self::Opaque(_) => return None,
        };
        Some(f)
    }
}

/// Kind-specific payload.
#[derive(Clone, Debug, PartialEq)]
pub enum PrimitiveData {
    /// Polygon face.
    Poly { closed: bool },
    /// Polygon mesh grid.
    Mesh {
        surface: String,
        u_wrap: bool,
        v_wrap: bool,
    },
    MetaBall {
        transform: Transform,
        kernel: String,
        weight: f64,
    },
    MetaSQuad {
        transform: Transform,
        kernel: String,
        weight: f64,
        xy_exponent: f64,
        z_exponent: f64,
    },
    /// Circle or sphere.
    Quadric { transform: Transform },
    Tube {
        transform: Transform,
        caps: bool,
        taper: f64,
    },
    SplineCurve { closed: bool, basis: Basis },
    SplineMesh {
        surface: String,
        u_wrap: bool,
        v_wrap: bool,
        u_basis: Basis,
        v_basis: Basis,
        /// Profile curves, a nested document.
        profiles: Option<Box<Detail>>,
    },
    Particle { render_properties: Value },
    Volume {
        transform: Transform,
        resolution: [usize; 3],
        border: Value,
        compression: Value,
        voxels: Value,
    },
    /// Data block of an unknown kind, kept verbatim.
    Opaque(Value),
}

/// A geometric primitive referencing vertices by offset.
#[derive(Clone, Debug, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub vertices: Vec<usize>,
    pub data: PrimitiveData,
}

impl Primitive {
    pub fn new(kind: PrimitiveKind, vertices: Vec<usize>, data: PrimitiveData) -> Self {
        Self {
            kind,
            vertices,
            data,
        }
    }

    /// Closed polygon over the given vertices.
    pub fn poly(vertices: Vec<usize>) -> Self {
        Self::new(PrimitiveKind::Poly, vertices, PrimitiveData::Poly { closed: true })
    }

    pub fn kind(&self) -> &PrimitiveKind {
        &self.kind
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex offset of the `index`-th vertex.
    pub fn vertex_offset(&self, index: usize) -> Option<usize> {
        self.vertices.get(index).copied()
    }

    /// Load one `[definition, data]` primitive entry.
    ///
    /// A run definition expands to one primitive per data row.
    pub(crate) fn load_entry(
        definition: &Value,
        data: &Value,
        ctx: &mut LoadContext,
    ) -> Result<Vec<Primitive>> {
        let pdef = Record::from_value(definition, "primitive definition")?;
        let ptype = pdef.require_str("type")?;
        if ptype == "run" {
            return load_run(&pdef, data, ctx);
        }
        Ok(vec![Self::load_block(PrimitiveKind::from_name(ptype), data, ctx)?])
    }

    fn load_block(kind: PrimitiveKind, data: &Value, ctx: &mut LoadContext) -> Result<Primitive> {
        match kind.loader() {
            Some(load) => {
                let fields = Record::from_value(data, kind.name())?;
                load(kind.clone(), &fields, ctx)
            }
            None => {
                trace!(kind = kind.name(), "Passing through unknown primitive");
                Ok(Self::new(kind, Vec::new(), PrimitiveData::Opaque(data.clone())))
            }
        }
    }

    /// Emit `[["type", kind], data]`.
    pub fn save(&self) -> Value {
        let header = RecordBuilder::new().field("type", self.kind.name()).build();
        Value::Array(vec![header, self.save_data()])
    }

    fn save_data(&self) -> Value {
        let first_vertex = || Value::from(self.vertices.first().copied().unwrap_or(0));
        match &self.data {
            PrimitiveData::Opaque(block) => block.clone(),
            PrimitiveData::Poly { closed } => RecordBuilder::new()
                .field("vertex", self.vertices.clone())
                .field("closed", *closed)
                .build(),
            PrimitiveData::Mesh {
                surface,
                u_wrap,
                v_wrap,
            } => RecordBuilder::new()
                .field("vertex", self.vertices.clone())
                .field("surface", surface.as_str())
                .field("uwrap", *u_wrap)
                .field("vwrap", *v_wrap)
                .build(),
            PrimitiveData::MetaBall {
                transform,
                kernel,
                weight,
            } => RecordBuilder::new()
                .field("vertex", first_vertex())
                .field("transform", transform.to_vec())
                .field("metakernel", kernel.as_str())
                .field("metaweight", *weight)
                .build(),
            PrimitiveData::MetaSQuad {
                transform,
                kernel,
                weight,
                xy_exponent,
                z_exponent,
            } => RecordBuilder::new()
                .field("vertex", first_vertex())
                .field("transform", transform.to_vec())
                .field("metakernel", kernel.as_str())
                .field("metaweight", *weight)
                .field("xy-exponent", *xy_exponent)
                .field("z-exponent", *z_exponent)
                .build(),
            PrimitiveData::Quadric { transform } => RecordBuilder::new()
                .field("vertex", first_vertex())
                .field("transform", transform.to_vec())
                .build(),
            PrimitiveData::Tube {
                transform,
                caps,
                taper,
            } => RecordBuilder::new()
                .field("vertex", first_vertex())
                .field("transform", transform.to_vec())
                .field("caps", *caps)
                .field("taper", *taper)
                .build(),
            PrimitiveData::SplineCurve { closed, basis } => RecordBuilder::new()
                .field("vertex", self.vertices.clone())
                .field("closed", *closed)
                .field("basis", basis.save())
                .build(),
            PrimitiveData::SplineMesh {
                surface,
                u_wrap,
                v_wrap,
                u_basis,
                v_basis,
                profiles,
            } => RecordBuilder::new()
                .field("vertex", self.vertices.clone())
                .field("surface", surface.as_str())
                .field("uwrap", *u_wrap)
                .field("vwrap", *v_wrap)
                .field("ubasis", u_basis.save())
                .field("vbasis", v_basis.save())
                .field_opt("profiles", profiles.as_ref().map(|p| p.to_value()))
                .build(),
            PrimitiveData::Particle { render_properties } => RecordBuilder::new()
                .field("vertex", self.vertices.clone())
                .field("renderproperties", render_properties.clone())
                .build(),
            PrimitiveData::Volume {
                transform,
                resolution,
                border,
                compression,
                voxels,
            } => RecordBuilder::new()
                .field("vertex", first_vertex())
                .field("transform", transform.to_vec())
                .field("res", resolution.to_vec())
                .field("border", border.clone())
                .field("compression", compression.clone())
                .field("voxels", voxels.clone())
                .build(),
        }
    }
}

/// Expand a run of primitives.
fn load_run(pdef: &Record<'_>, data: &Value, ctx: &mut LoadContext) -> Result<Vec<Primitive>> {
    let runtype = pdef.require_str("runtype")?;
    let varying = pdef
        .require_array("varyingfields")?
        .iter()
        .map(Value::as_str)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| FormatError::wrong_type("run", "varyingfields", "array of strings"))?;
    let uniform = match pdef.get("uniformfields") {
        Some(v) => Record::from_value(v, runtype)?,
        None => Record::empty(runtype),
    };
    let rows = data
        .as_array()
        .ok_or_else(|| FormatError::wrong_type("run", "data", "array of rows"))?;

    let kind = PrimitiveKind::from_name(runtype);
    let mut prims = Vec::with_capacity(rows.len());
    for row in rows {
        let values = row
            .as_array()
            .ok_or_else(|| FormatError::wrong_type("run", "row", "array"))?;
        if values.len() != varying.len() {
            return Err(FormatError::ElementCount {
                context: format!("{} run row", runtype),
                expected: varying.len(),
                actual: values.len(),
            }
            .into());
        }
        let mut fields = uniform.clone();
        for (name, value) in varying.iter().zip(values) {
            fields.set(name, value);
        }
        let prim = match kind.loader() {
            Some(load) => load(kind.clone(), &fields, ctx)?,
            None => Primitive::new(
                kind.clone(),
                Vec::new(),
                PrimitiveData::Opaque(fields.to_value()),
            ),
        };
        prims.push(prim);
    }
    trace!(runtype, count = prims.len(), "Expanded primitive run");
    Ok(prims)
}

fn vertex_list(rec: &Record<'_>) -> Result<Vec<usize>> {
    rec.require_indices("vertex")
}

/// Kinds with one vertex store it as a scalar.
fn single_vertex(rec: &Record<'_>) -> Result<Vec<usize>> {
    let v = rec.require("vertex")?;
    if let Some(i) = as_index(v) {
        return Ok(vec![i]);
    }
    let one = match v.as_array().map(Vec::as_slice) {
        Some([one]) => as_index(one),
        _ => None,
    };
    one.map(|i| vec![i])
        .ok_or_else(|| FormatError::wrong_type(rec.context(), "vertex", "vertex offset").into())
}

fn transform(rec: &Record<'_>) -> Result<Transform> {
    let wrong = || FormatError::wrong_type(rec.context(), "transform", "3x3 matrix");
    let v = rec.require("transform")?;
    let items = v.as_array().ok_or_else(wrong)?;
    // Accept both the flat form and rows of three.
    let flat: Vec<f64> = if items.iter().all(Value::is_array) {
        items
            .iter()
            .flat_map(|row| row.as_array().into_iter().flatten())
            .map(Value::as_f64)
            .collect::<Option<_>>()
            .ok_or_else(wrong)?
    } else {
        items
            .iter()
            .map(Value::as_f64)
            .collect::<Option<_>>()
            .ok_or_else(wrong)?
    };
    <Transform>::try_from(flat.as_slice()).map_err(|_| wrong().into())
}

fn load_poly(kind: PrimitiveKind, rec: &Record<'_>, _: &mut LoadContext) -> Result<Primitive> {
    let closed = rec.bool("closed")?.unwrap_or(true);
    Ok(Primitive::new(kind, vertex_list(rec)?, PrimitiveData::Poly { closed }))
}

fn load_mesh(kind: PrimitiveKind, rec: &Record<'_>, _: &mut LoadContext) -> Result<Primitive> {
    let data = PrimitiveData::Mesh {
        surface: rec.require_str("surface")?.to_string(),
        u_wrap: rec.require_bool("uwrap")?,
        v_wrap: rec.require_bool("vwrap")?,
    };
    Ok(Primitive::new(kind, vertex_list(rec)?, data))
}

fn load_metaball(kind: PrimitiveKind, rec: &Record<'_>, _: &mut LoadContext) -> Result<Primitive> {
    let data = PrimitiveData::MetaBall {
        transform: transform(rec)?,
        kernel: rec.require_str("metakernel")?.to_string(),
        weight: rec.require_f64("metaweight")?,
    };
    Ok(Primitive::new(kind, single_vertex(rec)?, data))
}

fn load_metasquad(kind: PrimitiveKind, rec: &Record<'_>, _: &mut LoadContext) -> Result<Primitive> {
    let data = PrimitiveData::MetaSQuad {
        transform: transform(rec)?,
        kernel: rec.require_str("metakernel")?.to_string(),
        weight: rec.require_f64("metaweight")?,
        xy_exponent: rec.require_f64("xy-exponent")?,
        z_exponent: rec.require_f64("z-exponent")?,
    };
    Ok(Primitive::new(kind, single_vertex(rec)?, data))
}

fn load_quadric(kind: PrimitiveKind, rec: &Record<'_>, _: &mut LoadContext) -> Result<Primitive> {
    let data = PrimitiveData::Quadric {
        transform: transform(rec)?,
    };
    Ok(Primitive::new(kind, single_vertex(rec)?, data))
}

fn load_tube(kind: PrimitiveKind, rec: &Record<'_>, _: &mut LoadContext) -> Result<Primitive> {
    let data = PrimitiveData::Tube {
        transform: transform(rec)?,
        caps: rec.bool("caps")?.unwrap_or(false),
        taper: rec.f64("taper")?.unwrap_or(1.0),
    };
    Ok(Primitive::new(kind, single_vertex(rec)?, data))
}

fn load_spline_curve(kind: PrimitiveKind, rec: &Record<'_>, _: &mut LoadContext) -> Result<Primitive> {
    let data = PrimitiveData::SplineCurve {
        closed: rec.require_bool("closed")?,
        basis: Basis::load(rec.require("basis")?)?,
    };
    Ok(Primitive::new(kind, vertex_list(rec)?, data))
}

fn load_spline_mesh(kind: PrimitiveKind, rec: &Record<'_>, ctx: &mut LoadContext) -> Result<Primitive> {
    let profiles = match rec.get("profiles") {
        Some(Value::Null) | None => None,
        Some(doc) => Some(Box::new(Detail::load_nested(doc, ctx)?)),
    };
    let data = PrimitiveData::SplineMesh {
        surface: rec.require_str("surface")?.to_string(),
        u_wrap: rec.require_bool("uwrap")?,
        v_wrap: rec.require_bool("vwrap")?,
        u_basis: Basis::load(rec.require("ubasis")?)?,
        v_basis: Basis::load(rec.require("vbasis")?)?,
        profiles,
    };
    Ok(Primitive::new(kind, vertex_list(rec)?, data))
}

fn load_particle(kind: PrimitiveKind, rec: &Record<'_>, _: &mut LoadContext) -> Result<Primitive> {
    let render_properties = rec
        .get("renderproperties")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    Ok(Primitive::new(
        kind,
        vertex_list(rec)?,
        PrimitiveData::Particle { render_properties },
    ))
}

fn load_volume(kind: PrimitiveKind, rec: &Record<'_>, _: &mut LoadContext) -> Result<Primitive> {
    let res = rec.require_indices("res")?;
    let resolution = match res.as_slice() {
        &[x, y, z] => [x, y, z],
        _ => return Err(FormatError::wrong_type(rec.context(), "res", "3 voxel counts").into()),
    };
    let data = PrimitiveData::Volume {
        transform: transform(rec)?,
        resolution,
        border: rec.require("border")?.clone(),
        compression: rec.require("compression")?.clone(),
        voxels: rec.require("voxels")?.clone(),
    };
    Ok(Primitive::new(kind, single_vertex(rec)?, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::detail::LoadOptions;
    use serde_json::json;

    fn load(def: Value, data: Value) -> Result<Vec<Primitive>> {
        let opts = LoadOptions::default();
        let mut ctx = LoadContext::new(&opts);
        Primitive::load_entry(&def, &data, &mut ctx)
    }

    const IDENTITY: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

    #[test]
    fn test_kind_names() {
        for name in ["Poly", "NURBCurve", "Part", "Volume", "BezierMesh"] {
            assert_eq!(PrimitiveKind::from_name(name).name(), name);
        }
        assert!(PrimitiveKind::from_name("TriFan").is_opaque());
    }

    #[test]
    fn test_poly_defaults_closed() {
        let prims = load(json!(["type", "Poly"]), json!(["vertex", [0, 1, 2]])).unwrap();
        assert_eq!(prims, vec![Primitive::poly(vec![0, 1, 2])]);
        assert_eq!(prims[0].vertex_offset(2), Some(2));
    }

    #[test]
    fn test_missing_required_field() {
        let err = load(json!(["type", "Mesh"]), json!(["vertex", [0], "uwrap", false])).unwrap_err();
        assert!(matches!(err.as_format(), Some(FormatError::MissingField { .. })));
    }

    #[test]
    fn test_tube_defaults() {
        let prims = load(
            json!(["type", "Tube"]),
            json!(["vertex", 4, "transform", IDENTITY]),
        )
        .unwrap();
        assert_eq!(prims[0].vertices, vec![4]);
        assert_eq!(
            prims[0].data,
            PrimitiveData::Tube {
                transform: IDENTITY,
                caps: false,
                taper: 1.0
            }
        );
    }

    #[test]
    fn test_quadric_nested_transform_and_save() {
        let prims = load(
            json!(["type", "Sphere"]),
            json!(["vertex", 0, "transform", [[1, 0, 0], [0, 1, 0], [0, 0, 1]]]),
        )
        .unwrap();
        assert_eq!(prims[0].kind, PrimitiveKind::Sphere);
        assert_eq!(
            prims[0].save(),
            json!([["type", "Sphere"], ["vertex", 0, "transform", IDENTITY]])
        );

        // Rows come back flat, but the transform itself is unchanged.
        let saved = prims[0].save();
        let again = load(saved[0].clone(), saved[1].clone()).unwrap();
        assert_eq!(again, prims);
    }

    #[test]
    fn test_bad_transform() {
        let err = load(json!(["type", "Circle"]), json!(["vertex", 0, "transform", [1, 2]])).unwrap_err();
        assert!(matches!(err.as_format(), Some(FormatError::WrongType { .. })));
    }

    #[test]
    fn test_run_expansion() {
        let prims = load(
            json!(["type", "run", "runtype", "Poly",
                "varyingfields", ["vertex"],
                "uniformfields", ["closed", false]]),
            json!([[[0, 1, 2]], [[2, 3, 0]]]),
        )
        .unwrap();
        assert_eq!(prims.len(), 2);
        assert_eq!(prims[1].vertices, vec![2, 3, 0]);
        assert!(prims.iter().all(|p| p.data == PrimitiveData::Poly { closed: false }));
        // Runs are written back one primitive at a time.
        assert_eq!(
            prims[0].save(),
            json!([["type", "Poly"], ["vertex", [0, 1, 2], "closed", false]])
        );
    }

    #[test]
    fn test_run_row_width_mismatch() {
        let err = load(
            json!(["type", "run", "runtype", "Poly", "varyingfields", ["vertex", "closed"]]),
            json!([[[0, 1, 2]]]),
        )
        .unwrap_err();
        assert!(matches!(err.as_format(), Some(FormatError::ElementCount { .. })));
    }

    #[test]
    fn test_unknown_kind_round_trips() {
        let data = json!({"x": 1});
        let prims = load(json!(["type", "Foo"]), data.clone()).unwrap();
        assert_eq!(prims[0].kind, PrimitiveKind::Opaque("Foo".into()));
        assert!(prims[0].vertices.is_empty());
        assert_eq!(prims[0].save(), json!([["type", "Foo"], {"x": 1}]));
    }

    #[test]
    fn test_spline_curve() {
        let prims = load(
            json!(["type", "NURBCurve"]),
            json!(["vertex", [0, 1, 2, 3], "closed", false,
                "basis", ["type", "NURBS", "order", 4, "knots", [0, 0, 0, 0, 1, 1, 1, 1]]]),
        )
        .unwrap();
        match &prims[0].data {
            PrimitiveData::SplineCurve { closed, basis } => {
                assert!(!closed);
                assert_eq!(basis.order, 4);
                assert_eq!(basis.knots.len(), 8);
            }
            other => panic!("unexpected data {:?}", other),
        }
    }

    #[test]
    fn test_particle_and_volume() {
        let prims = load(json!(["type", "Part"]), json!(["vertex", [0, 1]])).unwrap();
        assert_eq!(
            prims[0].data,
            PrimitiveData::Particle { render_properties: json!({}) }
        );

        let prims = load(
            json!(["type", "Volume"]),
            json!(["vertex", 0, "transform", IDENTITY, "res", [2, 2, 1],
                "border", ["type", "constant"], "compression", ["tolerance", 0],
                "voxels", ["tiles", []]]),
        )
        .unwrap();
        match &prims[0].data {
            PrimitiveData::Volume { resolution, .. } => assert_eq!(resolution, &[2, 2, 1]),
            other => panic!("unexpected data {:?}", other),
        }
        let saved = prims[0].save();
        let again = load(saved[0].clone(), saved[1].clone()).unwrap();
        assert_eq!(again, prims);
    }
}
