//! Spline bases and profile-curve trim regions.

use serde_json::Value;

use crate::core::{Record, RecordBuilder};
use crate::util::{FormatError, Result};

/// Basis type of a spline direction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BasisType {
    /// Non-uniform rational B-spline
    #[default]
    Nurbs,
    /// Bezier
    Bezier,
    /// Any other basis name, kept verbatim
    Other(String),
}

impl BasisType {
    /// Parse from the stored name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "NURBS" => Self::Nurbs,
            "Bezier" => Self::Bezier,
            other => Self::Other(other.to_string()),
        }
    }

    /// Stored name.
    pub fn name(&self) -> &str {
        match self {
            Self::Nurbs => "NURBS",
            Self::Bezier => "Bezier",
            Self::Other(name) => name,
        }
    }
}

/// Spline basis for one surface or curve direction.
#[derive(Clone, Debug, PartialEq)]
pub struct Basis {
    pub basis_type: BasisType,
    pub order: u32,
    pub end_interpolation: bool,
    pub knots: Vec<f64>,
}

impl Default for Basis {
    fn default() -> Self {
        Self {
            basis_type: BasisType::Nurbs,
            order: 2,
            end_interpolation: true,
            knots: vec![0.0, 0.0, 1.0, 1.0],
        }
    }
}

impl Basis {
    /// Load a basis block. Absent fields keep their defaults.
    pub fn load(value: &Value) -> Result<Self> {
        let rec = Record::from_value(value, "basis")?;
        let mut basis = Self::default();
        if let Some(t) = rec.str("type")? {
            basis.basis_type = BasisType::from_name(t);
        }
        if let Some(order) = rec.usize("order")? {
            basis.order = u32::try_from(order)
                .map_err(|_| FormatError::wrong_type("basis", "order", "32-bit order"))?;
        }
        if let Some(end) = rec.bool("endinterpolation")? {
            basis.end_interpolation = end;
        }
        if let Some(knots) = rec.numbers("knots")? {
            basis.knots = knots;
        }
        Ok(basis)
    }

    pub fn save(&self) -> Value {
        RecordBuilder::new()
            .field("type", self.basis_type.name())
            .field("order", self.order)
            .field("endinterpolation", self.end_interpolation)
            .field("knots", self.knots.clone())
            .build()
    }
}

/// One face span of a trim region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrimFace {
    pub face: usize,
    pub u0: f64,
    pub u1: f64,
}

/// A trim region of a profile curve: a list of faces with parameter extents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrimRegion {
    pub open_casual: bool,
    pub faces: Vec<TrimFace>,
}

impl TrimRegion {
    pub fn load(value: &Value) -> Result<Self> {
        let rec = Record::from_value(value, "trimregion")?;
        let open_casual = rec.require_bool("opencasual")?;
        let faces = rec
            .require_array("faces")?
            .iter()
            .map(|face| {
                let f = Record::from_value(face, "trimregion face")?;
                Ok(TrimFace {
                    face: f.require_usize("face")?,
                    u0: f.require_f64("u0")?,
                    u1: f.require_f64("u1")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { open_casual, faces })
    }

    pub fn save(&self) -> Value {
        let faces: Vec<Value> = self
            .faces
            .iter()
            .map(|f| {
                RecordBuilder::new()
                    .field("face", f.face)
                    .field("u0", f.u0)
                    .field("u1", f.u1)
                    .build()
            })
            .collect();
        RecordBuilder::new()
            .field("opencasual", self.open_casual)
            .field("faces", faces)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basis_defaults() {
        let b = Basis::load(&json!([])).unwrap();
        assert_eq!(b, Basis::default());
        assert_eq!(b.knots, vec![0.0, 0.0, 1.0, 1.0]);
        assert_eq!(b.order, 2);
        assert!(b.end_interpolation);
    }

    #[test]
    fn test_basis_fields() {
        let b = Basis::load(&json!([
            "type", "Bezier", "order", 4, "endinterpolation", false,
            "knots", [0, 1, 2]
        ]))
        .unwrap();
        assert_eq!(b.basis_type, BasisType::Bezier);
        assert_eq!(b.order, 4);
        assert!(!b.end_interpolation);
        assert_eq!(Basis::load(&b.save()).unwrap(), b);
    }

    #[test]
    fn test_trim_region() {
        let v = json!([
            "opencasual", true,
            "faces", [["face", 2, "u0", 0.25, "u1", 0.75]]
        ]);
        let t = TrimRegion::load(&v).unwrap();
        assert!(t.open_casual);
        assert_eq!(t.faces, vec![TrimFace { face: 2, u0: 0.25, u1: 0.75 }]);
        assert_eq!(TrimRegion::load(&t.save()).unwrap(), t);
    }

    #[test]
    fn test_trim_region_requires_faces() {
        let err = TrimRegion::load(&json!(["opencasual", false])).unwrap_err();
        assert!(err.is_format());
    }
}
