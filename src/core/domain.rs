//! Element domains.

use std::fmt;

/// Element space an attribute or group is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    /// Per-point.
    Point,
    /// Per-vertex.
    Vertex,
    /// Per-primitive.
    Primitive,
    /// One value for the whole document.
    Global,
}

impl Domain {
    /// All domains, in save order of their attribute lists.
    pub const ALL: [Domain; 4] = [
        Domain::Vertex,
        Domain::Point,
        Domain::Primitive,
        Domain::Global,
    ];

    /// Domains that can carry element groups.
    pub const GROUPED: [Domain; 3] = [Domain::Point, Domain::Vertex, Domain::Primitive];

    /// Parse from a group type string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "point" => Some(Self::Point),
            "vertex" => Some(Self::Vertex),
            "primitive" => Some(Self::Primitive),
            "global" | "detail" => Some(Self::Global),
            _ => None,
        }
    }

    /// Short name, as written in group definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Vertex => "vertex",
            Self::Primitive => "primitive",
            Self::Global => "global",
        }
    }

    /// Key of this domain's attribute list in the `attributes` block.
    pub fn attributes_key(&self) -> &'static str {
        match self {
            Self::Point => "pointattributes",
            Self::Vertex => "vertexattributes",
            Self::Primitive => "primitiveattributes",
            Self::Global => "globalattributes",
        }
    }

    /// Top-level key of this domain's group list. Global has no groups.
    pub fn groups_key(&self) -> Option<&'static str> {
        match self {
            Self::Point => Some("pointgroups"),
            Self::Vertex => Some("vertexgroups"),
            Self::Primitive => Some("primitivegroups"),
            Self::Global => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
