//! Human-readable document report.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::Domain;

use super::detail::Detail;

/// One attribute line of a summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeInfo {
    pub domain: Domain,
    pub name: String,
    pub type_name: String,
    pub tuple_size: usize,
}

/// One group line of a summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupInfo {
    pub domain: Domain,
    pub name: String,
    pub ordered: bool,
    pub members: usize,
}

/// Counts and listings of a [`Detail`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetailSummary {
    pub point_count: usize,
    pub vertex_count: usize,
    pub primitive_count: usize,
    pub attributes: Vec<AttributeInfo>,
    pub groups: Vec<GroupInfo>,
    /// Primitive count per kind name.
    pub primitive_kinds: BTreeMap<String, usize>,
}

impl Detail {
    /// Collect counts, attribute and group listings, and the primitive mix.
    pub fn summary(&self) -> DetailSummary {
        let mut summary = DetailSummary {
            point_count: self.point_count(),
            vertex_count: self.vertex_count(),
            primitive_count: self.primitive_count(),
            ..Default::default()
        };

        for domain in Domain::ALL {
            for attr in self.attributes(domain).values() {
                summary.attributes.push(AttributeInfo {
                    domain,
                    name: attr.name.clone(),
                    type_name: attr.type_name().to_string(),
                    tuple_size: attr.tuple_size,
                });
            }
            let Some(groups) = self.groups(domain) else {
                continue;
            };
            for group in groups.values() {
                summary.groups.push(GroupInfo {
                    domain,
                    name: group.name.clone(),
                    ordered: group.is_ordered(),
                    members: group.count(),
                });
            }
        }

        for prim in &self.primitives {
            *summary
                .primitive_kinds
                .entry(prim.kind.name().to_string())
                .or_default() += 1;
        }
        summary
    }
}

impl fmt::Display for DetailSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Points:     {}", self.point_count)?;
        writeln!(f, "Vertices:   {}", self.vertex_count)?;
        writeln!(f, "Primitives: {}", self.primitive_count)?;
        for (kind, n) in &self.primitive_kinds {
            writeln!(f, "  {:<12} {}", kind, n)?;
        }
        if !self.attributes.is_empty() {
            writeln!(f, "Attributes:")?;
            for a in &self.attributes {
                writeln!(
                    f,
                    "  {:<9} {:<8} {}[{}]",
                    a.domain, a.type_name, a.name, a.tuple_size
                )?;
            }
        }
        if !self.groups.is_empty() {
            writeln!(f, "Groups:")?;
            for g in &self.groups {
                let style = if g.ordered { "ordered" } else { "unordered" };
                writeln!(
                    f,
                    "  {:<9} {:<9} {} ({} members)",
                    g.domain, style, g.name, g.members
                )?;
            }
        }
        Ok(())
    }
}
