//! The geometry document.
//!
//! A [`Detail`] holds everything one document describes: the vertex -> point
//! map, attributes for each domain, the primitive list, element groups, and
//! for profile curves the 2D extensions (altitude, trim regions).
//!
//! Loading walks topology, attributes, primitives, groups, then extensions.
//! Saving writes the same structure back with counts taken from live data.

use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, debug_span, trace};

use crate::core::{Domain, Record, RecordBuilder};
use crate::util::{FormatError, Result};

use super::attribute::{AttribValue, Attribute, SemanticType};
use super::basis::TrimRegion;
use super::group::ElementGroup;
use super::primitive::Primitive;

/// File version written on save.
pub const FILE_VERSION: &str = "12.0.0";

/// Default limit on nested profile documents.
pub const MAX_NESTING_DEPTH: usize = 16;

/// Attributes of one domain, by name.
pub type AttributeMap = BTreeMap<String, Attribute>;

/// Groups of one domain, by name.
pub type GroupMap = BTreeMap<String, ElementGroup>;

/// Options for loading a document.
#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
    /// Maximum nesting of profile documents inside spline meshes.
    pub max_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

/// State of one load call: options, nesting depth, and lap timing.
#[derive(Debug)]
pub(crate) struct LoadContext {
    options: LoadOptions,
    depth: usize,
    started: Instant,
    lap: Instant,
}

impl LoadContext {
    pub(crate) fn new(options: &LoadOptions) -> Self {
        let now = Instant::now();
        Self {
            options: *options,
            depth: 0,
            started: now,
            lap: now,
        }
    }

    /// Log a progress step with total and lap time.
    fn lap(&mut self, step: &str) {
        let now = Instant::now();
        debug!(
            depth = self.depth,
            total_ms = now.duration_since(self.started).as_secs_f64() * 1e3,
            lap_ms = now.duration_since(self.lap).as_secs_f64() * 1e3,
            "Loaded {}",
            step
        );
        self.lap = now;
    }
}

/// A complete geometry document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detail {
    pub point_attributes: AttributeMap,
    pub vertex_attributes: AttributeMap,
    pub primitive_attributes: AttributeMap,
    pub global_attributes: AttributeMap,
    /// Point offset of each vertex.
    pub vertex_to_point: Vec<usize>,
    pub primitives: Vec<Primitive>,
    pub point_groups: GroupMap,
    pub vertex_groups: GroupMap,
    pub primitive_groups: GroupMap,
    /// Profile-curve altitude, passed through.
    pub altitude: Option<Value>,
    pub trim_regions: Option<Vec<TrimRegion>>,
    /// Document metadata, passed through unexamined.
    pub info: Option<Value>,
}

impl Detail {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Counts and queries
    // ========================================================================

    /// Number of points: the length of `"P"`, else of any point attribute,
    /// else the widest of the point group masks and the referenced points.
    pub fn point_count(&self) -> usize {
        if let Some(p) = self.point_attributes.get("P") {
            return p.len();
        }
        if let Some(a) = self
            .point_attributes
            .values()
            .find(|a| a.semantic_type() != SemanticType::Opaque)
        {
            return a.len();
        }
        let referenced = self.vertex_to_point.iter().max().map_or(0, |&m| m + 1);
        self.point_groups
            .values()
            .map(|g| g.selection.len())
            .fold(referenced, usize::max)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_to_point.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Element count of a domain. Global is always 1.
    pub fn element_count(&self, domain: Domain) -> usize {
        match domain {
            Domain::Point => self.point_count(),
            Domain::Vertex => self.vertex_count(),
            Domain::Primitive => self.primitive_count(),
            Domain::Global => 1,
        }
    }

    /// Point referenced by a vertex.
    pub fn vertex_point(&self, vertex: usize) -> Option<usize> {
        self.vertex_to_point.get(vertex).copied()
    }

    /// Position of a point, from the `"P"` attribute.
    pub fn point_position(&self, point: usize) -> Option<glam::DVec3> {
        match self.point_attributes.get("P")?.get_value(point)? {
            AttribValue::Numeric(&[x, y, z, ..]) => Some(glam::DVec3::new(x, y, z)),
            _ => None,
        }
    }

    pub fn attributes(&self, domain: Domain) -> &AttributeMap {
        match domain {
            Domain::Point => &self.point_attributes,
            Domain::Vertex => &self.vertex_attributes,
            Domain::Primitive => &self.primitive_attributes,
            Domain::Global => &self.global_attributes,
        }
    }

    pub fn attributes_mut(&mut self, domain: Domain) -> &mut AttributeMap {
        match domain {
            Domain::Point => &mut self.point_attributes,
            Domain::Vertex => &mut self.vertex_attributes,
            Domain::Primitive => &mut self.primitive_attributes,
            Domain::Global => &mut self.global_attributes,
        }
    }

    /// Groups of a domain. Global has none.
    pub fn groups(&self, domain: Domain) -> Option<&GroupMap> {
        match domain {
            Domain::Point => Some(&self.point_groups),
            Domain::Vertex => Some(&self.vertex_groups),
            Domain::Primitive => Some(&self.primitive_groups),
            Domain::Global => None,
        }
    }

    fn groups_mut(&mut self, domain: Domain) -> Option<&mut GroupMap> {
        match domain {
            Domain::Point => Some(&mut self.point_groups),
            Domain::Vertex => Some(&mut self.vertex_groups),
            Domain::Primitive => Some(&mut self.primitive_groups),
            Domain::Global => None,
        }
    }

    /// Insert an attribute into its domain, replacing any of the same name.
    pub fn add_attribute(&mut self, attribute: Attribute) -> Option<Attribute> {
        let domain = attribute.domain;
        self.attributes_mut(domain)
            .insert(attribute.name.clone(), attribute)
    }

    /// Insert a group into its domain, replacing any of the same name.
    pub fn add_group(&mut self, group: ElementGroup) -> Option<ElementGroup> {
        let map = self.groups_mut(group.domain)?;
        map.insert(group.name.clone(), group)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load a document with default options.
    pub fn from_value(doc: &Value) -> Result<Self> {
        Self::from_value_with(doc, &LoadOptions::default())
    }

    /// Load a document.
    ///
    /// Any structural error aborts the whole load, nested documents included.
    pub fn from_value_with(doc: &Value, options: &LoadOptions) -> Result<Self> {
        let mut ctx = LoadContext::new(options);
        Self::load_nested(doc, &mut ctx)
    }

    /// Load a document one nesting level below the current one.
    pub(crate) fn load_nested(doc: &Value, ctx: &mut LoadContext) -> Result<Self> {
        if ctx.depth >= ctx.options.max_depth {
            return Err(FormatError::NestingTooDeep(ctx.options.max_depth).into());
        }
        ctx.depth += 1;
        let result = {
            let _span = debug_span!("load_detail", depth = ctx.depth).entered();
            Self::load(doc, ctx)
        };
        ctx.depth -= 1;
        result
    }

    fn load(doc: &Value, ctx: &mut LoadContext) -> Result<Self> {
        let file = Record::from_value(doc, "document")?;
        let mut detail = Self::new();

        detail.info = file.get("info").cloned();

        detail.load_topology(file.require("topology")?)?;
        ctx.lap("topology");

        let point_count = file.require_usize("pointcount")?;
        let vertex_count = file.require_usize("vertexcount")?;
        let primitive_count = file.require_usize("primitivecount")?;

        if vertex_count != detail.vertex_count() {
            return Err(FormatError::ElementCount {
                context: "topology".to_string(),
                expected: vertex_count,
                actual: detail.vertex_count(),
            }
            .into());
        }
        if let Some(pos) = detail.vertex_to_point.iter().position(|&p| p >= point_count) {
            return Err(FormatError::IndexOutOfRange {
                context: format!("topology vertex {}", pos),
                index: detail.vertex_to_point[pos] as i64,
                count: point_count,
            }
            .into());
        }

        let declared = |domain: Domain| match domain {
            Domain::Point => point_count,
            Domain::Vertex => vertex_count,
            Domain::Primitive => primitive_count,
            Domain::Global => 1,
        };

        if let Some(attributes) = file.record("attributes")? {
            for domain in Domain::ALL {
                let list = attributes.array(domain.attributes_key())?.unwrap_or_default();
                *detail.attributes_mut(domain) =
                    load_attribute_list(list, domain, declared(domain))?;
            }
        }
        ctx.lap("attributes");

        for entry in file.require_array("primitives")? {
            let (pdef, pdata) = pair(entry, "primitive")?;
            detail.primitives.extend(Primitive::load_entry(pdef, pdata, ctx)?);
        }
        if detail.primitive_count() != primitive_count {
            return Err(FormatError::ElementCount {
                context: "primitives".to_string(),
                expected: primitive_count,
                actual: detail.primitive_count(),
            }
            .into());
        }
        detail.check_primitive_vertices()?;
        ctx.lap("primitives");

        for domain in Domain::GROUPED {
            let Some(key) = domain.groups_key() else { continue };
            let list = file.array(key)?.unwrap_or_default();
            // Point attributes already match the declared count; without any,
            // only the declared count knows about unreferenced points.
            let count = match domain {
                Domain::Point => point_count,
                _ => detail.element_count(domain),
            };
            let groups = load_group_list(list, domain, count)?;
            if let Some(map) = detail.groups_mut(domain) {
                *map = groups;
            }
        }
        ctx.lap("groups");

        detail.altitude = file.get("altitude").cloned();
        if let Some(regions) = file.array("trimregions")? {
            detail.trim_regions = Some(
                regions
                    .iter()
                    .map(TrimRegion::load)
                    .collect::<Result<Vec<_>>>()?,
            );
        }

        Ok(detail)
    }

    fn load_topology(&mut self, value: &Value) -> Result<()> {
        let topology = Record::from_value(value, "topology")?;
        let pointref = topology
            .record("pointref")?
            .ok_or_else(|| FormatError::InvalidTopology("missing 'pointref'".to_string()))?;
        let indices = pointref
            .get("indices")
            .ok_or_else(|| FormatError::InvalidTopology("missing 'indices'".to_string()))?;
        let indices = indices
            .as_array()
            .ok_or_else(|| FormatError::InvalidTopology("indices is not a list".to_string()))?;
        self.vertex_to_point = indices
            .iter()
            .map(crate::core::as_index)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                FormatError::InvalidTopology("indices must be point offsets".to_string())
            })?;
        Ok(())
    }

    fn check_primitive_vertices(&self) -> Result<()> {
        let count = self.vertex_count();
        for (i, prim) in self.primitives.iter().enumerate() {
            if let Some(&v) = prim.vertices.iter().find(|&&v| v >= count) {
                return Err(FormatError::IndexOutOfRange {
                    context: format!("primitive {} ({})", i, prim.kind.name()),
                    index: v as i64,
                    count,
                }
                .into());
            }
        }
        Ok(())
    }

    // ========================================================================
    // Saving
    // ========================================================================

    /// Emit the document. Counts always come from the live data.
    pub fn to_value(&self) -> Value {
        let mut out = RecordBuilder::new()
            .field("fileversion", FILE_VERSION)
            .field_opt("info", self.info.clone())
            .field("pointcount", self.point_count())
            .field("vertexcount", self.vertex_count())
            .field("primitivecount", self.primitive_count())
            .field(
                "topology",
                RecordBuilder::new().field(
                    "pointref",
                    RecordBuilder::new().field("indices", self.vertex_to_point.clone()),
                ),
            );

        let mut attributes = RecordBuilder::new();
        let mut any_attributes = false;
        for domain in Domain::ALL {
            let map = self.attributes(domain);
            if !map.is_empty() {
                any_attributes = true;
                let list: Vec<Value> = map.values().map(Attribute::save).collect();
                attributes.push(domain.attributes_key(), list);
            }
        }
        if any_attributes {
            out.push("attributes", attributes);
        }

        let prims: Vec<Value> = self.primitives.iter().map(Primitive::save).collect();
        out.push("primitives", prims);

        for domain in [Domain::Point, Domain::Vertex, Domain::Primitive] {
            let (Some(key), Some(groups)) = (domain.groups_key(), self.groups(domain)) else {
                continue;
            };
            if !groups.is_empty() {
                let list: Vec<Value> = groups.values().map(ElementGroup::save).collect();
                out.push(key, list);
            }
        }

        if let Some(altitude) = &self.altitude {
            out.push("altitude", altitude.clone());
        }
        if let Some(regions) = &self.trim_regions {
            let list: Vec<Value> = regions.iter().map(TrimRegion::save).collect();
            out.push("trimregions", list);
        }
        out.build()
    }
}

/// Split a `[definition, data]` pair.
fn pair<'a>(entry: &'a Value, what: &str) -> Result<(&'a Value, &'a Value)> {
    match entry.as_array().map(Vec::as_slice) {
        Some([def, data]) => Ok((def, data)),
        _ => Err(FormatError::invalid(format!(
            "invalid {} block: expected [definition, data]",
            what
        ))
        .into()),
    }
}

fn load_attribute_list(list: &[Value], domain: Domain, count: usize) -> Result<AttributeMap> {
    let mut map = AttributeMap::new();
    for entry in list {
        let (adef, avalue) = pair(entry, "attribute")?;
        let attribute = Attribute::load(adef, avalue, domain, count)?;
        trace!(domain = domain.as_str(), name = %attribute.name, "Loaded attribute");
        map.insert(attribute.name.clone(), attribute);
    }
    Ok(map)
}

fn load_group_list(list: &[Value], domain: Domain, count: usize) -> Result<GroupMap> {
    let mut map = GroupMap::new();
    for (n, entry) in list.iter().enumerate() {
        let (gdef, gsel) = pair(entry, "group")?;
        let gdef = Record::from_value(gdef, "group definition")?;
        let name = gdef.require_str("name")?;
        let mut group = ElementGroup::new(name, domain, 0);
        group.load_selection(gsel, count)?;
        map.insert(name.to_string(), group);
        if (n + 1) % 100 == 0 {
            trace!(domain = domain.as_str(), loaded = n + 1, "Loading groups");
        }
    }
    Ok(map)
}
