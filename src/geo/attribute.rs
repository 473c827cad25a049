//! Typed per-element attributes.
//!
//! An attribute is stored as a definition block (name, type, scope, options)
//! and a value block. Numeric values and string-table indices can each be
//! encoded three ways, tried in order:
//!
//! 1. `tuples` - an explicit array of tuples
//! 2. `rawpagedata` - the paged layout, see [`decode_pages`]
//! 3. `arrays` - a single column, only valid for tuple size 1
//!
//! Values are kept flat, tuple-major, regardless of the input encoding.

use serde_json::Value;
use tracing::warn;

use crate::core::{as_bool, as_int, decode_pages, Domain, PageLayout, Record, RecordBuilder};
use crate::util::{FormatError, Result, Storage};

/// Semantic type of an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SemanticType {
    Numeric,
    String,
    /// Unknown type, stored verbatim.
    Opaque,
}

/// Attribute payload.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeData {
    /// Numeric components, `tuple_size` per element.
    Numeric { storage: Storage, values: Vec<f64> },
    /// Indices into a shared string table, `tuple_size` per element.
    String {
        strings: Vec<String>,
        storage: Storage,
        indices: Vec<i64>,
    },
    /// Value block of an unrecognized attribute type.
    Opaque { type_name: String, block: Value },
}

/// Value of one element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttribValue<'a> {
    Numeric(&'a [f64]),
    String(&'a str),
}

/// A typed, per-element value store bound to one domain.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub domain: Domain,
    /// Visibility scope ("public", "private"), passed through.
    pub scope: String,
    pub tuple_size: usize,
    pub options: Value,
    pub defaults: Option<Vec<f64>>,
    pub data: AttributeData,
}

impl Attribute {
    /// Create a numeric attribute from flat tuple-major values.
    pub fn numeric(
        name: impl Into<String>,
        domain: Domain,
        tuple_size: usize,
        storage: Storage,
        values: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            domain,
            scope: "public".to_string(),
            tuple_size: tuple_size.max(1),
            options: Value::Object(Default::default()),
            defaults: None,
            data: AttributeData::Numeric { storage, values },
        }
    }

    /// Create a single-component string attribute.
    pub fn string(
        name: impl Into<String>,
        domain: Domain,
        strings: Vec<String>,
        indices: Vec<i64>,
    ) -> Self {
        Self {
            name: name.into(),
            domain,
            scope: "public".to_string(),
            tuple_size: 1,
            options: Value::Object(Default::default()),
            defaults: None,
            data: AttributeData::String {
                strings,
                storage: Storage::Int32,
                indices,
            },
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self.data {
            AttributeData::Numeric { .. } => SemanticType::Numeric,
            AttributeData::String { .. } => SemanticType::String,
            AttributeData::Opaque { .. } => SemanticType::Opaque,
        }
    }

    /// Type name as written in the definition block.
    pub fn type_name(&self) -> &str {
        match &self.data {
            AttributeData::Numeric { .. } => "numeric",
            AttributeData::String { .. } => "string",
            AttributeData::Opaque { type_name, .. } => type_name,
        }
    }

    /// Number of elements. Opaque attributes report 0.
    pub fn len(&self) -> usize {
        match &self.data {
            AttributeData::Numeric { values, .. } => values.len() / self.tuple_size,
            AttributeData::String { indices, .. } => indices.len() / self.tuple_size,
            AttributeData::Opaque { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load an attribute from its definition and value blocks.
    pub fn load(
        definition: &Value,
        values: &Value,
        domain: Domain,
        element_count: usize,
    ) -> Result<Self> {
        let adef = Record::from_value(definition, "attribute definition")?;
        let name = adef.require_str("name")?;
        let type_name = adef.require_str("type")?;
        let scope = adef.str("scope")?.unwrap_or("public");
        let options = adef
            .get("options")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));

        if !matches!(type_name, "numeric" | "string") {
            warn!(attribute = name, type_name, "Unknown attribute type, kept verbatim");
            return Ok(Self {
                name: name.to_string(),
                domain,
                scope: scope.to_string(),
                tuple_size: 1,
                options,
                defaults: None,
                data: AttributeData::Opaque {
                    type_name: type_name.to_string(),
                    block: values.clone(),
                },
            });
        }

        let obj = Record::from_value(values, name)?;
        let defaults = load_defaults(&obj)?;

        let (tuple_size, data) = match type_name {
            "numeric" => {
                let block = obj.require_record("values")?;
                let tuple_size = tuple_size_of(&block)?;
                let storage = Storage::from_name(block.str("storage")?.unwrap_or("fpreal32"));
                let values = load_array(&block, name, tuple_size, element_count, Value::as_f64)?;
                (tuple_size, AttributeData::Numeric { storage, values })
            }
            _ => {
                let strings = obj
                    .require_array("strings")?
                    .iter()
                    .map(|s| s.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| FormatError::wrong_type(name, "strings", "array of strings"))?;
                let block = obj.require_record("indices")?;
                let tuple_size = tuple_size_of(&block)?;
                let storage = Storage::from_name(block.str("storage")?.unwrap_or("int32"));
                let indices = load_array(&block, name, tuple_size, element_count, as_int)?;
                (
                    tuple_size,
                    AttributeData::String {
                        strings,
                        storage,
                        indices,
                    },
                )
            }
        };

        Ok(Self {
            name: name.to_string(),
            domain,
            scope: scope.to_string(),
            tuple_size,
            options,
            defaults,
            data,
        })
    }

    /// Numeric tuple at `offset`.
    pub fn tuple(&self, offset: usize) -> Option<&[f64]> {
        match &self.data {
            AttributeData::Numeric { values, .. } => {
                let start = offset.checked_mul(self.tuple_size)?;
                values.get(start..start + self.tuple_size)
            }
            _ => None,
        }
    }

    /// Resolve component `component` of a string attribute at `offset`.
    ///
    /// Indices outside the string table resolve to the empty string.
    pub fn string_at(&self, offset: usize, component: usize) -> Option<&str> {
        match &self.data {
            AttributeData::String {
                strings, indices, ..
            } => {
                if component >= self.tuple_size {
                    return None;
                }
                let idx = *indices.get(offset.checked_mul(self.tuple_size)? + component)?;
                Some(
                    usize::try_from(idx)
                        .ok()
                        .and_then(|i| strings.get(i))
                        .map_or("", String::as_str),
                )
            }
            _ => None,
        }
    }

    /// All resolved components of a string attribute at `offset`.
    pub fn strings_at(&self, offset: usize) -> Vec<&str> {
        (0..self.tuple_size)
            .map_while(|c| self.string_at(offset, c))
            .collect()
    }

    /// Value of the element at `offset`.
    ///
    /// Numeric attributes yield the stored tuple, string attributes the
    /// first component resolved through the string table.
    pub fn get_value(&self, offset: usize) -> Option<AttribValue<'_>> {
        match &self.data {
            AttributeData::Numeric { .. } => self.tuple(offset).map(AttribValue::Numeric),
            AttributeData::String { .. } => self.string_at(offset, 0).map(AttribValue::String),
            AttributeData::Opaque { .. } => None,
        }
    }

    /// Emit `[definition, values]` in the expanded encoding.
    pub fn save(&self) -> Value {
        let adef = RecordBuilder::new()
            .field("scope", self.scope.as_str())
            .field("type", self.type_name())
            .field("name", self.name.as_str())
            .field("options", self.options.clone())
            .build();

        let avalue = match &self.data {
            AttributeData::Opaque { block, .. } => block.clone(),
            AttributeData::Numeric { storage, values } => {
                let mut out = self.value_header();
                out.push("storage", storage.name());
                let components = values.iter().map(|&v| storage.encode(v));
                out.push("values", self.save_array(storage, components));
                out.build()
            }
            AttributeData::String {
                strings,
                storage,
                indices,
            } => {
                let mut out = self.value_header();
                out.push("strings", strings.clone());
                let components = indices.iter().map(|&i| Value::from(i));
                out.push("indices", self.save_array(storage, components));
                out.build()
            }
        };
        Value::Array(vec![adef, avalue])
    }

    fn value_header(&self) -> RecordBuilder {
        let mut out = RecordBuilder::new().field("size", self.tuple_size);
        if let Some(defaults) = self.defaults.as_ref().filter(|d| !d.is_empty()) {
            out.push(
                "defaults",
                RecordBuilder::new()
                    .field("size", defaults.len())
                    .field("storage", Storage::Fpreal64.name())
                    .field("values", defaults.clone()),
            );
        }
        out
    }

    fn save_array(&self, storage: &Storage, components: impl Iterator<Item = Value>) -> Value {
        let components: Vec<Value> = components.collect();
        let block = RecordBuilder::new()
            .field("size", self.tuple_size)
            .field("storage", storage.name());
        if self.tuple_size == 1 {
            block.field("arrays", vec![Value::Array(components)]).build()
        } else {
            let tuples: Vec<Value> = components
                .chunks(self.tuple_size)
                .map(|t| Value::Array(t.to_vec()))
                .collect();
            block.field("tuples", tuples).build()
        }
    }
}

fn load_defaults(obj: &Record<'_>) -> Result<Option<Vec<f64>>> {
    match obj.record("defaults")? {
        Some(d) => d.numbers("values"),
        None => Ok(None),
    }
}

fn tuple_size_of(block: &Record<'_>) -> Result<usize> {
    let size = block.usize("size")?.unwrap_or(1);
    if size == 0 {
        return Err(FormatError::wrong_type(block.context(), "size", "positive tuple size").into());
    }
    Ok(size)
}

/// Decode one value array (numeric values or string indices).
fn load_array<T: Copy>(
    block: &Record<'_>,
    name: &str,
    tuple_size: usize,
    element_count: usize,
    parse: fn(&Value) -> Option<T>,
) -> Result<Vec<T>> {
    let wrong = |field: &str| FormatError::wrong_type(name, field, "numbers");

    let flat = if let Some(tuples) = block.array("tuples")? {
        // Widths first, so the capacity below is backed by real data.
        for tuple in tuples {
            let width = match tuple {
                Value::Array(items) => items.len(),
                _ if tuple_size == 1 => 1,
                _ => return Err(wrong("tuples").into()),
            };
            if width != tuple_size {
                return Err(FormatError::ElementCount {
                    context: format!("tuple of attribute '{}'", name),
                    expected: tuple_size,
                    actual: width,
                }
                .into());
            }
        }
        let mut flat = Vec::with_capacity(tuples.len() * tuple_size);
        for tuple in tuples {
            match tuple {
                Value::Array(items) => {
                    for item in items {
                        flat.push(parse(item).ok_or_else(|| wrong("tuples"))?);
                    }
                }
                scalar => flat.push(parse(scalar).ok_or_else(|| wrong("tuples"))?),
            }
        }
        flat
    } else if let Some(raw) = block.array("rawpagedata")? {
        let raw = raw
            .iter()
            .map(parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| wrong("rawpagedata"))?;
        let packing = if block.contains("packing") {
            block.require_indices("packing")?
        } else {
            vec![tuple_size]
        };
        let page_size = block.require_usize("pagesize")?;
        let const_flags = match block.array("constantpageflags")? {
            Some(flags) => Some(
                flags
                    .iter()
                    .map(|f| {
                        f.as_array()
                            .and_then(|a| a.iter().map(as_bool).collect::<Option<Vec<_>>>())
                    })
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| FormatError::wrong_type(name, "constantpageflags", "arrays of booleans"))?,
            ),
            None => None,
        };
        let layout = PageLayout {
            packing: &packing,
            page_size,
            const_flags: const_flags.as_deref(),
        };
        let packed = layout.tuple_size()?;
        if packed != tuple_size {
            return Err(FormatError::ElementCount {
                context: format!("packing of attribute '{}'", name),
                expected: tuple_size,
                actual: packed,
            }
            .into());
        }
        decode_pages(&raw, &layout, element_count)?
    } else if let Some(arrays) = block.array("arrays")? {
        if tuple_size != 1 {
            return Err(FormatError::TupleWidth(tuple_size).into());
        }
        let column = arrays
            .first()
            .and_then(Value::as_array)
            .ok_or_else(|| wrong("arrays"))?;
        column
            .iter()
            .map(parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| wrong("arrays"))?
    } else {
        return Err(FormatError::MissingValues(name.to_string()).into());
    };

    let actual = flat.len() / tuple_size;
    if actual != element_count {
        return Err(FormatError::ElementCount {
            context: format!("attribute '{}'", name),
            expected: element_count,
            actual,
        }
        .into());
    }
    Ok(flat)
}
