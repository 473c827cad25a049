//! Key/value blocks.
//!
//! Documents store objects as flat `[key, value, key, value, ...]` lists.
//! [`Record`] turns one such list into a keyed lookup borrowing from the
//! document, and [`RecordBuilder`] produces the flat form again on save.

use serde_json::Value;
use smallvec::SmallVec;

use crate::util::{FormatError, Result};

/// Borrowed keyed view of one key/value block.
///
/// Uses SmallVec since most blocks carry only a handful of keys.
/// Later duplicates of a key shadow earlier ones.
#[derive(Clone, Debug)]
pub struct Record<'a> {
    context: &'a str,
    entries: SmallVec<[(&'a str, &'a Value); 8]>,
}

impl<'a> Record<'a> {
    /// Create an empty record.
    pub fn empty(context: &'a str) -> Self {
        Self {
            context,
            entries: SmallVec::new(),
        }
    }

    /// Normalize a flat key/value list (or a JSON object) into a record.
    ///
    /// `context` names the block in error messages.
    pub fn from_value(value: &'a Value, context: &'a str) -> Result<Self> {
        let mut record = Self::empty(context);
        match value {
            Value::Array(items) => {
                if items.len() % 2 != 0 {
                    return Err(FormatError::invalid(format!(
                        "key/value list for {} has odd length {}",
                        context,
                        items.len()
                    ))
                    .into());
                }
                for pair in items.chunks_exact(2) {
                    let key = pair[0]
                        .as_str()
                        .ok_or_else(|| FormatError::NotARecord(context.to_string()))?;
                    record.entries.push((key, &pair[1]));
                }
            }
            Value::Object(map) => {
                for (k, v) in map {
                    record.entries.push((k.as_str(), v));
                }
            }
            _ => return Err(FormatError::NotARecord(context.to_string()).into()),
        }
        Ok(record)
    }

    /// Name of this block, used in error messages.
    pub fn context(&self) -> &'a str {
        self.context
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| *k == key)
    }

    /// Set or replace a value.
    pub fn set(&mut self, key: &'a str, value: &'a Value) {
        for (k, v) in &mut self.entries {
            if *k == key {
                *v = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over key-value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    /// Get a value, failing if the key is absent.
    pub fn require(&self, key: &str) -> Result<&'a Value> {
        self.get(key)
            .ok_or_else(|| FormatError::missing(self.context, key).into())
    }

    /// Get and normalize a nested key/value block.
    pub fn record(&self, key: &'a str) -> Result<Option<Record<'a>>> {
        match self.get(key) {
            Some(Value::Null) | None => Ok(None),
            Some(v) => Record::from_value(v, key).map(Some),
        }
    }

    /// Get and normalize a nested key/value block, failing if absent.
    pub fn require_record(&self, key: &'a str) -> Result<Record<'a>> {
        Record::from_value(self.require(key)?, key)
    }

    fn wrong(&self, key: &str, expected: &'static str) -> crate::util::Error {
        FormatError::wrong_type(self.context, key, expected).into()
    }

    /// Get a string field.
    pub fn str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.as_str().map(Some).ok_or_else(|| self.wrong(key, "string")),
        }
    }

    /// Get a required string field.
    pub fn require_str(&self, key: &str) -> Result<&'a str> {
        self.str(key)?
            .ok_or_else(|| FormatError::missing(self.context, key).into())
    }

    /// Get a boolean field. Integers are accepted as 0/non-zero.
    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => as_bool(v).map(Some).ok_or_else(|| self.wrong(key, "boolean")),
        }
    }

    /// Get a required boolean field.
    pub fn require_bool(&self, key: &str) -> Result<bool> {
        self.bool(key)?
            .ok_or_else(|| FormatError::missing(self.context, key).into())
    }

    /// Get a numeric field.
    pub fn f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| self.wrong(key, "number")),
        }
    }

    /// Get a required numeric field.
    pub fn require_f64(&self, key: &str) -> Result<f64> {
        self.f64(key)?
            .ok_or_else(|| FormatError::missing(self.context, key).into())
    }

    /// Get a non-negative integer field.
    pub fn usize(&self, key: &str) -> Result<Option<usize>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => as_index(v)
                .map(Some)
                .ok_or_else(|| self.wrong(key, "non-negative integer")),
        }
    }

    /// Get a required non-negative integer field.
    pub fn require_usize(&self, key: &str) -> Result<usize> {
        self.usize(key)?
            .ok_or_else(|| FormatError::missing(self.context, key).into())
    }

    /// Get an array field.
    pub fn array(&self, key: &str) -> Result<Option<&'a [Value]>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_array()
                .map(|a| Some(a.as_slice()))
                .ok_or_else(|| self.wrong(key, "array")),
        }
    }

    /// Get a required array field.
    pub fn require_array(&self, key: &str) -> Result<&'a [Value]> {
        self.array(key)?
            .ok_or_else(|| FormatError::missing(self.context, key).into())
    }

    /// Get an array of numbers.
    pub fn numbers(&self, key: &str) -> Result<Option<Vec<f64>>> {
        match self.array(key)? {
            None => Ok(None),
            Some(items) => items
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<_>>>()
                .map(Some)
                .ok_or_else(|| self.wrong(key, "array of numbers")),
        }
    }

    /// Get a required array of element offsets.
    pub fn require_indices(&self, key: &str) -> Result<Vec<usize>> {
        self.require_array(key)?
            .iter()
            .map(as_index)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.wrong(key, "array of non-negative integers"))
    }

    /// Emit the flat key/value form again.
    pub fn to_value(&self) -> Value {
        let mut out = Vec::with_capacity(self.entries.len() * 2);
        for (k, v) in self.iter() {
            out.push(Value::from(k));
            out.push(v.clone());
        }
        Value::Array(out)
    }
}

/// Builder for the flat `[key, value, ...]` list form.
#[derive(Clone, Debug, Default)]
pub struct RecordBuilder {
    items: Vec<Value>,
}

impl RecordBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key/value pair.
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    /// Append a key/value pair only when a value is present.
    pub fn field_opt(mut self, key: &str, value: Option<impl Into<Value>>) -> Self {
        if let Some(v) = value {
            self.push(key, v);
        }
        self
    }

    /// Append a key/value pair in place.
    pub fn push(&mut self, key: &str, value: impl Into<Value>) {
        self.items.push(Value::from(key));
        self.items.push(value.into());
    }

    /// Finish into a flat list value.
    pub fn build(self) -> Value {
        Value::Array(self.items)
    }
}

impl From<RecordBuilder> for Value {
    fn from(b: RecordBuilder) -> Self {
        b.build()
    }
}

/// Interpret a value as an element offset.
pub fn as_index(v: &Value) -> Option<usize> {
    if let Some(u) = v.as_u64() {
        return usize::try_from(u).ok();
    }
    match v.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 => Some(f as usize),
        _ => None,
    }
}

/// Interpret a value as a signed integer, accepting integral floats.
pub fn as_int(v: &Value) -> Option<i64> {
    if let Some(i) = v.as_i64() {
        return Some(i);
    }
    match v.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= i64::MAX as f64 => Some(f as i64),
        _ => None,
    }
}

/// Interpret a value as a boolean; integers map 0 to false.
pub fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        _ => as_int(v).map(|i| i != 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_list() {
        let v = json!(["a", 1, "b", "two", "c", [1, 2]]);
        let r = Record::from_value(&v, "test").unwrap();
        assert_eq!(r.len(), 3);
        assert_eq!(r.require_usize("a").unwrap(), 1);
        assert_eq!(r.require_str("b").unwrap(), "two");
        assert_eq!(r.require_indices("c").unwrap(), vec![1, 2]);
        assert!(r.get("d").is_none());
    }

    #[test]
    fn test_object_passthrough() {
        let v = json!({"x": true});
        let r = Record::from_value(&v, "test").unwrap();
        assert_eq!(r.bool("x").unwrap(), Some(true));
    }

    #[test]
    fn test_odd_length_rejected() {
        let v = json!(["a", 1, "b"]);
        assert!(Record::from_value(&v, "test").unwrap_err().is_format());
    }

    #[test]
    fn test_non_string_key_rejected() {
        let v = json!([1, 2]);
        let err = Record::from_value(&v, "blk").unwrap_err();
        assert_eq!(err.as_format(), Some(&FormatError::NotARecord("blk".into())));
    }

    #[test]
    fn test_missing_and_wrong_type() {
        let v = json!(["a", "text"]);
        let r = Record::from_value(&v, "blk").unwrap();
        assert!(matches!(
            r.require("b").unwrap_err().as_format(),
            Some(FormatError::MissingField { .. })
        ));
        assert!(matches!(
            r.f64("a").unwrap_err().as_format(),
            Some(FormatError::WrongType { .. })
        ));
    }

    #[test]
    fn test_set_and_round_trip() {
        let v = json!(["a", 1]);
        let replacement = json!(2);
        let extra = json!("x");
        let mut r = Record::from_value(&v, "test").unwrap();
        r.set("a", &replacement);
        r.set("b", &extra);
        assert_eq!(r.to_value(), json!(["a", 2, "b", "x"]));
    }

    #[test]
    fn test_builder() {
        let v = RecordBuilder::new()
            .field("name", "P")
            .field_opt("missing", None::<i32>)
            .field("size", 3)
            .build();
        assert_eq!(v, json!(["name", "P", "size", 3]));
    }

    #[test]
    fn test_value_helpers() {
        assert_eq!(as_index(&json!(4)), Some(4));
        assert_eq!(as_index(&json!(4.0)), Some(4));
        assert_eq!(as_index(&json!(-1)), None);
        assert_eq!(as_int(&json!(-3)), Some(-3));
        assert_eq!(as_bool(&json!(0)), Some(false));
        assert_eq!(as_bool(&json!(true)), Some(true));
        assert_eq!(as_bool(&json!("no")), None);
    }
}
