//! Named element groups.
//!
//! A group selects a subset of one domain's elements. Unordered groups are a
//! membership mask; ordered groups also keep the member order so it can be
//! written back exactly.

use serde_json::Value;

use crate::core::{as_bool, as_int, Domain, Record, RecordBuilder};
use crate::util::{FormatError, Result};

/// Named membership set over one element domain.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementGroup {
    pub name: String,
    pub domain: Domain,
    /// Membership mask over the whole domain.
    pub selection: Vec<bool>,
    /// Member order, present for ordered groups only.
    pub order: Option<Vec<usize>>,
    /// Schema-specific default descriptors, passed through.
    pub defaults: Value,
    count: usize,
}

impl ElementGroup {
    /// Create an empty unordered group over `element_count` elements.
    pub fn new(name: impl Into<String>, domain: Domain, element_count: usize) -> Self {
        Self {
            name: name.into(),
            domain,
            selection: vec![false; element_count],
            order: None,
            defaults: Value::Null,
            count: 0,
        }
    }

    /// Create an ordered group from a member list.
    pub fn ordered(
        name: impl Into<String>,
        domain: Domain,
        order: Vec<usize>,
        element_count: usize,
    ) -> Result<Self> {
        let mut group = Self::new(name, domain, element_count);
        group.load_ordered(order, element_count)?;
        group.update_membership();
        Ok(group)
    }

    /// Number of members.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_ordered(&self) -> bool {
        self.order.is_some()
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.selection.get(offset).copied().unwrap_or(false)
    }

    /// Recount members from the mask.
    pub fn update_membership(&mut self) {
        self.count = self.selection.iter().filter(|&&s| s).count();
    }

    /// Load the `selection` block of a group.
    pub fn load_selection(&mut self, value: &Value, element_count: usize) -> Result<()> {
        let obj = Record::from_value(value, "group")?;
        let sel = obj.require_record("selection")?;
        self.defaults = sel.get("defaults").cloned().unwrap_or(Value::Null);

        if let Some(style) = sel.get("unordered") {
            self.load_unordered(style)?;
            self.order = None;
            if self.selection.len() != element_count {
                return Err(FormatError::ElementCount {
                    context: format!("{} group '{}'", self.domain, self.name),
                    expected: element_count,
                    actual: self.selection.len(),
                }
                .into());
            }
        } else if sel.contains("ordered") {
            let order = sel.require_indices("ordered")?;
            self.load_ordered(order, element_count)?;
        } else {
            return Err(FormatError::UnknownGroupEncoding(self.name.clone()).into());
        }
        self.update_membership();
        Ok(())
    }

    /// Load an unordered mask from either run-length pairs or one value per element.
    pub fn load_unordered(&mut self, value: &Value) -> Result<()> {
        let obj = Record::from_value(value, "unordered")?;
        if let Some(rle) = obj.array("boolRLE")? {
            let pairs = rle
                .iter()
                .map(as_int)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| FormatError::wrong_type("unordered", "boolRLE", "integers"))?;
            self.selection = unpack_rle(&pairs)?;
            return Ok(());
        }
        if let Some(i8s) = obj.array("i8")? {
            self.selection = i8s
                .iter()
                .map(as_bool)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| FormatError::wrong_type("unordered", "i8", "integers"))?;
            return Ok(());
        }
        Err(FormatError::UnknownGroupEncoding(self.name.clone()).into())
    }

    /// Set members from an explicit ordered list, keeping the order.
    pub fn load_ordered(&mut self, order: Vec<usize>, element_count: usize) -> Result<()> {
        if let Some(&i) = order.iter().find(|&&i| i >= element_count) {
            return Err(FormatError::IndexOutOfRange {
                context: format!("ordered group '{}'", self.name),
                index: i as i64,
                count: element_count,
            }
            .into());
        }
        let mut selection = empty_mask(element_count)?;
        for &i in &order {
            let slot = &mut selection[i];
            if *slot {
                return Err(FormatError::invalid(format!(
                    "ordered group '{}' lists element {} twice",
                    self.name, i
                ))
                .into());
            }
            *slot = true;
        }
        self.selection = selection;
        self.order = Some(order);
        Ok(())
    }

    /// Emit `[definition, selection]`.
    ///
    /// Ordered groups write their order; unordered groups always write the
    /// one-value-per-element form.
    pub fn save(&self) -> Value {
        let gdef = RecordBuilder::new()
            .field("name", self.name.as_str())
            .field("type", self.domain.as_str())
            .build();
        let selection = match &self.order {
            Some(order) => RecordBuilder::new()
                .field("defaults", self.defaults.clone())
                .field("ordered", order.clone()),
            None => {
                let bools: Vec<Value> = self
                    .selection
                    .iter()
                    .map(|&s| Value::from(u8::from(s)))
                    .collect();
                RecordBuilder::new()
                    .field("defaults", self.defaults.clone())
                    .field("unordered", RecordBuilder::new().field("i8", bools).build())
            }
        };
        Value::Array(vec![
            gdef,
            RecordBuilder::new().field("selection", selection).build(),
        ])
    }
}

/// All-false mask over `len` elements, failing instead of aborting when the
/// length cannot be allocated.
fn empty_mask(len: usize) -> Result<Vec<bool>> {
    let mut mask = Vec::new();
    mask.try_reserve_exact(len)
        .map_err(|_| FormatError::invalid(format!("group over {} elements is too large", len)))?;
    mask.resize(len, false);
    Ok(mask)
}

/// Expand `[count, state, count, state, ...]` run-length pairs into a mask.
pub fn unpack_rle(rle: &[i64]) -> Result<Vec<bool>> {
    if rle.len() % 2 != 0 {
        return Err(FormatError::invalid("boolRLE has an unpaired run").into());
    }
    let mut out = Vec::new();
    for pair in rle.chunks_exact(2) {
        let count = usize::try_from(pair[0])
            .map_err(|_| FormatError::invalid(format!("negative run length {}", pair[0])))?;
        out.try_reserve(count)
            .map_err(|_| FormatError::invalid(format!("run length {} is too large", count)))?;
        out.extend(std::iter::repeat(pair[1] != 0).take(count));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unpack_rle() {
        assert_eq!(
            unpack_rle(&[3, 0, 2, 1]).unwrap(),
            vec![false, false, false, true, true]
        );
        assert!(unpack_rle(&[3]).is_err());
        assert!(unpack_rle(&[-1, 0]).is_err());
    }

    #[test]
    fn test_oversized_masks_are_errors() {
        assert!(unpack_rle(&[i64::MAX, 1]).unwrap_err().is_format());
        let err = ElementGroup::ordered("g", Domain::Point, vec![], usize::MAX).unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_ordered_group() {
        let g = ElementGroup::ordered("g", Domain::Point, vec![1, 3], 5).unwrap();
        assert_eq!(g.selection, vec![false, true, false, true, false]);
        assert_eq!(g.count(), 2);
    }

    #[test]
    fn test_ordered_group_keeps_order() {
        let g = ElementGroup::ordered("g", Domain::Point, vec![3, 1], 5).unwrap();
        let saved = g.save();
        assert_eq!(
            saved,
            json!([
                ["name", "g", "type", "point"],
                ["selection", ["defaults", null, "ordered", [3, 1]]]
            ])
        );
    }

    #[test]
    fn test_ordered_group_out_of_range() {
        let err = ElementGroup::ordered("g", Domain::Vertex, vec![5], 5).unwrap_err();
        assert!(matches!(
            err.as_format(),
            Some(FormatError::IndexOutOfRange { index: 5, count: 5, .. })
        ));
        assert!(ElementGroup::ordered("g", Domain::Vertex, vec![1, 1], 5).is_err());
    }

    #[test]
    fn test_load_rle_selection() {
        let mut g = ElementGroup::new("edge", Domain::Primitive, 0);
        g.load_selection(
            &json!(["selection", ["defaults", null, "unordered", ["boolRLE", [2, 1, 3, 0]]]]),
            5,
        )
        .unwrap();
        assert_eq!(g.count(), 2);
        assert!(g.contains(1));
        assert!(!g.contains(2));
        assert!(!g.is_ordered());
    }

    #[test]
    fn test_unordered_saves_dense_form() {
        let mut g = ElementGroup::new("edge", Domain::Primitive, 0);
        g.load_selection(
            &json!(["selection", ["unordered", ["boolRLE", [1, 0, 1, 1]]]]),
            2,
        )
        .unwrap();
        assert_eq!(
            g.save()[1],
            json!(["selection", ["defaults", null, "unordered", ["i8", [0, 1]]]])
        );
    }

    #[test]
    fn test_mask_length_must_match_domain() {
        let mut g = ElementGroup::new("g", Domain::Point, 0);
        let err = g
            .load_selection(&json!(["selection", ["unordered", ["i8", [1, 0]]]]), 3)
            .unwrap_err();
        assert!(matches!(err.as_format(), Some(FormatError::ElementCount { .. })));
    }

    #[test]
    fn test_unknown_encoding() {
        let mut g = ElementGroup::new("g", Domain::Point, 0);
        let err = g
            .load_selection(&json!(["selection", ["unordered", ["bits", [1]]]]), 1)
            .unwrap_err();
        assert_eq!(
            err.as_format(),
            Some(&FormatError::UnknownGroupEncoding("g".into()))
        );
        let err = g
            .load_selection(&json!(["selection", ["defaults", null]]), 1)
            .unwrap_err();
        assert!(matches!(
            err.as_format(),
            Some(FormatError::UnknownGroupEncoding(_))
        ));
    }
}
