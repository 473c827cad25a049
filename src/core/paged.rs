//! Paged raw-data decoding.
//!
//! Paged attribute data is stored as a flat value stream, page by page:
//!
//! ```text
//! [ <subvector0_page0> <subvector1_page0> ... <subvector0_page1> ... ]
//! ```
//!
//! Each page holds up to `page_size` tuples. A tuple is split into
//! sub-vectors per the `packing` widths; a sub-vector flagged constant on a
//! page stores a single value for the whole page instead of one per tuple.
//!
//! Decoding is one-directional. Saving always writes the expanded form.

use crate::util::{FormatError, Result};

/// Layout parameters of one paged block.
#[derive(Clone, Copy, Debug)]
pub struct PageLayout<'a> {
    /// Width of each sub-vector; the sum is the tuple width.
    pub packing: &'a [usize],
    /// Maximum number of tuples per page.
    pub page_size: usize,
    /// Per sub-vector, per page: true when the sub-vector is constant.
    pub const_flags: Option<&'a [Vec<bool>]>,
}

impl PageLayout<'_> {
    /// Tuple width implied by the packing.
    pub fn tuple_size(&self) -> Result<usize> {
        self.packing
            .iter()
            .try_fold(0usize, |acc, &w| acc.checked_add(w))
            .ok_or_else(|| FormatError::invalid("packing widths overflow").into())
    }

    fn is_constant(&self, subvector: usize, page: usize) -> bool {
        self.const_flags
            .and_then(|flags| flags.get(subvector))
            .and_then(|f| f.get(page).copied())
            .unwrap_or(false)
    }

    fn page_count(&self, tuple_size: usize, raw_len: usize) -> usize {
        let from_flags = self
            .const_flags
            .and_then(|flags| flags.iter().find(|f| !f.is_empty()))
            .map_or(0, Vec::len);
        if from_flags > 0 {
            return from_flags;
        }
        let full_page = tuple_size.saturating_mul(self.page_size);
        raw_len.div_ceil(full_page)
    }
}

/// Expand paged raw data into a flat array of `total_tuples` tuples.
///
/// The result is tuple-major: tuple `i` occupies
/// `[i * tuple_size, (i + 1) * tuple_size)`.
pub fn decode_pages<T: Copy>(
    raw: &[T],
    layout: &PageLayout<'_>,
    total_tuples: usize,
) -> Result<Vec<T>> {
    let tuple_size = layout.tuple_size()?;
    if tuple_size == 0 {
        return Err(FormatError::invalid("paged data with empty packing").into());
    }
    if layout.page_size == 0 {
        return Err(FormatError::invalid("paged data with zero page size").into());
    }

    let total_len = total_tuples.checked_mul(tuple_size).ok_or_else(|| {
        FormatError::invalid(format!("{} tuples of width {} is too large", total_tuples, tuple_size))
    })?;

    let n_pages = layout.page_count(tuple_size, raw.len());
    let n_sub = layout.packing.len();

    // Constant pages expand, so raw length is only a lower bound.
    let mut result: Vec<T> = Vec::with_capacity(total_len.min(raw.len()));
    let mut decoded = 0usize;
    let mut raw_index = 0usize;
    let mut steps = vec![0usize; n_sub];
    let mut offsets = vec![0usize; n_sub];

    for page in 0..n_pages {
        // Per-tuple step of each sub-vector; 0 where constant on this page.
        for (s, step) in steps.iter_mut().enumerate() {
            *step = if layout.is_constant(s, page) {
                0
            } else {
                layout.packing[s]
            };
        }
        let n_varying: usize = steps.iter().sum();
        let n_constant = tuple_size - n_varying;
        let raw_left = raw.len() - raw_index;

        let n_tuples = if n_varying > 0 {
            if raw_left < n_constant {
                return Err(FormatError::TruncatedPage { page }.into());
            }
            layout.page_size.min((raw_left - n_constant) / n_varying)
        } else {
            if raw_left < tuple_size {
                return Err(FormatError::TruncatedPage { page }.into());
            }
            // A wholly constant final page holds one tuple here; the rest
            // are replicated once the total is known.
            if raw_left > tuple_size {
                layout.page_size
            } else {
                1
            }
        };

        if n_tuples > total_tuples - decoded {
            return Err(FormatError::PageCount {
                expected: total_tuples,
                actual: decoded + n_tuples,
            }
            .into());
        }

        let mut cursor = raw_index;
        for (s, offset) in offsets.iter_mut().enumerate() {
            *offset = cursor;
            cursor = cursor.saturating_add((steps[s] * n_tuples).max(layout.packing[s]));
        }

        for _ in 0..n_tuples {
            for (s, offset) in offsets.iter_mut().enumerate() {
                let width = layout.packing[s];
                result.extend_from_slice(&raw[*offset..*offset + width]);
                *offset += steps[s];
            }
        }
        decoded += n_tuples;

        raw_index += n_varying * n_tuples + n_constant;
    }

    // Only a trailing constant page can stand for the missing tuples.
    let missing = total_tuples - decoded;
    if missing > 0 && missing < layout.page_size && decoded > 0 && layout.const_flags.is_some() {
        result
            .try_reserve(missing * tuple_size)
            .map_err(|_| FormatError::invalid(format!("{} padded tuples is too large", missing)))?;
        let last = result.len() - tuple_size;
        for _ in decoded..total_tuples {
            result.extend_from_within(last..last + tuple_size);
        }
        decoded = total_tuples;
    }

    if decoded != total_tuples {
        return Err(FormatError::PageCount {
            expected: total_tuples,
            actual: decoded,
        }
        .into());
    }
    Ok(result)
}
