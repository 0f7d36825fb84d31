use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::core::types::{RecId, Record, RecordSet};
use crate::index::fields::{is_physical_tag, FieldMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// The `so` request parameter: "a" ascending, anything else
    /// descending (the original default).
    pub fn from_code(code: &str) -> Self {
        if code == "a" {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }
}

/// Sort parameters: a field, a direction, and an optional preferential
/// pattern that moves matching records to the front regardless of
/// their natural key comparison.
#[derive(Debug, Clone)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
    pub pattern: Option<String>,
}

/// Order a result set for display. Without a sort field, the order is
/// descending identifier (most-recent-first). With one, a stable sort
/// by the field's primary value; ties keep ascending-identifier order.
pub fn sort(
    results: &RecordSet,
    records: &HashMap<RecId, Record>,
    field_map: &FieldMap,
    spec: Option<&SortSpec>,
) -> Vec<RecId> {
    let mut ids = results.to_vec();
    let Some(spec) = spec else {
        ids.reverse();
        return ids;
    };

    let pattern = spec.pattern.as_ref().map(|p| p.to_lowercase());
    let mut keyed: Vec<(bool, String, RecId)> = ids
        .into_iter()
        .map(|id| {
            let key = sort_key(records.get(&id), &spec.field, field_map);
            let preferred = pattern
                .as_ref()
                .map(|p| !p.is_empty() && key.contains(p.as_str()))
                .unwrap_or(false);
            (preferred, key, id)
        })
        .collect();

    // Preferential-pattern hits are a higher-priority key layered in
    // front of the field comparison, within the chosen direction.
    keyed.sort_by(|a, b| {
        match (a.0, b.0) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        match spec.order {
            SortOrder::Ascending => a.1.cmp(&b.1),
            SortOrder::Descending => b.1.cmp(&a.1),
        }
    });
    keyed.into_iter().map(|(_, _, id)| id).collect()
}

/// Primary sort value: the first value of the first resolved tag that
/// carries one, lowercased. Records without the field sort on the
/// empty string.
fn sort_key(record: Option<&Record>, field: &str, field_map: &FieldMap) -> String {
    let Some(record) = record else {
        return String::new();
    };
    let resolved: Vec<String> = match field_map.tags_for(field) {
        Some(tags) => tags.to_vec(),
        None if is_physical_tag(field) => vec![field.to_string()],
        None => Vec::new(),
    };
    resolved
        .iter()
        .find_map(|tag| record.first_value(tag))
        .map(|v| v.to_lowercase())
        .unwrap_or_default()
}

/// Slice a sorted sequence into one page. `jrec` is the 1-based index
/// of the first wanted record; an offset beyond the end produces an
/// empty page and no-further-results, not an error.
pub fn paginate(sorted: &[RecId], jrec: usize, page_size: usize) -> (Vec<RecId>, bool) {
    let offset = jrec.saturating_sub(1);
    if offset >= sorted.len() {
        return (Vec::new(), false);
    }
    let end = (offset + page_size).min(sorted.len());
    (sorted[offset..end].to_vec(), end < sorted.len())
}
