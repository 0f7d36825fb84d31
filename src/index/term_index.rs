use regex::Regex;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::ops::Bound::{Excluded, Unbounded};
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::core::types::{RecId, Record, RecordSet};
use crate::index::fields::{is_physical_tag, tag_matches, FieldMap};

/// Lowercased word tokens of a field value or query pattern.
pub fn words(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Full field value entry. Values are keyed by their lowercased form
/// so phrase lookups are case-insensitive, but the original casing is
/// kept for nearest-term display and regexp matching.
#[derive(Debug, Clone)]
struct ValueEntry {
    display: String,
    postings: RecordSet,
}

/// Per-field term index: one sorted word map (for word matching) and
/// one sorted full-value map (for exact/partial phrase and regexp).
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    words: BTreeMap<String, RecordSet>,
    values: BTreeMap<String, ValueEntry>,
}

impl FieldIndex {
    fn add_value(&mut self, id: RecId, value: &str) {
        for word in words(value) {
            self.words.entry(word).or_default().insert(id);
        }
        self.values
            .entry(value.to_lowercase())
            .or_insert_with(|| ValueEntry {
                display: value.to_string(),
                postings: RecordSet::new(),
            })
            .postings
            .insert(id);
    }

    /// Exact sorted lookup of one word.
    pub fn lookup_word(&self, term: &str) -> RecordSet {
        self.words
            .get(&term.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Exact full-value lookup, case-insensitive.
    pub fn lookup_exact(&self, phrase: &str) -> RecordSet {
        self.values
            .get(&phrase.to_lowercase())
            .map(|e| e.postings.clone())
            .unwrap_or_default()
    }

    /// Substring scan over the sorted value list. Bounded: scanning
    /// more than `max_scan` values degrades to empty, soft.
    pub fn lookup_partial(&self, pattern: &str, max_scan: usize) -> RecordSet {
        let needle = pattern.to_lowercase();
        let mut hits = RecordSet::new();
        for (scanned, (value, entry)) in self.values.iter().enumerate() {
            if scanned >= max_scan {
                warn!(pattern, max_scan, "partial-phrase scan bound hit, degrading to empty");
                return RecordSet::new();
            }
            if value.contains(&needle) {
                hits.union_with(&entry.postings);
            }
        }
        hits
    }

    /// Regexp scan over the raw (original-case) value list. Same soft
    /// scan bound as partial lookup.
    pub fn lookup_regex(&self, pattern: &str, max_scan: usize) -> RecordSet {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            // Malformed pattern is a user input problem, not an error.
            Err(_) => return RecordSet::new(),
        };
        let mut hits = RecordSet::new();
        for (scanned, entry) in self.values.values().enumerate() {
            if scanned >= max_scan {
                warn!(pattern, max_scan, "regexp scan bound hit, degrading to empty");
                return RecordSet::new();
            }
            if re.is_match(&entry.display) {
                hits.union_with(&entry.postings);
            }
        }
        hits
    }

    /// Sorted terms immediately before and after `term` in the word
    /// map, nearest first on both sides; `term` itself is excluded.
    pub fn word_neighbors(&self, term: &str, each_side: usize) -> (Vec<String>, Vec<String>) {
        let key = term.to_lowercase();
        let before = self
            .words
            .range::<String, _>(..key.clone())
            .rev()
            .take(each_side)
            .map(|(t, _)| t.clone())
            .collect();
        let after = self
            .words
            .range::<String, _>((Excluded(key), Unbounded))
            .take(each_side)
            .map(|(t, _)| t.clone())
            .collect();
        (before, after)
    }

    /// As `word_neighbors`, over the full-value map; returns the
    /// original-cased values.
    pub fn value_neighbors(&self, phrase: &str, each_side: usize) -> (Vec<String>, Vec<String>) {
        let key = phrase.to_lowercase();
        let before = self
            .values
            .range::<String, _>(..key.clone())
            .rev()
            .take(each_side)
            .map(|(_, e)| e.display.clone())
            .collect();
        let after = self
            .values
            .range::<String, _>((Excluded(key), Unbounded))
            .take(each_side)
            .map(|(_, e)| e.display.clone())
            .collect();
        (before, after)
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// The full term index for one generation: a `FieldIndex` per logical
/// field, per physical tag, and one combined any-field index (keyed by
/// the empty string), plus the set of identifiers that exist at all.
pub struct TermIndex {
    field_map: FieldMap,
    fields: HashMap<String, FieldIndex>,
    existing: RecordSet,
}

impl TermIndex {
    pub fn new(field_map: FieldMap) -> Self {
        let mut fields = HashMap::new();
        fields.insert(String::new(), FieldIndex::default());
        TermIndex {
            field_map,
            fields,
            existing: RecordSet::new(),
        }
    }

    /// Index one record under its physical tags, the logical fields
    /// those tags feed, and the combined index.
    pub fn add_record(&mut self, record: &Record) {
        self.existing.insert(record.id);
        for (tag, values) in &record.fields {
            for value in values {
                self.fields
                    .entry(tag.clone())
                    .or_default()
                    .add_value(record.id, value);
                self.fields
                    .get_mut("")
                    .unwrap()
                    .add_value(record.id, value);
            }
        }
        for logical in self.field_map.logical_fields().map(str::to_string).collect::<Vec<_>>() {
            let tags = self.field_map.tags_for(&logical).unwrap_or(&[]).to_vec();
            for tag in tags {
                for value in record.values(&tag) {
                    self.fields
                        .entry(logical.clone())
                        .or_default()
                        .add_value(record.id, value);
                }
            }
        }
    }

    /// Identifiers present in this generation.
    pub fn existing(&self) -> &RecordSet {
        &self.existing
    }

    pub fn field(&self, name: &str) -> Option<&FieldIndex> {
        self.fields.get(name)
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    /// Resolve a query field prefix to the concrete field indexes it
    /// denotes. Empty prefix is the combined index; a logical field
    /// resolves to itself; a physical tag pattern resolves to every
    /// matching tag index (possibly several); anything else resolves
    /// to nothing, which evaluates to an empty result.
    pub fn resolve_field(&self, field: &str) -> Vec<&FieldIndex> {
        if field.is_empty() {
            return self.fields.get("").into_iter().collect();
        }
        if self.field_map.is_logical(field) {
            return self.fields.get(field).into_iter().collect();
        }
        if is_physical_tag(field) {
            let mut keys: Vec<&String> = self
                .fields
                .keys()
                .filter(|k| !k.is_empty() && is_physical_tag(k) && tag_matches(field, k))
                .collect();
            keys.sort();
            return keys.into_iter().filter_map(|k| self.fields.get(k)).collect();
        }
        Vec::new()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RecId;

    fn index() -> TermIndex {
        let mut map = FieldMap::new();
        map.add_field("author", &["100__a", "700__a"]);
        map.add_field("title", &["245__a"]);
        let mut idx = TermIndex::new(map);
        let mut rec = Record::new(RecId(8));
        rec.add_value("100__a", "Ellis, J");
        rec.add_value("245__a", "Quantum theory of muon decay");
        idx.add_record(&rec);
        let mut rec = Record::new(RecId(9));
        rec.add_value("700__a", "Enqvist, K");
        rec.add_value("245__a", "Thermal field theory");
        idx.add_record(&rec);
        idx
    }

    #[test]
    fn word_lookup_is_case_insensitive() {
        let idx = index();
        let author = idx.field("author").unwrap();
        assert_eq!(author.lookup_word("ELLIS").to_vec(), vec![RecId(8)]);
    }

    #[test]
    fn exact_phrase_hits_full_value_only() {
        let idx = index();
        let author = idx.field("author").unwrap();
        assert_eq!(author.lookup_exact("Ellis, J").to_vec(), vec![RecId(8)]);
        assert!(author.lookup_exact("Ellis").is_empty());
    }

    #[test]
    fn partial_phrase_is_substring_match() {
        let idx = index();
        let title = idx.field("title").unwrap();
        assert_eq!(title.lookup_partial("theory", 1000).to_vec().len(), 2);
    }

    #[test]
    fn regex_scans_raw_values() {
        let idx = index();
        let author = idx.field("author").unwrap();
        assert_eq!(author.lookup_regex("^Ell.*J$", 1000).to_vec(), vec![RecId(8)]);
    }

    #[test]
    fn scan_bound_degrades_to_empty() {
        let idx = index();
        let title = idx.field("title").unwrap();
        assert!(title.lookup_partial("theory", 1).is_empty());
    }

    #[test]
    fn tag_prefix_resolves_to_all_matching_tags() {
        let idx = index();
        assert_eq!(idx.resolve_field("100__a").len(), 1);
        // An unknown logical field resolves to nothing.
        assert!(idx.resolve_field("keyword").is_empty());
        assert_eq!(idx.resolve_field("700").len(), 1);
    }

    #[test]
    fn neighbors_exclude_the_probe_term() {
        let idx = index();
        let any = idx.field("").unwrap();
        let (before, after) = any.word_neighbors("theory", 2);
        assert!(!before.contains(&"theory".to_string()));
        assert!(!after.contains(&"theory".to_string()));
    }
}
