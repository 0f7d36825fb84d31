use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Record identifier. Positive, unique, assigned by the external
/// metadata store in monotonically increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecId(pub u32);

impl RecId {
    pub fn new(id: u32) -> Self {
        RecId(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for RecId {
    fn from(id: u32) -> Self {
        RecId(id)
    }
}

/// A bibliographic record as the core sees it: an identifier plus a
/// mapping from physical field tag (e.g. "100__a") to one or more
/// string values. Immutable; owned by the external metadata store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: RecId,
    pub fields: HashMap<String, Vec<String>>,
}

impl Record {
    pub fn new(id: RecId) -> Self {
        Record {
            id,
            fields: HashMap::new(),
        }
    }

    pub fn add_value(&mut self, tag: &str, value: &str) {
        self.fields
            .entry(tag.to_string())
            .or_default()
            .push(value.to_string());
    }

    pub fn values(&self, tag: &str) -> &[String] {
        self.fields.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value under the given tag, if any.
    pub fn first_value(&self, tag: &str) -> Option<&str> {
        self.fields.get(tag).and_then(|v| v.first()).map(String::as_str)
    }
}

/// Deduplicated, ascending set of record identifiers. Both posting
/// lists and intermediate/final result sets use this representation,
/// so boolean evaluation is plain bitmap algebra.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    bits: RoaringBitmap,
}

impl RecordSet {
    pub fn new() -> Self {
        RecordSet::default()
    }

    pub fn from_range(range: RangeInclusive<u32>) -> Self {
        let mut bits = RoaringBitmap::new();
        if range.start() <= range.end() {
            bits.insert_range(*range.start()..=*range.end());
        }
        RecordSet { bits }
    }

    pub fn insert(&mut self, id: RecId) {
        self.bits.insert(id.0);
    }

    pub fn contains(&self, id: RecId) -> bool {
        self.bits.contains(id.0)
    }

    pub fn len(&self) -> u64 {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn intersect(&self, other: &RecordSet) -> RecordSet {
        RecordSet {
            bits: &self.bits & &other.bits,
        }
    }

    pub fn union(&self, other: &RecordSet) -> RecordSet {
        RecordSet {
            bits: &self.bits | &other.bits,
        }
    }

    pub fn difference(&self, other: &RecordSet) -> RecordSet {
        RecordSet {
            bits: &self.bits - &other.bits,
        }
    }

    pub fn union_with(&mut self, other: &RecordSet) {
        self.bits |= &other.bits;
    }

    /// Identifiers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = RecId> + '_ {
        self.bits.iter().map(RecId)
    }

    pub fn to_vec(&self) -> Vec<RecId> {
        self.iter().collect()
    }
}

impl FromIterator<RecId> for RecordSet {
    fn from_iter<I: IntoIterator<Item = RecId>>(iter: I) -> Self {
        let mut set = RecordSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}
