use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// A physical tag is a fixed-width metadata element code: three digits
/// followed by up to three indicator/subfield characters, with `%`
/// allowed as a wildcard (e.g. "100__a", "245", "700__%").
static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{3}[0-9a-zA-Z_%]{0,3}$").unwrap());

/// True when a query field prefix denotes a physical tag rather than a
/// logical field name, bypassing logical-field resolution.
pub fn is_physical_tag(field: &str) -> bool {
    TAG_PATTERN.is_match(field)
}

/// SQL-LIKE style match of a tag pattern against a concrete tag. A
/// pattern shorter than the tag and without `%` is a prefix pattern:
/// "100" matches every "100__?" tag.
pub fn tag_matches(pattern: &str, tag: &str) -> bool {
    fn like(p: &[u8], t: &[u8]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some(b'%'), _) => like(&p[1..], t) || (!t.is_empty() && like(p, &t[1..])),
            (None, Some(_)) => false,
            (Some(_), None) => false,
            (Some(&pc), Some(&tc)) => pc == tc && like(&p[1..], &t[1..]),
        }
    }
    if pattern.contains('%') {
        like(pattern.as_bytes(), tag.as_bytes())
    } else if pattern.len() < tag.len() {
        tag.starts_with(pattern)
    } else {
        pattern == tag
    }
}

/// Mapping from logical field names ("author", "title", ...) to the
/// physical tags whose values feed that field. Reference data supplied
/// at load time, immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    tags_by_field: HashMap<String, Vec<String>>,
}

impl FieldMap {
    pub fn new() -> Self {
        FieldMap::default()
    }

    pub fn add_field(&mut self, logical: &str, tags: &[&str]) {
        self.tags_by_field
            .entry(logical.to_string())
            .or_default()
            .extend(tags.iter().map(|t| t.to_string()));
    }

    pub fn tags_for(&self, logical: &str) -> Option<&[String]> {
        self.tags_by_field.get(logical).map(Vec::as_slice)
    }

    pub fn is_logical(&self, field: &str) -> bool {
        self.tags_by_field.contains_key(field)
    }

    pub fn logical_fields(&self) -> impl Iterator<Item = &str> {
        self.tags_by_field.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_tag_shapes() {
        assert!(is_physical_tag("100__a"));
        assert!(is_physical_tag("245"));
        assert!(is_physical_tag("700__%"));
        assert!(!is_physical_tag("author"));
        assert!(!is_physical_tag("24"));
        assert!(!is_physical_tag("0247_a2"));
    }

    #[test]
    fn prefix_and_wildcard_matching() {
        assert!(tag_matches("100", "100__a"));
        assert!(tag_matches("100__%", "100__u"));
        assert!(tag_matches("100__a", "100__a"));
        assert!(!tag_matches("100__a", "100__u"));
        assert!(!tag_matches("110", "100__a"));
    }

    #[test]
    fn field_map_resolution() {
        let mut map = FieldMap::new();
        map.add_field("author", &["100__a", "700__a"]);
        assert_eq!(map.tags_for("author").unwrap().len(), 2);
        assert!(map.tags_for("keyword").is_none());
    }
}
