use serde::{Deserialize, Serialize};

/// How a term pattern is matched against indexed terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// Word token lookup in the sorted word map.
    Word,
    /// Exact full field value.
    ExactPhrase,
    /// Substring of the field value.
    PartialPhrase,
    /// Regular expression over the raw field value.
    Regex,
}

/// Single term leaf: a pattern scoped to a field (logical name,
/// physical tag pattern, or empty for the combined index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub pattern: String,
    pub kind: MatchKind,
}

impl TermQuery {
    pub fn word(field: &str, pattern: &str) -> Self {
        TermQuery {
            field: field.to_string(),
            pattern: pattern.to_string(),
            kind: MatchKind::Word,
        }
    }
}

/// Parsed query tree. Well-formed by construction: the parser never
/// fails, so there are no dangling-operator states to represent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
    AndNot(Box<Query>, Box<Query>),
    /// Identifier range `[lo, hi]`, inclusive; bypasses the term index.
    RecidRange { lo: u32, hi: u32 },
}

impl Query {
    pub fn term(field: &str, pattern: &str, kind: MatchKind) -> Self {
        Query::Term(TermQuery {
            field: field.to_string(),
            pattern: pattern.to_string(),
            kind,
        })
    }

    pub fn and(self, rhs: Query) -> Self {
        Query::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: Query) -> Self {
        Query::Or(Box::new(self), Box::new(rhs))
    }

    pub fn and_not(self, rhs: Query) -> Self {
        Query::AndNot(Box::new(self), Box::new(rhs))
    }

    /// Term leaves in left-to-right order.
    pub fn leaves(&self) -> Vec<&TermQuery> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a TermQuery>) {
        match self {
            Query::Term(t) => out.push(t),
            Query::And(l, r) | Query::Or(l, r) | Query::AndNot(l, r) => {
                l.collect_leaves(out);
                r.collect_leaves(out);
            }
            Query::RecidRange { .. } => {}
        }
    }

    /// Rebuild the tree with the leaf at `index` (left-to-right
    /// numbering) replaced by `new_leaf`. Used by the nearest-term
    /// finder to probe substitute terms.
    pub fn replace_leaf(&self, index: usize, new_leaf: &TermQuery) -> Query {
        let mut counter = 0;
        self.replace_leaf_inner(index, new_leaf, &mut counter)
    }

    fn replace_leaf_inner(&self, index: usize, new_leaf: &TermQuery, counter: &mut usize) -> Query {
        match self {
            Query::Term(t) => {
                let current = *counter;
                *counter += 1;
                if current == index {
                    Query::Term(new_leaf.clone())
                } else {
                    Query::Term(t.clone())
                }
            }
            Query::And(l, r) => Query::And(
                Box::new(l.replace_leaf_inner(index, new_leaf, counter)),
                Box::new(r.replace_leaf_inner(index, new_leaf, counter)),
            ),
            Query::Or(l, r) => Query::Or(
                Box::new(l.replace_leaf_inner(index, new_leaf, counter)),
                Box::new(r.replace_leaf_inner(index, new_leaf, counter)),
            ),
            Query::AndNot(l, r) => Query::AndNot(
                Box::new(l.replace_leaf_inner(index, new_leaf, counter)),
                Box::new(r.replace_leaf_inner(index, new_leaf, counter)),
            ),
            Query::RecidRange { lo, hi } => Query::RecidRange { lo: *lo, hi: *hi },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_walk_left_to_right() {
        let q = Query::term("title", "a", MatchKind::Word)
            .and(Query::term("author", "b", MatchKind::Word))
            .or(Query::term("", "c", MatchKind::Word));
        let leaves: Vec<&str> = q.leaves().iter().map(|t| t.pattern.as_str()).collect();
        assert_eq!(leaves, vec!["a", "b", "c"]);
    }

    #[test]
    fn replace_leaf_targets_by_position() {
        let q = Query::term("", "a", MatchKind::Word).and(Query::term("", "b", MatchKind::Word));
        let swapped = q.replace_leaf(1, &TermQuery::word("", "z"));
        let leaves: Vec<&str> = swapped.leaves().iter().map(|t| t.pattern.as_str()).collect();
        assert_eq!(leaves, vec!["a", "z"]);
    }
}
