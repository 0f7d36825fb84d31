use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::Config;
use crate::index::term_index::{words, FieldIndex, TermIndex};
use crate::query::ast::{MatchKind, Query, TermQuery};
use crate::search::evaluator::Evaluator;

/// What to tell the caller about a zero-hit evaluation. Advisory only:
/// suggestions are surfaced for user-facing re-querying and are never
/// substituted into the returned result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoHitAdvice {
    /// Result set was non-empty, or there is nothing useful to say
    /// (e.g. an identifier-range query).
    None,
    /// A single term missed; these are its lexical neighbours in the
    /// same field's term list, in sorted order.
    TermMiss {
        field: String,
        pattern: String,
        nearest: Vec<String>,
    },
    /// A boolean query missed overall because one leaf had zero hits;
    /// substituting one of `alternatives` for that leaf makes the
    /// expression non-empty.
    BooleanSubstitution {
        leaf_index: usize,
        field: String,
        pattern: String,
        alternatives: Vec<String>,
    },
    /// Every leaf matched individually but the combination has no
    /// hits; the terms need to be combined differently.
    BooleanNoHits,
    /// The query matched `total` records, all outside the requested
    /// collections; the caller may propose widening the collection
    /// scope instead of changing the terms.
    HitsElsewhere { total: u64 },
}

/// Proposes alternate terms when an evaluation came back empty.
pub struct NearestTermFinder<'a> {
    index: &'a TermIndex,
    config: &'a Config,
}

impl<'a> NearestTermFinder<'a> {
    pub fn new(index: &'a TermIndex, config: &'a Config) -> Self {
        NearestTermFinder { index, config }
    }

    /// Advice for a query whose overall result set is empty.
    pub fn advise(&self, query: &Query) -> NoHitAdvice {
        let leaves = query.leaves();
        match leaves.len() {
            0 => NoHitAdvice::None,
            1 if leaves[0].pattern.is_empty() => NoHitAdvice::None,
            1 => {
                let leaf = leaves[0];
                NoHitAdvice::TermMiss {
                    field: leaf.field.clone(),
                    pattern: leaf.pattern.clone(),
                    nearest: self.nearest_terms(leaf),
                }
            }
            _ => self.advise_boolean(query, &leaves),
        }
    }

    /// Lexical neighbours of a failing term within its own field's
    /// sorted term list: an equal count immediately preceding and
    /// following its position (fewer when a side runs out), never
    /// including the searched term itself.
    pub fn nearest_terms(&self, leaf: &TermQuery) -> Vec<String> {
        let fields = self.index.resolve_field(&leaf.field);
        let Some(field) = fields.first() else {
            return Vec::new();
        };
        let each_side = self.config.nearest_terms.div_ceil(2);
        let (mut before, after) = self.neighbors(field, leaf, each_side);
        before.reverse();
        before.extend(after);
        before
    }

    fn neighbors(
        &self,
        field: &FieldIndex,
        leaf: &TermQuery,
        each_side: usize,
    ) -> (Vec<String>, Vec<String>) {
        match leaf.kind {
            MatchKind::Word => {
                let probe = words(&leaf.pattern)
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| leaf.pattern.to_lowercase());
                field.word_neighbors(&probe, each_side)
            }
            // Phrase and regexp terms live in the full-value list.
            _ => field.value_neighbors(&leaf.pattern, each_side),
        }
    }

    /// The asymmetric boolean rule: substitutes are proposed for the
    /// leftmost zero-hit leaf, not for leaves that matched. If every
    /// leaf matched individually, the failure is the combination
    /// itself and is reported as such.
    fn advise_boolean(&self, query: &Query, leaves: &[&TermQuery]) -> NoHitAdvice {
        let evaluator = Evaluator::new(self.index, self.config);
        let worst = leaves
            .iter()
            .position(|leaf| evaluator.evaluate_term(leaf).is_empty());
        let Some(worst) = worst else {
            return NoHitAdvice::BooleanNoHits;
        };

        let leaf = leaves[worst];
        let nearest = self.nearest_terms(leaf);
        // Prefer candidates that actually rescue the whole expression;
        // fall back to plain lexical neighbours when none does.
        let rescuing: Vec<String> = nearest
            .iter()
            .filter(|candidate| {
                let substitute = TermQuery {
                    field: leaf.field.clone(),
                    pattern: (*candidate).clone(),
                    kind: leaf.kind,
                };
                let patched = query.replace_leaf(worst, &substitute);
                !evaluator.evaluate(&patched).is_empty()
            })
            .cloned()
            .collect();
        debug!(
            leaf = worst,
            candidates = nearest.len(),
            rescuing = rescuing.len(),
            "boolean substitution advice"
        );
        NoHitAdvice::BooleanSubstitution {
            leaf_index: worst,
            field: leaf.field.clone(),
            pattern: leaf.pattern.clone(),
            alternatives: if rescuing.is_empty() { nearest } else { rescuing },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RecId, Record};
    use crate::index::fields::FieldMap;
    use crate::query::parser::QueryParser;

    fn index() -> TermIndex {
        let mut map = FieldMap::new();
        map.add_field("author", &["100__a"]);
        map.add_field("title", &["245__a"]);
        let mut idx = TermIndex::new(map);
        for (id, author, title) in [
            (8, "Ellis, J", "Muon decay"),
            (9, "Enqvist, K", "Energie and fields"),
            (10, "Fabbro, B", "Thermal letter"),
        ] {
            let mut rec = Record::new(RecId(id));
            rec.add_value("100__a", author);
            rec.add_value("245__a", title);
            idx.add_record(&rec);
        }
        idx
    }

    fn advise(q: &str) -> NoHitAdvice {
        let idx = index();
        let config = Config::default();
        let query = QueryParser::new("").parse(q, "");
        NearestTermFinder::new(&idx, &config).advise(&query)
    }

    #[test]
    fn single_term_miss_proposes_neighbors() {
        match advise("author:ellisz") {
            NoHitAdvice::TermMiss { nearest, .. } => {
                assert!(!nearest.is_empty());
                assert!(!nearest.contains(&"ellisz".to_string()));
            }
            other => panic!("unexpected advice: {other:?}"),
        }
    }

    #[test]
    fn phrase_miss_proposes_full_values() {
        match advise("author:\"Ellis, Z\"") {
            NoHitAdvice::TermMiss { nearest, .. } => {
                assert!(nearest.contains(&"Enqvist, K".to_string()));
            }
            other => panic!("unexpected advice: {other:?}"),
        }
    }

    #[test]
    fn boolean_substitutes_leftmost_zero_hit_leaf() {
        match advise("title:ellisz author:ellisz") {
            NoHitAdvice::BooleanSubstitution { leaf_index, field, .. } => {
                assert_eq!(leaf_index, 0);
                assert_eq!(field, "title");
            }
            other => panic!("unexpected advice: {other:?}"),
        }
        // First leaf matches, second does not: the second is patched.
        match advise("title:energie author:energie") {
            NoHitAdvice::BooleanSubstitution { leaf_index, field, .. } => {
                assert_eq!(leaf_index, 1);
                assert_eq!(field, "author");
            }
            other => panic!("unexpected advice: {other:?}"),
        }
    }

    #[test]
    fn all_leaves_matching_reports_combination_failure() {
        // ellis, thermal, letter all match individually, never together.
        assert_eq!(advise("ellis thermal letter"), NoHitAdvice::BooleanNoHits);
    }

    #[test]
    fn suggestions_bounded_by_each_side_availability() {
        let idx = index();
        let config = Config::default();
        let finder = NearestTermFinder::new(&idx, &config);
        let leaf = TermQuery::word("author", "aaaa");
        let nearest = finder.nearest_terms(&leaf);
        // Nothing precedes "aaaa"; only the following side contributes.
        assert!(nearest.len() <= config.nearest_terms.div_ceil(2));
    }
}
