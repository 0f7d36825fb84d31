use tracing::debug;

use crate::core::config::Config;
use crate::core::types::RecordSet;
use crate::index::fields::is_physical_tag;
use crate::index::term_index::{words, TermIndex};
use crate::query::ast::{MatchKind, Query, TermQuery};

/// Executes a query tree against one index snapshot as set algebra
/// over posting lists. Stateless and read-only; any number may run
/// concurrently over the same snapshot.
pub struct Evaluator<'a> {
    index: &'a TermIndex,
    config: &'a Config,
}

impl<'a> Evaluator<'a> {
    pub fn new(index: &'a TermIndex, config: &'a Config) -> Self {
        Evaluator { index, config }
    }

    pub fn evaluate(&self, query: &Query) -> RecordSet {
        match query {
            Query::Term(term) => self.evaluate_term(term),
            Query::And(l, r) => {
                let left = self.evaluate(l);
                // An empty left child short-circuits the intersection
                // without evaluating the sibling.
                if left.is_empty() {
                    return left;
                }
                left.intersect(&self.evaluate(r))
            }
            Query::Or(l, r) => self.evaluate(l).union(&self.evaluate(r)),
            Query::AndNot(l, r) => {
                let left = self.evaluate(l);
                if left.is_empty() {
                    return left;
                }
                left.difference(&self.evaluate(r))
            }
            Query::RecidRange { lo, hi } => {
                // Identifiers are generated directly, then filtered for
                // existence; absent identifiers drop out silently.
                RecordSet::from_range(*lo..=*hi).intersect(self.index.existing())
            }
        }
    }

    /// Posting lookup for one term leaf, honoring its match kind.
    pub fn evaluate_term(&self, term: &TermQuery) -> RecordSet {
        if term.pattern.is_empty() {
            return RecordSet::new();
        }
        let fields = self.index.resolve_field(&term.field);
        if fields.is_empty() {
            debug!(field = %term.field, "field resolved to no index, empty result");
            return RecordSet::new();
        }
        // A regexp against an ambiguous multi-tag prefix is defined as
        // unsupported: yield an empty leaf rather than guessing.
        if term.kind == MatchKind::Regex && is_physical_tag(&term.field) && fields.len() > 1 {
            debug!(field = %term.field, "ambiguous tag prefix with regexp, empty result");
            return RecordSet::new();
        }

        let mut hits = RecordSet::new();
        for field in &fields {
            let field_hits = match term.kind {
                MatchKind::Word => {
                    // A word pattern may normalize to several tokens
                    // ("Ellis, J"); all of them must match.
                    let tokens = words(&term.pattern);
                    match tokens.split_first() {
                        None => RecordSet::new(),
                        Some((first, rest)) => {
                            let mut acc = field.lookup_word(first);
                            for token in rest {
                                if acc.is_empty() {
                                    break;
                                }
                                acc = acc.intersect(&field.lookup_word(token));
                            }
                            acc
                        }
                    }
                }
                MatchKind::ExactPhrase => field.lookup_exact(&term.pattern),
                MatchKind::PartialPhrase => {
                    field.lookup_partial(&term.pattern, self.config.max_term_scan)
                }
                MatchKind::Regex => field.lookup_regex(&term.pattern, self.config.max_term_scan),
            };
            hits.union_with(&field_hits);
        }
        hits
    }
}
