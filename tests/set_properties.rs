//! Algebraic properties of result-set evaluation and sorting,
//! checked over randomized inputs.

use proptest::prelude::*;

use bibsearch::index::fields::FieldMap;
use bibsearch::index::term_index::TermIndex;
use bibsearch::query::ast::{MatchKind, Query};
use bibsearch::query::parser::QueryParser;
use bibsearch::search::evaluator::Evaluator;
use bibsearch::{Config, RecId, Record, RecordSet};

fn record_set(ids: &[u32]) -> RecordSet {
    ids.iter().map(|&i| RecId(i)).collect()
}

proptest! {
    #[test]
    fn intersection_commutative(a in prop::collection::vec(0u32..512, 0..64),
                                b in prop::collection::vec(0u32..512, 0..64)) {
        let (a, b) = (record_set(&a), record_set(&b));
        prop_assert_eq!(a.intersect(&b), b.intersect(&a));
    }

    #[test]
    fn intersection_associative(a in prop::collection::vec(0u32..512, 0..64),
                                b in prop::collection::vec(0u32..512, 0..64),
                                c in prop::collection::vec(0u32..512, 0..64)) {
        let (a, b, c) = (record_set(&a), record_set(&b), record_set(&c));
        prop_assert_eq!(
            a.intersect(&b).intersect(&c),
            a.intersect(&b.intersect(&c))
        );
    }

    #[test]
    fn union_and_difference_respect_bounds(a in prop::collection::vec(0u32..512, 0..64),
                                           b in prop::collection::vec(0u32..512, 0..64)) {
        let (a, b) = (record_set(&a), record_set(&b));
        let union = a.union(&b);
        prop_assert!(union.len() <= a.len() + b.len());
        prop_assert!(a.difference(&b).len() <= a.len());
        prop_assert!(a.intersect(&b).len() <= a.len().min(b.len()));
    }

    #[test]
    fn recid_range_is_exactly_the_existing_identifiers(
        existing in prop::collection::btree_set(1u32..256, 1..64),
        lo in 1u32..256,
        span in 0u32..64,
    ) {
        let map = FieldMap::new();
        let mut index = TermIndex::new(map);
        for &id in &existing {
            let mut rec = Record::new(RecId(id));
            rec.add_value("245__a", "range fixture");
            index.add_record(&rec);
        }
        let config = Config::default();
        let hi = lo.saturating_add(span);
        let hits = Evaluator::new(&index, &config)
            .evaluate(&Query::RecidRange { lo, hi });
        let expected: Vec<u32> = existing.iter().copied()
            .filter(|&id| id >= lo && id <= hi)
            .collect();
        let got: Vec<u32> = hits.iter().map(|r| r.value()).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn word_conjunction_is_order_independent(
        words in prop::collection::vec("[a-c]{1,2}", 1..4),
        values in prop::collection::vec("[a-c]{1,2}( [a-c]{1,2}){0,3}", 1..16),
    ) {
        let map = FieldMap::new();
        let mut index = TermIndex::new(map);
        for (i, value) in values.iter().enumerate() {
            let mut rec = Record::new(RecId(i as u32 + 1));
            rec.add_value("245__a", value);
            index.add_record(&rec);
        }
        let config = Config::default();
        let parser = QueryParser::new("");
        let evaluator = Evaluator::new(&index, &config);

        let forward = parser.parse(&words.join(" "), "");
        let reversed_words: Vec<String> = words.iter().rev().cloned().collect();
        let backward = parser.parse(&reversed_words.join(" "), "");
        prop_assert_eq!(evaluator.evaluate(&forward), evaluator.evaluate(&backward));
    }
}

#[test]
fn empty_term_evaluates_to_empty_set() {
    let index = TermIndex::new(FieldMap::new());
    let config = Config::default();
    let query = Query::term("", "", MatchKind::Word);
    assert!(Evaluator::new(&index, &config).evaluate(&query).is_empty());
}
