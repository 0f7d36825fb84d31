use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::collection::{requested_collections, CollectionDef, CollectionRegistry, CollectionSelector};
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{RecId, Record, RecordSet};
use crate::format::{self, FormatContext, OutputFormat};
use crate::index::fields::FieldMap;
use crate::index::term_index::TermIndex;
use crate::query::ast::Query;
use crate::query::parser::QueryParser;
use crate::search::cache::{CacheStats, RequestSignature, SearchCache};
use crate::search::evaluator::Evaluator;
use crate::search::nearest::{NearestTermFinder, NoHitAdvice};
use crate::search::sorter::{self, SortOrder, SortSpec};

/// The full inbound query signature, as handed over by the
/// web-dispatch collaborator after legacy-URL normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Collection column (scalar or list at the boundary).
    pub c: CollectionSelector,
    /// Collection context.
    pub cc: String,
    /// Free-text query and field.
    pub p: String,
    pub f: String,
    /// Output format code.
    pub of: String,
    /// Sort field, order ("a"/"d") and preferential pattern.
    pub sf: String,
    pub so: String,
    pub sp: String,
    /// Identifier range.
    pub recid: Option<u32>,
    pub recidb: Option<u32>,
    /// External system-number lookup.
    pub sysno: String,
    /// Paging: 1-based first record and page size.
    pub jrec: usize,
    pub rg: usize,
    /// Split results by collection.
    pub sc: bool,
    /// Interface language (carried through, not interpreted here).
    pub ln: String,
    /// Structured three-part query.
    pub p1: String,
    pub f1: String,
    pub m1: String,
    pub op1: String,
    pub p2: String,
    pub f2: String,
    pub m2: String,
    pub op2: String,
    pub p3: String,
    pub f3: String,
    pub m3: String,
}

/// Restricted-collection names the caller has proven credentials for.
pub type AuthorizedCollections = HashSet<String>;

/// Outcome of one search request: a rendered payload, or the signal
/// that the dispatch layer must detour through authentication before
/// any identifier can be returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SearchResponse {
    Rendered(RenderedResults),
    AuthorizationRequired { collections: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedResults {
    pub payload: String,
    /// Total hits after collection filtering.
    pub total: u64,
    /// Identifiers on the returned page, in display order.
    pub page: Vec<RecId>,
    pub has_more: bool,
    pub advice: NoHitAdvice,
}

/// One immutable snapshot of index and collection reference data.
/// Everything a request touches hangs off a `Generation`, so requests
/// evaluate concurrently without coordination.
pub struct Generation {
    pub term_index: TermIndex,
    pub records: HashMap<RecId, Record>,
    pub collections: CollectionRegistry,
}

impl Generation {
    pub fn load(
        field_map: FieldMap,
        records: Vec<Record>,
        collections: Vec<CollectionDef>,
    ) -> Result<Self> {
        let mut term_index = TermIndex::new(field_map);
        let mut by_id = HashMap::new();
        for record in records {
            term_index.add_record(&record);
            by_id.insert(record.id, record);
        }
        let collections = CollectionRegistry::load(collections)?;
        let terms = term_index.field("").map(|f| f.word_count()).unwrap_or(0);
        info!(records = by_id.len(), terms, "generation loaded");
        Ok(Generation {
            term_index,
            records: by_id,
            collections,
        })
    }
}

/// The query execution core: parser, evaluator, nearest-term advice,
/// collection access filter, sorter/formatter and the request-level
/// cache, wired over a swappable generation snapshot.
pub struct SearchService {
    config: Config,
    parser: QueryParser,
    generation: RwLock<Option<Arc<Generation>>>,
    cache: SearchCache,
}

impl SearchService {
    /// A service with no snapshot installed yet; requests fail with
    /// `IndexUnavailable` until `install_generation` is called.
    pub fn new(config: Config) -> Self {
        let parser = QueryParser::new(&config.default_field);
        let cache = SearchCache::new(config.cache_capacity, config.cache_ttl_secs);
        SearchService {
            config,
            parser,
            generation: RwLock::new(None),
            cache,
        }
    }

    pub fn with_generation(config: Config, generation: Generation) -> Self {
        let service = SearchService::new(config);
        service.install_generation(generation);
        service
    }

    /// Swap in a new snapshot. The search cache is scoped to a
    /// generation and is invalidated as a unit.
    pub fn install_generation(&self, generation: Generation) {
        *self.generation.write() = Some(Arc::new(generation));
        self.cache.clear();
        info!("generation advanced, search cache cleared");
    }

    pub fn generation(&self) -> Option<Arc<Generation>> {
        self.generation.read().clone()
    }

    /// Execute one request end to end: authorization check, parse,
    /// cache probe or evaluate, collection filter, advice on empty,
    /// sort, paginate, render.
    pub fn perform_request(
        &self,
        req: &SearchRequest,
        authorized: &AuthorizedCollections,
    ) -> Result<SearchResponse> {
        let generation = self
            .generation()
            .ok_or_else(|| Error::IndexUnavailable("no generation installed".to_string()))?;

        let requested = requested_collections(&req.c, &req.cc);
        let offenders = generation.collections.unauthorized_among(&requested, authorized);
        if !offenders.is_empty() {
            debug!(collections = ?offenders, "authorization required");
            return Ok(SearchResponse::AuthorizationRequired {
                collections: offenders,
            });
        }

        let query = self.build_query(req);
        let evaluator = Evaluator::new(&generation.term_index, &self.config);
        let eval = |defining: &str| {
            let tree = self.parser.parse(defining, "");
            evaluator.evaluate(&tree)
        };

        // The cache holds the unfiltered evaluation; collection
        // scoping is memoized per generation and reapplied on every
        // retrieval, so the pre-filter set stays available for advice.
        let signature = RequestSignature {
            query: serde_json::to_string(&query).unwrap_or_default(),
            field: req.f.clone(),
        };
        let hits: RecordSet = match self.cache.get(&signature) {
            Some(ids) => ids.into_iter().collect(),
            None => {
                let hits = evaluator.evaluate(&query);
                self.cache.put(signature, hits.to_vec());
                hits
            }
        };
        let result_set = generation.collections.restrict(&hits, &requested, &eval);
        let ids = result_set.to_vec();

        // Advice looks at the evaluation, not the scoped result: a
        // term that matched records must not be reported as a miss
        // just because the requested collections exclude them all.
        let advice = if !ids.is_empty() {
            NoHitAdvice::None
        } else if !hits.is_empty() {
            NoHitAdvice::HitsElsewhere { total: hits.len() }
        } else {
            NearestTermFinder::new(&generation.term_index, &self.config).advise(&query)
        };
        let sort_spec = (!req.sf.is_empty()).then(|| SortSpec {
            field: req.sf.clone(),
            order: SortOrder::from_code(&req.so),
            pattern: (!req.sp.is_empty()).then(|| req.sp.clone()),
        });
        let sorted = sorter::sort(
            &result_set,
            &generation.records,
            generation.term_index.field_map(),
            sort_spec.as_ref(),
        );
        let page_size = if req.rg > 0 { req.rg } else { self.config.page_size };
        let (page, has_more) = sorter::paginate(&sorted, req.jrec.max(1), page_size);

        let groups: Vec<(String, Vec<RecId>)> = if req.sc && !requested.is_empty() {
            requested
                .iter()
                .map(|name| {
                    let members = generation.collections.membership(name, &eval);
                    let in_group = page.iter().copied().filter(|id| members.contains(*id)).collect();
                    (name.clone(), in_group)
                })
                .collect()
        } else {
            vec![(String::new(), page.clone())]
        };

        let output = OutputFormat::from_code(&req.of);
        let ctx = FormatContext {
            records: &generation.records,
            groups: &groups,
            all_ids: &ids,
            total: ids.len() as u64,
        };
        let payload = format::render(output, &ctx);
        debug!(total = ids.len(), page = page.len(), "request rendered");

        Ok(SearchResponse::Rendered(RenderedResults {
            payload,
            total: ids.len() as u64,
            page,
            has_more,
            advice,
        }))
    }

    /// Translate request parameters into a query tree. Identifier
    /// ranges and system-number lookups bypass text parsing entirely.
    fn build_query(&self, req: &SearchRequest) -> Query {
        if let Some(recid) = req.recid {
            let hi = req.recidb.unwrap_or(recid);
            return Query::RecidRange { lo: recid, hi };
        }
        if !req.sysno.is_empty() {
            return Query::term(
                &self.config.sysno_tag,
                &req.sysno,
                crate::query::ast::MatchKind::ExactPhrase,
            );
        }
        let parts = [
            (&req.p1, &req.f1, &req.m1),
            (&req.p2, &req.f2, &req.m2),
            (&req.p3, &req.f3, &req.m3),
        ];
        if parts.iter().any(|(p, _, _)| !p.is_empty()) {
            let ops = [&req.op1, &req.op2];
            let mut acc: Option<Query> = None;
            let mut op_cursor = 0;
            for (i, (p, f, m)) in parts.iter().enumerate() {
                if i > 0 {
                    op_cursor = i - 1;
                }
                if p.is_empty() {
                    continue;
                }
                let part = self.parser.parse_part(p, f, m);
                acc = Some(match acc {
                    None => part,
                    Some(q) => match ops[op_cursor].as_str() {
                        "o" => q.or(part),
                        "n" => q.and_not(part),
                        // Unknown operator degrades to And.
                        _ => q.and(part),
                    },
                });
            }
            if let Some(q) = acc {
                return q;
            }
        }
        self.parser.parse(&req.p, &req.f)
    }

    // Administrative cache interface, used by operational tooling.

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_entries(&self) -> Vec<(RequestSignature, chrono::DateTime<chrono::Utc>, usize)> {
        self.cache.entries()
    }

    pub fn cache_remove(&self, signature: &RequestSignature) -> bool {
        self.cache.remove(signature)
    }

    pub fn cache_clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::MatchKind;

    fn service_without_generation() -> SearchService {
        SearchService::new(Config::default())
    }

    #[test]
    fn missing_generation_is_a_hard_failure() {
        let service = service_without_generation();
        let err = service
            .perform_request(&SearchRequest::default(), &AuthorizedCollections::new())
            .unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));
    }

    #[test]
    fn recid_range_bypasses_text_parsing() {
        let service = service_without_generation();
        let req = SearchRequest {
            recid: Some(1),
            recidb: Some(10),
            p: "ignored".to_string(),
            ..Default::default()
        };
        assert_eq!(service.build_query(&req), Query::RecidRange { lo: 1, hi: 10 });
        let req = SearchRequest {
            recid: Some(8),
            ..Default::default()
        };
        assert_eq!(service.build_query(&req), Query::RecidRange { lo: 8, hi: 8 });
    }

    #[test]
    fn sysno_resolves_through_reserved_tag() {
        let service = service_without_generation();
        let req = SearchRequest {
            sysno: "CER-123".to_string(),
            ..Default::default()
        };
        assert_eq!(
            service.build_query(&req),
            Query::term("970__a", "CER-123", MatchKind::ExactPhrase)
        );
    }

    #[test]
    fn structured_parts_combine_left_to_right() {
        let service = service_without_generation();
        let req = SearchRequest {
            p1: "ellis".to_string(),
            f1: "author".to_string(),
            m1: "a".to_string(),
            op1: "n".to_string(),
            p2: "muon".to_string(),
            f2: "title".to_string(),
            m2: "a".to_string(),
            ..Default::default()
        };
        assert_eq!(
            service.build_query(&req),
            Query::term("author", "ellis", MatchKind::Word)
                .and_not(Query::term("title", "muon", MatchKind::Word))
        );
    }
}
