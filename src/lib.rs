pub mod collection;
pub mod core;
pub mod format;
pub mod index;
pub mod query;
pub mod search;
pub mod service;

/*
┌──────────────────────────── REQUEST FLOW ─────────────────────────────┐
│                                                                        │
│  SearchRequest ──> SearchService::perform_request                      │
│      │                                                                 │
│      ├── CollectionRegistry::unauthorized_among ──> AuthorizationReq.  │
│      │                                                                 │
│      ├── QueryParser ──> Query tree (total, degrade-never-fail)        │
│      │                                                                 │
│      ├── SearchCache probe (signature = query ⊕ collection set)        │
│      │        miss ↓                                                   │
│      ├── Evaluator ──consults──> TermIndex (posting-list set algebra)  │
│      │        │                                                        │
│      │        └── CollectionRegistry::restrict (memoized membership)   │
│      │                                                                 │
│      ├── empty? ──> NearestTermFinder (advisory suggestions only)      │
│      │                                                                 │
│      └── sorter::sort ──> sorter::paginate ──> format::render          │
│                                                                        │
│  Generation = immutable Arc snapshot: TermIndex + records + registry.  │
│  Advancing the generation swaps the Arc and clears the cache.          │
└────────────────────────────────────────────────────────────────────────┘
*/

pub use crate::collection::{CollectionDef, CollectionSelector};
pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::types::{RecId, Record, RecordSet};
pub use crate::service::{
    AuthorizedCollections, Generation, RenderedResults, SearchRequest, SearchResponse,
    SearchService,
};
