use serde::{Deserialize, Serialize};

/// Tunables for one service instance. All of these have conservative
/// defaults; none of them change query semantics except
/// `max_term_scan`, which bounds substring/regexp scans (a leaf that
/// hits the bound degrades to empty rather than running unbounded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logical field searched when a query gives no field prefix.
    /// Empty string means the combined any-field index.
    pub default_field: String,
    /// Upper bound on terms visited by a substring or regexp scan.
    pub max_term_scan: usize,
    /// Nearest-term suggestions returned per failing term.
    pub nearest_terms: usize,
    /// Search cache capacity (entries) and entry time-to-live.
    pub cache_capacity: usize,
    pub cache_ttl_secs: i64,
    /// Default page size when the request gives none.
    pub page_size: usize,
    /// Physical tag holding the external system number (sysno lookup).
    pub sysno_tag: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_field: String::new(),
            max_term_scan: 50_000,
            nearest_terms: 10,
            cache_capacity: 1000,
            cache_ttl_secs: 600,
            page_size: 10,
            sysno_tag: "970__a".to_string(),
        }
    }
}
