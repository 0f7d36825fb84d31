use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::core::error::{Error, Result};
use crate::core::types::RecordSet;

/// One collection as configured: a defining query (membership is that
/// query's result), child collections (a DAG, since a child may be
/// shared by several parents), and a restricted flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDef {
    pub name: String,
    pub query: String,
    pub restricted: bool,
    #[serde(default)]
    pub children: Vec<String>,
}

impl CollectionDef {
    pub fn new(name: &str, query: &str) -> Self {
        CollectionDef {
            name: name.to_string(),
            query: query.to_string(),
            restricted: false,
            children: Vec::new(),
        }
    }

    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    pub fn with_children(mut self, children: &[&str]) -> Self {
        self.children = children.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// The loosely-typed scalar-or-list collection parameters of the
/// inbound interface, resolved once at the boundary into a uniform
/// set of names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CollectionSelector {
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl CollectionSelector {
    pub fn names(&self) -> Vec<String> {
        match self {
            CollectionSelector::None => Vec::new(),
            CollectionSelector::Single(name) => {
                if name.is_empty() {
                    Vec::new()
                } else {
                    vec![name.clone()]
                }
            }
            CollectionSelector::Multiple(names) => {
                names.iter().filter(|n| !n.is_empty()).cloned().collect()
            }
        }
    }
}

impl Default for CollectionSelector {
    fn default() -> Self {
        CollectionSelector::None
    }
}

/// Normalize the collection column `c` and context `cc` into one
/// sorted, deduplicated set of requested names.
pub fn requested_collections(c: &CollectionSelector, cc: &str) -> Vec<String> {
    let mut names = c.names();
    if !cc.is_empty() {
        names.push(cc.to_string());
    }
    names.sort();
    names.dedup();
    names
}

/// Read-only collection reference data for one generation, with
/// memoized membership sets. Loading rejects duplicate names,
/// references to undefined children, and hierarchy cycles; a cycle
/// is a fatal configuration error, not a runtime condition.
#[derive(Debug)]
pub struct CollectionRegistry {
    defs: HashMap<String, CollectionDef>,
    memberships: RwLock<HashMap<String, RecordSet>>,
}

impl CollectionRegistry {
    pub fn load(defs: Vec<CollectionDef>) -> Result<Self> {
        let mut by_name = HashMap::new();
        for def in defs {
            let name = def.name.clone();
            if by_name.insert(name.clone(), def).is_some() {
                return Err(Error::InvalidConfiguration(format!(
                    "duplicate collection '{name}'"
                )));
            }
        }
        for def in by_name.values() {
            for child in &def.children {
                if !by_name.contains_key(child) {
                    return Err(Error::InvalidConfiguration(format!(
                        "collection '{}' references undefined child '{}'",
                        def.name, child
                    )));
                }
            }
        }
        let registry = CollectionRegistry {
            defs: by_name,
            memberships: RwLock::new(HashMap::new()),
        };
        registry.check_acyclic()?;
        Ok(registry)
    }

    /// Iterative three-color reachability check over the child graph.
    fn check_acyclic(&self) -> Result<()> {
        let mut done: HashSet<&str> = HashSet::new();
        for start in self.defs.keys() {
            if done.contains(start.as_str()) {
                continue;
            }
            // (name, child cursor) frames; a name reappearing below
            // itself on the stack closes a cycle.
            let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
            let mut on_path: HashSet<&str> = HashSet::new();
            on_path.insert(start);
            while let Some((name, cursor)) = stack.pop() {
                let children = &self.defs[name].children;
                if cursor >= children.len() {
                    on_path.remove(name);
                    done.insert(name);
                    continue;
                }
                stack.push((name, cursor + 1));
                let child = children[cursor].as_str();
                if on_path.contains(child) {
                    return Err(Error::CollectionCycle(child.to_string()));
                }
                if !done.contains(child) {
                    on_path.insert(child);
                    stack.push((child, 0));
                }
            }
        }
        Ok(())
    }

    /// Unknown names are not restricted; they resolve to empty
    /// membership instead of failing.
    pub fn is_restricted(&self, name: &str) -> bool {
        self.defs.get(name).map(|d| d.restricted).unwrap_or(false)
    }

    /// Requested restricted collections the caller is not authorized
    /// for. Restriction is all-or-nothing per request: any offender
    /// blocks the whole request.
    pub fn unauthorized_among(&self, requested: &[String], authorized: &HashSet<String>) -> Vec<String> {
        requested
            .iter()
            .filter(|name| self.is_restricted(name) && !authorized.contains(*name))
            .cloned()
            .collect()
    }

    /// Membership of one collection: its defining query's result set,
    /// united with every descendant's membership. Memoized for the
    /// lifetime of the registry (one generation); computed in
    /// topological order with an explicit stack. `eval` evaluates a
    /// defining query string against the generation's index.
    pub fn membership<F>(&self, name: &str, eval: &F) -> RecordSet
    where
        F: Fn(&str) -> RecordSet,
    {
        if !self.defs.contains_key(name) {
            debug!(collection = name, "unknown collection, empty membership");
            return RecordSet::new();
        }
        if let Some(cached) = self.memberships.read().get(name) {
            return cached.clone();
        }

        // Children-first order over the sub-DAG below `name`. Loading
        // guaranteed acyclicity, so this terminates.
        let mut order: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&str, bool)> = vec![(name, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.push((current, true));
            for child in &self.defs[current].children {
                stack.push((child.as_str(), false));
            }
        }

        for current in order {
            if self.memberships.read().contains_key(current) {
                continue;
            }
            let def = &self.defs[current];
            let mut members = eval(&def.query);
            {
                let memo = self.memberships.read();
                for child in &def.children {
                    if let Some(child_members) = memo.get(child) {
                        members.union_with(child_members);
                    }
                }
            }
            self.memberships.write().insert(current.to_string(), members);
        }
        self.memberships.read().get(name).cloned().unwrap_or_default()
    }

    /// Restrict a result set to the union of the requested
    /// collections' membership sets. An empty request leaves the
    /// result set untouched.
    pub fn restrict<F>(&self, results: &RecordSet, requested: &[String], eval: &F) -> RecordSet
    where
        F: Fn(&str) -> RecordSet,
    {
        if requested.is_empty() {
            return results.clone();
        }
        let mut allowed = RecordSet::new();
        for name in requested {
            allowed.union_with(&self.membership(name, eval));
        }
        results.intersect(&allowed)
    }
}
