//! InMemoryAdapter - fixture-backed adapter for testing and development.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use futures::future::{self, FutureExt};
use serde_json::{json, Map, Value};

use super::{Adapter, AdapterFuture};
use crate::error::FetchError;
use crate::record::Relationship;
use crate::serializer::pluralize;
use crate::snapshot::Snapshot;
use crate::store::{RecordArray, Store};

/// A request as the adapter received it.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterRequest {
    Find {
        type_key: String,
        id: String,
        snapshot: Snapshot,
    },
    FindMany {
        type_key: String,
        ids: Vec<String>,
        snapshots: Vec<Snapshot>,
    },
    FindHasMany {
        link: String,
        relationship: Relationship,
        snapshot: Snapshot,
    },
    FindBelongsTo {
        link: String,
        relationship: Relationship,
        snapshot: Snapshot,
    },
    FindAll {
        type_key: String,
        since: Option<String>,
    },
    FindQuery {
        type_key: String,
        query: Value,
    },
}

struct Fixture {
    value: Map<String, Value>,
    revision: u64,
}

#[derive(Default)]
struct Fixtures {
    records: HashMap<String, BTreeMap<String, Fixture>>,
    links: HashMap<String, Value>,
    revision: u64,
}

/// Adapter answering from in-memory fixtures, in root-keyed REST form.
///
/// Every insert bumps a revision counter. `find_all` only returns fixtures
/// newer than the since token it is given and reports the current revision
/// as `meta.since`.
pub struct InMemoryAdapter {
    key: String,
    fixtures: RwLock<Fixtures>,
    requests: RwLock<Vec<AdapterRequest>>,
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::with_key("in-memory")
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fixtures: RwLock::new(Fixtures::default()),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Insert or replace a fixture. Non-object attributes are ignored.
    pub fn insert(&self, type_key: &str, id: &str, attributes: Value) {
        let mut value = match attributes {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        value.insert("id".into(), Value::String(id.to_string()));

        let mut fixtures = self.fixtures.write().unwrap_or_else(PoisonError::into_inner);
        fixtures.revision += 1;
        let revision = fixtures.revision;
        fixtures
            .records
            .entry(type_key.to_string())
            .or_default()
            .insert(id.to_string(), Fixture { value, revision });
    }

    pub fn with_record(self, type_key: &str, id: &str, attributes: Value) -> Self {
        self.insert(type_key, id, attributes);
        self
    }

    pub fn remove(&self, type_key: &str, id: &str) -> bool {
        let mut fixtures = self.fixtures.write().unwrap_or_else(PoisonError::into_inner);
        fixtures
            .records
            .get_mut(type_key)
            .map(|records| records.remove(id).is_some())
            .unwrap_or(false)
    }

    /// Serve `payload` verbatim for relationship requests against `href`.
    pub fn set_link(&self, href: &str, payload: Value) {
        let mut fixtures = self.fixtures.write().unwrap_or_else(PoisonError::into_inner);
        fixtures.links.insert(href.to_string(), payload);
    }

    pub fn with_link(self, href: &str, payload: Value) -> Self {
        self.set_link(href, payload);
        self
    }

    pub fn revision(&self) -> u64 {
        self.fixtures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .revision
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<AdapterRequest> {
        self.requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn log(&self, request: AdapterRequest) {
        self.requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    fn select<F>(&self, type_key: &str, predicate: F) -> Vec<Value>
    where
        F: Fn(&Fixture) -> bool,
    {
        let fixtures = self.fixtures.read().unwrap_or_else(PoisonError::into_inner);
        fixtures
            .records
            .get(type_key)
            .map(|records| {
                records
                    .values()
                    .filter(|fixture| predicate(fixture))
                    .map(|fixture| Value::Object(fixture.value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn link(&self, href: &str) -> AdapterFuture {
        let fixtures = self.fixtures.read().unwrap_or_else(PoisonError::into_inner);
        let outcome = fixtures
            .links
            .get(href)
            .cloned()
            .ok_or_else(|| FetchError::rejected(Some(404), format!("no fixture for link {}", href)));
        future::ready(outcome).boxed()
    }
}

fn matches_query(fixture: &Fixture, query: &Value) -> bool {
    match query {
        Value::Object(conditions) => conditions
            .iter()
            .all(|(field, expected)| fixture.value.get(field) == Some(expected)),
        _ => true,
    }
}

impl Adapter for InMemoryAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    fn find(&self, _store: &Store, type_key: &str, id: &str, snapshot: Snapshot) -> AdapterFuture {
        self.log(AdapterRequest::Find {
            type_key: type_key.to_string(),
            id: id.to_string(),
            snapshot,
        });

        let found = self
            .select(type_key, |fixture| fixture.value.get("id") == Some(&json!(id)))
            .into_iter()
            .next();
        let outcome = match found {
            Some(value) => Ok(json!({ type_key: value })),
            None => Err(FetchError::rejected(
                Some(404),
                format!("{} {} not found", type_key, id),
            )),
        };
        future::ready(outcome).boxed()
    }

    fn find_many(
        &self,
        _store: &Store,
        type_key: &str,
        ids: &[String],
        snapshots: Vec<Snapshot>,
    ) -> Option<AdapterFuture> {
        self.log(AdapterRequest::FindMany {
            type_key: type_key.to_string(),
            ids: ids.to_vec(),
            snapshots,
        });

        let found: Vec<Value> = ids
            .iter()
            .flat_map(|id| self.select(type_key, |fixture| fixture.value.get("id") == Some(&json!(id))))
            .collect();
        Some(future::ready(Ok(json!({ pluralize(type_key): found }))).boxed())
    }

    fn find_has_many(
        &self,
        _store: &Store,
        snapshot: Snapshot,
        link: &str,
        relationship: &Relationship,
    ) -> AdapterFuture {
        self.log(AdapterRequest::FindHasMany {
            link: link.to_string(),
            relationship: relationship.clone(),
            snapshot,
        });
        self.link(link)
    }

    fn find_belongs_to(
        &self,
        _store: &Store,
        snapshot: Snapshot,
        link: &str,
        relationship: &Relationship,
    ) -> AdapterFuture {
        self.log(AdapterRequest::FindBelongsTo {
            link: link.to_string(),
            relationship: relationship.clone(),
            snapshot,
        });
        self.link(link)
    }

    fn find_all(&self, _store: &Store, type_key: &str, since: Option<&str>) -> AdapterFuture {
        self.log(AdapterRequest::FindAll {
            type_key: type_key.to_string(),
            since: since.map(str::to_string),
        });

        let since: u64 = since.and_then(|token| token.parse().ok()).unwrap_or(0);
        let found = self.select(type_key, |fixture| fixture.revision > since);
        let revision = self.revision();
        future::ready(Ok(json!({
            pluralize(type_key): found,
            "meta": { "since": revision.to_string() }
        })))
        .boxed()
    }

    fn find_query(
        &self,
        _store: &Store,
        type_key: &str,
        query: &Value,
        _array: &RecordArray,
    ) -> AdapterFuture {
        self.log(AdapterRequest::FindQuery {
            type_key: type_key.to_string(),
            query: query.clone(),
        });

        let found = self.select(type_key, |fixture| matches_query(fixture, query));
        future::ready(Ok(json!({ pluralize(type_key): found }))).boxed()
    }
}
