//! Point-in-time views of records handed to adapters.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::record::{Record, RelationshipData, RelationshipKind, TypeSchema};
use crate::reference::Identity;

/// Immutable copy of a record's attributes and relationships.
///
/// Adapters receive snapshots instead of live records so they cannot hold on
/// to, or mutate, cached state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    identity: Identity,
    attributes: Map<String, Value>,
    belongs_to: BTreeMap<String, Option<String>>,
    has_many: BTreeMap<String, Vec<String>>,
    links: BTreeMap<String, String>,
}

impl Snapshot {
    pub(crate) fn new(
        identity: Identity,
        attributes: Map<String, Value>,
        relationships: &BTreeMap<String, RelationshipData>,
        schema: TypeSchema,
    ) -> Self {
        let mut belongs_to = BTreeMap::new();
        let mut has_many = BTreeMap::new();
        let mut links = BTreeMap::new();

        for relationship in schema.relationships() {
            let data = relationships.get(&relationship.key);
            let ids = data.map(|d| d.ids.clone()).unwrap_or_default();
            match relationship.kind {
                RelationshipKind::BelongsTo => {
                    belongs_to.insert(relationship.key.clone(), ids.into_iter().next());
                }
                RelationshipKind::HasMany => {
                    has_many.insert(relationship.key.clone(), ids);
                }
            }
            if let Some(link) = data.and_then(|d| d.link.clone()) {
                links.insert(relationship.key.clone(), link);
            }
        }

        Self {
            identity,
            attributes,
            belongs_to,
            has_many,
            links,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn type_key(&self) -> &str {
        &self.identity.type_key
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Related id of a belongs-to relationship. `None` for unknown keys or
    /// an unset relationship.
    pub fn belongs_to(&self, key: &str) -> Option<&str> {
        self.belongs_to.get(key)?.as_deref()
    }

    pub fn has_many(&self, key: &str) -> Option<&[String]> {
        self.has_many.get(key).map(Vec::as_slice)
    }

    pub fn link(&self, key: &str) -> Option<&str> {
        self.links.get(key).map(String::as_str)
    }
}

/// Capture a snapshot of one record.
pub fn snapshot(record: &Record) -> Snapshot {
    record.create_snapshot()
}

/// Capture snapshots of a batch of records, in order.
pub fn snapshot_all(records: &[Record]) -> Vec<Snapshot> {
    records.iter().map(Record::create_snapshot).collect()
}
