use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
    HasMany,
    BelongsTo,
}

/// A named link from an owning record to records of another type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub key: String,
    pub kind: RelationshipKind,
    pub type_key: String,
    /// Remote href used to resolve the relationship lazily.
    pub link: Option<String>,
}

/// Relationship declarations for one record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSchema {
    type_key: String,
    relationships: BTreeMap<String, Relationship>,
}

impl TypeSchema {
    pub fn new(type_key: impl Into<String>) -> Self {
        Self {
            type_key: type_key.into(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn has_many(self, key: impl Into<String>, type_key: impl Into<String>) -> Self {
        self.relationship(key.into(), RelationshipKind::HasMany, type_key.into())
    }

    pub fn belongs_to(self, key: impl Into<String>, type_key: impl Into<String>) -> Self {
        self.relationship(key.into(), RelationshipKind::BelongsTo, type_key.into())
    }

    fn relationship(mut self, key: String, kind: RelationshipKind, type_key: String) -> Self {
        self.relationships.insert(
            key.clone(),
            Relationship {
                key,
                kind,
                type_key,
                link: None,
            },
        );
        self
    }

    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    pub fn get(&self, key: &str) -> Option<&Relationship> {
        self.relationships.get(key)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }
}

/// What a record knows about one of its relationships.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RelationshipData {
    pub link: Option<String>,
    pub ids: Vec<String>,
}

/// Read related ids out of a pushed field: an id, an array of ids, or null.
///
/// Embedded objects contribute their `id`.
pub(crate) fn related_ids(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(related_id).collect(),
        other => related_id(other).into_iter().collect(),
    }
}

fn related_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        Value::Object(object) => object.get("id").and_then(related_id),
        _ => None,
    }
}
