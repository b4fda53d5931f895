use std::fmt;
use std::sync::Weak;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::Record;
use crate::store::StoreInner;

/// Identity of a record: its type key and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub type_key: String,
    pub id: String,
}

impl Identity {
    pub fn new(type_key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_key: type_key.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_key, self.id)
    }
}

/// Stable handle to a record's identity.
///
/// A reference does not keep the record or the store alive. Reads go through
/// the store's identity map, so they always observe the latest merged data,
/// and they return `None` once the record has been unloaded or the store
/// destroyed.
#[derive(Clone)]
pub struct Reference {
    identity: Identity,
    store: Weak<StoreInner>,
}

impl Reference {
    pub(crate) fn new(identity: Identity, store: Weak<StoreInner>) -> Self {
        Self { identity, store }
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

    /// The live record currently cached under this identity, if any.
    pub fn record(&self) -> Option<Record> {
        let store = self.store.upgrade()?;
        store.peek(&self.identity)
    }

    pub fn is_loaded(&self) -> bool {
        self.record().map(|r| r.is_loaded()).unwrap_or(false)
    }

    /// Current attributes as a JSON object, including the id.
    pub fn value(&self) -> Option<Value> {
        let attributes = self.record()?.attributes()?;
        let mut object = Map::with_capacity(attributes.len() + 1);
        object.insert("id".into(), Value::String(self.identity.id.clone()));
        object.extend(attributes);
        Some(Value::Object(object))
    }

    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.record()?.attribute(key)
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Reference {}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reference").field(&self.identity).finish()
    }
}
