//! Records: the cached entities owned by a [`Store`](crate::Store).

mod relationship;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde_json::{Map, Value};

use crate::guard::Alive;
use crate::reference::{Identity, Reference};
use crate::snapshot::Snapshot;
use crate::store::StoreInner;

pub(crate) use relationship::{related_ids, RelationshipData};
pub use relationship::{Relationship, RelationshipKind, TypeSchema};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordState {
    /// Known identity, no data, nothing in flight.
    #[default]
    Empty,
    Loading,
    Loaded,
    /// A lookup for this record was rejected.
    NotFound,
}

/// Handle to a cached record. Clones share the same record.
#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

struct RecordInner {
    identity: Identity,
    data: RwLock<RecordData>,
    destroyed: AtomicBool,
    store: Weak<StoreInner>,
}

#[derive(Default)]
struct RecordData {
    state: RecordState,
    attributes: Option<Map<String, Value>>,
    relationships: BTreeMap<String, RelationshipData>,
}

impl Record {
    pub(crate) fn new(identity: Identity, store: Weak<StoreInner>) -> Self {
        Self {
            inner: Arc::new(RecordInner {
                identity,
                data: RwLock::new(RecordData::default()),
                destroyed: AtomicBool::new(false),
                store,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RecordData> {
        self.inner.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RecordData> {
        self.inner.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn type_key(&self) -> &str {
        &self.inner.identity.type_key
    }

    pub fn id(&self) -> &str {
        &self.inner.identity.id
    }

    pub fn state(&self) -> RecordState {
        self.read().state
    }

    /// True while the record carries no data.
    pub fn is_empty(&self) -> bool {
        self.read().attributes.is_none()
    }

    pub fn is_loaded(&self) -> bool {
        self.read().state == RecordState::Loaded
    }

    pub fn attributes(&self) -> Option<Map<String, Value>> {
        self.read().attributes.clone()
    }

    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.read().attributes.as_ref()?.get(key).cloned()
    }

    /// Ids currently linked through the named relationship.
    pub fn related_ids(&self, key: &str) -> Vec<String> {
        self.read()
            .relationships
            .get(key)
            .map(|data| data.ids.clone())
            .unwrap_or_default()
    }

    /// The declared relationship, with the link this record was given for it.
    pub fn relationship(&self, key: &str) -> Option<Relationship> {
        let store = self.inner.store.upgrade()?;
        let mut relationship = store.relationship(self.type_key(), key)?;
        relationship.link = self
            .read()
            .relationships
            .get(key)
            .and_then(|data| data.link.clone());
        Some(relationship)
    }

    pub fn create_snapshot(&self) -> Snapshot {
        let data = self.read();
        Snapshot::new(
            self.identity().clone(),
            data.attributes.clone().unwrap_or_default(),
            &data.relationships,
            self.inner
                .store
                .upgrade()
                .map(|store| store.schema(self.type_key()))
                .unwrap_or_default(),
        )
    }

    pub fn reference(&self) -> Reference {
        Reference::new(self.identity().clone(), self.inner.store.clone())
    }

    /// Mark a request for this record's data as in flight.
    pub fn loading_data(&self) {
        let mut data = self.write();
        if data.attributes.is_none() {
            data.state = RecordState::Loading;
        }
    }

    pub fn not_found(&self) {
        self.write().state = RecordState::NotFound;
    }

    /// Remove this record from the store's identity map and destroy it.
    pub fn unload_record(&self) {
        if let Some(store) = self.inner.store.upgrade() {
            store.unload(self);
        }
        self.destroy();
    }

    pub(crate) fn destroy(&self) {
        self.inner.destroyed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Merge pushed data. Returns true if the record carried no data before.
    pub(crate) fn merge(
        &self,
        attributes: Map<String, Value>,
        related: BTreeMap<String, Vec<String>>,
        links: BTreeMap<String, String>,
    ) -> bool {
        let mut data = self.write();
        let was_empty = data.attributes.is_none();
        data.attributes
            .get_or_insert_with(Map::new)
            .extend(attributes);
        for (key, ids) in related {
            data.relationships.entry(key).or_default().ids = ids;
        }
        for (key, link) in links {
            data.relationships.entry(key).or_default().link = Some(link);
        }
        data.state = RecordState::Loaded;
        was_empty
    }

    pub(crate) fn set_related_ids(&self, key: &str, ids: Vec<String>) {
        self.write()
            .relationships
            .entry(key.to_string())
            .or_default()
            .ids = ids;
    }
}

impl Alive for Record {
    fn is_alive(&self) -> bool {
        !self.inner.destroyed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("identity", self.identity())
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.identity())
    }
}
