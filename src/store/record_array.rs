use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde_json::Value;

use super::StoreInner;
use crate::reference::{Identity, Reference};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordArrayKind {
    /// Every cached record of the type. Kept current by the store.
    All,
    /// The result of a query. Replaced wholesale on each load.
    Query(Value),
}

#[derive(Default)]
struct ArrayState {
    content: Vec<Identity>,
    is_loaded: bool,
    is_updating: bool,
}

/// Live collection of records of one type. Clones share content.
#[derive(Clone)]
pub struct RecordArray {
    inner: Arc<RecordArrayInner>,
}

struct RecordArrayInner {
    type_key: String,
    kind: RecordArrayKind,
    state: RwLock<ArrayState>,
    store: Weak<StoreInner>,
}

impl RecordArray {
    pub(crate) fn new(type_key: &str, kind: RecordArrayKind, store: Weak<StoreInner>) -> Self {
        Self {
            inner: Arc::new(RecordArrayInner {
                type_key: type_key.to_string(),
                kind,
                state: RwLock::new(ArrayState::default()),
                store,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ArrayState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ArrayState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn type_key(&self) -> &str {
        &self.inner.type_key
    }

    pub fn kind(&self) -> &RecordArrayKind {
        &self.inner.kind
    }

    pub fn query(&self) -> Option<&Value> {
        match &self.inner.kind {
            RecordArrayKind::Query(query) => Some(query),
            RecordArrayKind::All => None,
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.read().content.iter().map(|i| i.id.clone()).collect()
    }

    pub fn references(&self) -> Vec<Reference> {
        self.read()
            .content
            .iter()
            .map(|identity| Reference::new(identity.clone(), self.inner.store.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().content.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().content.iter().any(|i| i.id == id)
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_loaded
    }

    pub fn is_updating(&self) -> bool {
        self.read().is_updating
    }

    /// Replace the whole content with `references`, in order.
    pub fn load(&self, references: Vec<Reference>) {
        let mut state = self.write();
        state.content = references
            .into_iter()
            .map(|reference| reference.identity().clone())
            .collect();
        state.is_loaded = true;
        state.is_updating = false;
    }

    /// True if both handles point at the same collection.
    pub fn ptr_eq(&self, other: &RecordArray) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn set_updating(&self, updating: bool) {
        self.write().is_updating = updating;
    }

    pub(crate) fn did_update(&self) {
        let mut state = self.write();
        state.is_loaded = true;
        state.is_updating = false;
    }

    pub(crate) fn insert(&self, identity: &Identity) {
        let mut state = self.write();
        if !state.content.contains(identity) {
            state.content.push(identity.clone());
        }
    }

    pub(crate) fn remove(&self, identity: &Identity) {
        self.write().content.retain(|i| i != identity);
    }

    pub(crate) fn clear(&self) {
        self.write().content.clear();
    }
}

impl fmt::Debug for RecordArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordArray")
            .field("type_key", &self.inner.type_key)
            .field("kind", &self.inner.kind)
            .field("ids", &self.ids())
            .finish()
    }
}
