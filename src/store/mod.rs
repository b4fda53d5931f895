//! Store - the identity map every fetch merges into.
//!
//! A `Store` is a cheap handle: clones share the same records, arrays,
//! metadata and registries.
//!
//! ## Example
//!
//! ```ignore
//! use sourced_fetch::{InMemoryAdapter, Store};
//!
//! let adapter = Arc::new(InMemoryAdapter::new().with_record("widget", "1", json!({"name": "a"})));
//! let store = Store::new().with_adapter(adapter);
//!
//! let widget = store.find("widget", "1").await?;
//! assert_eq!(widget.attribute("name"), Some(json!("a")));
//! ```

mod changes;
mod find;
mod metadata;
mod record_array;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

use crate::adapter::Adapter;
use crate::config::StoreConfig;
use crate::error::FetchError;
use crate::guard::Alive;
use crate::record::{related_ids, Record, Relationship, TypeSchema};
use crate::reference::{Identity, Reference};
use crate::request::describe_payload;
use crate::serializer::{Extracted, Serializer, SerializerRegistry};

use changes::ChangeQueue;

pub use changes::{Change, ChangeBatch, ChangeKind};
pub use metadata::TypeMetadata;
pub use record_array::{RecordArray, RecordArrayKind};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// A pushed payload split into what the record stores.
struct ParsedRecord {
    id: String,
    attributes: Map<String, Value>,
    related: BTreeMap<String, Vec<String>>,
    links: BTreeMap<String, String>,
}

#[derive(Default)]
struct AdapterRegistry {
    default: Option<Arc<dyn Adapter>>,
    by_type: HashMap<String, Arc<dyn Adapter>>,
}

pub(crate) struct StoreInner {
    config: StoreConfig,
    records: RwLock<HashMap<Identity, Record>>,
    schemas: RwLock<HashMap<String, TypeSchema>>,
    live_arrays: RwLock<HashMap<String, RecordArray>>,
    metadata: RwLock<HashMap<String, TypeMetadata>>,
    adapters: RwLock<AdapterRegistry>,
    serializers: RwLock<SerializerRegistry>,
    changes: ChangeQueue,
    destroyed: AtomicBool,
}

impl StoreInner {
    pub(crate) fn peek(&self, identity: &Identity) -> Option<Record> {
        read(&self.records).get(identity).cloned()
    }

    pub(crate) fn schema(&self, type_key: &str) -> TypeSchema {
        read(&self.schemas)
            .get(type_key)
            .cloned()
            .unwrap_or_else(|| TypeSchema::new(type_key))
    }

    pub(crate) fn relationship(&self, type_key: &str, key: &str) -> Option<Relationship> {
        read(&self.schemas).get(type_key)?.get(key).cloned()
    }

    /// Drop `record` from the identity map, if it is still the cached one.
    pub(crate) fn unload(&self, record: &Record) {
        let removed = {
            let mut records = write(&self.records);
            match records.get(record.identity()) {
                Some(cached) if cached.ptr_eq(record) => records.remove(record.identity()).is_some(),
                _ => false,
            }
        };
        if !removed {
            return;
        }

        if let Some(array) = read(&self.live_arrays).get(record.type_key()) {
            array.remove(record.identity());
        }
        self.changes
            .record(record.identity().clone(), ChangeKind::Unloaded);
    }
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let serializers = SerializerRegistry::new(config.default_serializer());
        Self {
            inner: Arc::new(StoreInner {
                config,
                records: RwLock::new(HashMap::new()),
                schemas: RwLock::new(HashMap::new()),
                live_arrays: RwLock::new(HashMap::new()),
                metadata: RwLock::new(HashMap::new()),
                adapters: RwLock::new(AdapterRegistry::default()),
                serializers: RwLock::new(serializers),
                changes: ChangeQueue::new(),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    // -- registration ------------------------------------------------------

    pub fn with_schema(self, schema: TypeSchema) -> Self {
        self.define_type(schema);
        self
    }

    pub fn define_type(&self, schema: TypeSchema) {
        write(&self.inner.schemas).insert(schema.type_key().to_string(), schema);
    }

    pub fn schema_for(&self, type_key: &str) -> TypeSchema {
        self.inner.schema(type_key)
    }

    /// Adapter used for every type without its own.
    pub fn with_adapter(self, adapter: Arc<dyn Adapter>) -> Self {
        write(&self.inner.adapters).default = Some(adapter);
        self
    }

    pub fn with_adapter_for(self, type_key: &str, adapter: Arc<dyn Adapter>) -> Self {
        write(&self.inner.adapters)
            .by_type
            .insert(type_key.to_string(), adapter);
        self
    }

    pub fn adapter_for(&self, type_key: &str) -> Result<Arc<dyn Adapter>, FetchError> {
        let adapters = read(&self.inner.adapters);
        adapters
            .by_type
            .get(type_key)
            .or(adapters.default.as_ref())
            .cloned()
            .ok_or_else(|| FetchError::NoAdapter(type_key.to_string()))
    }

    /// Register a serializer for an adapter key, a type, or both.
    pub fn with_serializer(
        self,
        adapter_key: Option<&str>,
        type_key: Option<&str>,
        serializer: Arc<dyn Serializer>,
    ) -> Self {
        write(&self.inner.serializers).register(adapter_key, type_key, serializer);
        self
    }

    pub(crate) fn serializer_for(&self, adapter_key: &str, type_key: &str) -> Arc<dyn Serializer> {
        read(&self.inner.serializers).resolve(adapter_key, type_key)
    }

    // -- identity map ------------------------------------------------------

    /// The cached record for `(type_key, id)`, created empty if missing.
    pub fn record_for_id(&self, type_key: &str, id: &str) -> Record {
        let identity = Identity::new(type_key, id);
        if let Some(record) = self.inner.peek(&identity) {
            return record;
        }
        write(&self.inner.records)
            .entry(identity.clone())
            .or_insert_with(|| Record::new(identity, Arc::downgrade(&self.inner)))
            .clone()
    }

    pub fn peek_record(&self, type_key: &str, id: &str) -> Option<Record> {
        self.inner.peek(&Identity::new(type_key, id))
    }

    pub fn has_record_for_id(&self, type_key: &str, id: &str) -> bool {
        read(&self.inner.records).contains_key(&Identity::new(type_key, id))
    }

    pub fn reference_for(&self, type_key: &str, id: &str) -> Reference {
        Reference::new(Identity::new(type_key, id), Arc::downgrade(&self.inner))
    }

    pub fn unload_record(&self, record: &Record) {
        record.unload_record();
    }

    // -- merging -----------------------------------------------------------

    /// Merge one normalized record payload into the cache.
    pub fn push(&self, type_key: &str, payload: Value) -> Result<Record, FetchError> {
        let parsed = self.parse(type_key, payload)?;
        Ok(self.apply(type_key, parsed))
    }

    /// Merge a batch of normalized records. Every item is validated before
    /// any is merged, and the merge notifies listeners once.
    pub fn push_many(&self, type_key: &str, payload: Vec<Value>) -> Result<Vec<Record>, FetchError> {
        let parsed = payload
            .into_iter()
            .map(|item| self.parse(type_key, item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.adapter_run(|| {
            parsed
                .into_iter()
                .map(|item| self.apply(type_key, item))
                .collect()
        }))
    }

    /// Merge an extracted response: `primary` records of `type_key`, plus
    /// its sideloaded records and metadata.
    ///
    /// Every record is validated before anything is merged, so a response
    /// with one bad record leaves the store untouched. Returns the primary
    /// records in order.
    pub fn push_extracted(
        &self,
        type_key: &str,
        primary: Vec<Value>,
        extracted: Extracted,
    ) -> Result<Vec<Record>, FetchError> {
        let mut sideloaded = Vec::new();
        for (root_type, value) in extracted.sideloaded {
            let items = match value {
                Value::Array(items) => items,
                other => vec![other],
            };
            for item in items {
                sideloaded.push((self.parse(&root_type, item)?, root_type.clone()));
            }
        }
        let primary = primary
            .into_iter()
            .map(|item| self.parse(type_key, item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.adapter_run(|| {
            if let Some(meta) = extracted.meta {
                self.set_metadata_for(type_key, meta);
            }
            for (parsed, root_type) in sideloaded {
                self.apply(&root_type, parsed);
            }
            primary
                .into_iter()
                .map(|parsed| self.apply(type_key, parsed))
                .collect()
        }))
    }

    /// Run `f` as one transactional merge: every change it makes reaches
    /// listeners in a single batch once it returns, unwinds included.
    pub fn adapter_run<T>(&self, f: impl FnOnce() -> T) -> T {
        let _scope = self.inner.changes.begin();
        f()
    }

    fn parse(&self, type_key: &str, payload: Value) -> Result<ParsedRecord, FetchError> {
        let mut fields = match payload {
            Value::Object(fields) => fields,
            other => {
                return Err(FetchError::invalid_record(
                    type_key,
                    format!("expected an object, got {}", describe_payload(&other)),
                ))
            }
        };

        let id = match fields.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(FetchError::invalid_record(type_key, "payload has no id")),
        };

        let links = match fields.remove("links") {
            Some(Value::Object(links)) => links
                .into_iter()
                .filter_map(|(key, href)| href.as_str().map(|href| (key, href.to_string())))
                .collect(),
            _ => BTreeMap::new(),
        };

        let mut related = BTreeMap::new();
        for relationship in self.inner.schema(type_key).relationships() {
            if let Some(value) = fields.remove(&relationship.key) {
                related.insert(relationship.key.clone(), related_ids(&value));
            }
        }

        Ok(ParsedRecord {
            id,
            attributes: fields,
            related,
            links,
        })
    }

    fn apply(&self, type_key: &str, parsed: ParsedRecord) -> Record {
        let record = self.record_for_id(type_key, &parsed.id);
        let created = record.merge(parsed.attributes, parsed.related, parsed.links);
        self.live_array(type_key).insert(record.identity());

        let kind = if created {
            ChangeKind::Created
        } else {
            ChangeKind::Updated
        };
        self.inner.changes.record(record.identity().clone(), kind);
        record
    }

    // -- collections and metadata ------------------------------------------

    /// Live array of every loaded record of `type_key`.
    pub fn all(&self, type_key: &str) -> RecordArray {
        self.live_array(type_key)
    }

    fn live_array(&self, type_key: &str) -> RecordArray {
        if let Some(array) = read(&self.inner.live_arrays).get(type_key) {
            return array.clone();
        }

        write(&self.inner.live_arrays)
            .entry(type_key.to_string())
            .or_insert_with(|| {
                let array = RecordArray::new(
                    type_key,
                    RecordArrayKind::All,
                    Arc::downgrade(&self.inner),
                );
                let mut loaded: Vec<_> = read(&self.inner.records)
                    .values()
                    .filter(|record| record.type_key() == type_key && !record.is_empty())
                    .map(|record| record.identity().clone())
                    .collect();
                loaded.sort();
                for identity in &loaded {
                    array.insert(identity);
                }
                array
            })
            .clone()
    }

    /// A new, empty array to be filled by a query.
    pub fn record_array_for_query(&self, type_key: &str, query: Value) -> RecordArray {
        RecordArray::new(
            type_key,
            RecordArrayKind::Query(query),
            Arc::downgrade(&self.inner),
        )
    }

    pub fn metadata_for(&self, type_key: &str) -> TypeMetadata {
        read(&self.inner.metadata)
            .get(type_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Merge `meta` into the type's metadata.
    pub fn set_metadata_for(&self, type_key: &str, meta: Map<String, Value>) {
        write(&self.inner.metadata)
            .entry(type_key.to_string())
            .or_default()
            .meta
            .extend(meta);
    }

    pub(crate) fn will_update_all(&self, type_key: &str) {
        write(&self.inner.metadata)
            .entry(type_key.to_string())
            .or_default()
            .is_updating = true;
        self.live_array(type_key).set_updating(true);
    }

    /// Record that the type's full collection was just refreshed.
    pub fn did_update_all(&self, type_key: &str) {
        {
            let mut metadata = write(&self.inner.metadata);
            let entry = metadata.entry(type_key.to_string()).or_default();
            entry.update_count += 1;
            entry.is_updating = false;
        }
        self.live_array(type_key).did_update();
    }

    /// A full refresh failed; the type is no longer updating.
    pub(crate) fn update_all_failed(&self, type_key: &str) {
        if let Some(entry) = write(&self.inner.metadata).get_mut(type_key) {
            entry.is_updating = false;
        }
        self.live_array(type_key).set_updating(false);
    }

    // -- observers and lifetime --------------------------------------------

    /// Listen for change batches. Returns an id for [`Store::off_change`].
    pub fn on_change<F>(&self, listener: F) -> String
    where
        F: Fn(ChangeBatch) + Send + Sync + 'static,
    {
        self.inner.changes.subscribe(listener)
    }

    pub fn off_change(&self, listener_id: &str) -> bool {
        self.inner.changes.unsubscribe(listener_id)
    }

    /// Tear the store down: every record is unloaded and destroyed, and
    /// requests still in flight are abandoned when they settle.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        let records: Vec<Record> = write(&self.inner.records)
            .drain()
            .map(|(_, record)| record)
            .collect();
        for record in &records {
            record.destroy();
        }
        for array in read(&self.inner.live_arrays).values() {
            array.clear();
        }
        tracing::debug!(records = records.len(), "store destroyed");
    }
}

impl Alive for Store {
    fn is_alive(&self) -> bool {
        !self.inner.destroyed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("records", &read(&self.inner.records).len())
            .field("alive", &self.is_alive())
            .finish()
    }
}
