//! The six fetch operations.
//!
//! Each one snapshots what the adapter needs, issues the request, guards the
//! pending result against the store (and, for relationship fetches, the
//! owning record) being destroyed, then extracts the payload, validates it
//! and merges it in a single adapter run, and resolves with references.

use std::sync::Arc;

use serde_json::Value;

use crate::adapter::{cast, Adapter};
use crate::error::FetchError;
use crate::guard::guard;
use crate::record::{Record, Relationship};
use crate::reference::Reference;
use crate::request::{describe_payload, RequestKind};
use crate::serializer::{serializer_for, Extracted, Serializer};
use crate::snapshot::snapshot_all;
use crate::store::{RecordArray, Store};
use crate::BoxFut;

pub type FetchFuture<T> = BoxFut<'static, Result<T, FetchError>>;

/// A targeted lookup must answer with data; these count as no answer.
fn is_absent(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(value) => !value,
        Value::Number(value) => value.as_f64() == Some(0.0),
        Value::String(value) => value.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn expect_collection(payload: Value, kind: RequestKind) -> Result<Vec<Value>, FetchError> {
    match payload {
        Value::Array(items) => Ok(items),
        other => {
            let err = FetchError::malformed(
                kind,
                format!(
                    "the response from a {} must be an array, not {}",
                    kind,
                    describe_payload(&other)
                ),
            );
            tracing::warn!(error = %err, "rejecting payload");
            Err(err)
        }
    }
}

fn references(records: Vec<Record>) -> Vec<Reference> {
    records.iter().map(Record::reference).collect()
}

/// Extract a collection payload, check its shape, then merge it with its
/// sideloads. Nothing reaches the store unless the whole response is valid.
fn merge_collection(
    store: &Store,
    serializer: &dyn Serializer,
    type_key: &str,
    payload: Value,
    kind: RequestKind,
) -> Result<Vec<Reference>, FetchError> {
    let mut extracted = serializer.extract(store, type_key, payload, None, kind)?;
    let items = expect_collection(std::mem::take(&mut extracted.primary), kind)?;
    Ok(references(store.push_extracted(type_key, items, extracted)?))
}

/// The record a single-record response resolved to, if any.
fn merge_single(
    store: &Store,
    type_key: &str,
    mut extracted: Extracted,
) -> Result<Option<Reference>, FetchError> {
    let primary = std::mem::take(&mut extracted.primary);
    let items = if is_absent(&primary) {
        Vec::new()
    } else {
        vec![primary]
    };
    let records = store.push_extracted(type_key, items, extracted)?;
    Ok(records.first().map(Record::reference))
}

fn no_data(type_key: &str, id: &str) -> FetchError {
    let err = FetchError::malformed(
        RequestKind::Find,
        format!(
            "you made a request for a {} with id {}, but the adapter's response did not have any data",
            type_key, id
        ),
    );
    tracing::warn!(error = %err, "rejecting payload");
    err
}

/// Fetch one record by id.
///
/// On rejection the record is marked not found and, if it carries no data,
/// unloaded; the adapter's error is returned unchanged.
pub fn fetch_one(
    adapter: &Arc<dyn Adapter>,
    store: &Store,
    type_key: &str,
    id: &str,
    record: &Record,
) -> FetchFuture<Reference> {
    let snapshot = record.create_snapshot();
    let pending = adapter.find(store, type_key, id, snapshot);
    let serializer = serializer_for(store, adapter.as_ref(), type_key);
    let label = format!("Handle Adapter#find of {} with id: {}", type_key, id);
    let pending = guard(cast(pending, label), store.clone());

    let store = store.clone();
    let record = record.clone();
    let type_key = type_key.to_string();
    let id = id.to_string();
    Box::pin(async move {
        match pending.await {
            Ok(payload) => {
                if is_absent(&payload) {
                    return Err(no_data(&type_key, &id));
                }
                let extracted = serializer.extract(
                    &store,
                    &type_key,
                    payload,
                    Some(&id),
                    RequestKind::Find,
                )?;
                if is_absent(&extracted.primary) {
                    return Err(no_data(&type_key, &id));
                }
                merge_single(&store, &type_key, extracted)?
                    .ok_or_else(|| no_data(&type_key, &id))
            }
            Err(err) => {
                record.not_found();
                if record.is_empty() {
                    tracing::warn!(record = %record, error = %err, "lookup failed, unloading empty record");
                    record.unload_record();
                }
                Err(err)
            }
        }
    })
}

/// Fetch a batch of records by id.
///
/// Fails immediately if the adapter produces no pending result at all.
pub fn fetch_many(
    adapter: &Arc<dyn Adapter>,
    store: &Store,
    type_key: &str,
    ids: &[String],
    records: &[Record],
) -> Result<FetchFuture<Vec<Reference>>, FetchError> {
    let snapshots = snapshot_all(records);
    let pending = adapter
        .find_many(store, type_key, ids, snapshots)
        .ok_or_else(|| {
            FetchError::AdapterMisuse(format!(
                "adapter {} returned no pending result from find_many for {}",
                adapter.key(),
                type_key
            ))
        })?;
    let serializer = serializer_for(store, adapter.as_ref(), type_key);
    let label = format!("Handle Adapter#findMany of {}", type_key);
    let pending = guard(cast(pending, label), store.clone());

    let store = store.clone();
    let type_key = type_key.to_string();
    Ok(Box::pin(async move {
        let payload = pending.await?;
        merge_collection(
            &store,
            serializer.as_ref(),
            &type_key,
            payload,
            RequestKind::FindMany,
        )
    }))
}

/// Fetch the records behind a has-many relationship's link.
pub fn fetch_has_many(
    adapter: &Arc<dyn Adapter>,
    store: &Store,
    record: &Record,
    link: &str,
    relationship: &Relationship,
) -> FetchFuture<Vec<Reference>> {
    let snapshot = record.create_snapshot();
    let pending = adapter.find_has_many(store, snapshot, link, relationship);
    let serializer = serializer_for(store, adapter.as_ref(), &relationship.type_key);
    let label = format!(
        "Handle Adapter#findHasMany of {} : {}",
        record, relationship.type_key
    );
    let pending = guard(cast(pending, label), store.clone());
    let pending = guard(pending, record.clone());

    let store = store.clone();
    let type_key = relationship.type_key.clone();
    Box::pin(async move {
        let payload = pending.await?;
        merge_collection(
            &store,
            serializer.as_ref(),
            &type_key,
            payload,
            RequestKind::FindHasMany,
        )
    })
}

/// Fetch the record behind a belongs-to relationship's link.
///
/// An empty payload resolves `None`: there is no related record.
pub fn fetch_belongs_to(
    adapter: &Arc<dyn Adapter>,
    store: &Store,
    record: &Record,
    link: &str,
    relationship: &Relationship,
) -> FetchFuture<Option<Reference>> {
    let snapshot = record.create_snapshot();
    let pending = adapter.find_belongs_to(store, snapshot, link, relationship);
    let serializer = serializer_for(store, adapter.as_ref(), &relationship.type_key);
    let label = format!(
        "Handle Adapter#findBelongsTo of {} : {}",
        record, relationship.type_key
    );
    let pending = guard(cast(pending, label), store.clone());
    let pending = guard(pending, record.clone());

    let store = store.clone();
    let type_key = relationship.type_key.clone();
    Box::pin(async move {
        let payload = pending.await?;
        let extracted = serializer.extract(
            &store,
            &type_key,
            payload,
            None,
            RequestKind::FindBelongsTo,
        )?;
        merge_single(&store, &type_key, extracted)
    })
}

/// Fetch every record of a type, then resolve with the store's live array.
pub fn fetch_all(
    adapter: &Arc<dyn Adapter>,
    store: &Store,
    type_key: &str,
    since: Option<&str>,
) -> FetchFuture<RecordArray> {
    let pending = adapter.find_all(store, type_key, since);
    let serializer = serializer_for(store, adapter.as_ref(), type_key);
    let label = format!("Handle Adapter#findAll of {}", type_key);
    let pending = guard(cast(pending, label), store.clone());

    let store = store.clone();
    let type_key = type_key.to_string();
    Box::pin(async move {
        let payload = pending.await?;
        merge_collection(
            &store,
            serializer.as_ref(),
            &type_key,
            payload,
            RequestKind::FindAll,
        )?;
        store.did_update_all(&type_key);
        Ok(store.all(&type_key))
    })
}

/// Run a query and load its results into `array`, replacing its content.
pub fn fetch_query(
    adapter: &Arc<dyn Adapter>,
    store: &Store,
    type_key: &str,
    query: &Value,
    array: &RecordArray,
) -> FetchFuture<RecordArray> {
    let pending = adapter.find_query(store, type_key, query, array);
    let serializer = serializer_for(store, adapter.as_ref(), type_key);
    let label = format!("Handle Adapter#findQuery of {}", type_key);
    let pending = guard(cast(pending, label), store.clone());

    let store = store.clone();
    let type_key = type_key.to_string();
    let array = array.clone();
    Box::pin(async move {
        let payload = pending.await?;
        let references = merge_collection(
            &store,
            serializer.as_ref(),
            &type_key,
            payload,
            RequestKind::FindQuery,
        )?;
        array.load(references);
        Ok(array)
    })
}
