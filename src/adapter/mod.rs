//! Adapter capability: the remote side of every fetch.

mod in_memory;

use futures::future::{self, FutureExt};
use serde_json::Value;
use tracing::Instrument;

use crate::error::FetchError;
use crate::record::Relationship;
use crate::request::RequestKind;
use crate::snapshot::Snapshot;
use crate::store::{RecordArray, Store};
use crate::BoxFut;

pub use in_memory::{AdapterRequest, InMemoryAdapter};

/// Raw payload from an adapter, or the adapter's rejection.
pub type AdapterFuture = BoxFut<'static, Result<Value, FetchError>>;

/// Performs remote requests for a store.
///
/// Only `find` is required. The remaining request shapes reject by default,
/// except `find_many`, which returns `None`: an adapter that cannot fetch in
/// batches must not be asked to.
pub trait Adapter: Send + Sync {
    /// Identifies this adapter when resolving serializers.
    fn key(&self) -> &str;

    fn find(&self, store: &Store, type_key: &str, id: &str, snapshot: Snapshot) -> AdapterFuture;

    fn find_many(
        &self,
        _store: &Store,
        _type_key: &str,
        _ids: &[String],
        _snapshots: Vec<Snapshot>,
    ) -> Option<AdapterFuture> {
        None
    }

    fn find_has_many(
        &self,
        _store: &Store,
        _snapshot: Snapshot,
        _link: &str,
        _relationship: &Relationship,
    ) -> AdapterFuture {
        unsupported(RequestKind::FindHasMany)
    }

    fn find_belongs_to(
        &self,
        _store: &Store,
        _snapshot: Snapshot,
        _link: &str,
        _relationship: &Relationship,
    ) -> AdapterFuture {
        unsupported(RequestKind::FindBelongsTo)
    }

    fn find_all(&self, _store: &Store, _type_key: &str, _since: Option<&str>) -> AdapterFuture {
        unsupported(RequestKind::FindAll)
    }

    fn find_query(
        &self,
        _store: &Store,
        _type_key: &str,
        _query: &Value,
        _array: &RecordArray,
    ) -> AdapterFuture {
        unsupported(RequestKind::FindQuery)
    }
}

/// Rejection for request shapes an adapter does not implement.
pub fn unsupported(kind: RequestKind) -> AdapterFuture {
    future::ready(Err(FetchError::rejected(
        None,
        format!("adapter does not implement {}", kind),
    )))
    .boxed()
}

/// Wrap an adapter future in a labelled span so every request can be traced.
pub(crate) fn cast(pending: AdapterFuture, label: String) -> AdapterFuture {
    let span = tracing::debug_span!("adapter_request", label = %label);
    async move {
        let outcome = pending.await;
        match &outcome {
            Ok(_) => tracing::debug!("adapter resolved"),
            Err(err) => tracing::debug!(error = %err, "adapter rejected"),
        }
        outcome
    }
    .instrument(span)
    .boxed()
}
