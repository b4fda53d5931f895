//! Fetch orchestration for an in-memory entity store.
//!
//! A [`Store`] keeps one [`Record`] per `(type, id)`. The fetch operations in
//! this crate ask an [`Adapter`] for remote data, run the raw payload through
//! the [`Serializer`] registered for that adapter and type, merge the result
//! into the store in a single batched run, and resolve with stable
//! [`Reference`]s. Every pending request is guarded: if the store (or the
//! record a relationship belongs to) is destroyed before the adapter answers,
//! the continuation is dropped and the returned future never completes.

mod adapter;
mod config;
mod error;
mod finders;
mod guard;
mod record;
mod reference;
mod request;
mod serializer;
mod snapshot;
mod store;

use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future.
pub type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use adapter::{unsupported, Adapter, AdapterFuture, AdapterRequest, InMemoryAdapter};
pub use config::{SerializerKind, StoreConfig};
pub use error::FetchError;
pub use finders::{
    fetch_all, fetch_belongs_to, fetch_has_many, fetch_many, fetch_one, fetch_query, FetchFuture,
};
pub use guard::{guard, Alive};
pub use record::{Record, RecordState, Relationship, RelationshipKind, TypeSchema};
pub use reference::{Identity, Reference};
pub use request::RequestKind;
pub use serializer::{
    pluralize, serializer_for, singularize, Extracted, JsonSerializer, RestSerializer,
    Serializer, SerializerRegistry,
};
pub use snapshot::{snapshot, snapshot_all, Snapshot};
pub use store::{
    Change, ChangeBatch, ChangeKind, RecordArray, RecordArrayKind, Store, TypeMetadata,
};
