//! Store entry points that pick an adapter and delegate to the fetch
//! operations.

use futures::future::{self, FutureExt, TryFutureExt};
use serde_json::Value;

use super::{RecordArray, Store};
use crate::error::FetchError;
use crate::finders::{
    fetch_all, fetch_belongs_to, fetch_has_many, fetch_many, fetch_one, fetch_query, FetchFuture,
};
use crate::record::{Record, Relationship, RelationshipKind};
use crate::reference::Reference;

fn failed<T: Send + 'static>(err: FetchError) -> FetchFuture<T> {
    future::ready(Err(err)).boxed()
}

impl Store {
    /// Find a record by id. A record that is already loaded resolves from
    /// the cache without asking the adapter.
    pub fn find(&self, type_key: &str, id: &str) -> FetchFuture<Reference> {
        let record = self.record_for_id(type_key, id);
        if record.is_loaded() {
            return future::ready(Ok(record.reference())).boxed();
        }
        self.fetch_record(&record)
    }

    /// Ask the adapter for `record` again, loaded or not.
    pub fn reload(&self, record: &Record) -> FetchFuture<Reference> {
        self.fetch_record(record)
    }

    fn fetch_record(&self, record: &Record) -> FetchFuture<Reference> {
        let adapter = match self.adapter_for(record.type_key()) {
            Ok(adapter) => adapter,
            Err(err) => return failed(err),
        };
        record.loading_data();
        fetch_one(&adapter, self, record.type_key(), record.id(), record)
    }

    /// Find several records of one type in a single adapter request.
    pub fn find_many(
        &self,
        type_key: &str,
        ids: &[&str],
    ) -> Result<FetchFuture<Vec<Reference>>, FetchError> {
        let adapter = self.adapter_for(type_key)?;
        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let records: Vec<Record> = ids
            .iter()
            .map(|id| self.record_for_id(type_key, id))
            .collect();
        for record in &records {
            record.loading_data();
        }
        fetch_many(&adapter, self, type_key, &ids, &records)
    }

    /// Refresh every record of a type. The adapter receives the since token
    /// from the previous refresh, if any.
    pub fn find_all(&self, type_key: &str) -> FetchFuture<RecordArray> {
        let adapter = match self.adapter_for(type_key) {
            Ok(adapter) => adapter,
            Err(err) => return failed(err),
        };
        let since = self.metadata_for(type_key).since();
        self.will_update_all(type_key);

        let store = self.clone();
        let type_key = type_key.to_string();
        fetch_all(&adapter, self, &type_key, since.as_deref())
            .inspect_err(move |_| store.update_all_failed(&type_key))
            .boxed()
    }

    /// Run a query into a fresh record array.
    pub fn find_query(&self, type_key: &str, query: Value) -> FetchFuture<RecordArray> {
        let adapter = match self.adapter_for(type_key) {
            Ok(adapter) => adapter,
            Err(err) => return failed(err),
        };
        let array = self.record_array_for_query(type_key, query.clone());
        array.set_updating(true);
        fetch_query(&adapter, self, type_key, &query, &array)
    }

    /// Follow the link of a has-many relationship. On success the record's
    /// related ids are replaced with the fetched ones.
    pub fn find_has_many(&self, record: &Record, key: &str) -> FetchFuture<Vec<Reference>> {
        let (relationship, link) =
            match self.linked_relationship(record, key, RelationshipKind::HasMany) {
                Ok(found) => found,
                Err(err) => return failed(err),
            };
        let adapter = match self.adapter_for(record.type_key()) {
            Ok(adapter) => adapter,
            Err(err) => return failed(err),
        };

        let owner = record.clone();
        let key = key.to_string();
        fetch_has_many(&adapter, self, record, &link, &relationship)
            .map_ok(move |references| {
                let ids = references.iter().map(|r| r.id().to_string()).collect();
                owner.set_related_ids(&key, ids);
                references
            })
            .boxed()
    }

    /// Follow the link of a belongs-to relationship.
    pub fn find_belongs_to(&self, record: &Record, key: &str) -> FetchFuture<Option<Reference>> {
        let (relationship, link) =
            match self.linked_relationship(record, key, RelationshipKind::BelongsTo) {
                Ok(found) => found,
                Err(err) => return failed(err),
            };
        let adapter = match self.adapter_for(record.type_key()) {
            Ok(adapter) => adapter,
            Err(err) => return failed(err),
        };

        let owner = record.clone();
        let key = key.to_string();
        fetch_belongs_to(&adapter, self, record, &link, &relationship)
            .map_ok(move |reference| {
                let ids = reference.iter().map(|r| r.id().to_string()).collect();
                owner.set_related_ids(&key, ids);
                reference
            })
            .boxed()
    }

    fn linked_relationship(
        &self,
        record: &Record,
        key: &str,
        kind: RelationshipKind,
    ) -> Result<(Relationship, String), FetchError> {
        let unknown = || FetchError::UnknownRelationship {
            type_key: record.type_key().to_string(),
            key: key.to_string(),
        };
        let relationship = record.relationship(key).ok_or_else(unknown)?;
        if relationship.kind != kind {
            return Err(unknown());
        }
        let link = relationship
            .link
            .clone()
            .ok_or_else(|| FetchError::MissingLink {
                type_key: record.type_key().to_string(),
                key: key.to_string(),
            })?;
        Ok((relationship, link))
    }
}
