use serde_json::{Map, Value};

use super::{Extracted, Serializer};
use crate::error::FetchError;
use crate::request::RequestKind;
use crate::store::Store;

/// Payloads are the records themselves, with no root key.
///
/// The only normalization is renaming a custom primary key to `id`.
#[derive(Debug, Clone)]
pub struct JsonSerializer {
    primary_key: String,
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::new("id")
    }
}

impl JsonSerializer {
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
        }
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub(crate) fn normalize_record(&self, mut record: Map<String, Value>) -> Map<String, Value> {
        if self.primary_key != "id" {
            if let Some(id) = record.remove(&self.primary_key) {
                record.insert("id".into(), id);
            }
        }
        record
    }

    /// Normalize a record, an array of records, or pass anything else through.
    pub(crate) fn normalize(&self, payload: Value) -> Value {
        match payload {
            Value::Object(record) => Value::Object(self.normalize_record(record)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(record) => Value::Object(self.normalize_record(record)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

impl Serializer for JsonSerializer {
    fn extract(
        &self,
        _store: &Store,
        _type_key: &str,
        payload: Value,
        _id: Option<&str>,
        _kind: RequestKind,
    ) -> Result<Extracted, FetchError> {
        Ok(Extracted::new(self.normalize(payload)))
    }
}
