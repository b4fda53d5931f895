use serde_json::{Map, Value};

use super::json::JsonSerializer;
use super::{singularize, Extracted, Serializer};
use crate::error::FetchError;
use crate::request::RequestKind;
use crate::store::Store;

/// Root-keyed payloads, as returned by typical REST APIs.
///
/// ```text
/// { "post": {...}, "comments": [...], "meta": {...} }
/// ```
///
/// The root naming the requested type (singular or plural) is the primary
/// payload. Every other root is sideloaded under the type its key names. A
/// `meta` root becomes the requested type's metadata. Payloads without a
/// root (bare arrays, bare records) pass through.
#[derive(Debug, Clone, Default)]
pub struct RestSerializer {
    json: JsonSerializer,
}

impl RestSerializer {
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            json: JsonSerializer::new(primary_key),
        }
    }

    fn is_bare_record(&self, root: &Map<String, Value>) -> bool {
        root.contains_key(self.json.primary_key())
    }
}

fn record_id(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

impl Serializer for RestSerializer {
    fn extract(
        &self,
        _store: &Store,
        type_key: &str,
        payload: Value,
        id: Option<&str>,
        kind: RequestKind,
    ) -> Result<Extracted, FetchError> {
        let mut root = match payload {
            Value::Object(root) if !self.is_bare_record(&root) => root,
            other => return Ok(Extracted::new(self.json.normalize(other))),
        };

        let meta = match root.remove("meta") {
            Some(Value::Object(meta)) => Some(meta),
            _ => None,
        };
        let mut primary = None;
        let mut sideloaded = Vec::new();
        for (key, value) in root {
            let root_type = singularize(&key);
            if primary.is_none() && (key == type_key || root_type == type_key) {
                primary = Some(self.json.normalize(value));
            } else {
                match self.json.normalize(value) {
                    records @ (Value::Array(_) | Value::Object(_)) => {
                        sideloaded.push((root_type, records));
                    }
                    other => {
                        tracing::debug!(root = %root_type, value = %other, "ignoring non-record sideload");
                    }
                }
            }
        }

        let primary = match primary.unwrap_or(Value::Null) {
            Value::Array(mut items) if !kind.expects_collection() => {
                let position = match id {
                    Some(id) => items
                        .iter()
                        .position(|item| record_id(item).as_deref() == Some(id)),
                    None if items.is_empty() => None,
                    None => Some(0),
                };
                let picked = position.map(|i| items.remove(i)).unwrap_or(Value::Null);
                if !items.is_empty() {
                    sideloaded.push((type_key.to_string(), Value::Array(items)));
                }
                picked
            }
            other => other,
        };

        Ok(Extracted {
            primary,
            sideloaded,
            meta,
        })
    }
}
