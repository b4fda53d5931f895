//! Serializer capability: normalizes raw adapter payloads for the store.

mod json;
mod registry;
mod rest;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::adapter::Adapter;
use crate::error::FetchError;
use crate::request::RequestKind;
use crate::store::Store;

pub use json::JsonSerializer;
pub use registry::SerializerRegistry;
pub use rest::RestSerializer;

/// A normalized payload, not yet merged.
///
/// `primary` is one record object for singular requests, an array of record
/// objects for collection requests, or `null` for nothing. `sideloaded`
/// holds other records the response carried, keyed by record type, each a
/// record object or an array of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub primary: Value,
    pub sideloaded: Vec<(String, Value)>,
    pub meta: Option<Map<String, Value>>,
}

impl Extracted {
    pub fn new(primary: Value) -> Self {
        Self {
            primary,
            ..Self::default()
        }
    }
}

/// Turns a raw adapter payload into the store's canonical shape.
///
/// Extraction never touches the store; the caller merges the result once
/// the primary payload has been checked.
pub trait Serializer: Send + Sync {
    fn extract(
        &self,
        store: &Store,
        type_key: &str,
        payload: Value,
        id: Option<&str>,
        kind: RequestKind,
    ) -> Result<Extracted, FetchError>;
}

/// Resolve the serializer for an adapter and record type.
pub fn serializer_for(store: &Store, adapter: &dyn Adapter, type_key: &str) -> Arc<dyn Serializer> {
    store.serializer_for(adapter.key(), type_key)
}

/// Root key used for a collection of `type_key` records.
pub fn pluralize(type_key: &str) -> String {
    if let Some(stem) = type_key.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if type_key.ends_with('s') || type_key.ends_with('x') || type_key.ends_with("ch") {
        return format!("{}es", type_key);
    }
    format!("{}s", type_key)
}

/// Record type named by a payload root key.
pub fn singularize(root: &str) -> String {
    if let Some(stem) = root.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["sses", "xes", "ches"] {
        if root.ends_with(suffix) {
            return root[..root.len() - 2].to_string();
        }
    }
    if let Some(stem) = root.strip_suffix('s') {
        if !stem.ends_with('s') {
            return stem.to_string();
        }
    }
    root.to_string()
}
