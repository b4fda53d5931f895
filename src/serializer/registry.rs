use std::collections::HashMap;
use std::sync::Arc;

use super::Serializer;

/// Serializers keyed by adapter key and record type.
///
/// Resolution goes from most to least specific: adapter + type, adapter
/// only, type only, then the default.
pub struct SerializerRegistry {
    default: Arc<dyn Serializer>,
    entries: HashMap<(Option<String>, Option<String>), Arc<dyn Serializer>>,
}

impl SerializerRegistry {
    pub fn new(default: Arc<dyn Serializer>) -> Self {
        Self {
            default,
            entries: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        adapter_key: Option<&str>,
        type_key: Option<&str>,
        serializer: Arc<dyn Serializer>,
    ) {
        self.entries.insert(
            (adapter_key.map(str::to_string), type_key.map(str::to_string)),
            serializer,
        );
    }

    pub fn resolve(&self, adapter_key: &str, type_key: &str) -> Arc<dyn Serializer> {
        let candidates = [
            (Some(adapter_key), Some(type_key)),
            (Some(adapter_key), None),
            (None, Some(type_key)),
        ];
        candidates
            .iter()
            .find_map(|(adapter, ty)| {
                self.entries
                    .get(&(adapter.map(str::to_string), ty.map(str::to_string)))
            })
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}
