use serde_json::{Map, Value};

/// Per-type bookkeeping for find-all refreshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeMetadata {
    /// Latest `meta` object delivered with a payload of this type.
    pub meta: Map<String, Value>,
    /// Number of completed find-all refreshes.
    pub update_count: u64,
    pub is_updating: bool,
}

impl TypeMetadata {
    /// Since token for the next find-all, taken from `meta.since`.
    pub fn since(&self) -> Option<String> {
        match self.meta.get("since")? {
            Value::String(token) => Some(token.clone()),
            Value::Number(token) => Some(token.to_string()),
            _ => None,
        }
    }
}
