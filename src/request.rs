use std::fmt;

use serde::{Deserialize, Serialize};

/// The six request shapes an adapter answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Find,
    FindMany,
    FindHasMany,
    FindBelongsTo,
    FindAll,
    FindQuery,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Find => "find",
            RequestKind::FindMany => "findMany",
            RequestKind::FindHasMany => "findHasMany",
            RequestKind::FindBelongsTo => "findBelongsTo",
            RequestKind::FindAll => "findAll",
            RequestKind::FindQuery => "findQuery",
        }
    }

    /// Whether the normalized payload must be an array.
    pub fn expects_collection(&self) -> bool {
        matches!(
            self,
            RequestKind::FindMany
                | RequestKind::FindHasMany
                | RequestKind::FindAll
                | RequestKind::FindQuery
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short description of a payload's JSON shape, for error messages.
pub(crate) fn describe_payload(payload: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match payload {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
