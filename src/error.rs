use std::fmt;

use crate::request::RequestKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The adapter rejected the request. Passed to callers untouched.
    Adapter {
        status: Option<u16>,
        message: String,
    },
    /// The adapter broke its contract (e.g. `find_many` produced no future).
    AdapterMisuse(String),
    MalformedResponse {
        operation: RequestKind,
        message: String,
    },
    InvalidRecord {
        type_key: String,
        message: String,
    },
    Serializer(String),
    NoAdapter(String),
    UnknownRelationship {
        type_key: String,
        key: String,
    },
    MissingLink {
        type_key: String,
        key: String,
    },
    Config(String),
}

impl FetchError {
    /// Shorthand for an adapter rejection.
    pub fn rejected(status: Option<u16>, message: impl Into<String>) -> Self {
        FetchError::Adapter {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(operation: RequestKind, message: impl Into<String>) -> Self {
        FetchError::MalformedResponse {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_record(type_key: &str, message: impl Into<String>) -> Self {
        FetchError::InvalidRecord {
            type_key: type_key.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Adapter {
                status: Some(status),
                message,
            } => write!(f, "adapter error ({}): {}", status, message),
            FetchError::Adapter {
                status: None,
                message,
            } => write!(f, "adapter error: {}", message),
            FetchError::AdapterMisuse(message) => write!(f, "adapter misuse: {}", message),
            FetchError::MalformedResponse { operation, message } => {
                write!(f, "malformed {} response: {}", operation, message)
            }
            FetchError::InvalidRecord { type_key, message } => {
                write!(f, "invalid {} record: {}", type_key, message)
            }
            FetchError::Serializer(message) => write!(f, "serializer error: {}", message),
            FetchError::NoAdapter(type_key) => {
                write!(f, "no adapter registered for type {}", type_key)
            }
            FetchError::UnknownRelationship { type_key, key } => {
                write!(f, "type {} has no relationship named {}", type_key, key)
            }
            FetchError::MissingLink { type_key, key } => {
                write!(f, "relationship {}.{} has no link to load from", type_key, key)
            }
            FetchError::Config(message) => write!(f, "config error: {}", message),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Serializer(err.to_string())
    }
}
