use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::serializer::{JsonSerializer, RestSerializer, Serializer};

/// Serializer used when no more specific one is registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    #[default]
    Rest,
    Json,
}

/// Store configuration.
///
/// ```ignore
/// let config = StoreConfig::from_json(r#"{ "serializer": "json", "primary_key": "_id" }"#)?;
/// let store = Store::with_config(config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub serializer: SerializerKind,
    /// Payload field holding a record's id.
    pub primary_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            serializer: SerializerKind::Rest,
            primary_key: "id".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_json(json: &str) -> Result<Self, FetchError> {
        serde_json::from_str(json).map_err(|e| FetchError::Config(e.to_string()))
    }

    pub(crate) fn default_serializer(&self) -> Arc<dyn Serializer> {
        match self.serializer {
            SerializerKind::Rest => Arc::new(RestSerializer::new(self.primary_key.clone())),
            SerializerKind::Json => Arc::new(JsonSerializer::new(self.primary_key.clone())),
        }
    }
}
