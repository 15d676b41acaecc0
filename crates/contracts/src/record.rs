//! Record - caller input, and its flattened / encoded forms

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ContractError;

/// Nested attribute tree supplied by the caller
pub type Attributes = Map<String, Value>;

/// Caller-supplied unit of work
///
/// Immutable once submitted. Records sharing a `key` land in the same buffer
/// and, in arrival order, in the same stream of batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stream key (collection name)
    #[serde(alias = "collection")]
    pub key: String,

    /// Opaque identifier
    pub id: String,

    /// Nested attributes
    #[serde(default, alias = "properties")]
    pub attributes: Attributes,
}

impl Record {
    /// Create a record with no attributes
    pub fn new(key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
            attributes: Attributes::new(),
        }
    }

    /// Add one top-level attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Single-level mapping from dotted attribute path to scalar/array value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecord(Map<String, Value>);

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a flattened entry, returning the previous value at that path
    pub fn insert(&mut self, path: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(path.into(), value)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Wire shape of one buffered object
#[derive(Serialize)]
struct ItemBody<'a> {
    id: &'a str,
    properties: &'a NormalizedRecord,
}

/// JSON encoding of one normalized record
///
/// Held exclusively by a buffer until flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedItem(Bytes);

impl SerializedItem {
    /// Encode `{"id": .., "properties": ..}`
    ///
    /// # Errors
    /// Returns `ContractError::Serialization` if JSON encoding fails
    pub fn encode(id: &str, properties: &NormalizedRecord) -> Result<Self, ContractError> {
        let data = serde_json::to_vec(&ItemBody { id, properties })?;
        Ok(Self(Bytes::from(data)))
    }

    /// Wrap bytes that are already a JSON object
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Encoded size in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
