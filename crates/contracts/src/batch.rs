//! Batch - one outbound request body

use bytes::Bytes;
use serde::Serialize;
use serde_json::value::RawValue;

use crate::{ContractError, SerializedItem};

/// Unit sent over the wire
///
/// Built only inside a flush and never mutated afterwards. `objects` is the
/// comma-joined array of buffered items, embedded verbatim.
#[derive(Debug, Serialize)]
pub struct Batch {
    /// Stream key
    pub collection: String,

    /// API credential
    #[serde(rename = "writeKey")]
    pub write_key: String,

    /// `[item,item,...]` in accumulation order
    pub objects: Box<RawValue>,

    #[serde(skip)]
    item_count: usize,
}

impl Batch {
    /// Join `items` into a single array payload
    ///
    /// # Errors
    /// Returns `ContractError::Serialization` if the joined payload is not valid JSON
    pub fn from_items(
        collection: impl Into<String>,
        write_key: impl Into<String>,
        items: &[SerializedItem],
    ) -> Result<Self, ContractError> {
        let payload_len = items.iter().map(SerializedItem::len).sum::<usize>() + items.len() + 1;
        let mut payload = Vec::with_capacity(payload_len);
        payload.push(b'[');
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                payload.push(b',');
            }
            payload.extend_from_slice(item.as_bytes());
        }
        payload.push(b']');

        let payload = String::from_utf8(payload).map_err(|e| ContractError::Serialization {
            message: format!("batch payload is not utf-8: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            collection: collection.into(),
            write_key: write_key.into(),
            objects: RawValue::from_string(payload)?,
            item_count: items.len(),
        })
    }

    /// Number of items in the payload
    pub fn len(&self) -> usize {
        self.item_count
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    /// Encode the request body
    ///
    /// # Errors
    /// Returns `ContractError::Serialization` if JSON encoding fails
    pub fn to_json(&self) -> Result<Bytes, ContractError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}
