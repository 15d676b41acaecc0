//! KeyedBuffer - pending items of one stream key

use contracts::SerializedItem;

/// Ordered items awaiting the next flush for one key
///
/// Owned by exactly one flush worker, so no locking: a flush reads and
/// resets the buffer in one `take` with nothing able to interleave.
#[derive(Debug)]
pub struct KeyedBuffer {
    key: String,
    items: Vec<SerializedItem>,
    size: usize,
}

impl KeyedBuffer {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            items: Vec::new(),
            size: 0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append in arrival order
    pub fn append(&mut self, item: SerializedItem) {
        self.size += item.len();
        self.items.push(item);
    }

    /// Accumulated bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Accumulated items
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether adding `item_len` more bytes reaches `max_bytes`
    pub fn reaches_bytes(&self, item_len: usize, max_bytes: usize) -> bool {
        self.size + item_len >= max_bytes
    }

    /// Remove and return every item, zeroing the counters
    pub fn take(&mut self) -> Vec<SerializedItem> {
        let items = std::mem::take(&mut self.items);
        self.reset();
        items
    }

    /// Drop every item, zeroing the counters
    pub fn reset(&mut self) {
        self.items.clear();
        self.size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(body: &str) -> SerializedItem {
        SerializedItem::from_bytes(body.to_string())
    }

    #[test]
    fn test_counters_track_items() {
        let mut buffer = KeyedBuffer::new("users");
        buffer.append(item(r#"{"id":"1"}"#));
        buffer.append(item(r#"{"id":"22"}"#));

        assert_eq!(buffer.key(), "users");
        assert_eq!(buffer.count(), 2);
        assert_eq!(buffer.size(), 10 + 11);
        assert!(buffer.reaches_bytes(4, 25));
        assert!(!buffer.reaches_bytes(3, 25));
    }

    #[test]
    fn test_take_preserves_order_and_resets() {
        let mut buffer = KeyedBuffer::new("users");
        buffer.append(item("1"));
        buffer.append(item("2"));
        buffer.append(item("3"));

        let taken = buffer.take();
        let bodies: Vec<_> = taken.iter().map(|i| i.as_bytes().to_vec()).collect();
        assert_eq!(bodies, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn test_reset() {
        let mut buffer = KeyedBuffer::new("users");
        buffer.append(item("abc"));
        buffer.reset();
        assert_eq!(buffer.count(), 0);
        assert_eq!(buffer.size(), 0);
    }
}
