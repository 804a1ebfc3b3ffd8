// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// F1 DISTRIBUTION - STORE MODULE
//
// Ordered byte-keyed storage. Every range scan returns entries in ascending
// lexicographic key order; reward accounting iterates slash events and
// delegations by key prefix, so this order is consensus-critical.
//
// Backends:
//   MemStore   — BTreeMap, used by tests and simulation
//   SledStore  — persistent, sled embedded database
//   CacheStore — write-back layer over any other store (per-message atomicity)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod cache;
pub mod mem;
pub mod sled_store;

pub use cache::CacheStore;
pub use mem::MemStore;
pub use sled_store::SledStore;

use thiserror::Error;

pub type KvPair = (Vec<u8>, Vec<u8>);

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),

    #[error("store backend: {0}")]
    Backend(String),
}

/// Byte store with deterministic ordered iteration.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Entries with `start <= key < end` (unbounded above when `end` is None).
    fn iter_range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<KvPair>, StoreError>;

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, StoreError> {
        let end = prefix_end(prefix);
        self.iter_range(prefix, end.as_deref())
    }
}

/// Smallest key strictly greater than every key starting with `prefix`.
/// `None` when no such key exists (empty or all-0xff prefix).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_end() {
        assert_eq!(prefix_end(&[0x05, 0x01]), Some(vec![0x05, 0x02]));
        assert_eq!(prefix_end(&[0x05, 0xff]), Some(vec![0x06]));
        assert_eq!(prefix_end(&[0xff, 0xff]), None);
        assert_eq!(prefix_end(&[]), None);
    }
}
