// ─────────────────────────────────────────────────────────────────
// Write-back cache
// ─────────────────────────────────────────────────────────────────
// Buffers sets and deletes over a parent store. Reads fall through
// to the parent for keys not touched here. `write()` flushes the dirty
// set into the parent; dropping the cache without writing discards it.
// ─────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::{KvPair, KvStore, StoreError};

pub struct CacheStore<'p> {
    parent: &'p mut dyn KvStore,
    // None marks a pending delete
    dirty: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'p> CacheStore<'p> {
    pub fn new(parent: &'p mut dyn KvStore) -> Self {
        Self {
            parent,
            dirty: BTreeMap::new(),
        }
    }

    /// Number of buffered writes (sets and deletes).
    pub fn pending(&self) -> usize {
        self.dirty.len()
    }

    /// Flush buffered writes into the parent in key order.
    pub fn write(self) -> Result<(), StoreError> {
        let CacheStore { parent, dirty } = self;
        for (key, value) in dirty {
            match value {
                Some(v) => parent.set(&key, v)?,
                None => parent.delete(&key)?,
            }
        }
        Ok(())
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.dirty.get(key) {
            Some(v) => Ok(v.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.dirty.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.dirty.insert(key.to_vec(), None);
        Ok(())
    }

    fn iter_range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<KvPair>, StoreError> {
        if matches!(end, Some(e) if e <= start) {
            return Ok(Vec::new());
        }
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.iter_range(start, end)?.into_iter().collect();
        let upper = match end {
            Some(e) => Bound::Excluded(e.to_vec()),
            None => Bound::Unbounded,
        };
        for (k, v) in self.dirty.range((Bound::Included(start.to_vec()), upper)) {
            match v {
                Some(v) => {
                    merged.insert(k.clone(), v.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemStore;

    #[test]
    fn test_reads_see_own_writes() {
        let mut base = MemStore::new();
        base.set(b"k1", b"base".to_vec()).unwrap();
        let mut cache = CacheStore::new(&mut base);
        assert_eq!(cache.get(b"k1").unwrap(), Some(b"base".to_vec()));
        cache.set(b"k1", b"new".to_vec()).unwrap();
        cache.delete(b"k2").unwrap();
        assert_eq!(cache.get(b"k1").unwrap(), Some(b"new".to_vec()));
        assert_eq!(cache.pending(), 2);
    }

    #[test]
    fn test_drop_discards() {
        let mut base = MemStore::new();
        base.set(b"k", b"v".to_vec()).unwrap();
        {
            let mut cache = CacheStore::new(&mut base);
            cache.delete(b"k").unwrap();
            cache.set(b"x", b"y".to_vec()).unwrap();
        }
        assert_eq!(base.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert!(!base.has(b"x").unwrap());
    }

    #[test]
    fn test_write_flushes() {
        let mut base = MemStore::new();
        base.set(b"k", b"v".to_vec()).unwrap();
        let mut cache = CacheStore::new(&mut base);
        cache.delete(b"k").unwrap();
        cache.set(b"x", b"y".to_vec()).unwrap();
        cache.write().unwrap();
        assert!(!base.has(b"k").unwrap());
        assert_eq!(base.get(b"x").unwrap(), Some(b"y".to_vec()));
    }

    #[test]
    fn test_range_merges_dirty_set() {
        let mut base = MemStore::new();
        for k in [b"a1", b"a2", b"a3", b"b1"] {
            base.set(k, b"base".to_vec()).unwrap();
        }
        let mut cache = CacheStore::new(&mut base);
        cache.delete(b"a2").unwrap();
        cache.set(b"a0", b"new".to_vec()).unwrap();
        cache.set(b"a3", b"new".to_vec()).unwrap();
        let got = cache.iter_prefix(b"a").unwrap();
        let keys: Vec<&[u8]> = got.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![&b"a0"[..], &b"a1"[..], &b"a3"[..]]);
        assert_eq!(got[2].1, b"new".to_vec());
    }

    #[test]
    fn test_nested_caches() {
        let mut base = MemStore::new();
        let mut outer = CacheStore::new(&mut base);
        outer.set(b"o", b"1".to_vec()).unwrap();
        {
            let mut inner = CacheStore::new(&mut outer);
            inner.set(b"i", b"2".to_vec()).unwrap();
            assert!(inner.has(b"o").unwrap());
            inner.write().unwrap();
        }
        {
            let mut discarded = CacheStore::new(&mut outer);
            discarded.set(b"gone", b"3".to_vec()).unwrap();
        }
        outer.write().unwrap();
        assert!(base.has(b"i").unwrap());
        assert!(base.has(b"o").unwrap());
        assert!(!base.has(b"gone").unwrap());
    }
}
