// ─────────────────────────────────────────────────────────────────
// sled backend
// ─────────────────────────────────────────────────────────────────
// All distribution keys live in one named tree. sled iterates keys
// in lexicographic byte order, which is exactly the order required.
// ─────────────────────────────────────────────────────────────────

use std::path::Path;

use log::{debug, info, warn};
use sled::{Db, Tree};

use crate::{KvPair, KvStore, StoreError};

const TREE_DISTRIBUTION: &str = "distribution";

pub struct SledStore {
    db: Db,
    tree: Tree,
}

impl SledStore {
    /// Open or create a database at `path`. There is no background
    /// flusher: writes reach disk on `flush` or when the store is dropped,
    /// and the file lock is released as soon as the store goes away.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .path(path.as_ref())
            .flush_every_ms(None)
            .open()?;
        let tree = db.open_tree(TREE_DISTRIBUTION)?;
        info!(
            "opened distribution store at {} ({} keys)",
            path.as_ref().display(),
            tree.len()
        );
        Ok(Self { db, tree })
    }

    /// Throwaway database that is removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        let tree = db.open_tree(TREE_DISTRIBUTION)?;
        Ok(Self { db, tree })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        let bytes = self.db.flush()?;
        debug!("flushed {} bytes", bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl Drop for SledStore {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            warn!("flush on close failed: {}", e);
        }
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.tree.insert(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.tree.remove(key)?;
        Ok(())
    }

    fn iter_range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<KvPair>, StoreError> {
        let iter = match end {
            Some(e) if e <= start => return Ok(Vec::new()),
            Some(e) => self.tree.range(start..e),
            None => self.tree.range(start..),
        };
        iter.map(|item| -> Result<KvPair, StoreError> {
            let (k, v) = item?;
            Ok((k.to_vec(), v.to_vec()))
        })
        .collect()
    }
}
