//! In-memory store for tests.

use crate::kv::{KvStore, StorageError};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A `BTreeMap`-backed [`KvStore`], the ordered in-memory twin of
/// [`crate::RocksKv`]. Used by unit and integration tests that don't want a
/// disk.
#[derive(Debug, Default)]
pub struct MemoryKv {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn in_prefix<'a>(
        map: &'a BTreeMap<Vec<u8>, Vec<u8>>,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a Vec<u8>)> + 'a {
        map.range(prefix.to_vec()..)
            .take_while(move |(key, _)| key.starts_with(prefix))
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.map.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.map.write().remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let map = self.map.read();
        Ok(Self::in_prefix(&map, prefix)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn scan_prefix_rev(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let mut items = self.scan_prefix(prefix)?;
        items.reverse();
        Ok(items)
    }

    fn scan_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
        let map = self.map.read();
        Ok(Self::in_prefix(&map, prefix).map(|(k, _)| k.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_prefix_bounds() {
        let kv = MemoryKv::new();
        kv.put(b"a/1", b"one").unwrap();
        kv.put(b"a/2", b"two").unwrap();
        kv.put(b"b/1", b"other").unwrap();

        let items = kv.scan_prefix(b"a/").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], (b"a/1".to_vec(), b"one".to_vec()));

        let keys = kv.scan_keys(b"a/").unwrap();
        assert_eq!(keys, vec![b"a/1".to_vec(), b"a/2".to_vec()]);
    }

    #[test]
    fn test_scan_rev_descends() {
        let kv = MemoryKv::new();
        kv.put(b"k/1", b"1").unwrap();
        kv.put(b"k/2", b"2").unwrap();
        kv.put(b"k/3", b"3").unwrap();

        let items = kv.scan_prefix_rev(b"k/").unwrap();
        let keys: Vec<_> = items.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"k/3".to_vec(), b"k/2".to_vec(), b"k/1".to_vec()]);
    }
}
