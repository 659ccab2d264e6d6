//! The key-value store contract.

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// A byte-keyed, byte-valued store with ordered iteration.
///
/// Keys are composed by [`crate::keys`]; iteration order is byte
/// lexicographic, which those keys arrange to equal numeric order.
pub trait KvStore: Send + Sync {
    /// Point read.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert or overwrite.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), StorageError>;

    /// All `(key, value)` pairs under `prefix`, ascending.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// All `(key, value)` pairs under `prefix`, descending.
    fn scan_prefix_rev(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// All keys under `prefix`, ascending, without reading values. The
    /// peer listing path uses this: composed keys already carry the ids it
    /// needs.
    fn scan_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StorageError>;
}
