//! RocksDB-backed store.
//!
//! Production storage implementation. Tuning mirrors what a replication
//! workload wants: LZ4 on disk, a block cache for the hot membership rows,
//! bloom filters for point reads on composed keys.

use crate::keys;
use crate::kv::{KvStore, StorageError};
use rocksdb::{Direction, IteratorMode, Options, DB};
use std::path::Path;
use std::sync::Arc;

/// On-disk compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// No compression.
    None,
    /// LZ4, the default.
    Lz4,
    /// Zstd, denser and slower.
    Zstd,
}

impl Compression {
    fn to_rocksdb(self) -> rocksdb::DBCompressionType {
        match self {
            Compression::None => rocksdb::DBCompressionType::None,
            Compression::Lz4 => rocksdb::DBCompressionType::Lz4,
            Compression::Zstd => rocksdb::DBCompressionType::Zstd,
        }
    }
}

/// Tunables for [`RocksKv::open_with_config`].
#[derive(Debug, Clone)]
pub struct RocksConfig {
    /// Background compaction/flush jobs.
    pub max_background_jobs: i32,
    /// Incremental fsync chunk; 0 disables.
    pub bytes_per_sync: usize,
    /// Info-log files to retain.
    pub keep_log_file_num: usize,
    /// Memtables per column family.
    pub max_write_buffer_number: i32,
    /// Memtable size in bytes.
    pub write_buffer_size: usize,
    /// Compression codec.
    pub compression: Compression,
    /// Block cache size in bytes; `None` for rocksdb's default.
    pub block_cache_size: Option<usize>,
    /// Bloom filter bits per key; 0 disables.
    pub bloom_filter_bits: f64,
}

impl Default for RocksConfig {
    fn default() -> Self {
        Self {
            max_background_jobs: 4,
            bytes_per_sync: 1 << 20,
            keep_log_file_num: 10,
            max_write_buffer_number: 4,
            write_buffer_size: 64 << 20,
            compression: Compression::Lz4,
            block_cache_size: Some(256 << 20),
            bloom_filter_bits: 10.0,
        }
    }
}

/// RocksDB-based [`KvStore`] for production use.
pub struct RocksKv {
    db: Arc<DB>,
}

impl RocksKv {
    /// Open or create a database at `path` with default tuning.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::open_with_config(path, RocksConfig::default())
    }

    /// Open with custom configuration.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: RocksConfig,
    ) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        opts.set_max_background_jobs(config.max_background_jobs);
        if config.bytes_per_sync > 0 {
            opts.set_bytes_per_sync(config.bytes_per_sync as u64);
        }
        opts.set_keep_log_file_num(config.keep_log_file_num);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(config.compression.to_rocksdb());

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        if let Some(cache_size) = config.block_cache_size {
            let cache = rocksdb::Cache::new_lru_cache(cache_size);
            block_opts.set_block_cache(&cache);
        }
        if config.bloom_filter_bits > 0.0 {
            block_opts.set_bloom_filter(config.bloom_filter_bits, false);
        }
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, path).map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Forward iteration over `[prefix, next_prefix)`.
    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));

        iter.map_while(|item| item.ok())
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect()
    }
}

impl KvStore for RocksKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.db
            .get(key)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.db
            .put(key, value)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.db
            .delete(key)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        Ok(self.iter_prefix(prefix))
    }

    fn scan_prefix_rev(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        // Seek to the exclusive upper bound and walk backwards. The seek
        // lands on the last key <= bound, which may be the bound itself;
        // skip until we're inside the prefix.
        let end = keys::next_prefix(prefix);
        let iter = match &end {
            Some(end) => self
                .db
                .iterator(IteratorMode::From(end, Direction::Reverse)),
            None => self.db.iterator(IteratorMode::End),
        };
        Ok(iter
            .map_while(|item| item.ok())
            .skip_while(|(key, _)| !key.starts_with(prefix))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect())
    }

    fn scan_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
        Ok(self.iter_prefix(prefix).into_iter().map(|(k, _)| k).collect())
    }
}
