//! Key-value storage and the per-group log store.
//!
//! Everything a node persists lives in one byte-keyed, byte-valued store
//! behind the [`KvStore`] trait: point reads, ordered prefix iteration in
//! both directions, and key-only iteration. [`RocksKv`] is the production
//! implementation; [`MemoryKv`] backs tests.
//!
//! All operations are synchronous blocking I/O. Callers in async contexts
//! should use `spawn_blocking` if needed to avoid blocking the runtime.

pub mod keys;
mod kv;
mod log;
mod memory;
mod rocks;

pub use kv::{KvStore, StorageError};
pub use log::{GroupLog, ReverseLogIterator};
pub use memory::MemoryKv;
pub use rocks::{Compression, RocksConfig, RocksKv};
