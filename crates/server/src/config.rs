//! Node configuration.
//!
//! Loaded from TOML, every section optional except `[node]`:
//!
//! ```toml
//! [node]
//! key_path = "/etc/conclave/node.key"
//! data_dir = "/var/lib/conclave"
//!
//! [storage]
//! write_buffer_mb = 64
//! block_cache_mb = 256
//! compression = "lz4"
//! ```

use conclave_storage::{Compression, RocksConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level node configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Node identity configuration.
    pub node: NodeSection,

    /// Storage tuning.
    #[serde(default)]
    pub storage: StorageSection,
}

/// Node identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSection {
    /// Path to the node's ed25519 key file (32 raw bytes).
    pub key_path: PathBuf,

    /// Data directory for the store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// Storage tuning section.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// Memtable size in megabytes.
    #[serde(default = "default_write_buffer_mb")]
    pub write_buffer_mb: usize,

    /// Block cache size in megabytes; 0 disables the cache.
    #[serde(default = "default_block_cache_mb")]
    pub block_cache_mb: usize,

    /// Compression codec: `none`, `lz4`, or `zstd`.
    #[serde(default = "default_compression")]
    pub compression: String,
}

fn default_write_buffer_mb() -> usize {
    64
}

fn default_block_cache_mb() -> usize {
    256
}

fn default_compression() -> String {
    "lz4".into()
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            write_buffer_mb: default_write_buffer_mb(),
            block_cache_mb: default_block_cache_mb(),
            compression: default_compression(),
        }
    }
}

impl NodeConfig {
    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

impl StorageSection {
    /// Translate into storage-layer tuning.
    pub fn rocks_config(&self) -> anyhow::Result<RocksConfig> {
        let compression = match self.compression.as_str() {
            "none" => Compression::None,
            "lz4" => Compression::Lz4,
            "zstd" => Compression::Zstd,
            other => anyhow::bail!("unknown compression codec: {other}"),
        };
        Ok(RocksConfig {
            write_buffer_size: self.write_buffer_mb << 20,
            block_cache_size: (self.block_cache_mb > 0).then_some(self.block_cache_mb << 20),
            compression,
            ..RocksConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: NodeConfig = toml::from_str(
            r#"
            [node]
            key_path = "node.key"
            "#,
        )
        .unwrap();
        assert_eq!(config.node.data_dir, PathBuf::from("./data"));
        assert_eq!(config.storage.write_buffer_mb, 64);
        assert_eq!(config.storage.compression, "lz4");
    }

    #[test]
    fn test_rejects_unknown_compression() {
        let section = StorageSection {
            compression: "brotli".into(),
            ..Default::default()
        };
        assert!(section.rocks_config().is_err());
    }
}
