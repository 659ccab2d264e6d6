//! Pooled connections to other cluster nodes.

use conclave_messages::{ClusterConnector, RpcClient};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Cached RPC connections, created on first use and reused thereafter.
///
/// Dialing failures are not sticky: a peer that refused one connection
/// attempt is retried on the next `try_get`.
pub struct ClusterClients {
    connector: Arc<dyn ClusterConnector>,
    clients: RwLock<HashMap<String, RpcClient>>,
}

impl ClusterClients {
    /// Create a pool dialing through `connector`.
    pub fn new(connector: Arc<dyn ClusterConnector>) -> Self {
        Self {
            connector,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// A connection to `addr`, reusing a pooled one when present. Returns
    /// `None` when the peer cannot be dialed; callers skip the peer and let
    /// the next replication tick retry.
    pub async fn try_get(&self, addr: &str) -> Option<RpcClient> {
        if let Some(client) = self.clients.read().get(addr) {
            return Some(client.clone());
        }
        match self.connector.connect(addr).await {
            Ok(client) => {
                // Two tasks may race the dial; last writer wins and both
                // handles stay usable.
                self.clients
                    .write()
                    .insert(addr.to_owned(), client.clone());
                Some(client)
            }
            Err(e) => {
                warn!(addr, error = %e, "failed to dial cluster peer");
                None
            }
        }
    }

    /// Drop the pooled connection to `addr`, forcing a fresh dial next
    /// time.
    pub fn evict(&self, addr: &str) {
        self.clients.write().remove(addr);
    }

    /// Number of pooled connections.
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}
