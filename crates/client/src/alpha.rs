//! The alpha-node connection pool.
//!
//! Clients bootstrap from a positional list of server addresses believed to
//! be network members. Polling those for the alpha group's hosts (under
//! majority agreement) yields the authoritative alpha membership, complete
//! with public keys; the pool can then be refreshed to talk to actual
//! alpha nodes and verify everything they sign.

use crate::quorum::majority_response;
use conclave_messages::{ClusterConnector, RpcClient};
use conclave_types::{nodes_message, Host, PublicKey, ALPHA_GROUP};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// One pooled alpha connection.
///
/// `key` is known once the peer came out of a verified membership answer.
/// Bootstrap connections start without one and their responses are tallied
/// unverified; the initial trust is the majority across independently
/// chosen bootstrap servers.
#[derive(Clone)]
pub struct AlphaClient {
    /// The connection.
    pub rpc: RpcClient,
    /// Address the connection was dialed to.
    pub addr: String,
    /// The node's public key, when known.
    pub key: Option<PublicKey>,
}

/// Atomically swappable set of alpha connections.
pub struct AlphaRpcPool {
    connector: Arc<dyn ClusterConnector>,
    clients: RwLock<Arc<Vec<AlphaClient>>>,
}

impl AlphaRpcPool {
    /// Dial the bootstrap list. Unreachable entries are skipped; an empty
    /// pool is permitted and simply fails every quorum until refreshed.
    pub async fn connect(bootstraps: &[String], connector: Arc<dyn ClusterConnector>) -> Self {
        let mut clients = Vec::with_capacity(bootstraps.len());
        for addr in bootstraps {
            match connector.connect(addr).await {
                Ok(rpc) => clients.push(AlphaClient {
                    rpc,
                    addr: addr.clone(),
                    key: None,
                }),
                Err(e) => warn!(addr, error = %e, "bootstrap server unreachable"),
            }
        }
        Self {
            connector,
            clients: RwLock::new(Arc::new(clients)),
        }
    }

    /// Snapshot of the current connections.
    pub fn get(&self) -> Arc<Vec<AlphaClient>> {
        self.clients.read().clone()
    }

    /// Re-resolve the alpha group through the current pool and reconnect
    /// to its actual members. Returns whether the pool was replaced.
    pub async fn refresh(&self) -> bool {
        let current = self.get();
        let Some(hosts) = alpha_nodes(&current).await else {
            debug!("alpha membership quorum failed, keeping current pool");
            return false;
        };

        let mut clients = Vec::with_capacity(hosts.len());
        for host in &hosts {
            let key = match PublicKey::from_bytes(&host.public_key) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(node = %host.id, error = %e, "alpha host with invalid key");
                    None
                }
            };
            match self.connector.connect(&host.server_addr).await {
                Ok(rpc) => clients.push(AlphaClient {
                    rpc,
                    addr: host.server_addr.clone(),
                    key,
                }),
                Err(e) => warn!(addr = %host.server_addr, error = %e, "alpha node unreachable"),
            }
        }
        if clients.is_empty() {
            warn!("no alpha node reachable, keeping current pool");
            return false;
        }
        debug!(count = clients.len(), "alpha pool refreshed");
        *self.clients.write() = Arc::new(clients);
        true
    }
}

/// Resolve the alpha group's hosts by majority over `clients`.
///
/// Canonical bytes are [`nodes_message`] over the advertised host list;
/// responses from clients with a known key must additionally carry a valid
/// signature over those bytes or they abstain.
pub async fn alpha_nodes(clients: &[AlphaClient]) -> Option<Vec<Host>> {
    majority_response(clients, |client: AlphaClient| async move {
        match client.rpc.group_hosts(ALPHA_GROUP).await {
            Ok(response) => {
                let canonical = nodes_message(&response.nodes);
                if let Some(key) = &client.key {
                    if !key.verify(&canonical, &response.signature) {
                        warn!(addr = %client.addr, "alpha host list with bad signature");
                        return (None, Vec::new());
                    }
                }
                (Some(response.nodes), canonical)
            }
            Err(e) => {
                warn!(addr = %client.addr, error = %e, "error getting alpha hosts");
                (None, Vec::new())
            }
        }
    })
    .await
}
