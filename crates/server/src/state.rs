//! Node state assembly.

use crate::clients::ClusterClients;
use crate::directory::Directory;
use crate::replication::Replicator;
use crate::service::{CommandExecutor, ConsensusHandler, Service};
use conclave_messages::ClusterConnector;
use conclave_storage::{GroupLog, KvStore};
use conclave_types::{KeyPair, NodeId};
use std::sync::Arc;

/// One node's replication state: storage, membership directory, connection
/// pool, and the leader-side replicator, wired together.
pub struct NodeState {
    keypair: KeyPair,
    node_id: NodeId,
    directory: Arc<Directory>,
    log: GroupLog,
    clients: Arc<ClusterClients>,
    replicator: Replicator,
}

impl NodeState {
    /// Assemble a node over `kv`, dialing peers through `connector`.
    pub fn new(
        keypair: KeyPair,
        kv: Arc<dyn KvStore>,
        connector: Arc<dyn ClusterConnector>,
    ) -> Self {
        let node_id = NodeId::from_public_key(&keypair.public_key());
        let directory = Arc::new(Directory::new(kv.clone(), node_id));
        let log = GroupLog::new(kv);
        let clients = Arc::new(ClusterClients::new(connector));
        let replicator = Replicator::new(
            directory.clone(),
            log.clone(),
            clients.clone(),
            keypair.clone(),
        );
        Self {
            keypair,
            node_id,
            directory,
            log,
            clients,
            replicator,
        }
    }

    /// This node's id (hash of its public key).
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The node's signing key.
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Membership directory.
    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    /// Group log store.
    pub fn log(&self) -> &GroupLog {
        &self.log
    }

    /// Pooled connections to other nodes.
    pub fn clients(&self) -> &Arc<ClusterClients> {
        &self.clients
    }

    /// Leader-side replication dispatcher.
    pub fn replicator(&self) -> &Replicator {
        &self.replicator
    }

    /// Build the node's RPC surface with the given external contracts.
    pub fn service(
        &self,
        executor: Arc<dyn CommandExecutor>,
        consensus: Arc<dyn ConsensusHandler>,
    ) -> Arc<Service> {
        Arc::new(Service::new(
            self.directory.clone(),
            self.keypair.clone(),
            executor,
            consensus,
        ))
    }
}
