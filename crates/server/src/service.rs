//! The node's RPC surface.
//!
//! [`Service`] answers the cluster RPC contract over the node's membership
//! directory: host lists and leader lookups for any group it knows about
//! (alpha nodes answer these for every group), signed command execution,
//! and inbound replication.
//!
//! Command semantics and log-commit rules are deliberately external:
//! [`CommandExecutor`] applies commands to the deterministic state machine,
//! [`ConsensusHandler`] owns what happens to an accepted `AppendEntries`
//! batch. The service's own job is membership, signing, and signature
//! verification at the boundary.

use crate::directory::Directory;
use conclave_messages::{
    AppendEntriesRequest, AppendEntriesResponse, ClusterRpc, CommandResponse,
    GroupContentResponse, GroupLeaderResponse, GroupNodesResponse, RpcError,
};
use conclave_storage::StorageError;
use conclave_types::{
    command_result_message, exec_command_message, nodes_message, CommandRequest, GroupId, Host,
    KeyPair, PublicKey,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Applies committed commands to the node's deterministic state machine.
///
/// Every replica must produce identical bytes for identical `(func_id,
/// arg)` sequences; the client-side quorum tally depends on it.
pub trait CommandExecutor: Send + Sync {
    /// Execute one command and return its result bytes.
    fn execute(&self, request: &CommandRequest) -> Vec<u8>;
}

/// Consumes verified inbound replication batches.
pub trait ConsensusHandler: Send + Sync {
    /// Handle an `AppendEntries` batch whose leader signature has already
    /// been verified.
    fn on_append_entries(&self, request: AppendEntriesRequest) -> AppendEntriesResponse;
}

/// RPC handlers over one node's state.
pub struct Service {
    directory: Arc<Directory>,
    keypair: KeyPair,
    executor: Arc<dyn CommandExecutor>,
    consensus: Arc<dyn ConsensusHandler>,
}

impl Service {
    /// Create the service for a node signing with `keypair`.
    pub fn new(
        directory: Arc<Directory>,
        keypair: KeyPair,
        executor: Arc<dyn CommandExecutor>,
        consensus: Arc<dyn ConsensusHandler>,
    ) -> Self {
        Self {
            directory,
            keypair,
            executor,
            consensus,
        }
    }

    /// Hosts backing `group`, in the order of the peers that own them.
    ///
    /// The order is a pure function of stored membership, so every honest
    /// node advertising the same group produces byte-identical
    /// [`nodes_message`] payloads, which is what clients compare.
    fn hosts_of_group(&self, group: GroupId) -> Result<Vec<Host>, StorageError> {
        let peers = self.directory.get_group_peers(group)?;
        let mut hosts: Vec<Host> = Vec::with_capacity(peers.len());
        for peer in peers.iter() {
            match self.directory.get_host(peer.host)? {
                Some(host) => {
                    if !hosts.iter().any(|h| h.id == host.id) {
                        hosts.push((*host).clone());
                    }
                }
                None => warn!(%group, host = %peer.host, "peer host has no record"),
            }
        }
        Ok(hosts)
    }

    fn verified_public_key(&self, host: &Host) -> Option<PublicKey> {
        match PublicKey::from_bytes(&host.public_key) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(host = %host.id, error = %e, "stored host key invalid");
                None
            }
        }
    }
}

fn storage_error(e: StorageError) -> RpcError {
    RpcError::Remote(e.to_string())
}

#[async_trait::async_trait]
impl ClusterRpc for Service {
    async fn group_hosts(&self, group: GroupId) -> Result<GroupNodesResponse, RpcError> {
        let nodes = self.hosts_of_group(group).map_err(storage_error)?;
        let signature = self.keypair.sign(&nodes_message(&nodes));
        Ok(GroupNodesResponse { nodes, signature })
    }

    async fn group_leader(&self, group: GroupId) -> Result<GroupLeaderResponse, RpcError> {
        let leader = (|| -> Result<Option<Host>, StorageError> {
            let Some(meta) = self.directory.get_group(group)? else {
                return Ok(None);
            };
            let Some(peer) = self.directory.get_peer(group, meta.leader_peer)? else {
                return Ok(None);
            };
            Ok(self.directory.get_host(peer.host)?.map(|h| (*h).clone()))
        })()
        .map_err(storage_error)?;

        if leader.is_none() {
            debug!(%group, "no leader known");
        }
        let signed: &[Host] = leader.as_slice();
        let signature = self.keypair.sign(&nodes_message(signed));
        Ok(GroupLeaderResponse {
            node: leader,
            signature,
        })
    }

    async fn group_content(&self, group: GroupId) -> Result<GroupContentResponse, RpcError> {
        let exists = self
            .directory
            .get_group(group)
            .map_err(storage_error)?
            .is_some();
        let signature = self.keypair.sign(&[exists as u8]);
        Ok(GroupContentResponse { exists, signature })
    }

    async fn exec_command(&self, request: CommandRequest) -> Result<CommandResponse, RpcError> {
        // The client registered its public key as a host record; its node
        // id binds the two together.
        let client_host = self
            .directory
            .get_host(request.client_id)
            .map_err(storage_error)?
            .ok_or_else(|| RpcError::Remote(format!("unknown client {}", request.client_id)))?;
        let key = self
            .verified_public_key(&client_host)
            .ok_or_else(|| RpcError::Remote("client key unusable".into()))?;
        if !key.verify(&exec_command_message(&request), &request.signature) {
            warn!(client = %request.client_id, request = %request.request_id.0, "bad command signature");
            return Err(RpcError::Remote("invalid command signature".into()));
        }

        let result = self.executor.execute(&request);
        let signature = self.keypair.sign(&command_result_message(
            request.group,
            request.request_id,
            &result,
        ));
        Ok(CommandResponse {
            group: request.group,
            request_id: request.request_id,
            result,
            signature,
        })
    }

    async fn append_entries(
        &self,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, RpcError> {
        let leader_host = self
            .directory
            .get_host(request.leader_id)
            .map_err(storage_error)?
            .ok_or_else(|| RpcError::Remote(format!("unknown leader {}", request.leader_id)))?;
        let key = self
            .verified_public_key(&leader_host)
            .ok_or_else(|| RpcError::Remote("leader key unusable".into()))?;
        let anchor = conclave_types::append_entries_message(
            request.group,
            request.term,
            request.prev_log_index,
            request.prev_log_term,
        );
        if !key.verify(&anchor, &request.signature) {
            warn!(group = %request.group, leader = %request.leader_id, "bad append entries signature");
            return Err(RpcError::Remote("invalid leader signature".into()));
        }

        Ok(self.consensus.on_append_entries(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_storage::MemoryKv;
    use conclave_types::{
        exec_command_message, NodeId, Peer, PeerId, RaftGroup, RequestId, Signature,
    };

    /// Echoes the argument back, prefixed by the func id byte.
    struct EchoExecutor;

    impl CommandExecutor for EchoExecutor {
        fn execute(&self, request: &CommandRequest) -> Vec<u8> {
            let mut out = vec![request.func_id as u8];
            out.extend_from_slice(&request.arg);
            out
        }
    }

    struct RejectAll;

    impl ConsensusHandler for RejectAll {
        fn on_append_entries(&self, request: AppendEntriesRequest) -> AppendEntriesResponse {
            AppendEntriesResponse {
                group: request.group,
                term: request.term,
                peer: PeerId(0),
                success: false,
                convinced: true,
                last_index: 0,
                last_hash: conclave_types::Hash::ZERO,
                signature: Signature::zero(),
            }
        }
    }

    struct Fixture {
        service: Service,
        server_key: KeyPair,
        client_key: KeyPair,
        client_id: NodeId,
    }

    fn host_for(key: &KeyPair, addr: &str) -> Host {
        let public_key = key.public_key();
        Host {
            id: NodeId::from_public_key(&public_key),
            server_addr: addr.into(),
            public_key: public_key.as_bytes().to_vec(),
            online: true,
        }
    }

    fn fixture() -> Fixture {
        let kv = Arc::new(MemoryKv::new());
        let server_key = KeyPair::generate();
        let server_id = NodeId::from_public_key(&server_key.public_key());
        let directory = Arc::new(Directory::new(kv, server_id));

        let server_host = host_for(&server_key, "10.0.0.1:4000");
        directory.save_host(&server_host).unwrap();
        directory
            .save_peer(&Peer {
                id: PeerId(10),
                group: GroupId(7),
                host: server_host.id,
                next_index: 1,
                match_index: 0,
            })
            .unwrap();
        directory
            .save_group(&RaftGroup {
                id: GroupId(7),
                term: 1,
                leader_peer: PeerId(10),
                replications: 3,
            })
            .unwrap();

        let client_key = KeyPair::generate();
        let client_host = host_for(&client_key, "client");
        let client_id = client_host.id;
        directory.save_host(&client_host).unwrap();

        Fixture {
            service: Service::new(
                directory,
                server_key.clone(),
                Arc::new(EchoExecutor),
                Arc::new(RejectAll),
            ),
            server_key,
            client_key,
            client_id,
        }
    }

    fn signed_request(fx: &Fixture) -> CommandRequest {
        let mut request = CommandRequest {
            group: GroupId(7),
            client_id: fx.client_id,
            request_id: RequestId(1),
            func_id: 42,
            arg: vec![0xAA],
            signature: Signature::zero(),
        };
        request.signature = fx.client_key.sign(&exec_command_message(&request));
        request
    }

    #[tokio::test]
    async fn test_group_hosts_signed() {
        let fx = fixture();
        let response = fx.service.group_hosts(GroupId(7)).await.unwrap();
        assert_eq!(response.nodes.len(), 1);
        assert!(fx
            .server_key
            .public_key()
            .verify(&nodes_message(&response.nodes), &response.signature));
    }

    #[tokio::test]
    async fn test_group_leader_resolves() {
        let fx = fixture();
        let response = fx.service.group_leader(GroupId(7)).await.unwrap();
        let leader = response.node.unwrap();
        assert_eq!(leader.server_addr, "10.0.0.1:4000");
    }

    #[tokio::test]
    async fn test_group_leader_absent_group() {
        let fx = fixture();
        let response = fx.service.group_leader(GroupId(99)).await.unwrap();
        assert!(response.node.is_none());
    }

    #[tokio::test]
    async fn test_group_content() {
        let fx = fixture();
        assert!(fx.service.group_content(GroupId(7)).await.unwrap().exists);
        assert!(!fx.service.group_content(GroupId(99)).await.unwrap().exists);
    }

    #[tokio::test]
    async fn test_exec_command_round_trip() {
        let fx = fixture();
        let response = fx.service.exec_command(signed_request(&fx)).await.unwrap();
        assert_eq!(response.result, vec![42, 0xAA]);
        // Replica result is signed for the client-side tally.
        assert!(fx.server_key.public_key().verify(
            &command_result_message(GroupId(7), RequestId(1), &response.result),
            &response.signature,
        ));
    }

    #[tokio::test]
    async fn test_exec_command_rejects_bad_signature() {
        let fx = fixture();
        let mut request = signed_request(&fx);
        request.arg = vec![0xFF];
        let err = fx.service.exec_command(request).await.unwrap_err();
        assert!(matches!(err, RpcError::Remote(_)));
    }

    #[tokio::test]
    async fn test_exec_command_rejects_unknown_client() {
        let fx = fixture();
        let mut request = signed_request(&fx);
        request.client_id = NodeId(0xDEAD);
        assert!(fx.service.exec_command(request).await.is_err());
    }

    #[tokio::test]
    async fn test_append_entries_verifies_leader() {
        let fx = fixture();
        let leader_key = &fx.server_key;
        let anchor = conclave_types::append_entries_message(GroupId(7), 1, 0, 0);
        let request = AppendEntriesRequest {
            group: GroupId(7),
            term: 1,
            leader_id: NodeId::from_public_key(&leader_key.public_key()),
            prev_log_index: 0,
            prev_log_term: 0,
            signature: leader_key.sign(&anchor),
            quorum_votes: vec![],
            entries: vec![],
        };
        let response = fx.service.append_entries(request.clone()).await.unwrap();
        assert!(response.convinced);

        let forged = AppendEntriesRequest {
            signature: Signature::zero(),
            ..request
        };
        assert!(fx.service.append_entries(forged).await.is_err());
    }
}
