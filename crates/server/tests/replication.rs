//! End-to-end replication dispatch over an in-memory transport.

use async_trait::async_trait;
use conclave_messages::{
    AppendEntriesRequest, AppendEntriesResponse, ClusterConnector, RpcClient, RpcError,
};
use conclave_server::{CommandExecutor, ConsensusHandler, NodeState, Service};
use conclave_storage::MemoryKv;
use conclave_types::{
    CommandRequest, GroupId, Hash, Host, KeyPair, LogEntry, NodeId, Peer, PeerId, PublicKey,
    RaftGroup, Signature,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Routes addresses to in-process services.
#[derive(Default)]
struct InMemoryNetwork {
    routes: RwLock<HashMap<String, RpcClient>>,
}

impl InMemoryNetwork {
    fn register(&self, addr: &str, client: RpcClient) {
        self.routes.write().insert(addr.to_owned(), client);
    }
}

#[async_trait]
impl ClusterConnector for InMemoryNetwork {
    async fn connect(&self, addr: &str) -> Result<RpcClient, RpcError> {
        self.routes
            .read()
            .get(addr)
            .cloned()
            .ok_or_else(|| RpcError::Unavailable(format!("no route to {addr}")))
    }
}

struct NoopExecutor;

impl CommandExecutor for NoopExecutor {
    fn execute(&self, _request: &CommandRequest) -> Vec<u8> {
        Vec::new()
    }
}

/// Records verified inbound batches for the test to poll.
struct RecordingConsensus {
    seen: Mutex<Vec<AppendEntriesRequest>>,
}

impl RecordingConsensus {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    async fn wait_for_batch(&self) -> AppendEntriesRequest {
        loop {
            if let Some(request) = self.seen.lock().first().cloned() {
                return request;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl ConsensusHandler for RecordingConsensus {
    fn on_append_entries(&self, request: AppendEntriesRequest) -> AppendEntriesResponse {
        let response = AppendEntriesResponse {
            group: request.group,
            term: request.term,
            peer: PeerId(2),
            success: true,
            convinced: true,
            last_index: request.entries.last().map(|e| e.index).unwrap_or(0),
            last_hash: Hash::ZERO,
            signature: Signature::zero(),
        };
        self.seen.lock().push(request);
        response
    }
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

struct Cluster {
    leader: NodeState,
    leader_host: Host,
    follower_host: Host,
    consensus: Arc<RecordingConsensus>,
    group: RaftGroup,
    follower_peer: Peer,
}

/// A leader node and a follower service wired through the in-memory
/// network, both knowing each other's host records.
fn two_node_cluster(network: &Arc<InMemoryNetwork>, next_index: u64) -> Cluster {
    let leader_key = KeyPair::generate();
    let follower_key = KeyPair::generate();
    let leader_host = host_for(&leader_key, "10.0.0.1:4000");
    let follower_host = host_for(&follower_key, "10.0.0.2:4000");

    let group = RaftGroup {
        id: GroupId(7),
        term: 3,
        leader_peer: PeerId(1),
        replications: 2,
    };
    let follower_peer = Peer {
        id: PeerId(2),
        group: group.id,
        host: follower_host.id,
        next_index,
        match_index: 0,
    };

    let leader = NodeState::new(
        leader_key,
        Arc::new(MemoryKv::new()),
        network.clone() as Arc<dyn ClusterConnector>,
    );
    leader.directory().save_host(&leader_host).unwrap();
    leader.directory().save_host(&follower_host).unwrap();
    leader.directory().save_group(&group).unwrap();

    let follower = NodeState::new(
        follower_key,
        Arc::new(MemoryKv::new()),
        network.clone() as Arc<dyn ClusterConnector>,
    );
    follower.directory().save_host(&leader_host).unwrap();
    let consensus = RecordingConsensus::new();
    let service: Arc<Service> = follower.service(Arc::new(NoopExecutor), consensus.clone());
    network.register(&follower_host.server_addr, service);

    Cluster {
        leader,
        leader_host,
        follower_host,
        consensus,
        group,
        follower_peer,
    }
}

#[tokio::test]
async fn test_leader_ships_missing_suffix_with_signed_anchor() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let network = Arc::new(InMemoryNetwork::default());
    let cluster = two_node_cluster(&network, 3);

    for (index, term) in [(1, 1), (2, 1), (3, 2), (4, 2), (5, 3)] {
        cluster
            .leader
            .log()
            .append(cluster.group.id, &LogEntry::new(index, term, vec![index as u8]))
            .unwrap();
    }

    cluster
        .leader
        .replicator()
        .send_peer_uncommitted_entries(
            CancellationToken::new(),
            &cluster.group,
            &cluster.follower_peer,
        )
        .await;

    let batch = tokio::time::timeout(Duration::from_secs(5), cluster.consensus.wait_for_batch())
        .await
        .expect("follower never saw the batch");

    let indices: Vec<u64> = batch.entries.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![3, 4, 5]);
    assert_eq!(batch.prev_log_index, 2);
    assert_eq!(batch.prev_log_term, 1);
    assert_eq!(batch.term, 3);
    assert_eq!(batch.leader_id, cluster.leader_host.id);
    assert!(batch.quorum_votes.is_empty());

    // The service already verified the anchor signature before the
    // recording handler saw it; check it independently all the same.
    let key = PublicKey::from_bytes(&cluster.leader_host.public_key).unwrap();
    let anchor = conclave_types::append_entries_message(
        batch.group,
        batch.term,
        batch.prev_log_index,
        batch.prev_log_term,
    );
    assert!(key.verify(&anchor, &batch.signature));
}

#[tokio::test]
async fn test_empty_log_dispatches_sentinel_anchor() {
    let network = Arc::new(InMemoryNetwork::default());
    let cluster = two_node_cluster(&network, 1);

    cluster
        .leader
        .replicator()
        .send_peer_uncommitted_entries(
            CancellationToken::new(),
            &cluster.group,
            &cluster.follower_peer,
        )
        .await;

    let batch = tokio::time::timeout(Duration::from_secs(5), cluster.consensus.wait_for_batch())
        .await
        .expect("follower never saw the batch");

    assert!(batch.entries.is_empty());
    assert_eq!(batch.prev_log_index, 0);
    assert_eq!(batch.prev_log_term, 0);
}

#[tokio::test]
async fn test_unknown_host_is_skipped() {
    let network = Arc::new(InMemoryNetwork::default());
    let cluster = two_node_cluster(&network, 1);

    let stranger = Peer {
        host: NodeId(0xDEAD),
        ..cluster.follower_peer.clone()
    };
    // No host record, no dispatch; nothing to observe but no panic either.
    cluster
        .leader
        .replicator()
        .send_peer_uncommitted_entries(CancellationToken::new(), &cluster.group, &stranger)
        .await;

    assert!(cluster.consensus.seen.lock().is_empty());
}

#[tokio::test]
async fn test_undialable_follower_is_skipped() {
    let network = Arc::new(InMemoryNetwork::default());
    let cluster = two_node_cluster(&network, 1);

    // Deregister the follower's route; the pool reports no client and the
    // dispatcher gives up until the next tick.
    network.routes.write().remove(&cluster.follower_host.server_addr);
    cluster
        .leader
        .replicator()
        .send_peer_uncommitted_entries(
            CancellationToken::new(),
            &cluster.group,
            &cluster.follower_peer,
        )
        .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(cluster.consensus.seen.lock().is_empty());
}
