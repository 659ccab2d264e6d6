//! The group client.
//!
//! Resolves group membership through the alpha pool under majority
//! agreement, submits signed commands to group leaders, and accepts a
//! result only once a BFT quorum of the group's replicas produced
//! identical bytes.

use crate::alpha::{AlphaClient, AlphaRpcPool};
use crate::pending::PendingCommands;
use crate::quorum::majority_response;
use conclave_cache::TtlCache;
use conclave_messages::{ClusterConnector, CommandResponse, RpcClient};
use conclave_types::{
    command_result_message, exec_command_message, expected_players, nodes_message,
    strict_majority, CommandRequest, GroupId, Hash, Host, KeyError, KeyPair, NodeId, PublicKey,
    RequestId, Signature,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How long [`Client::exec_command`] waits for a quorum of replica
/// results.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Client construction options.
#[derive(Clone)]
pub struct ClientConfig {
    /// Raw ed25519 secret key (32 bytes).
    pub private_key: Vec<u8>,
}

/// Terminal errors surfaced to callers. Transient network and decode
/// failures never show up here; they are absorbed as quorum abstentions.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured private key did not parse.
    #[error(transparent)]
    InvalidKey(#[from] KeyError),
    /// No leader could be resolved for the group.
    #[error("no leader found for {0}")]
    NoLeader(GroupId),
    /// No host list could be resolved for the group.
    #[error("no hosts found for {0}")]
    NoHosts(GroupId),
    /// Enough results arrived but no value had a strict majority.
    #[error("replica results for {0} did not reach agreement")]
    NoMajority(GroupId),
    /// Too few replica results arrived in time.
    #[error("did not receive enough replica results for {0}")]
    Timeout(GroupId),
}

/// A client identity plus its view of the network.
pub struct Client {
    id: NodeId,
    keypair: KeyPair,
    connector: Arc<dyn ClusterConnector>,
    alpha: AlphaRpcPool,
    group_hosts: TtlCache<Arc<Vec<Host>>>,
    group_leaders: TtlCache<RpcClient>,
    pending: Arc<PendingCommands>,
    counter: AtomicU64,
    sweepers: Vec<tokio::task::JoinHandle<()>>,
}

impl Client {
    /// Create a client and dial the bootstrap list.
    ///
    /// `bootstraps` need not contain alpha nodes; any member can advertise
    /// the alpha group, and [`Client::refresh_alpha`] moves the pool onto
    /// actual alpha nodes afterwards.
    pub async fn connect(
        bootstraps: &[String],
        connector: Arc<dyn ClusterConnector>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let keypair = KeyPair::from_bytes(&config.private_key)?;
        let id = NodeId::from_public_key(&keypair.public_key());
        let alpha = AlphaRpcPool::connect(bootstraps, connector.clone()).await;
        let group_hosts: TtlCache<Arc<Vec<Host>>> = TtlCache::new();
        let group_leaders: TtlCache<RpcClient> = TtlCache::new();
        let sweepers = vec![group_hosts.spawn_sweeper(), group_leaders.spawn_sweeper()];
        Ok(Self {
            id,
            keypair,
            connector,
            alpha,
            group_hosts,
            group_leaders,
            pending: Arc::new(PendingCommands::new()),
            counter: AtomicU64::new(0),
            sweepers,
        })
    }

    /// This client's node id (hash of its public key).
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The client's public key. Servers verify command signatures against
    /// this; deployments register it with the cluster.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Re-resolve the alpha pool onto verified alpha members.
    pub async fn refresh_alpha(&self) -> bool {
        self.alpha.refresh().await
    }

    /// The hosts backing `group`, by strict majority over the alpha pool.
    /// Cached for one TTL; `None` means the quorum failed and the next
    /// call retries.
    pub async fn group_hosts(&self, group: GroupId) -> Option<Arc<Vec<Host>>> {
        let cache_key = group.0.to_string();
        if let Some(hosts) = self.group_hosts.get(&cache_key) {
            return Some(hosts);
        }
        let clients = self.alpha.get();
        let hosts = majority_response(clients.as_slice(), move |client: AlphaClient| async move {
            match client.rpc.group_hosts(group).await {
                Ok(response) => {
                    let canonical = nodes_message(&response.nodes);
                    if !verify_if_known(&client.key, &canonical, &response.signature) {
                        warn!(addr = %client.addr, %group, "host list with bad signature");
                        return (None, Vec::new());
                    }
                    (Some(response.nodes), canonical)
                }
                Err(e) => {
                    warn!(addr = %client.addr, %group, error = %e, "error getting group hosts");
                    (None, Vec::new())
                }
            }
        })
        .await?;

        let hosts = Arc::new(hosts);
        self.group_hosts.insert(cache_key, hosts.clone());
        Some(hosts)
    }

    /// A connection to `group`'s current leader.
    ///
    /// Agreement is over the leader's address alone: clients only need a
    /// majority to concur on *where to send commands*, and a compromised
    /// minority cannot divert traffic.
    pub async fn group_leader(&self, group: GroupId) -> Option<RpcClient> {
        let cache_key = group.0.to_string();
        if let Some(leader) = self.group_leaders.get(&cache_key) {
            return Some(leader);
        }
        let clients = self.alpha.get();
        let leader = majority_response(clients.as_slice(), move |client: AlphaClient| async move {
            match client.rpc.group_leader(group).await {
                Ok(response) => match response.node {
                    Some(host) => {
                        let signed = nodes_message(std::slice::from_ref(&host));
                        if !verify_if_known(&client.key, &signed, &response.signature) {
                            warn!(addr = %client.addr, %group, "leader answer with bad signature");
                            return (None, Vec::new());
                        }
                        let canonical = host.server_addr.clone().into_bytes();
                        (Some(host), canonical)
                    }
                    None => {
                        debug!(addr = %client.addr, %group, "alpha node knows no leader");
                        (None, Vec::new())
                    }
                },
                Err(e) => {
                    warn!(addr = %client.addr, %group, error = %e, "error getting group leader");
                    (None, Vec::new())
                }
            }
        })
        .await;

        let Some(leader) = leader else {
            debug!(client = %self.id, %group, "group has no agreed leader");
            return None;
        };
        match self.connector.connect(&leader.server_addr).await {
            Ok(client) => {
                self.group_leaders.insert(cache_key, client.clone());
                Some(client)
            }
            Err(e) => {
                warn!(addr = %leader.server_addr, error = %e, "failed to dial group leader");
                None
            }
        }
    }

    /// Whether `group` exists, by strict majority. A failed quorum reads
    /// as nonexistent.
    pub async fn group_exists(&self, group: GroupId) -> bool {
        let clients = self.alpha.get();
        majority_response(clients.as_slice(), move |client: AlphaClient| async move {
            match client.rpc.group_content(group).await {
                Ok(response) => {
                    let canonical = vec![response.exists as u8];
                    if !verify_if_known(&client.key, &canonical, &response.signature) {
                        return (None, Vec::new());
                    }
                    (Some(response.exists), canonical)
                }
                Err(e) => {
                    debug!(addr = %client.addr, %group, error = %e, "existence probe failed");
                    (None, Vec::new())
                }
            }
        })
        .await
        .unwrap_or(false)
    }

    /// Execute a command on `group` and return the quorum-agreed result.
    ///
    /// The command goes to the leader; in parallel, every replica's
    /// independently produced result funnels into a per-request inbox
    /// (the leader round trip contributes one, the rest arrive through
    /// [`Client::deliver_response`]). Once `expected_players` results are
    /// in, the value a strict majority of them agree on is returned.
    pub async fn exec_command(
        &self,
        group: GroupId,
        func_id: u64,
        arg: Vec<u8>,
    ) -> Result<Vec<u8>, ClientError> {
        let leader = self
            .group_leader(group)
            .await
            .ok_or(ClientError::NoLeader(group))?;
        let hosts = self
            .group_hosts(group)
            .await
            .ok_or(ClientError::NoHosts(group))?;

        let request_id = RequestId(self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        let mut request = CommandRequest {
            group,
            client_id: self.id,
            request_id,
            func_id,
            arg,
            signature: Signature::zero(),
        };
        request.signature = self.keypair.sign(&exec_command_message(&request));

        // Register before anything is sent so no result can race past us;
        // the guard deregisters on every return path.
        let mut inbox = self.pending.register(group, request_id, hosts.len());
        let _guard = InboxGuard {
            pending: &self.pending,
            group,
            request: request_id,
        };

        let pending = self.pending.clone();
        let leader_hosts = hosts.clone();
        tokio::spawn(async move {
            match leader.exec_command(request).await {
                Ok(response) => {
                    if verify_result(&leader_hosts, group, request_id, &response) {
                        pending.deliver(group, request_id, response.result);
                    } else {
                        warn!(%group, request = request_id.0, "leader result with bad signature");
                    }
                }
                Err(e) => {
                    warn!(%group, request = request_id.0, error = %e, "cannot exec on leader");
                }
            }
        });

        let expected = expected_players(hosts.len());
        let results = tokio::time::timeout(COMMAND_TIMEOUT, async {
            let mut results = Vec::with_capacity(expected);
            while results.len() < expected {
                match inbox.recv().await {
                    Some(result) => results.push(result),
                    None => break,
                }
            }
            results
        })
        .await
        .map_err(|_| ClientError::Timeout(group))?;

        if results.len() < expected {
            return Err(ClientError::Timeout(group));
        }

        // Tally by content hash; accept only a strict majority of the
        // collected results.
        let mut tallies: HashMap<Hash, (usize, Vec<u8>)> = HashMap::new();
        for result in results {
            let digest = Hash::from_bytes(&result);
            let tally = tallies.entry(digest).or_insert((0, result));
            tally.0 += 1;
        }
        match tallies.into_values().max_by_key(|(count, _)| *count) {
            Some((count, result)) if count >= strict_majority(expected) => Ok(result),
            _ => Err(ClientError::NoMajority(group)),
        }
    }

    /// Accept one replica's result for an in-flight command.
    ///
    /// The transport glue that receives replica results calls this; the
    /// result joins the tally only if its signature verifies against some
    /// member of the group.
    pub async fn deliver_response(&self, response: CommandResponse) -> bool {
        let Some(hosts) = self.group_hosts(response.group).await else {
            return false;
        };
        if !verify_result(&hosts, response.group, response.request_id, &response) {
            warn!(group = %response.group, request = response.request_id.0,
                "replica result with bad signature");
            return false;
        }
        self.pending
            .deliver(response.group, response.request_id, response.result)
    }

    /// Number of commands currently awaiting results.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

/// With a known key, require a valid signature; without one (bootstrap
/// connections), admit the response and rely on majority agreement.
fn verify_if_known(key: &Option<PublicKey>, message: &[u8], signature: &Signature) -> bool {
    match key {
        Some(key) => key.verify(message, signature),
        None => true,
    }
}

/// A result is admissible when some group member signed it.
fn verify_result(
    hosts: &[Host],
    group: GroupId,
    request_id: RequestId,
    response: &CommandResponse,
) -> bool {
    let message = command_result_message(group, request_id, &response.result);
    hosts.iter().any(|host| {
        PublicKey::from_bytes(&host.public_key)
            .map(|key| key.verify(&message, &response.signature))
            .unwrap_or(false)
    })
}

impl Drop for Client {
    fn drop(&mut self) {
        for sweeper in &self.sweepers {
            sweeper.abort();
        }
    }
}

struct InboxGuard<'a> {
    pending: &'a PendingCommands,
    group: GroupId,
    request: RequestId,
}

impl Drop for InboxGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.group, self.request);
    }
}
