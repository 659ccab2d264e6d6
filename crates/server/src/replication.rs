//! Leader-side log replication.
//!
//! A leader keeps `next_index` per follower: the lowest log index it
//! believes the follower is missing. Each replication tick ships the log
//! suffix at or above that index together with a signed anchor naming the
//! entry just below the batch, so the follower can verify continuity
//! before accepting anything.

use crate::clients::ClusterClients;
use crate::directory::Directory;
use conclave_messages::AppendEntriesRequest;
use conclave_storage::{GroupLog, StorageError};
use conclave_types::{append_entries_message, KeyPair, LogEntry, NodeId, Peer, RaftGroup};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The log suffix a follower is missing, plus its anchor.
///
/// `entries` is every entry with `index >= peer.next_index`, ascending.
/// `prev` is the entry immediately below the suffix, or the zero sentinel
/// when the suffix starts at the head of the log. When the follower is
/// already caught up, `entries` is empty and `prev` is the last log entry.
pub fn uncommitted_range(
    log: &GroupLog,
    group: &RaftGroup,
    peer: &Peer,
) -> Result<(Vec<LogEntry>, LogEntry), StorageError> {
    let mut entries = Vec::new();
    let mut prev = LogEntry::sentinel();
    for entry in log.reverse_iter(group.id)? {
        if entry.index < peer.next_index {
            prev = entry;
            break;
        }
        entries.push(entry);
    }
    // Collected newest-first; the wire format wants ascending.
    entries.reverse();
    Ok((entries, prev))
}

/// Dispatches uncommitted-entry batches to followers.
pub struct Replicator {
    directory: Arc<Directory>,
    log: GroupLog,
    clients: Arc<ClusterClients>,
    keypair: KeyPair,
    local: NodeId,
}

impl Replicator {
    /// Create a replicator signing with `keypair`.
    pub fn new(
        directory: Arc<Directory>,
        log: GroupLog,
        clients: Arc<ClusterClients>,
        keypair: KeyPair,
    ) -> Self {
        let local = NodeId::from_public_key(&keypair.public_key());
        Self {
            directory,
            log,
            clients,
            keypair,
            local,
        }
    }

    /// Ship `peer` everything it is missing, fire-and-forget.
    ///
    /// Resolves the peer's owning node and a pooled connection to it, then
    /// dispatches the batch from a spawned task. Unknown hosts and
    /// undialable peers are skipped silently: durability and retry cadence
    /// belong to the outer replication scheduler. `ctx` aborts the
    /// in-flight RPC on cancellation.
    pub async fn send_peer_uncommitted_entries(
        &self,
        ctx: CancellationToken,
        group: &RaftGroup,
        peer: &Peer,
    ) {
        let host = match self.directory.get_host(peer.host) {
            Ok(Some(host)) => host,
            Ok(None) => return,
            Err(e) => {
                warn!(group = %group.id, peer = %peer.id, error = %e, "host lookup failed");
                return;
            }
        };
        let Some(client) = self.clients.try_get(&host.server_addr).await else {
            return;
        };

        let log = self.log.clone();
        let keypair = self.keypair.clone();
        let local = self.local;
        let group = group.clone();
        let peer = peer.clone();
        tokio::spawn(async move {
            let (entries, prev) = match uncommitted_range(&log, &group, &peer) {
                Ok(range) => range,
                Err(e) => {
                    warn!(group = %group.id, peer = %peer.id, error = %e, "log read failed");
                    return;
                }
            };
            let sign_data =
                append_entries_message(group.id, group.term, prev.index, prev.term);
            let request = AppendEntriesRequest {
                group: group.id,
                term: group.term,
                leader_id: local,
                prev_log_index: prev.index,
                prev_log_term: prev.term,
                signature: keypair.sign(&sign_data),
                quorum_votes: vec![],
                entries,
            };

            tokio::select! {
                _ = ctx.cancelled() => {
                    debug!(group = %group.id, peer = %peer.id, "replication dispatch cancelled");
                }
                result = client.append_entries(request) => {
                    if let Err(e) = result {
                        // Next replication tick retries.
                        warn!(group = %group.id, peer = %peer.id, error = %e, "append entries failed");
                    }
                }
            }
        });
    }
}
