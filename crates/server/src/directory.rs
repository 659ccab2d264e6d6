//! Membership directory.
//!
//! Materializes `Peer`, `Host`, and `RaftGroup` records from the key-value
//! store, fronted by TTL caches. The caches are authoritative for their
//! TTL: there is no invalidation on writes, so a membership update becomes
//! visible everywhere within one TTL (60 seconds by default).

use conclave_cache::TtlCache;
use conclave_storage::keys::{self, Table};
use conclave_storage::{KvStore, StorageError};
use conclave_types::{GroupId, Host, NodeId, Peer, PeerId, RaftGroup, ALPHA_GROUP};
use sbor::prelude::{basic_decode, basic_encode};
use std::sync::Arc;
use tracing::warn;

/// A group's peers, ascending by peer id, shared as one cache entry.
pub type GroupPeers = Arc<Vec<Arc<Peer>>>;

/// Cached membership lookups over the node's store.
pub struct Directory {
    kv: Arc<dyn KvStore>,
    local: NodeId,
    peers: TtlCache<Arc<Peer>>,
    group_peers: TtlCache<GroupPeers>,
    hosts: TtlCache<Arc<Host>>,
    groups: TtlCache<Arc<RaftGroup>>,
}

impl Directory {
    /// Create a directory for the node identified by `local`.
    pub fn new(kv: Arc<dyn KvStore>, local: NodeId) -> Self {
        Self {
            kv,
            local,
            peers: TtlCache::new(),
            group_peers: TtlCache::new(),
            hosts: TtlCache::new(),
            groups: TtlCache::new(),
        }
    }

    /// The local node's id.
    pub fn local_node(&self) -> NodeId {
        self.local
    }

    /// Look up one peer. Cached under `"{group}-{peer}"`; repeated hits
    /// within a TTL return the same `Arc`.
    pub fn get_peer(
        &self,
        group: GroupId,
        peer_id: PeerId,
    ) -> Result<Option<Arc<Peer>>, StorageError> {
        let cache_key = format!("{}-{}", group.0, peer_id.0);
        if let Some(peer) = self.peers.get(&cache_key) {
            return Ok(Some(peer));
        }
        let db_key = keys::compose_key(group, Table::GroupPeers, peer_id.0);
        let Some(data) = self.kv.get(&db_key)? else {
            return Ok(None);
        };
        let Some(peer) = decode_record::<Peer>(&db_key, &data) else {
            return Ok(None);
        };
        let peer = Arc::new(peer);
        self.peers.insert(cache_key, peer.clone());
        Ok(Some(peer))
    }

    /// All peers of a group, ascending by peer id. Cached under
    /// `"{group}"`. The listing scans keys only; composed keys already
    /// carry the peer ids, and each id resolves through [`get_peer`]'s
    /// cache.
    ///
    /// [`get_peer`]: Self::get_peer
    pub fn get_group_peers(&self, group: GroupId) -> Result<GroupPeers, StorageError> {
        let cache_key = group.0.to_string();
        if let Some(peers) = self.group_peers.get(&cache_key) {
            return Ok(peers);
        }
        let prefix = keys::compose_key_prefix(group, Table::GroupPeers);
        let mut peers = Vec::new();
        for key in self.kv.scan_keys(&prefix)? {
            let peer_id = PeerId(keys::bytes_u64(&key, prefix.len()));
            match self.get_peer(group, peer_id)? {
                Some(peer) => peers.push(peer),
                // Row vanished between the key scan and the point read.
                None => warn!(%group, %peer_id, "peer key without record"),
            }
        }
        let peers: GroupPeers = Arc::new(peers);
        self.group_peers.insert(cache_key, peers.clone());
        Ok(peers)
    }

    /// The peer of `group` hosted on this node, if any.
    pub fn group_server_peer(&self, group: GroupId) -> Result<Option<Arc<Peer>>, StorageError> {
        let peers = self.get_group_peers(group)?;
        Ok(peers.iter().find(|peer| peer.host == self.local).cloned())
    }

    /// Look up a node's host record. Host rows are global, stored under the
    /// alpha group.
    pub fn get_host(&self, node: NodeId) -> Result<Option<Arc<Host>>, StorageError> {
        let cache_key = node.0.to_string();
        if let Some(host) = self.hosts.get(&cache_key) {
            return Ok(Some(host));
        }
        let db_key = keys::compose_key(ALPHA_GROUP, Table::HostList, node.0);
        let Some(data) = self.kv.get(&db_key)? else {
            return Ok(None);
        };
        let Some(host) = decode_record::<Host>(&db_key, &data) else {
            return Ok(None);
        };
        let host = Arc::new(host);
        self.hosts.insert(cache_key, host.clone());
        Ok(Some(host))
    }

    /// Look up a group's consensus metadata.
    pub fn get_group(&self, group: GroupId) -> Result<Option<Arc<RaftGroup>>, StorageError> {
        let cache_key = group.0.to_string();
        if let Some(meta) = self.groups.get(&cache_key) {
            return Ok(Some(meta));
        }
        let db_key = keys::compose_key_prefix(group, Table::GroupMeta);
        let Some(data) = self.kv.get(&db_key)? else {
            return Ok(None);
        };
        let Some(meta) = decode_record::<RaftGroup>(&db_key, &data) else {
            return Ok(None);
        };
        let meta = Arc::new(meta);
        self.groups.insert(cache_key, meta.clone());
        Ok(Some(meta))
    }

    /// Persist a peer record. Visible to cached readers after one TTL.
    pub fn save_peer(&self, peer: &Peer) -> Result<(), StorageError> {
        let key = keys::compose_key(peer.group, Table::GroupPeers, peer.id.0);
        self.kv.put(&key, &encode_record(peer)?)
    }

    /// Persist a host record.
    pub fn save_host(&self, host: &Host) -> Result<(), StorageError> {
        let key = keys::compose_key(ALPHA_GROUP, Table::HostList, host.id.0);
        self.kv.put(&key, &encode_record(host)?)
    }

    /// Persist a group's consensus metadata.
    pub fn save_group(&self, group: &RaftGroup) -> Result<(), StorageError> {
        let key = keys::compose_key_prefix(group.id, Table::GroupMeta);
        self.kv.put(&key, &encode_record(group)?)
    }
}

fn encode_record<T: sbor::prelude::BasicEncode>(record: &T) -> Result<Vec<u8>, StorageError> {
    basic_encode(record).map_err(|e| StorageError::Database(format!("encode record: {e:?}")))
}

/// Malformed stored records read as absent; an operator fixes the row, the
/// protocol keeps going.
fn decode_record<T: sbor::prelude::BasicDecode>(key: &[u8], data: &[u8]) -> Option<T> {
    match basic_decode(data) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(key = %hex::encode(key), error = ?e, "undecodable membership record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_storage::MemoryKv;

    fn peer(group: u64, id: u64, host: u64) -> Peer {
        Peer {
            id: PeerId(id),
            group: GroupId(group),
            host: NodeId(host),
            next_index: 1,
            match_index: 0,
        }
    }

    fn directory() -> Directory {
        Directory::new(Arc::new(MemoryKv::new()), NodeId(100))
    }

    #[test]
    fn test_get_peer_cached_pointer_equal() {
        let dir = directory();
        dir.save_peer(&peer(1, 10, 100)).unwrap();

        let first = dir.get_peer(GroupId(1), PeerId(10)).unwrap().unwrap();
        let second = dir.get_peer(GroupId(1), PeerId(10)).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_get_peer_absent() {
        let dir = directory();
        assert!(dir.get_peer(GroupId(1), PeerId(10)).unwrap().is_none());
    }

    #[test]
    fn test_group_peers_ascending() {
        let dir = directory();
        for id in [30u64, 10, 20] {
            dir.save_peer(&peer(1, id, id + 100)).unwrap();
        }
        let peers = dir.get_group_peers(GroupId(1)).unwrap();
        let ids: Vec<u64> = peers.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_group_peers_empty() {
        let dir = directory();
        assert!(dir.get_group_peers(GroupId(1)).unwrap().is_empty());
        assert!(dir.group_server_peer(GroupId(1)).unwrap().is_none());
    }

    #[test]
    fn test_group_server_peer_matches_local_host() {
        let dir = directory();
        dir.save_peer(&peer(1, 10, 100)).unwrap();
        dir.save_peer(&peer(1, 11, 101)).unwrap();

        let local = dir.group_server_peer(GroupId(1)).unwrap().unwrap();
        assert_eq!(local.id, PeerId(10));
    }

    #[test]
    fn test_malformed_record_reads_absent() {
        let kv = Arc::new(MemoryKv::new());
        let key = keys::compose_key(GroupId(1), Table::GroupPeers, 10);
        kv.put(&key, b"garbage").unwrap();

        let dir = Directory::new(kv, NodeId(100));
        assert!(dir.get_peer(GroupId(1), PeerId(10)).unwrap().is_none());
    }

    #[test]
    fn test_host_and_group_round_trip() {
        let dir = directory();
        let host = Host {
            id: NodeId(100),
            server_addr: "10.0.0.1:4000".into(),
            public_key: vec![1; 32],
            online: true,
        };
        dir.save_host(&host).unwrap();
        assert_eq!(*dir.get_host(NodeId(100)).unwrap().unwrap(), host);

        let meta = RaftGroup {
            id: GroupId(1),
            term: 4,
            leader_peer: PeerId(10),
            replications: 3,
        };
        dir.save_group(&meta).unwrap();
        assert_eq!(*dir.get_group(GroupId(1)).unwrap().unwrap(), meta);
    }
}
