//! Replication records shared between servers and clients.

use crate::{GroupId, Hash, NodeId, PeerId, RequestId, Signature};
use sbor::prelude::BasicSbor;

/// One group member on one node.
///
/// `next_index` is the smallest log index the leader believes this peer has
/// not yet acknowledged; the leader's own last index is always at least
/// `next_index - 1`.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Peer {
    /// Peer identifier, unique within the group.
    pub id: PeerId,
    /// Group this peer belongs to.
    pub group: GroupId,
    /// Node that owns this peer.
    pub host: NodeId,
    /// Next log index to replicate to this peer.
    pub next_index: u64,
    /// Highest log index known replicated on this peer.
    pub match_index: u64,
}

/// A node's global record: where to reach it and how to authenticate it.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Host {
    /// Node identifier (hash of `public_key`).
    pub id: NodeId,
    /// RPC address, `host:port`.
    pub server_addr: String,
    /// Raw ed25519 public key bytes.
    pub public_key: Vec<u8>,
    /// Whether the node is believed reachable.
    pub online: bool,
}

/// Per-group consensus metadata.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct RaftGroup {
    /// Group identifier.
    pub id: GroupId,
    /// Current term.
    pub term: u64,
    /// Peer currently acting as leader.
    pub leader_peer: PeerId,
    /// Target replication factor.
    pub replications: u32,
}

/// One entry in a group's ordered log.
///
/// Within a group, `index` is strictly increasing and dense from 1.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct LogEntry {
    /// Position in the group log, dense from 1.
    pub index: u64,
    /// Term in which the entry was appended.
    pub term: u64,
    /// Content hash over `(index, term, command)`.
    pub hash: Hash,
    /// Serialized command carried by this entry.
    pub command: Vec<u8>,
}

impl LogEntry {
    /// The anchor sentinel: stands in for "no preceding entry" when a
    /// replication batch starts at the head of the log.
    pub fn sentinel() -> Self {
        LogEntry {
            index: 0,
            term: 0,
            hash: Hash::ZERO,
            command: Vec::new(),
        }
    }

    /// Build an entry, computing its content hash.
    pub fn new(index: u64, term: u64, command: Vec<u8>) -> Self {
        let hash = Self::content_hash(index, term, &command);
        LogEntry {
            index,
            term,
            hash,
            command,
        }
    }

    /// Content hash over the entry's identity and payload.
    pub fn content_hash(index: u64, term: u64, command: &[u8]) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&index.to_be_bytes());
        hasher.update(&term.to_be_bytes());
        hasher.update(command);
        Hash(*hasher.finalize().as_bytes())
    }
}

/// A signed client command addressed to one group.
///
/// `request_id` is a client-monotonic counter; together with `client_id` it
/// identifies the command across every replica, which is what lets the
/// client match independently produced results back to one request.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct CommandRequest {
    /// Target group.
    pub group: GroupId,
    /// Issuing client's node id.
    pub client_id: NodeId,
    /// Client-monotonic request counter.
    pub request_id: RequestId,
    /// Which registered state-machine function to invoke.
    pub func_id: u64,
    /// Opaque argument bytes for the function.
    pub arg: Vec<u8>,
    /// Client signature over the request (see
    /// [`crate::exec_command_message`]).
    pub signature: Signature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_zero() {
        let sentinel = LogEntry::sentinel();
        assert_eq!(sentinel.index, 0);
        assert_eq!(sentinel.term, 0);
        assert_eq!(sentinel.hash, Hash::ZERO);
    }

    #[test]
    fn test_entry_hash_covers_payload() {
        let a = LogEntry::new(1, 1, vec![0xAA]);
        let b = LogEntry::new(1, 1, vec![0xAB]);
        let c = LogEntry::new(2, 1, vec![0xAA]);
        assert_ne!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
        assert_eq!(a.hash, LogEntry::new(1, 1, vec![0xAA]).hash);
    }
}
