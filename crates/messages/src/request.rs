//! Client-visible and replication requests.

use crate::network::{NetworkMessage, Request};
use crate::response::{
    AppendEntriesResponse, GroupContentResponse, GroupLeaderResponse, GroupNodesResponse,
};
use conclave_types::{GroupId, LogEntry, NodeId, PeerId, Signature};
use sbor::prelude::BasicSbor;

/// Ask for the hosts backing a group's peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub struct GroupHostsRequest {
    /// Group being queried.
    pub group: GroupId,
}

impl NetworkMessage for GroupHostsRequest {
    fn message_type_id() -> &'static str {
        "membership.group_hosts.request"
    }
}

impl Request for GroupHostsRequest {
    type Response = GroupNodesResponse;
}

/// Ask which host currently leads a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub struct GroupLeaderRequest {
    /// Group being queried.
    pub group: GroupId,
}

impl NetworkMessage for GroupLeaderRequest {
    fn message_type_id() -> &'static str {
        "membership.group_leader.request"
    }
}

impl Request for GroupLeaderRequest {
    type Response = GroupLeaderResponse;
}

/// Existence probe for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub struct GroupContentRequest {
    /// Group being probed.
    pub group: GroupId,
}

impl NetworkMessage for GroupContentRequest {
    fn message_type_id() -> &'static str {
        "membership.group_content.request"
    }
}

impl Request for GroupContentRequest {
    type Response = GroupContentResponse;
}

/// An election vote carried inside an `AppendEntries` batch.
///
/// A freshly elected leader attaches the votes that made it leader so
/// followers can convince themselves of the new term. Election itself is
/// outside this crate; the wire shape is fixed here so the field is
/// round-trippable.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct PeerVote {
    /// Voting peer.
    pub peer: PeerId,
    /// Term the vote was cast in.
    pub term: u64,
    /// Whether the vote was granted.
    pub granted: bool,
    /// Voter signature.
    pub signature: Signature,
}

/// Leader-to-follower replication of uncommitted log entries.
///
/// `entries` ascend by index; `(prev_log_index, prev_log_term)` anchor the
/// batch to the entry immediately preceding it (or the zero sentinel when
/// the batch starts at the head of the log). The signature covers
/// [`conclave_types::append_entries_message`] over the anchor tuple.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct AppendEntriesRequest {
    /// Target group.
    pub group: GroupId,
    /// Leader's current term.
    pub term: u64,
    /// Node id of the sending leader.
    pub leader_id: NodeId,
    /// Index of the entry immediately before `entries`.
    pub prev_log_index: u64,
    /// Term of the entry immediately before `entries`.
    pub prev_log_term: u64,
    /// Leader signature over the anchor tuple.
    pub signature: Signature,
    /// Election votes backing a new leader's first batches; empty on the
    /// steady-state replication path.
    pub quorum_votes: Vec<PeerVote>,
    /// Entries to append, ascending by index.
    pub entries: Vec<LogEntry>,
}

impl NetworkMessage for AppendEntriesRequest {
    fn message_type_id() -> &'static str {
        "replication.append_entries.request"
    }
}

impl Request for AppendEntriesRequest {
    type Response = AppendEntriesResponse;
}
