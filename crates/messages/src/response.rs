//! Responses to client-visible and replication requests.

use crate::network::NetworkMessage;
use conclave_types::{GroupId, Hash, Host, PeerId, RequestId, Signature};
use sbor::prelude::BasicSbor;

/// The hosts backing a group, signed by the answering node over
/// [`conclave_types::nodes_message`]. Clients only accept a host list once
/// a strict majority of polled alpha nodes produced byte-identical signing
/// payloads.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct GroupNodesResponse {
    /// Hosts backing the group, ascending by the peer ids they own.
    pub nodes: Vec<Host>,
    /// Responder signature over `nodes_message(&nodes)`.
    pub signature: Signature,
}

impl NetworkMessage for GroupNodesResponse {
    fn message_type_id() -> &'static str {
        "membership.group_hosts.response"
    }
}

/// The host currently leading a group, or `None` when the responder knows
/// of no leader for it.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct GroupLeaderResponse {
    /// Leader host record, if any.
    pub node: Option<Host>,
    /// Responder signature over `nodes_message` of the singleton list.
    pub signature: Signature,
}

impl NetworkMessage for GroupLeaderResponse {
    fn message_type_id() -> &'static str {
        "membership.group_leader.response"
    }
}

/// Existence probe result.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct GroupContentResponse {
    /// Whether the group exists on the responder.
    pub exists: bool,
    /// Responder signature over the one-byte answer.
    pub signature: Signature,
}

impl NetworkMessage for GroupContentResponse {
    fn message_type_id() -> &'static str {
        "membership.group_content.response"
    }
}

/// A replica's result for one executed command.
///
/// Every replica produces exactly one result per `(client_id, request_id)`;
/// the client tallies results across replicas and accepts the value a BFT
/// quorum agrees on. The signature covers
/// [`conclave_types::command_result_message`].
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct CommandResponse {
    /// Group the command executed in.
    pub group: GroupId,
    /// Request this result answers.
    pub request_id: RequestId,
    /// Deterministic execution result bytes.
    pub result: Vec<u8>,
    /// Replica signature over the result.
    pub signature: Signature,
}

impl NetworkMessage for CommandResponse {
    fn message_type_id() -> &'static str {
        "command.exec.response"
    }
}

/// Follower's answer to an `AppendEntries` batch.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct AppendEntriesResponse {
    /// Group the batch targeted.
    pub group: GroupId,
    /// Follower's current term.
    pub term: u64,
    /// Responding peer.
    pub peer: PeerId,
    /// Whether the batch was accepted.
    pub success: bool,
    /// Whether the follower recognizes the sender as leader for `term`.
    pub convinced: bool,
    /// Follower's last log index after the append.
    pub last_index: u64,
    /// Hash of the follower's last entry, for divergence detection.
    pub last_hash: Hash,
    /// Follower signature.
    pub signature: Signature,
}

impl NetworkMessage for AppendEntriesResponse {
    fn message_type_id() -> &'static str {
        "replication.append_entries.response"
    }
}
