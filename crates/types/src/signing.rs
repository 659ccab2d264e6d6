//! Canonical signing payloads.
//!
//! Every signature in the protocol covers one of the byte strings built
//! here. Payloads are domain-separated so a signature produced for one
//! message kind can never be replayed as another, and every integer is
//! big-endian so the encoding is stable across implementations.

use crate::{CommandRequest, GroupId, Host, RequestId};

/// Domain tag for a leader's append-entries anchor.
pub const DOMAIN_APPEND_ENTRIES: &[u8] = b"conclave.append";

/// Domain tag for a client's command submission.
pub const DOMAIN_EXEC_COMMAND: &[u8] = b"conclave.exec";

/// Domain tag for a replica's command result.
pub const DOMAIN_COMMAND_RESULT: &[u8] = b"conclave.result";

/// Domain tag for a host-list advertisement.
pub const DOMAIN_NODES: &[u8] = b"conclave.nodes";

/// Signing payload for an `AppendEntries` anchor: the follower verifies the
/// leader signed exactly the `(group, term, prev_index, prev_term)` tuple it
/// is being asked to extend.
pub fn append_entries_message(
    group: GroupId,
    term: u64,
    prev_index: u64,
    prev_term: u64,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(DOMAIN_APPEND_ENTRIES.len() + 32);
    message.extend_from_slice(DOMAIN_APPEND_ENTRIES);
    message.extend_from_slice(&group.0.to_be_bytes());
    message.extend_from_slice(&term.to_be_bytes());
    message.extend_from_slice(&prev_index.to_be_bytes());
    message.extend_from_slice(&prev_term.to_be_bytes());
    message
}

/// Signing payload for a command request: every field except the signature
/// itself.
pub fn exec_command_message(request: &CommandRequest) -> Vec<u8> {
    let mut message =
        Vec::with_capacity(DOMAIN_EXEC_COMMAND.len() + 32 + request.arg.len());
    message.extend_from_slice(DOMAIN_EXEC_COMMAND);
    message.extend_from_slice(&request.group.0.to_be_bytes());
    message.extend_from_slice(&request.client_id.0.to_be_bytes());
    message.extend_from_slice(&request.request_id.0.to_be_bytes());
    message.extend_from_slice(&request.func_id.to_be_bytes());
    message.extend_from_slice(&request.arg);
    message
}

/// Signing payload for a replica's result to a command.
pub fn command_result_message(group: GroupId, request_id: RequestId, result: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(DOMAIN_COMMAND_RESULT.len() + 16 + result.len());
    message.extend_from_slice(DOMAIN_COMMAND_RESULT);
    message.extend_from_slice(&group.0.to_be_bytes());
    message.extend_from_slice(&request_id.0.to_be_bytes());
    message.extend_from_slice(result);
    message
}

/// Signing payload over a host list, deterministic in list order. Clients
/// compare these bytes across alpha nodes, so two honest nodes advertising
/// the same membership must produce identical payloads.
pub fn nodes_message(hosts: &[Host]) -> Vec<u8> {
    let mut message = Vec::with_capacity(DOMAIN_NODES.len() + hosts.len() * 64);
    message.extend_from_slice(DOMAIN_NODES);
    for host in hosts {
        message.extend_from_slice(&host.id.0.to_be_bytes());
        message.extend_from_slice(host.server_addr.as_bytes());
        message.extend_from_slice(&host.public_key);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeId, Signature};

    fn request() -> CommandRequest {
        CommandRequest {
            group: GroupId(7),
            client_id: NodeId(11),
            request_id: RequestId(3),
            func_id: 42,
            arg: vec![0xAA, 0xBB],
            signature: Signature::zero(),
        }
    }

    #[test]
    fn test_domains_disjoint() {
        // A zero-argument exec payload must never collide with an append
        // payload even when the numeric fields match.
        let append = append_entries_message(GroupId(1), 2, 3, 4);
        let exec = exec_command_message(&CommandRequest {
            arg: vec![],
            ..request()
        });
        assert_ne!(append, exec);
    }

    #[test]
    fn test_exec_message_ignores_signature() {
        let signed = CommandRequest {
            signature: Signature([7u8; 64]),
            ..request()
        };
        assert_eq!(exec_command_message(&request()), exec_command_message(&signed));
    }

    #[test]
    fn test_exec_message_covers_arg() {
        let other = CommandRequest {
            arg: vec![0xAA, 0xBC],
            ..request()
        };
        assert_ne!(exec_command_message(&request()), exec_command_message(&other));
    }

    #[test]
    fn test_nodes_message_order_sensitive() {
        let a = Host {
            id: NodeId(1),
            server_addr: "10.0.0.1:4000".into(),
            public_key: vec![1; 32],
            online: true,
        };
        let b = Host {
            id: NodeId(2),
            server_addr: "10.0.0.2:4000".into(),
            public_key: vec![2; 32],
            online: true,
        };
        assert_ne!(
            nodes_message(&[a.clone(), b.clone()]),
            nodes_message(&[b, a])
        );
    }
}
