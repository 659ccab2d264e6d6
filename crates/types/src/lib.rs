//! Core types for Conclave group-sharded BFT replication.
//!
//! This crate provides the foundational types used throughout the
//! implementation:
//!
//! - **Primitives**: Hash, cryptographic keys and signatures
//! - **Identifiers**: NodeId, PeerId, GroupId
//! - **Records**: Peer, Host, RaftGroup, LogEntry, CommandRequest
//! - **Signing**: domain-separated canonical signing payloads
//! - **Quorum**: BFT quorum arithmetic
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.

mod crypto;
mod hash;
mod identifiers;
mod quorum;
mod records;
mod signing;

pub use crypto::{KeyError, KeyPair, PublicKey, Signature};
pub use hash::{Hash, HexError};
pub use identifiers::{GroupId, NodeId, PeerId, RequestId, ALPHA_GROUP};
pub use quorum::{expected_players, has_strict_majority, strict_majority};
pub use records::{CommandRequest, Host, LogEntry, Peer, RaftGroup};
pub use signing::{
    append_entries_message, command_result_message, exec_command_message, nodes_message,
    DOMAIN_APPEND_ENTRIES, DOMAIN_COMMAND_RESULT, DOMAIN_EXEC_COMMAND, DOMAIN_NODES,
};
