//! Wire messages and the cluster RPC contract.
//!
//! Transport framing is not this workspace's business: anything that can
//! carry an sbor-encoded request and return the matching response can
//! implement [`ClusterRpc`]. Production deployments put a real transport
//! behind it; tests wire it with an in-memory router.

mod network;
mod request;
mod response;
mod rpc;

pub use network::{NetworkMessage, Request};
pub use request::{
    AppendEntriesRequest, GroupContentRequest, GroupHostsRequest, GroupLeaderRequest, PeerVote,
};
pub use response::{
    AppendEntriesResponse, CommandResponse, GroupContentResponse, GroupLeaderResponse,
    GroupNodesResponse,
};
pub use rpc::{ClusterConnector, ClusterRpc, RpcClient, RpcError};

// Re-export the command request: it is both a stored record and the
// `exec_command` wire message.
pub use conclave_types::CommandRequest;
