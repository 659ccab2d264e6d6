//! The cluster RPC contract.

use crate::request::AppendEntriesRequest;
use crate::response::{
    AppendEntriesResponse, CommandResponse, GroupContentResponse, GroupLeaderResponse,
    GroupNodesResponse,
};
use conclave_types::{CommandRequest, GroupId};
use std::sync::Arc;

/// Error surfaced by an RPC transport.
///
/// Callers on the quorum path treat every variant the same way: log it and
/// count the peer as abstaining. Nothing here is terminal for the protocol.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The peer could not be reached or the connection dropped.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    /// The peer answered but the payload did not decode.
    #[error("malformed response: {0}")]
    Decode(String),
    /// The peer reported an application-level failure.
    #[error("remote error: {0}")]
    Remote(String),
    /// The call exceeded the transport deadline.
    #[error("rpc timed out")]
    Timeout,
}

/// A connection to one cluster node.
pub type RpcClient = Arc<dyn ClusterRpc>;

/// The RPC surface every cluster node serves.
///
/// Object-safe so connections can be pooled and cached as trait objects.
#[async_trait::async_trait]
pub trait ClusterRpc: Send + Sync {
    /// Hosts backing `group`'s peers.
    async fn group_hosts(&self, group: GroupId) -> Result<GroupNodesResponse, RpcError>;

    /// Current leader of `group`.
    async fn group_leader(&self, group: GroupId) -> Result<GroupLeaderResponse, RpcError>;

    /// Whether `group` exists.
    async fn group_content(&self, group: GroupId) -> Result<GroupContentResponse, RpcError>;

    /// Submit a signed command for execution.
    async fn exec_command(&self, request: CommandRequest) -> Result<CommandResponse, RpcError>;

    /// Leader-to-follower log replication.
    async fn append_entries(
        &self,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, RpcError>;
}

/// Opens [`RpcClient`]s from server addresses.
///
/// The single seam between this workspace and a concrete transport: client
/// pools and the replication dispatcher only ever dial through a connector.
#[async_trait::async_trait]
pub trait ClusterConnector: Send + Sync {
    /// Open (or reuse) a connection to `addr`.
    async fn connect(&self, addr: &str) -> Result<RpcClient, RpcError>;
}
