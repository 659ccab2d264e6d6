//! Byzantine-tolerant client for Conclave groups.
//!
//! No single node is trusted. Membership answers are accepted only when a
//! strict majority of polled alpha nodes agree on byte-identical signing
//! material ([`majority_response`]), and a command's result is accepted
//! only when a BFT quorum of the group's replicas independently produced
//! the same bytes ([`Client::exec_command`]).

mod alpha;
mod client;
mod pending;
mod quorum;

pub use alpha::{alpha_nodes, AlphaClient, AlphaRpcPool};
pub use client::{Client, ClientConfig, ClientError};
pub use pending::PendingCommands;
pub use quorum::majority_response;
