//! Server-side replication core.
//!
//! A node hosts peers in any number of consensus groups. This crate wires
//! the pieces a node needs around its store:
//!
//! - [`Directory`]: cached membership lookups (peers, hosts, groups)
//! - [`uncommitted_range`] / [`Replicator`]: leader-side log replication
//!   with signed anchors
//! - [`ClusterClients`]: pooled connections to other nodes
//! - [`Service`]: the RPC surface, with command execution and commit rules
//!   behind the [`CommandExecutor`] and [`ConsensusHandler`] contracts
//! - [`NodeState`]: all of the above assembled for one node

mod clients;
mod config;
mod directory;
mod replication;
mod service;
mod state;

pub use clients::ClusterClients;
pub use config::{NodeConfig, NodeSection, StorageSection};
pub use directory::{Directory, GroupPeers};
pub use replication::{uncommitted_range, Replicator};
pub use service::{CommandExecutor, ConsensusHandler, Service};
pub use state::NodeState;
