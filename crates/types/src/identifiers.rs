//! Identifier newtypes.

use crate::PublicKey;
use sbor::prelude::BasicSbor;
use std::fmt;

/// Identifier of a consensus group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct GroupId(pub u64);

/// The bootstrap group. Always present; its members advertise the membership
/// of every other group to joining clients and nodes.
pub const ALPHA_GROUP: GroupId = GroupId(1);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group({})", self.0)
    }
}

/// Identifier of a node (a physical server). Equals the stable hash of the
/// node's public key, so identity cannot be claimed without the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Derive a node id from a public key: the first eight bytes of
    /// `blake3(key)`, little-endian.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let digest = blake3::hash(key.as_bytes());
        let bytes = digest.as_bytes();
        NodeId(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Identifier of a peer, one group member on one node. A node hosting
/// replicas in several groups owns one peer per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer({})", self.0)
    }
}

/// Client-monotonic request counter value, unique per client id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct RequestId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn test_node_id_stable_for_key() {
        let keypair = KeyPair::generate();
        let a = NodeId::from_public_key(&keypair.public_key());
        let b = NodeId::from_public_key(&keypair.public_key());
        assert_eq!(a, b);
    }

    #[test]
    fn test_node_id_differs_across_keys() {
        let a = NodeId::from_public_key(&KeyPair::generate().public_key());
        let b = NodeId::from_public_key(&KeyPair::generate().public_key());
        assert_ne!(a, b);
    }
}
