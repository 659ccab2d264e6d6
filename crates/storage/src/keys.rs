//! Composed storage keys.
//!
//! Every key is `group(8, big-endian) ++ table(1) ++ …`. Big-endian on all
//! integer components makes byte-lexicographic iteration equal numeric
//! order, so a prefix scan over one table of one group walks ids
//! ascending.

use conclave_types::GroupId;

/// Logical tables multiplexed into the store, one byte after the group
/// prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Table {
    /// `Peer` records: `prefix ++ peer_id(8)`.
    GroupPeers = 0x01,
    /// `LogEntry` records: `prefix ++ index(8)`.
    LogEntries = 0x02,
    /// `RaftGroup` record: `prefix` alone.
    GroupMeta = 0x03,
    /// `Host` records, stored under the alpha group: `prefix ++ node_id(8)`.
    HostList = 0x04,
    /// Local node configuration: `prefix` alone.
    ServerConf = 0x05,
}

/// Fixed-width big-endian encoding of a u64.
pub fn u64_bytes(x: u64) -> [u8; 8] {
    x.to_be_bytes()
}

/// Decode the u64 at `offset`. Panics when fewer than eight bytes remain;
/// keys are composed by this module, so a short read is key corruption.
pub fn bytes_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_be_bytes(bytes)
}

/// The nine-byte `group ++ table` prefix under which a table's rows live.
pub fn compose_key_prefix(group: GroupId, table: Table) -> [u8; 9] {
    let mut prefix = [0u8; 9];
    prefix[..8].copy_from_slice(&u64_bytes(group.0));
    prefix[8] = table as u8;
    prefix
}

/// A table row keyed by one u64, e.g. a peer id or log index.
pub fn compose_key(group: GroupId, table: Table, id: u64) -> [u8; 17] {
    let mut key = [0u8; 17];
    key[..9].copy_from_slice(&compose_key_prefix(group, table));
    key[9..].copy_from_slice(&u64_bytes(id));
    key
}

/// Smallest byte string strictly greater than every key starting with
/// `prefix`, for half-open range scans. `None` when the prefix is all
/// `0xff` and no such bound exists.
pub fn next_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Some(end);
        }
        end.pop();
    }
    None
}
