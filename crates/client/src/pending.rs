//! Routing of replica results to waiting commands.
//!
//! Replicas deliver results for `(group, request_id)` independently of the
//! leader round trip. Each in-flight command registers an inbox here;
//! whatever transport carries replica results hands them to
//! [`PendingCommands::deliver`]. The two-level map is never exposed and
//! its lock is never held across a channel operation.

use conclave_types::{GroupId, RequestId};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::trace;

/// Inboxes for in-flight commands, keyed `group → request`.
#[derive(Default)]
pub struct PendingCommands {
    inner: RwLock<HashMap<GroupId, HashMap<RequestId, mpsc::Sender<Vec<u8>>>>>,
}

impl PendingCommands {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an inbox able to buffer `capacity` results. Replaces any
    /// stale registration for the same ids.
    pub fn register(
        &self,
        group: GroupId,
        request: RequestId,
        capacity: usize,
    ) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.inner
            .write()
            .entry(group)
            .or_default()
            .insert(request, tx);
        rx
    }

    /// Deliver one replica result. Returns false when no command is
    /// waiting (already finished, or never existed) or the inbox is full.
    pub fn deliver(&self, group: GroupId, request: RequestId, result: Vec<u8>) -> bool {
        let sender = {
            let inner = self.inner.read();
            match inner.get(&group).and_then(|m| m.get(&request)) {
                Some(sender) => sender.clone(),
                None => {
                    trace!(%group, request = request.0, "result for unknown request");
                    return false;
                }
            }
        };
        sender.try_send(result).is_ok()
    }

    /// Deregister an inbox. Later deliveries for the ids are dropped.
    pub fn remove(&self, group: GroupId, request: RequestId) {
        let mut inner = self.inner.write();
        if let Some(requests) = inner.get_mut(&group) {
            requests.remove(&request);
            if requests.is_empty() {
                inner.remove(&group);
            }
        }
    }

    /// Number of commands currently in flight.
    pub fn len(&self) -> usize {
        self.inner.read().values().map(|m| m.len()).sum()
    }

    /// Whether no commands are in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_deliver_receive() {
        let pending = PendingCommands::new();
        let mut rx = pending.register(GroupId(1), RequestId(1), 4);

        assert!(pending.deliver(GroupId(1), RequestId(1), vec![0xAB]));
        assert_eq!(rx.recv().await, Some(vec![0xAB]));
    }

    #[tokio::test]
    async fn test_deliver_unknown_request() {
        let pending = PendingCommands::new();
        assert!(!pending.deliver(GroupId(1), RequestId(9), vec![1]));
    }

    #[tokio::test]
    async fn test_remove_stops_delivery() {
        let pending = PendingCommands::new();
        let _rx = pending.register(GroupId(1), RequestId(1), 4);
        pending.remove(GroupId(1), RequestId(1));
        assert!(!pending.deliver(GroupId(1), RequestId(1), vec![1]));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_requests_isolated() {
        let pending = PendingCommands::new();
        let mut rx1 = pending.register(GroupId(1), RequestId(1), 4);
        let mut rx2 = pending.register(GroupId(1), RequestId(2), 4);

        pending.deliver(GroupId(1), RequestId(2), vec![2]);
        pending.deliver(GroupId(1), RequestId(1), vec![1]);

        assert_eq!(rx1.recv().await, Some(vec![1]));
        assert_eq!(rx2.recv().await, Some(vec![2]));
    }
}
