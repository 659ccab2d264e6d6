//! Majority agreement over an RPC fan-out.

use conclave_types::{strict_majority, Hash};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::mpsc;

/// Query every client concurrently and return the value a strict majority
/// agreed on.
///
/// The query returns `(value, canonical_bytes)`. Canonical bytes are what
/// agreement is measured over: responses tally together exactly when their
/// canonical bytes hash identically. Empty canonical bytes denote an
/// abstention (failed call, bad signature, undecodable payload) and never
/// contribute to any tally.
///
/// Returns as soon as one digest reaches a strict majority of the *polled*
/// clients (`> n/2`); sub-majority outcomes and ties yield `None`. Late
/// responses go nowhere: their channel is gone.
pub async fn majority_response<C, T, F, Fut>(clients: &[C], query: F) -> Option<T>
where
    C: Clone + Send + 'static,
    T: Send + 'static,
    F: Fn(C) -> Fut,
    Fut: Future<Output = (Option<T>, Vec<u8>)> + Send + 'static,
{
    let total = clients.len();
    if total == 0 {
        return None;
    }

    let (result_tx, mut result_rx) = mpsc::channel(total);
    for client in clients {
        let future = query(client.clone());
        let result_tx = result_tx.clone();
        tokio::spawn(async move {
            let _ = result_tx.send(future.await).await;
        });
    }
    drop(result_tx);

    let threshold = strict_majority(total);
    let mut tallies: HashMap<Hash, (usize, Option<T>)> = HashMap::new();
    while let Some((value, canonical)) = result_rx.recv().await {
        if canonical.is_empty() {
            continue;
        }
        let digest = Hash::from_bytes(&canonical);
        let tally = tallies.entry(digest).or_insert((0, None));
        tally.0 += 1;
        if tally.1.is_none() {
            tally.1 = value;
        }
        if tally.0 >= threshold {
            return tallies.remove(&digest).and_then(|(_, value)| value);
        }
    }
    None
}
