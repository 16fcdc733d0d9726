use std::collections::HashMap;

use tokio::sync::oneshot;

/// Outcome delivered to everyone waiting on one family: `Err` carries the
/// controller's explanation when the resolver failed.
pub type RelayOutcome = Result<(), String>;

/// Worker-side table of outstanding font requests, one per family.
///
/// Every waiter for a family is answered exactly once, by the first matching
/// delivery; the entry is removed at that point so duplicate or late deliveries
/// find nothing to resolve.
#[derive(Debug, Default)]
pub struct RelayRequests {
    pending: HashMap<String, Vec<oneshot::Sender<RelayOutcome>>>,
}

impl RelayRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait on `family`. The flag is `true` when no request was outstanding and
    /// the caller must emit `requestCache` for it.
    pub fn subscribe(&mut self, family: &str) -> (oneshot::Receiver<RelayOutcome>, bool) {
        let (tx, rx) = oneshot::channel();
        match self.pending.get_mut(family) {
            Some(waiters) => {
                waiters.push(tx);
                (rx, false)
            }
            None => {
                self.pending.insert(family.to_string(), vec![tx]);
                (rx, true)
            }
        }
    }

    /// Answer every waiter on `family`. Returns `false` when nothing was pending.
    pub fn fulfill(&mut self, family: &str, outcome: RelayOutcome) -> bool {
        let Some(waiters) = self.pending.remove(family) else {
            return false;
        };
        for tx in waiters {
            // a waiter that timed out has dropped its receiver
            let _ = tx.send(outcome.clone());
        }
        true
    }

    pub fn is_pending(&self, family: &str) -> bool {
        self.pending.contains_key(family)
    }

    /// Forget requests nobody waits for anymore, so the next job re-requests them.
    pub fn prune_abandoned(&mut self) -> Vec<String> {
        let mut dropped = Vec::new();
        self.pending.retain(|family, waiters| {
            waiters.retain(|tx| !tx.is_closed());
            if waiters.is_empty() {
                dropped.push(family.clone());
                false
            } else {
                true
            }
        });
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/relay/requests.rs"]
mod tests;
