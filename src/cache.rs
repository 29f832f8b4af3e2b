//! Single-slot TTL cache for sweep results.

use std::time::{Duration, Instant};

use tokio::sync::RwLock;

struct Slot<T> {
    value: T,
    computed_at: Instant,
}

/// One process-wide "current value" with a fixed time-to-live.
///
/// There is no keying: each refresh overwrites the slot and every caller
/// inside the TTL window sees the same value. Two near-simultaneous
/// callers that both miss after expiry may both recompute; the last
/// writer wins. That race is accepted, not prevented.
pub struct SlotCache<T> {
    ttl: Duration,
    slot: RwLock<Option<Slot<T>>>,
}

impl<T: Clone> SlotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Return the cached value if it is younger than the TTL.
    pub async fn get(&self) -> Option<T> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some(entry) if entry.computed_at.elapsed() < self.ttl => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Overwrite the slot with a freshly computed value.
    pub async fn put(&self, value: T) {
        let mut slot = self.slot.write().await;
        *slot = Some(Slot {
            value,
            computed_at: Instant::now(),
        });
    }
}
