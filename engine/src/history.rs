use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Symmetric pairing-history table: `history[a][b]` and `history[b][a]` always agree.
///
/// Expiry is tracked against a monotonic clock (`Instant`) rather than wall time —
/// cooldown is a relative, process-local concept with no meaning across a clock
/// adjustment or a process restart.
#[derive(Default)]
pub(crate) struct HistoryTable {
    entries: HashMap<u64, HashMap<u64, Instant>>,
}

impl HistoryTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// No-op when `cooldown` is zero — history tracking is disabled entirely.
    pub(crate) fn record_pair(&mut self, a: u64, b: u64, cooldown: Duration, now: Instant) {
        if cooldown.is_zero() {
            return;
        }
        let expiry = now + cooldown;
        self.entries.entry(a).or_default().insert(b, expiry);
        self.entries.entry(b).or_default().insert(a, expiry);
    }

    /// Always `false` when `cooldown` is zero.
    pub(crate) fn is_blocked(&self, a: u64, b: u64, cooldown: Duration, now: Instant) -> bool {
        if cooldown.is_zero() {
            return false;
        }
        self.entries
            .get(&a)
            .and_then(|inner| inner.get(&b))
            .is_some_and(|expiry| *expiry > now)
    }

    /// Removes every entry whose expiry has passed. Returns the number of
    /// directional entries evicted (so a mutual pair counts as 2).
    pub(crate) fn sweep(&mut self, now: Instant) -> usize {
        let mut evicted = 0;
        self.entries.retain(|_, inner| {
            let before = inner.len();
            inner.retain(|_, expiry| *expiry > now);
            evicted += before - inner.len();
            !inner.is_empty()
        });
        evicted
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn get(&self, a: u64, b: u64) -> Option<Instant> {
        self.entries.get(&a).and_then(|inner| inner.get(&b)).copied()
    }
}
