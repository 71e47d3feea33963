use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::{Duration, Instant};

use matching_shared::{EngineError, EngineResult};

use crate::config::EngineConfig;
use crate::history::HistoryTable;
use crate::models::Participant;
use crate::scoring::age_score;
use crate::store::ParticipantStore;

const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;
const DEFAULT_COOLDOWN_MS: u64 = 0;

struct State {
    store: ParticipantStore,
    history: HistoryTable,
    universe: HashSet<String>,
}

impl State {
    fn new() -> Self {
        Self {
            store: ParticipantStore::new(),
            history: HistoryTable::new(),
            universe: HashSet::new(),
        }
    }
}

struct Inner {
    state: RwLock<State>,
    configured: AtomicBool,
    sweeper_started: AtomicBool,
    cooldown_ms: AtomicU64,
    sweep_interval_ms: AtomicU64,
}

/// A cheaply-cloneable handle onto the matching engine's shared state.
///
/// Every clone observes the same underlying store and history table — cloning does
/// not snapshot, it shares a reference (`Arc` internally), mirroring the module-level
/// singleton the original sources use, made explicit as an owned handle instead of a
/// package-global. Safe to share across an arbitrary number of caller threads.
#[derive(Clone)]
pub struct MatchingEngine {
    inner: Arc<Inner>,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    /// Constructs an unconfigured handle. Every operation other than `configure`
    /// returns `Err(EngineError::NotInitialized)` until `configure` succeeds once.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::new()),
                configured: AtomicBool::new(false),
                sweeper_started: AtomicBool::new(false),
                cooldown_ms: AtomicU64::new(DEFAULT_COOLDOWN_MS),
                sweep_interval_ms: AtomicU64::new(DEFAULT_SWEEP_INTERVAL_MS),
            }),
        }
    }

    /// Installs the interest universe and optional tunables, empties the store, and
    /// starts the sweeper on the first successful call. Idempotent beyond that: a
    /// later `configure` re-installs the universe and re-empties the store, but does
    /// not spawn a second sweeper task.
    pub fn configure(
        &self,
        interests_universe: impl IntoIterator<Item = String>,
        cooldown: Option<Duration>,
        sweep_interval: Option<Duration>,
    ) -> EngineResult<()> {
        {
            let mut state = self.inner.state.write().unwrap();
            state.store.clear();
            state.universe = interests_universe.into_iter().collect();
        }

        if let Some(cooldown) = cooldown {
            self.inner
                .cooldown_ms
                .store(cooldown.as_millis() as u64, Ordering::Relaxed);
        }
        if let Some(sweep_interval) = sweep_interval {
            self.inner
                .sweep_interval_ms
                .store(sweep_interval.as_millis() as u64, Ordering::Relaxed);
        }

        self.inner.configured.store(true, Ordering::Release);

        if self
            .inner
            .sweeper_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            let weak = Arc::downgrade(&self.inner);
            tokio::spawn(sweeper_loop(weak));
        }

        tracing::info!("matching engine configured");
        Ok(())
    }

    /// Builds `configure` directly from an `EngineConfig` (e.g. one loaded from the
    /// environment via `EngineConfig::load`).
    pub fn configure_from(&self, config: &EngineConfig) -> EngineResult<()> {
        self.configure(
            config.interests_universe(),
            Some(config.cooldown()),
            Some(config.sweep_interval()),
        )
    }

    /// Upserts a participant. Interest tags outside the configured universe are
    /// silently dropped (the tolerant contract for unknown interests).
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        user_id: u64,
        language: impl Into<String>,
        your_start: i32,
        your_end: i32,
        your_sex: u8,
        my_age: i32,
        my_sex: u8,
        priority: bool,
        interests: impl IntoIterator<Item = String>,
    ) -> EngineResult<()> {
        self.ensure_configured()?;
        let mut state = self.inner.state.write().unwrap();
        let interests = interests
            .into_iter()
            .filter(|tag| state.universe.contains(tag))
            .collect();
        state.store.create(Participant {
            user_id,
            language: language.into(),
            your_start,
            your_end,
            your_sex,
            my_age,
            my_sex,
            priority,
            interests,
        });
        Ok(())
    }

    /// Idempotent removal. No-op if `user_id` is not present.
    pub fn delete(&self, user_id: u64) -> EngineResult<()> {
        self.ensure_configured()?;
        let mut state = self.inner.state.write().unwrap();
        state.store.delete(user_id);
        Ok(())
    }

    /// Scans compatible candidates (read-locked), then consumes the best one
    /// (write-locked, with re-verification) per the two-phase design in the design
    /// notes. Returns `Ok(None)` on a clean miss — never an error.
    #[allow(clippy::too_many_arguments)]
    pub fn search(
        &self,
        my_id: u64,
        language: &str,
        your_start: i32,
        your_end: i32,
        your_sex: u8,
        my_age: i32,
        my_sex: u8,
        interests: &[String],
    ) -> EngineResult<Option<Participant>> {
        self.ensure_configured()?;

        let cooldown = self.cooldown();
        let now = Instant::now();
        let sexes: &[u8] = if your_sex == 2 { &[0, 1] } else { &[your_sex] };

        let best_id = {
            let state = self.inner.state.read().unwrap();
            let mut best: Option<(u64, i32)> = None;

            for &sex in sexes {
                for candidate in state.store.bucket(language, sex) {
                    if candidate.user_id == my_id {
                        continue;
                    }
                    if your_sex != 2 && candidate.my_sex != your_sex {
                        continue;
                    }
                    if candidate.your_sex != 2 && candidate.your_sex != my_sex {
                        continue;
                    }
                    if state
                        .history
                        .is_blocked(my_id, candidate.user_id, cooldown, now)
                    {
                        continue;
                    }

                    let mut score = age_score(my_age, candidate.your_start, candidate.your_end)
                        + age_score(candidate.my_age, your_start, your_end);
                    if candidate.priority {
                        score += 3;
                    }
                    for interest in interests {
                        if candidate.interests.contains(interest) {
                            score += 1;
                        }
                    }

                    let improves = match best {
                        Some((_, best_score)) => score > best_score,
                        None => true,
                    };
                    if score > 0 && improves {
                        best = Some((candidate.user_id, score));
                    }
                }
            }

            best.map(|(id, _)| id)
        };

        let Some(candidate_id) = best_id else {
            return Ok(None);
        };

        let mut state = self.inner.state.write().unwrap();
        let Some(candidate) = state.store.get(candidate_id) else {
            // Consumed or deleted by a concurrent search between phases.
            return Ok(None);
        };
        state.history.record_pair(my_id, candidate_id, cooldown, now);
        state.store.delete(candidate_id);
        drop(state);

        tracing::info!(seeker = my_id, candidate = candidate_id, "match consumed");
        Ok(Some((*candidate).clone()))
    }

    pub fn set_cooldown(&self, cooldown: Duration) -> EngineResult<()> {
        self.ensure_configured()?;
        self.inner
            .cooldown_ms
            .store(cooldown.as_millis() as u64, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_sweep_interval(&self, sweep_interval: Duration) -> EngineResult<()> {
        self.ensure_configured()?;
        self.inner
            .sweep_interval_ms
            .store(sweep_interval.as_millis() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Empties the store, the bucket index, and the history table, and resets
    /// `cooldown`/`sweep_interval` to their defaults. The sweeper task is not torn
    /// down explicitly; it keeps ticking against the now-empty state.
    pub fn close(&self) -> EngineResult<()> {
        self.ensure_configured()?;
        {
            let mut state = self.inner.state.write().unwrap();
            state.store.clear();
            state.history.clear();
        }
        self.inner
            .cooldown_ms
            .store(DEFAULT_COOLDOWN_MS, Ordering::Relaxed);
        self.inner
            .sweep_interval_ms
            .store(DEFAULT_SWEEP_INTERVAL_MS, Ordering::Relaxed);
        tracing::info!("matching engine closed");
        Ok(())
    }

    fn ensure_configured(&self) -> EngineResult<()> {
        if self.inner.configured.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::from_millis(self.inner.cooldown_ms.load(Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn is_blocked(&self, a: u64, b: u64) -> bool {
        let state = self.inner.state.read().unwrap();
        state.history.is_blocked(a, b, self.cooldown(), Instant::now())
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, user_id: u64) -> bool {
        let state = self.inner.state.read().unwrap();
        state.store.contains(user_id)
    }
}

/// Ticks every `sweep_interval` and evicts expired cooldown entries. Holds only a
/// weak reference to the engine's shared state: once every `MatchingEngine` handle is
/// dropped, the next tick finds nothing to upgrade and the task exits on its own.
async fn sweeper_loop(state: Weak<Inner>) {
    loop {
        let interval = match state.upgrade() {
            Some(inner) => Duration::from_millis(inner.sweep_interval_ms.load(Ordering::Relaxed)),
            None => return,
        };
        tokio::time::sleep(interval).await;

        let Some(inner) = state.upgrade() else {
            return;
        };
        let now = Instant::now();
        let evicted = {
            let mut state = inner.state.write().unwrap();
            state.history.sweep(now)
        };
        if evicted > 0 {
            tracing::debug!(evicted, "sweeper pass evicted expired cooldown entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn universe() -> Vec<String> {
        tags(&["music", "hiking", "movies"])
    }

    #[tokio::test]
    async fn uninitialized_engine_rejects_every_operation() {
        let engine = MatchingEngine::new();
        assert_eq!(
            engine.create(1, "en", 18, 30, 1, 25, 1, false, tags(&["music"])),
            Err(EngineError::NotInitialized)
        );
        assert_eq!(engine.delete(1), Err(EngineError::NotInitialized));
        assert_eq!(
            engine.search(2, "en", 18, 30, 1, 25, 0, &tags(&["music"])),
            Err(EngineError::NotInitialized)
        );
        assert_eq!(
            engine.set_cooldown(Duration::from_secs(1)),
            Err(EngineError::NotInitialized)
        );
        assert_eq!(
            engine.set_sweep_interval(Duration::from_secs(1)),
            Err(EngineError::NotInitialized)
        );
        assert_eq!(engine.close(), Err(EngineError::NotInitialized));
    }

    #[tokio::test]
    async fn scenario_mutual_age_and_interest_match() {
        let engine = MatchingEngine::new();
        engine.configure(universe(), None, None).unwrap();
        engine
            .create(1, "en", 18, 30, 0, 25, 1, false, tags(&["music"]))
            .unwrap();

        let result = engine
            .search(2, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap();
        let winner = result.expect("expected a match");
        assert_eq!(winner.user_id, 1);
    }

    #[tokio::test]
    async fn scenario_priority_breaks_tie() {
        let engine = MatchingEngine::new();
        engine.configure(universe(), None, None).unwrap();
        engine
            .create(3, "en", 18, 30, 0, 25, 1, false, tags(&["music"]))
            .unwrap();
        engine
            .create(4, "en", 18, 30, 0, 25, 1, true, tags(&["music"]))
            .unwrap();

        let winner = engine
            .search(9, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap()
            .expect("expected a match");
        assert_eq!(winner.user_id, 4);
    }

    #[tokio::test]
    async fn self_exclusion() {
        let engine = MatchingEngine::new();
        engine.configure(universe(), None, None).unwrap();
        engine
            .create(12, "en", 18, 30, 1, 25, 1, false, tags(&["music"]))
            .unwrap();

        let result = engine
            .search(12, "en", 18, 30, 1, 25, 1, &tags(&["music"]))
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn far_out_of_range_ages_yield_no_match() {
        let engine = MatchingEngine::new();
        engine.configure(universe(), None, None).unwrap();
        engine
            .create(203, "en", 18, 20, 1, 25, 0, false, tags(&["music"]))
            .unwrap();

        let result = engine
            .search(204, "en", 50, 55, 1, 50, 1, &tags(&["music"]))
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn any_sex_seeker_matches_either_bucket() {
        let engine = MatchingEngine::new();
        engine.configure(universe(), None, None).unwrap();
        engine
            .create(1, "en", 18, 30, 1, 25, 0, false, tags(&["music"]))
            .unwrap();
        engine
            .create(2, "en", 18, 30, 1, 25, 1, false, tags(&["music"]))
            .unwrap();

        let winner = engine
            .search(3, "en", 18, 30, 2, 25, 1, &tags(&["music"]))
            .unwrap()
            .expect("expected a match");
        assert!(winner.user_id == 1 || winner.user_id == 2);
    }

    #[tokio::test]
    async fn cooldown_blocks_immediate_rematch_then_expires() {
        let engine = MatchingEngine::new();
        engine
            .configure(universe(), Some(Duration::from_millis(40)), None)
            .unwrap();
        engine
            .create(12, "en", 18, 30, 0, 25, 1, true, tags(&["music"]))
            .unwrap();

        let winner = engine
            .search(13, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap()
            .expect("expected a match");
        assert_eq!(winner.user_id, 12);
        assert!(engine.is_blocked(13, 12));

        // Re-insert the consumed candidate; the cooldown should still block it.
        engine
            .create(12, "en", 18, 30, 0, 25, 1, true, tags(&["music"]))
            .unwrap();
        let blocked = engine
            .search(13, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap();
        assert!(blocked.is_none());

        tokio::time::sleep(Duration::from_millis(60)).await;

        engine
            .create(12, "en", 18, 30, 0, 25, 1, true, tags(&["music"]))
            .unwrap();
        let winner_again = engine
            .search(13, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap()
            .expect("expected a match after cooldown expiry");
        assert_eq!(winner_again.user_id, 12);
    }

    #[tokio::test]
    async fn consumed_candidate_is_removed_from_the_store() {
        let engine = MatchingEngine::new();
        engine.configure(universe(), None, None).unwrap();
        engine
            .create(1, "en", 18, 30, 0, 25, 1, false, tags(&["music"]))
            .unwrap();

        let winner = engine
            .search(2, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap()
            .expect("expected a match");
        assert_eq!(winner.user_id, 1);
        assert!(!engine.contains(1));
    }

    #[tokio::test]
    async fn unknown_interests_are_dropped_silently() {
        let engine = MatchingEngine::new();
        engine.configure(universe(), None, None).unwrap();
        // "skydiving" is outside the universe, so the stored interest set ends up
        // empty; age ranges are engineered so neither age term scores either, so a
        // hit can only happen if the unknown interest wrongly counted.
        engine
            .create(1, "en", 18, 20, 0, 25, 1, false, tags(&["skydiving"]))
            .unwrap();

        let winner = engine
            .search(2, "en", 50, 55, 1, 50, 0, &tags(&["skydiving"]))
            .unwrap();
        assert!(winner.is_none(), "unknown interest must not score a hit");
    }

    #[tokio::test]
    async fn re_create_replaces_the_existing_record() {
        let engine = MatchingEngine::new();
        engine.configure(universe(), None, None).unwrap();
        engine
            .create(1, "en", 18, 30, 0, 25, 1, false, tags(&["music"]))
            .unwrap();
        // Replace with a record in a different language bucket.
        engine
            .create(1, "ru", 18, 30, 0, 25, 1, false, tags(&["music"]))
            .unwrap();

        let miss = engine
            .search(2, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap();
        assert!(miss.is_none(), "stale bucket entry must not survive re-create");

        let hit = engine
            .search(2, "ru", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap();
        assert_eq!(hit.unwrap().user_id, 1);
    }

    #[tokio::test]
    async fn close_empties_store_and_history_but_leaves_the_universe_and_engine_usable() {
        let engine = MatchingEngine::new();
        engine
            .configure(universe(), Some(Duration::from_secs(5)), Some(Duration::from_secs(1)))
            .unwrap();
        engine
            .create(1, "en", 18, 30, 0, 25, 1, false, tags(&["music"]))
            .unwrap();
        engine
            .search(2, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap()
            .expect("expected a match that records a cooldown entry");
        assert!(engine.is_blocked(2, 1), "sanity: cooldown was recorded");

        engine.close().unwrap();
        assert!(!engine.contains(1), "close must empty the store");
        assert!(!engine.is_blocked(2, 1), "close must empty the history table");
        assert_eq!(self_cooldown_ms(&engine), DEFAULT_COOLDOWN_MS);
        assert_eq!(
            self_sweep_interval_ms(&engine),
            DEFAULT_SWEEP_INTERVAL_MS
        );

        // §4.5 resets only the store, the history table, and the tunables — the
        // interest universe is a peer configuration field and survives close, so a
        // previously-known interest still scores a hit afterwards.
        engine
            .create(3, "en", 18, 30, 0, 25, 1, false, tags(&["music"]))
            .unwrap();
        let winner = engine
            .search(4, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap()
            .expect("interest universe must survive close");
        assert_eq!(winner.user_id, 3);
    }

    #[tokio::test]
    async fn re_configure_does_not_wipe_an_existing_cooldown() {
        let engine = MatchingEngine::new();
        engine
            .configure(universe(), Some(Duration::from_secs(5)), None)
            .unwrap();
        engine
            .create(12, "en", 18, 30, 0, 25, 1, true, tags(&["music"]))
            .unwrap();
        engine
            .search(13, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap()
            .expect("expected a match");
        assert!(engine.is_blocked(13, 12), "sanity: cooldown was recorded");

        // Re-configuring to widen the interest universe must not clear the store's
        // cooldown history (M3) — configure only re-empties the store (§4.5).
        engine
            .configure(
                tags(&["music", "hiking", "movies", "chess"]),
                Some(Duration::from_secs(5)),
                None,
            )
            .unwrap();
        assert!(
            engine.is_blocked(13, 12),
            "re-configure must not wipe an existing cooldown entry"
        );

        engine
            .create(12, "en", 18, 30, 0, 25, 1, true, tags(&["music"]))
            .unwrap();
        let blocked = engine
            .search(13, "en", 18, 30, 1, 25, 0, &tags(&["music"]))
            .unwrap();
        assert!(blocked.is_none(), "cooldown recorded before re-configure still applies");
    }

    fn self_cooldown_ms(engine: &MatchingEngine) -> u64 {
        engine.inner.cooldown_ms.load(Ordering::Relaxed)
    }

    fn self_sweep_interval_ms(engine: &MatchingEngine) -> u64 {
        engine.inner.sweep_interval_ms.load(Ordering::Relaxed)
    }
}
