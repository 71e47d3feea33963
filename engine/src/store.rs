use std::collections::HashMap;
use std::sync::Arc;

use crate::models::Participant;

/// Primary participant map plus a secondary bucket index keyed on the composite
/// `(language, my_sex)` pair (a single map rather than a nested `language -> sex`
/// mapping — an equivalent data-structure choice, not a contract).
///
/// Invariant: every id in `entries` appears in exactly one bucket, and vice versa.
/// `create` and `delete` keep both in lockstep.
#[derive(Default)]
pub(crate) struct ParticipantStore {
    entries: HashMap<u64, Arc<Participant>>,
    index: HashMap<(String, u8), HashMap<u64, Arc<Participant>>>,
}

impl ParticipantStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Upserts `participant`, removing any prior record (and its stale bucket entry)
    /// for the same `user_id` first.
    pub(crate) fn create(&mut self, participant: Participant) {
        self.remove_from_bucket(participant.user_id);

        let participant = Arc::new(participant);
        let key = participant.bucket_key();
        self.entries.insert(participant.user_id, participant.clone());
        self.index.entry(key).or_default().insert(participant.user_id, participant);
    }

    /// Idempotent: returns `true` if a record was actually removed.
    pub(crate) fn delete(&mut self, user_id: u64) -> bool {
        if self.entries.remove(&user_id).is_some() {
            self.remove_from_bucket(user_id);
            true
        } else {
            false
        }
    }

    fn remove_from_bucket(&mut self, user_id: u64) {
        if let Some(existing) = self.entries.get(&user_id) {
            let key = existing.bucket_key();
            if let Some(bucket) = self.index.get_mut(&key) {
                bucket.remove(&user_id);
            }
        }
    }

    pub(crate) fn get(&self, user_id: u64) -> Option<Arc<Participant>> {
        self.entries.get(&user_id).cloned()
    }

    pub(crate) fn contains(&self, user_id: u64) -> bool {
        self.entries.contains_key(&user_id)
    }

    /// Every participant in bucket `(language, sex)`, in unspecified but stable
    /// iteration order for the lifetime of this borrow.
    pub(crate) fn bucket(&self, language: &str, sex: u8) -> impl Iterator<Item = &Arc<Participant>> {
        self.index
            .get(&(language.to_string(), sex))
            .into_iter()
            .flat_map(|bucket| bucket.values())
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn bucket_len(&self, language: &str, sex: u8) -> usize {
        self.index
            .get(&(language.to_string(), sex))
            .map(|b| b.len())
            .unwrap_or(0)
    }
}
