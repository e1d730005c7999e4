//! Set of achievements a learner has unlocked.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use skillpath_types::achievement::{Achievement, AchievementDefinition, AchievementId, AchievementUnlock};

/// Unlocks for one learner. Entries are only ever added.
#[derive(Debug, Clone, Default)]
pub struct AchievementLedger {
    unlocked: BTreeMap<AchievementId, DateTime<Utc>>,
}

impl AchievementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_unlocks(unlocks: impl IntoIterator<Item = AchievementUnlock>) -> Self {
        let mut ledger = Self::new();
        for unlock in unlocks {
            ledger.record(unlock.achievement_id, unlock.unlocked_at);
        }
        ledger
    }

    pub fn is_unlocked(&self, id: &AchievementId) -> bool {
        self.unlocked.contains_key(id)
    }

    pub fn unlocked_at(&self, id: &AchievementId) -> Option<DateTime<Utc>> {
        self.unlocked.get(id).copied()
    }

    /// Record an unlock. Returns `false` and keeps the original timestamp if
    /// the achievement was already unlocked.
    pub fn record(&mut self, id: AchievementId, at: DateTime<Utc>) -> bool {
        match self.unlocked.entry(id) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(at);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.unlocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty()
    }

    pub fn unlocks(&self) -> Vec<AchievementUnlock> {
        self.unlocked
            .iter()
            .map(|(id, at)| AchievementUnlock {
                achievement_id: id.clone(),
                unlocked_at: *at,
            })
            .collect()
    }

    /// Every defined achievement with this learner's unlock state, in
    /// definition order.
    pub fn achievements(&self, definitions: &[AchievementDefinition]) -> Vec<Achievement> {
        definitions
            .iter()
            .map(|d| Achievement::from_definition(d, self.unlocked_at(&d.id)))
            .collect()
    }
}
