//! Progress persistence trait definition.
//!
//! The engine depends only on this narrow contract: load by
//! (learner, entity id) and an atomic batch commit. Storage internals live
//! in skillpath-infra.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use skillpath_types::achievement::{AchievementId, AchievementUnlock};
use skillpath_types::error::RepositoryError;
use skillpath_types::learner::LearnerId;
use skillpath_types::path::{PathId, PathProgress};
use skillpath_types::skill::SkillProgress;

/// Last committed progress of one learner on one path.
#[derive(Debug, Clone, Default)]
pub struct StoredPathProgress {
    /// Monotonic commit counter for this (learner, path). 0 = never committed.
    pub version: u64,
    pub rollup: PathProgress,
    /// Only skills the learner has touched; absent skills are not started.
    pub skills: Vec<SkillProgress>,
}

/// One logical transaction's worth of changes.
///
/// Applied all-or-nothing. `expected_version` must match the stored version,
/// otherwise the commit fails with `RepositoryError::Conflict`.
#[derive(Debug, Clone)]
pub struct ProgressCommit {
    pub learner_id: LearnerId,
    pub path_id: PathId,
    pub expected_version: u64,
    pub rollup: PathProgress,
    /// Skill rows to upsert.
    pub skills: Vec<SkillProgress>,
    /// Unlocks to insert if absent. Existing unlocks are never overwritten.
    pub unlocks: Vec<AchievementUnlock>,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Version now stored for the (learner, path).
    pub version: u64,
    /// Unlocks from the commit that were not already stored.
    pub inserted_unlocks: Vec<AchievementId>,
}

/// Repository trait for learner progress persistence.
///
/// Implementations live in skillpath-infra (e.g., `SqliteProgressStore`).
pub trait ProgressStore: Send + Sync {
    /// Load the committed progress for a (learner, path) pair.
    fn load_path_progress(
        &self,
        learner_id: &LearnerId,
        path_id: &PathId,
    ) -> impl std::future::Future<Output = Result<Option<StoredPathProgress>, RepositoryError>> + Send;

    /// Every path the learner has committed progress on.
    fn list_learner_paths(
        &self,
        learner_id: &LearnerId,
    ) -> impl std::future::Future<Output = Result<Vec<PathId>, RepositoryError>> + Send;

    /// Every achievement the learner has unlocked.
    fn load_unlocks(
        &self,
        learner_id: &LearnerId,
    ) -> impl std::future::Future<Output = Result<Vec<AchievementUnlock>, RepositoryError>> + Send;

    /// Atomically apply a commit.
    fn commit(
        &self,
        commit: &ProgressCommit,
    ) -> impl std::future::Future<Output = Result<CommitReceipt, RepositoryError>> + Send;
}

type ProgressKey = (LearnerId, PathId);

#[derive(Debug, Default)]
struct MemoryTables {
    paths: HashMap<ProgressKey, StoredPathProgress>,
    unlocks: HashMap<LearnerId, BTreeMap<AchievementId, DateTime<Utc>>>,
}

/// Progress store held in memory. Nothing survives the process.
///
/// Applies the same version check and insert-if-absent unlock semantics as
/// the SQLite store, which makes it a faithful stand-in for tests and
/// ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    tables: tokio::sync::Mutex<MemoryTables>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for InMemoryProgressStore {
    async fn load_path_progress(
        &self,
        learner_id: &LearnerId,
        path_id: &PathId,
    ) -> Result<Option<StoredPathProgress>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .paths
            .get(&(learner_id.clone(), path_id.clone()))
            .cloned())
    }

    async fn list_learner_paths(&self, learner_id: &LearnerId) -> Result<Vec<PathId>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut paths: Vec<PathId> = tables
            .paths
            .keys()
            .filter(|(learner, _)| learner == learner_id)
            .map(|(_, path)| path.clone())
            .collect();
        paths.sort();
        Ok(paths)
    }

    async fn load_unlocks(&self, learner_id: &LearnerId) -> Result<Vec<AchievementUnlock>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .unlocks
            .get(learner_id)
            .map(|unlocks| {
                unlocks
                    .iter()
                    .map(|(id, at)| AchievementUnlock {
                        achievement_id: id.clone(),
                        unlocked_at: *at,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, commit: &ProgressCommit) -> Result<CommitReceipt, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let key = (commit.learner_id.clone(), commit.path_id.clone());

        let stored_version = tables.paths.get(&key).map(|p| p.version).unwrap_or(0);
        if stored_version != commit.expected_version {
            return Err(RepositoryError::Conflict(format!(
                "expected version {} but found {stored_version}",
                commit.expected_version
            )));
        }

        let entry = tables.paths.entry(key).or_default();
        for progress in &commit.skills {
            match entry.skills.iter_mut().find(|s| s.skill_id == progress.skill_id) {
                Some(slot) => *slot = progress.clone(),
                None => entry.skills.push(progress.clone()),
            }
        }
        entry.rollup = commit.rollup.clone();
        entry.version = stored_version + 1;
        let version = entry.version;

        let ledger = tables.unlocks.entry(commit.learner_id.clone()).or_default();
        let mut inserted_unlocks = Vec::new();
        for unlock in &commit.unlocks {
            if !ledger.contains_key(&unlock.achievement_id) {
                ledger.insert(unlock.achievement_id.clone(), unlock.unlocked_at);
                inserted_unlocks.push(unlock.achievement_id.clone());
            }
        }

        Ok(CommitReceipt {
            version,
            inserted_unlocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillpath_types::skill::{SkillId, SkillStatus};

    fn commit(expected_version: u64, unlocks: &[&str]) -> ProgressCommit {
        let mut skill = SkillProgress::not_started(SkillId::new("a"));
        skill.status = SkillStatus::InProgress;
        ProgressCommit {
            learner_id: LearnerId::new("ada"),
            path_id: PathId::new("intro-science"),
            expected_version,
            rollup: PathProgress::default(),
            skills: vec![skill],
            unlocks: unlocks
                .iter()
                .map(|id| AchievementUnlock {
                    achievement_id: AchievementId::new(*id),
                    unlocked_at: Utc::now(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_commit_bumps_version_and_rejects_stale() {
        let store = InMemoryProgressStore::new();
        let receipt = store.commit(&commit(0, &[])).await.unwrap();
        assert_eq!(receipt.version, 1);

        let err = store.commit(&commit(0, &[])).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let stored = store
            .load_path_progress(&LearnerId::new("ada"), &PathId::new("intro-science"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.skills.len(), 1);
    }

    #[tokio::test]
    async fn test_unlocks_insert_if_absent() {
        let store = InMemoryProgressStore::new();
        let first = store.commit(&commit(0, &["first-steps"])).await.unwrap();
        assert_eq!(first.inserted_unlocks, vec![AchievementId::new("first-steps")]);

        let second = store.commit(&commit(1, &["first-steps", "scholar"])).await.unwrap();
        assert_eq!(second.inserted_unlocks, vec![AchievementId::new("scholar")]);

        let unlocks = store.load_unlocks(&LearnerId::new("ada")).await.unwrap();
        assert_eq!(unlocks.len(), 2);
        assert_eq!(
            store.list_learner_paths(&LearnerId::new("ada")).await.unwrap(),
            vec![PathId::new("intro-science")]
        );
    }
}
