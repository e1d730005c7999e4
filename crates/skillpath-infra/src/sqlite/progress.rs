//! SQLite progress store implementation.
//!
//! Implements `ProgressStore` from `skillpath-core` using sqlx with split
//! read/write pools. A commit is one transaction on the single writer
//! connection: version check, path row upsert, skill row upserts and
//! insert-if-absent achievement unlocks.

use chrono::{DateTime, Utc};
use skillpath_core::repository::progress::{
    CommitReceipt, ProgressCommit, ProgressStore, StoredPathProgress,
};
use skillpath_types::achievement::{AchievementId, AchievementUnlock};
use skillpath_types::error::RepositoryError;
use skillpath_types::learner::LearnerId;
use skillpath_types::path::{PathId, PathProgress, PathStatus};
use skillpath_types::skill::{SkillId, SkillProgress, SkillStatus};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ProgressStore`.
pub struct SqliteProgressStore {
    pool: DatabasePool,
}

impl SqliteProgressStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for `path_progress`.
struct PathRow {
    total_skills: i64,
    completed_skills: i64,
    progress_percentage: i64,
    status: String,
    started_at: Option<String>,
    version: i64,
}

impl PathRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            total_skills: row.try_get("total_skills")?,
            completed_skills: row.try_get("completed_skills")?,
            progress_percentage: row.try_get("progress_percentage")?,
            status: row.try_get("status")?,
            started_at: row.try_get("started_at")?,
            version: row.try_get("version")?,
        })
    }

    fn into_parts(self) -> Result<(u64, PathProgress), RepositoryError> {
        let status: PathStatus = self.status.parse().map_err(RepositoryError::Query)?;
        let rollup = PathProgress {
            total_skills: to_u32(self.total_skills, "total_skills")?,
            completed_skills: to_u32(self.completed_skills, "completed_skills")?,
            progress_percentage: to_percent(self.progress_percentage)?,
            status,
            started_at: self.started_at.as_deref().map(parse_datetime).transpose()?,
        };
        Ok((self.version.max(0) as u64, rollup))
    }
}

/// Internal row type for `skill_progress`.
struct SkillRow {
    skill_id: String,
    status: String,
    progress_percentage: i64,
    points_earned: i64,
    started_at: Option<String>,
    completed_at: Option<String>,
}

impl SkillRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            skill_id: row.try_get("skill_id")?,
            status: row.try_get("status")?,
            progress_percentage: row.try_get("progress_percentage")?,
            points_earned: row.try_get("points_earned")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    fn into_progress(self) -> Result<SkillProgress, RepositoryError> {
        let skill_id: SkillId = self
            .skill_id
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid skill id: {e}")))?;
        let status: SkillStatus = self.status.parse().map_err(RepositoryError::Query)?;

        Ok(SkillProgress {
            skill_id,
            status,
            progress_percentage: to_percent(self.progress_percentage)?,
            points_earned: to_u32(self.points_earned, "points_earned")?,
            started_at: self.started_at.as_deref().map(parse_datetime).transpose()?,
            completed_at: self.completed_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn to_u32(value: i64, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| RepositoryError::Query(format!("{column} out of range: {value}")))
}

fn to_percent(value: i64) -> Result<u8, RepositoryError> {
    match u8::try_from(value) {
        Ok(percent) if percent <= 100 => Ok(percent),
        _ => Err(RepositoryError::Query(format!("progress out of range: {value}"))),
    }
}

/// Pool exhaustion and I/O failures are worth retrying; everything else is a
/// query problem.
fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        other => RepositoryError::Query(other.to_string()),
    }
}

impl ProgressStore for SqliteProgressStore {
    async fn load_path_progress(
        &self,
        learner_id: &LearnerId,
        path_id: &PathId,
    ) -> Result<Option<StoredPathProgress>, RepositoryError> {
        let row = sqlx::query(
            "SELECT total_skills, completed_skills, progress_percentage, status, started_at, version
             FROM path_progress WHERE learner_id = ? AND path_id = ?",
        )
        .bind(learner_id.as_str())
        .bind(path_id.as_str())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let (version, rollup) = PathRow::from_row(&row)
            .map_err(map_sqlx_error)?
            .into_parts()?;

        let rows = sqlx::query(
            "SELECT skill_id, status, progress_percentage, points_earned, started_at, completed_at
             FROM skill_progress WHERE learner_id = ? AND path_id = ? ORDER BY skill_id",
        )
        .bind(learner_id.as_str())
        .bind(path_id.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let skills = rows
            .iter()
            .map(|row| {
                SkillRow::from_row(row)
                    .map_err(map_sqlx_error)?
                    .into_progress()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(StoredPathProgress {
            version,
            rollup,
            skills,
        }))
    }

    async fn list_learner_paths(&self, learner_id: &LearnerId) -> Result<Vec<PathId>, RepositoryError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT path_id FROM path_progress WHERE learner_id = ? ORDER BY path_id")
                .bind(learner_id.as_str())
                .fetch_all(&self.pool.reader)
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|(id,)| PathId::new(id)).collect())
    }

    async fn load_unlocks(&self, learner_id: &LearnerId) -> Result<Vec<AchievementUnlock>, RepositoryError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT achievement_id, unlocked_at FROM achievement_unlocks
             WHERE learner_id = ? ORDER BY achievement_id",
        )
        .bind(learner_id.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(id, at)| {
                Ok(AchievementUnlock {
                    achievement_id: AchievementId::new(id),
                    unlocked_at: parse_datetime(&at)?,
                })
            })
            .collect()
    }

    async fn commit(&self, commit: &ProgressCommit) -> Result<CommitReceipt, RepositoryError> {
        let now = format_datetime(&Utc::now());
        let learner_id = commit.learner_id.as_str();
        let path_id = commit.path_id.as_str();

        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let stored: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM path_progress WHERE learner_id = ? AND path_id = ?")
                .bind(learner_id)
                .bind(path_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        let stored_version = stored.map(|(v,)| v.max(0) as u64).unwrap_or(0);
        if stored_version != commit.expected_version {
            // Dropping `tx` rolls back.
            return Err(RepositoryError::Conflict(format!(
                "progress for learner '{learner_id}' on path '{path_id}' is at version {stored_version}, expected {}",
                commit.expected_version
            )));
        }
        let version = stored_version + 1;

        let rollup = &commit.rollup;
        sqlx::query(
            "INSERT INTO path_progress (learner_id, path_id, total_skills, completed_skills, progress_percentage, status, started_at, version, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (learner_id, path_id) DO UPDATE SET
                total_skills = excluded.total_skills,
                completed_skills = excluded.completed_skills,
                progress_percentage = excluded.progress_percentage,
                status = excluded.status,
                started_at = excluded.started_at,
                version = excluded.version,
                updated_at = excluded.updated_at",
        )
        .bind(learner_id)
        .bind(path_id)
        .bind(i64::from(rollup.total_skills))
        .bind(i64::from(rollup.completed_skills))
        .bind(i64::from(rollup.progress_percentage))
        .bind(rollup.status.to_string())
        .bind(rollup.started_at.as_ref().map(format_datetime))
        .bind(version as i64)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for skill in &commit.skills {
            sqlx::query(
                "INSERT INTO skill_progress (learner_id, skill_id, path_id, status, progress_percentage, points_earned, started_at, completed_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT (learner_id, skill_id) DO UPDATE SET
                    path_id = excluded.path_id,
                    status = excluded.status,
                    progress_percentage = excluded.progress_percentage,
                    points_earned = excluded.points_earned,
                    started_at = excluded.started_at,
                    completed_at = excluded.completed_at,
                    updated_at = excluded.updated_at",
            )
            .bind(learner_id)
            .bind(skill.skill_id.as_str())
            .bind(path_id)
            .bind(skill.status.to_string())
            .bind(i64::from(skill.progress_percentage))
            .bind(i64::from(skill.points_earned))
            .bind(skill.started_at.as_ref().map(format_datetime))
            .bind(skill.completed_at.as_ref().map(format_datetime))
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        let mut inserted_unlocks = Vec::new();
        for unlock in &commit.unlocks {
            let result = sqlx::query(
                "INSERT INTO achievement_unlocks (learner_id, achievement_id, unlocked_at)
                 VALUES (?, ?, ?)
                 ON CONFLICT (learner_id, achievement_id) DO NOTHING",
            )
            .bind(learner_id)
            .bind(unlock.achievement_id.as_str())
            .bind(format_datetime(&unlock.unlocked_at))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            if result.rows_affected() == 1 {
                inserted_unlocks.push(unlock.achievement_id.clone());
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        tracing::debug!(
            learner_id,
            path_id,
            version,
            skills = commit.skills.len(),
            unlocks = inserted_unlocks.len(),
            "committed progress"
        );

        Ok(CommitReceipt {
            version,
            inserted_unlocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::tests::test_pool;
    use chrono::Duration;

    fn learner() -> LearnerId {
        LearnerId::new("ada")
    }

    fn science() -> PathId {
        PathId::new("intro-science")
    }

    fn completed(id: &str, at: DateTime<Utc>) -> SkillProgress {
        SkillProgress {
            skill_id: SkillId::new(id),
            status: SkillStatus::Completed,
            progress_percentage: 100,
            points_earned: 10,
            started_at: Some(at - Duration::minutes(10)),
            completed_at: Some(at),
        }
    }

    fn commit(expected_version: u64, skills: Vec<SkillProgress>, unlocks: &[&str]) -> ProgressCommit {
        let at = Utc::now();
        ProgressCommit {
            learner_id: learner(),
            path_id: science(),
            expected_version,
            rollup: PathProgress {
                total_skills: 3,
                completed_skills: skills.len() as u32,
                progress_percentage: 33,
                status: PathStatus::InProgress,
                started_at: Some(at),
            },
            skills,
            unlocks: unlocks
                .iter()
                .map(|id| AchievementUnlock {
                    achievement_id: AchievementId::new(*id),
                    unlocked_at: at,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteProgressStore::new(test_pool(&dir).await);

        let stored = store.load_path_progress(&learner(), &science()).await.unwrap();
        assert!(stored.is_none());
        assert!(store.list_learner_paths(&learner()).await.unwrap().is_empty());
        assert!(store.load_unlocks(&learner()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteProgressStore::new(test_pool(&dir).await);
        let at = Utc::now();

        let receipt = store
            .commit(&commit(0, vec![completed("a", at)], &["first-steps"]))
            .await
            .unwrap();
        assert_eq!(receipt.version, 1);
        assert_eq!(receipt.inserted_unlocks, vec![AchievementId::new("first-steps")]);

        let stored = store
            .load_path_progress(&learner(), &science())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.rollup.progress_percentage, 33);
        assert_eq!(stored.rollup.status, PathStatus::InProgress);
        assert_eq!(stored.skills.len(), 1);
        assert_eq!(stored.skills[0].status, SkillStatus::Completed);
        assert_eq!(
            stored.skills[0].completed_at.map(|t| t.timestamp()),
            Some(at.timestamp())
        );

        assert_eq!(store.list_learner_paths(&learner()).await.unwrap(), vec![science()]);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteProgressStore::new(test_pool(&dir).await);
        let at = Utc::now();
        store.commit(&commit(0, vec![completed("a", at)], &[])).await.unwrap();

        let err = store
            .commit(&commit(0, vec![completed("b", at)], &["scholar"]))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let stored = store
            .load_path_progress(&learner(), &science())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.skills.len(), 1);
        assert!(store.load_unlocks(&learner()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skill_rows_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteProgressStore::new(test_pool(&dir).await);
        let at = Utc::now();

        let mut in_progress = SkillProgress::not_started(SkillId::new("a"));
        in_progress.status = SkillStatus::InProgress;
        in_progress.progress_percentage = 40;
        in_progress.points_earned = 4;
        in_progress.started_at = Some(at);
        store.commit(&commit(0, vec![in_progress], &[])).await.unwrap();
        store.commit(&commit(1, vec![completed("a", at)], &[])).await.unwrap();

        let stored = store
            .load_path_progress(&learner(), &science())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.skills.len(), 1);
        assert_eq!(stored.skills[0].progress_percentage, 100);
        assert_eq!(stored.skills[0].points_earned, 10);
    }

    #[tokio::test]
    async fn test_unlocks_are_insert_if_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteProgressStore::new(test_pool(&dir).await);
        let at = Utc::now();

        store.commit(&commit(0, vec![], &["first-steps"])).await.unwrap();
        let first = store.load_unlocks(&learner()).await.unwrap();

        let mut again = commit(1, vec![completed("a", at)], &["first-steps", "scholar"]);
        for unlock in &mut again.unlocks {
            unlock.unlocked_at = at + Duration::hours(1);
        }
        let receipt = store.commit(&again).await.unwrap();
        assert_eq!(receipt.inserted_unlocks, vec![AchievementId::new("scholar")]);

        let unlocks = store.load_unlocks(&learner()).await.unwrap();
        assert_eq!(unlocks.len(), 2);
        // The original timestamp is kept.
        assert_eq!(unlocks[0].achievement_id, AchievementId::new("first-steps"));
        assert_eq!(unlocks[0].unlocked_at, first[0].unlocked_at);
    }
}
