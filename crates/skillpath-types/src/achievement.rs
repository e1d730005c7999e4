//! Achievement definitions, unlock rules, and per-learner unlock records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::id::AchievementId;
use crate::id::PathId;

/// Unlock predicate, expressed as data so catalogs can author it.
///
/// Internally tagged by `kind`:
/// ```toml
/// [achievements.rule]
/// kind = "total_points"
/// points = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AchievementRule {
    /// Accumulated points across all paths reach the threshold.
    TotalPoints { points: u32 },
    /// Number of completed or mastered skills reaches the threshold.
    SkillsCompleted { count: u32 },
    /// Number of mastered skills reaches the threshold.
    SkillsMastered { count: u32 },
    /// A specific path reaches 100%.
    PathCompleted { path_id: PathId },
    /// Number of fully completed paths reaches the threshold.
    PathsCompleted { count: u32 },
}

/// Authored achievement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: AchievementId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rule: AchievementRule,
}

/// An achievement as seen by one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub name: String,
    pub description: String,
    pub rule: AchievementRule,
    pub is_unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl Achievement {
    pub fn from_definition(definition: &AchievementDefinition, unlocked_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            rule: definition.rule.clone(),
            is_unlocked: unlocked_at.is_some(),
            unlocked_at,
        }
    }
}

/// Persisted fact that a learner unlocked an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    pub achievement_id: AchievementId,
    pub unlocked_at: DateTime<Utc>,
}
