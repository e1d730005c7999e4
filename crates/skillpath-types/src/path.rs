use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::id::PathId;
use crate::skill::{SkillDefinition, SkillId, SkillSnapshot};

/// Authored definition of a learning path and its ordered skills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathDefinition {
    pub id: PathId,
    pub title: String,
    pub subject: String,
    pub grade_level: String,
    /// 1 (easiest) to 5 (hardest).
    pub difficulty: u8,
    /// Skills in presentation order.
    pub skills: Vec<SkillDefinition>,
}

impl PathDefinition {
    /// Ordered skill ids.
    pub fn skill_ids(&self) -> Vec<SkillId> {
        self.skills.iter().map(|s| s.id.clone()).collect()
    }
}

/// Path-level status derived from skill statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl Default for PathStatus {
    fn default() -> Self {
        PathStatus::NotStarted
    }
}

impl fmt::Display for PathStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStatus::NotStarted => write!(f, "not_started"),
            PathStatus::InProgress => write!(f, "in_progress"),
            PathStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for PathStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_started" => Ok(PathStatus::NotStarted),
            "in_progress" => Ok(PathStatus::InProgress),
            "completed" => Ok(PathStatus::Completed),
            other => Err(format!("invalid path status: '{other}'")),
        }
    }
}

/// Per-learner rollup of a path. Always recomputed from skill statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathProgress {
    pub total_skills: u32,
    pub completed_skills: u32,
    /// 0-100, round-half-up of completed / total.
    pub progress_percentage: u8,
    pub status: PathStatus,
    pub started_at: Option<DateTime<Utc>>,
}

/// Read model of a path for one learner at one committed version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSnapshot {
    pub id: PathId,
    pub title: String,
    pub subject: String,
    pub grade_level: String,
    pub difficulty: u8,
    pub skill_ids: Vec<SkillId>,
    pub total_skills: u32,
    pub completed_skills: u32,
    pub progress_percentage: u8,
    pub status: PathStatus,
    pub started_at: Option<DateTime<Utc>>,
    /// Skills in path order.
    pub skills: Vec<SkillSnapshot>,
    /// Committed version this view was taken from (0 = nothing committed yet).
    pub version: u64,
}

impl PathSnapshot {
    pub fn skill(&self, id: &SkillId) -> Option<&SkillSnapshot> {
        self.skills.iter().find(|s| &s.id == id)
    }

    /// Total points earned across the path's skills.
    pub fn points_earned(&self) -> u32 {
        self.skills.iter().map(|s| s.points_earned).sum()
    }
}
