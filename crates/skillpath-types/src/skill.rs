use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::id::{PathId, SkillId};

/// Kind of learning activity a skill represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillType {
    Lesson,
    Reading,
    Video,
    Practice,
    Quiz,
    Project,
}

impl fmt::Display for SkillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillType::Lesson => write!(f, "lesson"),
            SkillType::Reading => write!(f, "reading"),
            SkillType::Video => write!(f, "video"),
            SkillType::Practice => write!(f, "practice"),
            SkillType::Quiz => write!(f, "quiz"),
            SkillType::Project => write!(f, "project"),
        }
    }
}

/// Authored definition of a skill. Never mutated by progression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: SkillId,
    pub title: String,
    #[serde(rename = "type")]
    pub skill_type: SkillType,
    /// Points awarded on completion. Must be positive.
    pub points: u32,
    /// 1 (easiest) to 5 (hardest).
    pub difficulty: u8,
    pub estimated_minutes: u32,
    /// Skills that must be completed or mastered before this one unlocks.
    #[serde(default)]
    pub prerequisites: BTreeSet<SkillId>,
    pub learning_path_id: PathId,
}

/// Per-learner lifecycle state of a skill.
///
/// - NotStarted: initial state, set by the authoring process
/// - InProgress: started, progress between 0 and 99
/// - Completed: finished by the learner
/// - Mastered: promoted after completion by an external mastery signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    NotStarted,
    InProgress,
    Completed,
    Mastered,
}

impl SkillStatus {
    /// Completed or mastered. A satisfied prerequisite must be in one of these.
    pub fn is_finished(self) -> bool {
        matches!(self, SkillStatus::Completed | SkillStatus::Mastered)
    }
}

impl Default for SkillStatus {
    fn default() -> Self {
        SkillStatus::NotStarted
    }
}

impl fmt::Display for SkillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillStatus::NotStarted => write!(f, "not_started"),
            SkillStatus::InProgress => write!(f, "in_progress"),
            SkillStatus::Completed => write!(f, "completed"),
            SkillStatus::Mastered => write!(f, "mastered"),
        }
    }
}

impl FromStr for SkillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_started" => Ok(SkillStatus::NotStarted),
            "in_progress" => Ok(SkillStatus::InProgress),
            "completed" => Ok(SkillStatus::Completed),
            "mastered" => Ok(SkillStatus::Mastered),
            other => Err(format!("invalid skill status: '{other}'")),
        }
    }
}

/// Mutable per-learner progress on one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillProgress {
    pub skill_id: SkillId,
    pub status: SkillStatus,
    /// 0-100.
    pub progress_percentage: u8,
    pub points_earned: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SkillProgress {
    /// Fresh, untouched progress for a skill.
    pub fn not_started(skill_id: SkillId) -> Self {
        Self {
            skill_id,
            status: SkillStatus::NotStarted,
            progress_percentage: 0,
            points_earned: 0,
            started_at: None,
            completed_at: None,
        }
    }

    /// Whether the learner has ever acted on this skill.
    pub fn has_started(&self) -> bool {
        self.status != SkillStatus::NotStarted || self.started_at.is_some()
    }
}

/// Read model for a single skill: definition, learner progress and the
/// computed lock flag, all taken from one committed version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSnapshot {
    pub id: SkillId,
    pub title: String,
    #[serde(rename = "type")]
    pub skill_type: SkillType,
    pub points: u32,
    pub difficulty: u8,
    pub estimated_minutes: u32,
    pub prerequisites: BTreeSet<SkillId>,
    pub learning_path_id: PathId,
    pub status: SkillStatus,
    pub progress_percentage: u8,
    pub points_earned: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_locked: bool,
}

impl SkillSnapshot {
    pub fn from_parts(definition: &SkillDefinition, progress: &SkillProgress, is_locked: bool) -> Self {
        Self {
            id: definition.id.clone(),
            title: definition.title.clone(),
            skill_type: definition.skill_type,
            points: definition.points,
            difficulty: definition.difficulty,
            estimated_minutes: definition.estimated_minutes,
            prerequisites: definition.prerequisites.clone(),
            learning_path_id: definition.learning_path_id.clone(),
            status: progress.status,
            progress_percentage: progress.progress_percentage,
            points_earned: progress.points_earned,
            started_at: progress.started_at,
            completed_at: progress.completed_at,
            is_locked,
        }
    }
}
