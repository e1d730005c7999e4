//! Event types for the Skillpath progression event bus.
//!
//! `ProgressionEvent` is broadcast after a transition has been committed.
//! All variants are Clone + Send + Sync for use with tokio broadcast channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::achievement::AchievementId;
use crate::id::{LearnerId, PathId, SkillId};

/// Events emitted by progression transitions.
///
/// Subscribers (UI push, audit logging, notification delivery) only ever see
/// events from committed operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressionEvent {
    /// A learner moved a skill from not_started to in_progress.
    SkillStarted {
        learner_id: LearnerId,
        skill_id: SkillId,
        at: DateTime<Utc>,
    },

    /// Progress on an active skill changed.
    ProgressUpdated {
        learner_id: LearnerId,
        skill_id: SkillId,
        progress_percentage: u8,
        points_earned: u32,
    },

    /// A skill reached completed.
    SkillCompleted {
        learner_id: LearnerId,
        skill_id: SkillId,
        path_id: PathId,
        points_earned: u32,
        at: DateTime<Utc>,
    },

    /// A dependent skill's last unmet prerequisite was satisfied.
    SkillUnlocked {
        learner_id: LearnerId,
        skill_id: SkillId,
    },

    /// An external mastery signal promoted a completed skill.
    SkillMastered {
        learner_id: LearnerId,
        skill_id: SkillId,
        at: DateTime<Utc>,
    },

    /// The path rollup reached 100%.
    PathCompleted {
        learner_id: LearnerId,
        path_id: PathId,
    },

    /// An achievement unlocked for the first time.
    AchievementUnlocked {
        learner_id: LearnerId,
        achievement_id: AchievementId,
        at: DateTime<Utc>,
    },
}

impl ProgressionEvent {
    /// The learner this event belongs to.
    pub fn learner_id(&self) -> &LearnerId {
        match self {
            ProgressionEvent::SkillStarted { learner_id, .. }
            | ProgressionEvent::ProgressUpdated { learner_id, .. }
            | ProgressionEvent::SkillCompleted { learner_id, .. }
            | ProgressionEvent::SkillUnlocked { learner_id, .. }
            | ProgressionEvent::SkillMastered { learner_id, .. }
            | ProgressionEvent::PathCompleted { learner_id, .. }
            | ProgressionEvent::AchievementUnlocked { learner_id, .. } => learner_id,
        }
    }
}
