//! Learner-scoped aggregates and recommendation records.

use serde::{Deserialize, Serialize};

pub use crate::id::LearnerId;
use crate::id::{PathId, SkillId};

/// Totals across every path a learner has touched.
///
/// This is the input to achievement rules and the body of the learner
/// summary read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerSummary {
    pub learner_id: LearnerId,
    pub total_points: u32,
    pub completed_skills: u32,
    pub mastered_skills: u32,
    /// Paths at 100%, sorted.
    pub completed_paths: Vec<PathId>,
    pub unlocked_achievements: u32,
}

/// A suggested next skill. Derived data; nothing depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub skill_id: SkillId,
    /// Higher is better; 0.0-1.0 for the built-in recommender.
    pub score: f32,
    pub rationale: String,
}
