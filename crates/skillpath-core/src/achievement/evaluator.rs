//! Achievement rule evaluation.
//!
//! Rules are evaluated against learner-wide totals after every committed
//! transition. Unlocking is idempotent: the ledger refuses duplicates, so an
//! achievement fires at most once per learner no matter how often its rule
//! holds.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use skillpath_types::achievement::{Achievement, AchievementDefinition, AchievementRule};
use skillpath_types::learner::{LearnerId, LearnerSummary};
use skillpath_types::path::{PathId, PathStatus};
use skillpath_types::skill::SkillStatus;

use super::ledger::AchievementLedger;
use crate::progression::LearnerPathState;

/// Learner-wide totals that achievement rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerContext {
    pub learner_id: LearnerId,
    pub total_points: u32,
    /// Skills completed or mastered.
    pub completed_skills: u32,
    pub mastered_skills: u32,
    pub completed_paths: BTreeSet<PathId>,
}

impl LearnerContext {
    pub fn empty(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            total_points: 0,
            completed_skills: 0,
            mastered_skills: 0,
            completed_paths: BTreeSet::new(),
        }
    }

    /// Aggregate over every path state the learner has.
    pub fn from_states<'a, I>(learner_id: LearnerId, states: I) -> Self
    where
        I: IntoIterator<Item = &'a LearnerPathState>,
    {
        let mut context = Self::empty(learner_id);
        for state in states {
            context.total_points += state.points_earned();
            context.completed_skills += state.count_with(SkillStatus::is_finished);
            context.mastered_skills += state.count_with(|s| s == SkillStatus::Mastered);
            if state.rollup.status == PathStatus::Completed {
                context.completed_paths.insert(state.path_id.clone());
            }
        }
        context
    }

    pub fn summary(&self, unlocked_achievements: u32) -> LearnerSummary {
        LearnerSummary {
            learner_id: self.learner_id.clone(),
            total_points: self.total_points,
            completed_skills: self.completed_skills,
            mastered_skills: self.mastered_skills,
            completed_paths: self.completed_paths.iter().cloned().collect(),
            unlocked_achievements,
        }
    }
}

/// Stateless rule evaluator.
pub struct AchievementEvaluator;

impl AchievementEvaluator {
    /// Whether a rule holds for the learner.
    pub fn satisfied(rule: &AchievementRule, context: &LearnerContext) -> bool {
        match rule {
            AchievementRule::TotalPoints { points } => context.total_points >= *points,
            AchievementRule::SkillsCompleted { count } => context.completed_skills >= *count,
            AchievementRule::SkillsMastered { count } => context.mastered_skills >= *count,
            AchievementRule::PathCompleted { path_id } => context.completed_paths.contains(path_id),
            AchievementRule::PathsCompleted { count } => {
                context.completed_paths.len() as u32 >= *count
            }
        }
    }

    /// Unlock every not-yet-unlocked achievement whose rule now holds.
    ///
    /// Newly unlocked achievements are recorded in `ledger` with `now` and
    /// returned in definition order.
    pub fn evaluate(
        definitions: &[AchievementDefinition],
        ledger: &mut AchievementLedger,
        context: &LearnerContext,
        now: DateTime<Utc>,
    ) -> Vec<Achievement> {
        let mut unlocked = Vec::new();
        for definition in definitions {
            if ledger.is_unlocked(&definition.id) || !Self::satisfied(&definition.rule, context) {
                continue;
            }
            if ledger.record(definition.id.clone(), now) {
                tracing::debug!(
                    learner_id = %context.learner_id,
                    achievement_id = %definition.id,
                    "achievement rule satisfied"
                );
                unlocked.push(Achievement::from_definition(definition, Some(now)));
            }
        }
        unlocked
    }
}
