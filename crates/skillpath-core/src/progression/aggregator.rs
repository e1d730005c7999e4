//! Path rollups and read models.
//!
//! The rollup is always recomputed from skill statuses; it is never
//! incremented. That keeps it correct whichever transitions produced the
//! current state.

use skillpath_types::path::{PathProgress, PathSnapshot, PathStatus};
use skillpath_types::skill::{SkillId, SkillSnapshot, SkillStatus};

use super::state::LearnerPathState;
use crate::graph::SkillGraph;

/// Integer round-half-up of `100 * completed / total`. A path with no
/// skills reports 0.
pub fn rollup_percentage(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    ((200 * completed + total) / (2 * total)) as u8
}

pub struct PathAggregator;

impl PathAggregator {
    /// Compute the rollup for a state without changing it.
    ///
    /// Status follows the rounded percentage: a path reads `Completed` once
    /// it rounds to 100, so 199 of 200 finished skills already completes it.
    pub fn rollup(graph: &SkillGraph, state: &LearnerPathState) -> PathProgress {
        let total_skills = graph.len() as u32;
        let completed_skills = graph
            .skills()
            .iter()
            .filter(|s| state.status_of(&s.id).is_some_and(SkillStatus::is_finished))
            .count() as u32;
        let progress_percentage = rollup_percentage(completed_skills, total_skills);

        let any_started = state.skills().any(|p| p.has_started());
        let status = if total_skills > 0 && progress_percentage == 100 {
            PathStatus::Completed
        } else if any_started {
            PathStatus::InProgress
        } else {
            PathStatus::NotStarted
        };

        // First start is sticky.
        let started_at = state
            .rollup
            .started_at
            .or_else(|| state.skills().filter_map(|p| p.started_at).min());

        PathProgress {
            total_skills,
            completed_skills,
            progress_percentage,
            status,
            started_at,
        }
    }

    /// Recompute the rollup in place, returning the status it had before.
    pub fn recompute(graph: &SkillGraph, state: &mut LearnerPathState) -> PathStatus {
        let previous = state.rollup.status;
        state.rollup = Self::rollup(graph, state);
        previous
    }

    pub fn skill_snapshot(
        graph: &SkillGraph,
        state: &LearnerPathState,
        skill_id: &SkillId,
    ) -> Option<SkillSnapshot> {
        let definition = graph.skill(skill_id)?;
        let progress = state.progress(skill_id)?;
        let is_locked = graph.is_locked(skill_id, |id| state.status_of(id));
        Some(SkillSnapshot::from_parts(definition, progress, is_locked))
    }

    /// Full read model of a path for the learner owning `state`.
    pub fn snapshot(graph: &SkillGraph, state: &LearnerPathState) -> PathSnapshot {
        let definition = graph.definition();
        let rollup = &state.rollup;
        let skills = definition
            .skills
            .iter()
            .filter_map(|s| Self::skill_snapshot(graph, state, &s.id))
            .collect();

        PathSnapshot {
            id: definition.id.clone(),
            title: definition.title.clone(),
            subject: definition.subject.clone(),
            grade_level: definition.grade_level.clone(),
            difficulty: definition.difficulty,
            skill_ids: definition.skill_ids(),
            total_skills: rollup.total_skills,
            completed_skills: rollup.completed_skills,
            progress_percentage: rollup.progress_percentage,
            status: rollup.status,
            started_at: rollup.started_at,
            skills,
            version: state.version,
        }
    }
}
