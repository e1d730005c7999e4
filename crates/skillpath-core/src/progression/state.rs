//! Per-(learner, path) progress state.
//!
//! A `LearnerPathState` is an immutable committed value once it is shared
//! behind an `Arc`. Writers clone it into a working copy, mutate the copy,
//! and swap it in only after the commit succeeds.

use std::collections::{BTreeSet, HashMap};

use skillpath_types::learner::LearnerId;
use skillpath_types::path::{PathId, PathProgress};
use skillpath_types::skill::{SkillId, SkillProgress, SkillStatus};

use crate::graph::SkillGraph;
use crate::repository::progress::StoredPathProgress;

#[derive(Debug, Clone)]
pub struct LearnerPathState {
    pub learner_id: LearnerId,
    pub path_id: PathId,
    /// Committed version this state was derived from.
    pub version: u64,
    pub rollup: PathProgress,
    skills: HashMap<SkillId, SkillProgress>,
    /// Skills mutated since this copy was taken.
    dirty: BTreeSet<SkillId>,
}

impl LearnerPathState {
    /// State for a learner who has never touched the path.
    pub fn fresh(learner_id: LearnerId, graph: &SkillGraph) -> Self {
        let skills = graph
            .skills()
            .iter()
            .map(|s| (s.id.clone(), SkillProgress::not_started(s.id.clone())))
            .collect();
        Self {
            learner_id,
            path_id: graph.path_id().clone(),
            version: 0,
            rollup: PathProgress {
                total_skills: graph.len() as u32,
                ..PathProgress::default()
            },
            skills,
            dirty: BTreeSet::new(),
        }
    }

    /// Rebuild state from a stored record.
    ///
    /// Stored rows for skills no longer in the path are ignored; skills
    /// without a row start as not started.
    pub fn from_stored(learner_id: LearnerId, graph: &SkillGraph, stored: StoredPathProgress) -> Self {
        let mut state = Self::fresh(learner_id, graph);
        state.version = stored.version;
        state.rollup = stored.rollup;
        for progress in stored.skills {
            if let Some(slot) = state.skills.get_mut(&progress.skill_id) {
                *slot = progress;
            }
        }
        state
    }

    pub fn progress(&self, skill_id: &SkillId) -> Option<&SkillProgress> {
        self.skills.get(skill_id)
    }

    /// Mutable access that records the skill as changed.
    pub fn progress_mut(&mut self, skill_id: &SkillId) -> Option<&mut SkillProgress> {
        let progress = self.skills.get_mut(skill_id)?;
        self.dirty.insert(skill_id.clone());
        Some(progress)
    }

    pub fn status_of(&self, skill_id: &SkillId) -> Option<SkillStatus> {
        self.skills.get(skill_id).map(|p| p.status)
    }

    pub fn skills(&self) -> impl Iterator<Item = &SkillProgress> {
        self.skills.values()
    }

    /// Changed skill rows, in id order.
    pub fn dirty_skills(&self) -> Vec<SkillProgress> {
        self.dirty
            .iter()
            .filter_map(|id| self.skills.get(id).cloned())
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Forget change tracking once the changes are committed.
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    /// Points earned across the whole path.
    pub fn points_earned(&self) -> u32 {
        self.skills.values().map(|p| p.points_earned).sum()
    }

    pub fn count_with<F>(&self, predicate: F) -> u32
    where
        F: Fn(SkillStatus) -> bool,
    {
        self.skills.values().filter(|p| predicate(p.status)).count() as u32
    }
}
