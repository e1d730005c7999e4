//! The skill state machine.
//!
//! `not_started -> in_progress -> completed`, with `mastered` reachable only
//! from `completed` through an external mastery signal. Completed and
//! mastered are terminal for learner-driven transitions.
//!
//! Every operation checks all preconditions before touching the state, so a
//! rejected transition leaves the working copy exactly as it was. The engine
//! is synchronous and never awaits.

use chrono::{DateTime, Utc};
use skillpath_types::error::ProgressionError;
use skillpath_types::event::ProgressionEvent;
use skillpath_types::skill::{SkillId, SkillStatus};

use super::state::LearnerPathState;
use crate::graph::SkillGraph;

/// Applies transitions to a `LearnerPathState` for one validated graph.
pub struct ProgressionEngine<'g> {
    graph: &'g SkillGraph,
}

impl<'g> ProgressionEngine<'g> {
    pub fn new(graph: &'g SkillGraph) -> Self {
        Self { graph }
    }

    /// `not_started -> in_progress` with progress 0.
    pub fn start_skill(
        &self,
        state: &mut LearnerPathState,
        skill_id: &SkillId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressionEvent>, ProgressionError> {
        let status = self.current_status(state, skill_id)?;
        self.ensure_unlocked(state, skill_id)?;
        if status != SkillStatus::NotStarted {
            return Err(ProgressionError::AlreadyStarted {
                skill_id: skill_id.clone(),
                status,
            });
        }

        let mut events = Vec::new();
        self.begin(state, skill_id, now, &mut events);
        Ok(events)
    }

    /// Set progress on an active skill.
    ///
    /// `not_started` skills are started implicitly; 100 completes the skill.
    /// Values outside 0-100 are rejected, not clamped.
    pub fn update_progress(
        &self,
        state: &mut LearnerPathState,
        skill_id: &SkillId,
        percent: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressionEvent>, ProgressionError> {
        if !(0..=100).contains(&percent) {
            return Err(ProgressionError::Validation(format!(
                "progress must be between 0 and 100, got {percent}"
            )));
        }
        let percent = percent as u8;

        let status = self.current_status(state, skill_id)?;
        if status.is_finished() {
            return Err(ProgressionError::TerminalState {
                skill_id: skill_id.clone(),
                status,
            });
        }
        self.ensure_unlocked(state, skill_id)?;

        let mut events = Vec::new();
        if status == SkillStatus::NotStarted {
            self.begin(state, skill_id, now, &mut events);
        }

        if percent == 100 {
            self.finish(state, skill_id, now, &mut events);
            return Ok(events);
        }

        let points = self.points_for(skill_id);
        let learner_id = state.learner_id.clone();
        let Some(progress) = state.progress_mut(skill_id) else {
            return Err(ProgressionError::NotFound(format!("skill '{skill_id}'")));
        };
        let earned = (u64::from(percent) * u64::from(points) / 100) as u32;
        progress.progress_percentage = percent;
        // Never give points back, even if reported progress drops.
        progress.points_earned = progress.points_earned.max(earned).min(points);

        events.push(ProgressionEvent::ProgressUpdated {
            learner_id,
            skill_id: skill_id.clone(),
            progress_percentage: progress.progress_percentage,
            points_earned: progress.points_earned,
        });
        Ok(events)
    }

    /// Mark a skill completed and award its full points.
    pub fn complete_skill(
        &self,
        state: &mut LearnerPathState,
        skill_id: &SkillId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressionEvent>, ProgressionError> {
        let status = self.current_status(state, skill_id)?;
        if status.is_finished() {
            return Err(ProgressionError::TerminalState {
                skill_id: skill_id.clone(),
                status,
            });
        }
        self.ensure_unlocked(state, skill_id)?;

        let mut events = Vec::new();
        if status == SkillStatus::NotStarted {
            self.begin(state, skill_id, now, &mut events);
        }
        self.finish(state, skill_id, now, &mut events);
        Ok(events)
    }

    /// `completed -> mastered`, driven by an external mastery signal.
    pub fn promote_mastery(
        &self,
        state: &mut LearnerPathState,
        skill_id: &SkillId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressionEvent>, ProgressionError> {
        let status = self.current_status(state, skill_id)?;
        match status {
            SkillStatus::Completed => {}
            SkillStatus::Mastered => {
                return Err(ProgressionError::TerminalState {
                    skill_id: skill_id.clone(),
                    status,
                });
            }
            from => {
                return Err(ProgressionError::InvalidTransition {
                    skill_id: skill_id.clone(),
                    from,
                    to: SkillStatus::Mastered,
                });
            }
        }

        let points = self.points_for(skill_id);
        let learner_id = state.learner_id.clone();
        if let Some(progress) = state.progress_mut(skill_id) {
            progress.status = SkillStatus::Mastered;
            progress.progress_percentage = 100;
            progress.points_earned = points;
        }

        Ok(vec![ProgressionEvent::SkillMastered {
            learner_id,
            skill_id: skill_id.clone(),
            at: now,
        }])
    }

    fn current_status(
        &self,
        state: &LearnerPathState,
        skill_id: &SkillId,
    ) -> Result<SkillStatus, ProgressionError> {
        if !self.graph.contains(skill_id) {
            return Err(ProgressionError::NotFound(format!("skill '{skill_id}'")));
        }
        Ok(state.status_of(skill_id).unwrap_or_default())
    }

    fn ensure_unlocked(&self, state: &LearnerPathState, skill_id: &SkillId) -> Result<(), ProgressionError> {
        let missing = self
            .graph
            .unmet_prerequisites(skill_id, |id| state.status_of(id));
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProgressionError::SkillLocked {
                skill_id: skill_id.clone(),
                missing,
            })
        }
    }

    fn points_for(&self, skill_id: &SkillId) -> u32 {
        self.graph.skill(skill_id).map(|s| s.points).unwrap_or(0)
    }

    fn begin(
        &self,
        state: &mut LearnerPathState,
        skill_id: &SkillId,
        now: DateTime<Utc>,
        events: &mut Vec<ProgressionEvent>,
    ) {
        let learner_id = state.learner_id.clone();
        if let Some(progress) = state.progress_mut(skill_id) {
            progress.status = SkillStatus::InProgress;
            progress.progress_percentage = 0;
            progress.started_at.get_or_insert(now);
            events.push(ProgressionEvent::SkillStarted {
                learner_id,
                skill_id: skill_id.clone(),
                at: now,
            });
        }
    }

    fn finish(
        &self,
        state: &mut LearnerPathState,
        skill_id: &SkillId,
        now: DateTime<Utc>,
        events: &mut Vec<ProgressionEvent>,
    ) {
        let points = self.points_for(skill_id);
        let learner_id = state.learner_id.clone();
        if let Some(progress) = state.progress_mut(skill_id) {
            progress.status = SkillStatus::Completed;
            progress.progress_percentage = 100;
            progress.points_earned = points;
            progress.started_at.get_or_insert(now);
            progress.completed_at.get_or_insert(now);
        }

        events.push(ProgressionEvent::SkillCompleted {
            learner_id: learner_id.clone(),
            skill_id: skill_id.clone(),
            path_id: self.graph.path_id().clone(),
            points_earned: points,
            at: now,
        });

        // Dependents were all locked before (this skill was unfinished).
        // The ones with nothing else outstanding are now unlockable.
        for dependent in self.graph.dependents_of(skill_id) {
            if !self.graph.is_locked(dependent, |id| state.status_of(id)) {
                events.push(ProgressionEvent::SkillUnlocked {
                    learner_id: learner_id.clone(),
                    skill_id: dependent.clone(),
                });
            }
        }
    }
}
