use thiserror::Error;

use crate::id::SkillId;
use crate::skill::SkillStatus;

/// Configuration errors in an authored skill graph.
///
/// A path that fails with one of these is never served to learners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("cycle detected involving skill '{0}'")]
    CycleDetected(SkillId),

    #[error("skill '{skill}' lists unknown prerequisite '{prerequisite}'")]
    UnknownPrerequisite { skill: SkillId, prerequisite: SkillId },

    #[error("duplicate skill id '{0}'")]
    DuplicateSkill(SkillId),

    #[error("invalid definition: {0}")]
    InvalidDefinition(String),
}

/// Errors surfaced by progression operations.
#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("skill '{skill_id}' is locked (unmet prerequisites: {})", join_ids(missing))]
    SkillLocked { skill_id: SkillId, missing: Vec<SkillId> },

    #[error("skill '{skill_id}' already started (status: {status})")]
    AlreadyStarted { skill_id: SkillId, status: SkillStatus },

    #[error("skill '{skill_id}' is in terminal state {status}")]
    TerminalState { skill_id: SkillId, status: SkillStatus },

    #[error("skill '{skill_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        skill_id: SkillId,
        from: SkillStatus,
        to: SkillStatus,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("persistence error: {0}")]
    Persistence(String),
}

fn join_ids(ids: &[SkillId]) -> String {
    ids.iter().map(SkillId::as_str).collect::<Vec<_>>().join(", ")
}

/// Errors from repository operations (used by trait definitions in skillpath-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether retrying the same operation could succeed.
    ///
    /// Conflicts mean another writer committed first; replaying the same
    /// commit would only conflict again.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Connection | RepositoryError::Query(_))
    }
}
