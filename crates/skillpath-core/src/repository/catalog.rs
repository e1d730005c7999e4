//! Path catalog trait definition and an in-memory implementation.
//!
//! The catalog is the boundary to the external authoring process: it hands
//! out path and achievement definitions and never sees learner progress.

use std::collections::HashMap;

use skillpath_types::achievement::AchievementDefinition;
use skillpath_types::error::RepositoryError;
use skillpath_types::path::{PathDefinition, PathId};
use skillpath_types::skill::SkillId;

/// Read-only source of authored definitions.
///
/// Implementations live in skillpath-infra (e.g., `FileCatalog`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait PathCatalog: Send + Sync {
    /// All path definitions, in catalog order.
    fn list_paths(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<PathDefinition>, RepositoryError>> + Send;

    /// A single path definition by id.
    fn get_path(
        &self,
        id: &PathId,
    ) -> impl std::future::Future<Output = Result<Option<PathDefinition>, RepositoryError>> + Send;

    /// The path that owns a skill.
    fn locate_skill(
        &self,
        skill_id: &SkillId,
    ) -> impl std::future::Future<Output = Result<Option<PathId>, RepositoryError>> + Send;

    /// All achievement definitions.
    fn achievements(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<AchievementDefinition>, RepositoryError>> + Send;
}

/// Catalog held entirely in memory.
///
/// Used by tests and by the file catalog once its documents are parsed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    paths: Vec<PathDefinition>,
    skill_index: HashMap<SkillId, PathId>,
    achievements: Vec<AchievementDefinition>,
}

impl InMemoryCatalog {
    pub fn new(paths: Vec<PathDefinition>, achievements: Vec<AchievementDefinition>) -> Self {
        let skill_index = paths
            .iter()
            .flat_map(|p| p.skills.iter().map(move |s| (s.id.clone(), p.id.clone())))
            .collect();
        Self {
            paths,
            skill_index,
            achievements,
        }
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }
}

impl PathCatalog for InMemoryCatalog {
    async fn list_paths(&self) -> Result<Vec<PathDefinition>, RepositoryError> {
        Ok(self.paths.clone())
    }

    async fn get_path(&self, id: &PathId) -> Result<Option<PathDefinition>, RepositoryError> {
        Ok(self.paths.iter().find(|p| &p.id == id).cloned())
    }

    async fn locate_skill(&self, skill_id: &SkillId) -> Result<Option<PathId>, RepositoryError> {
        Ok(self.skill_index.get(skill_id).cloned())
    }

    async fn achievements(&self) -> Result<Vec<AchievementDefinition>, RepositoryError> {
        Ok(self.achievements.clone())
    }
}
