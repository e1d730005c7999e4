//! Cache of validated skill graphs, keyed by path.
//!
//! Graphs are built once from catalog definitions and shared as `Arc`s.
//! A path whose definition fails validation is never cached, so every
//! request for it keeps failing with the same `GraphError` until the
//! authoring side fixes it.

use std::sync::Arc;

use dashmap::DashMap;
use skillpath_types::error::ProgressionError;
use skillpath_types::path::PathId;
use skillpath_types::skill::SkillId;

use super::SkillGraph;
use crate::repository::catalog::PathCatalog;

pub struct SkillGraphStore<C: PathCatalog> {
    catalog: C,
    graphs: DashMap<PathId, Arc<SkillGraph>>,
    skill_index: DashMap<SkillId, PathId>,
}

impl<C: PathCatalog> SkillGraphStore<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            graphs: DashMap::new(),
            skill_index: DashMap::new(),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Load and validate the graph for a path.
    ///
    /// Fails with `NotFound` for unknown paths and `Graph` for invalid ones.
    pub async fn load(&self, path_id: &PathId) -> Result<Arc<SkillGraph>, ProgressionError> {
        if let Some(graph) = self.graphs.get(path_id) {
            return Ok(Arc::clone(graph.value()));
        }

        let definition = self
            .catalog
            .get_path(path_id)
            .await
            .map_err(|e| ProgressionError::Persistence(e.to_string()))?
            .ok_or_else(|| ProgressionError::NotFound(format!("path '{path_id}'")))?;

        let graph = match SkillGraph::load(definition) {
            Ok(graph) => Arc::new(graph),
            Err(err) => {
                tracing::warn!(path_id = %path_id, error = %err, "refusing to serve invalid path");
                return Err(err.into());
            }
        };

        for skill in graph.skills() {
            self.skill_index.insert(skill.id.clone(), path_id.clone());
        }

        // Another task may have loaded the same path concurrently; keep the first.
        let graph = self
            .graphs
            .entry(path_id.clone())
            .or_insert(graph)
            .clone();
        tracing::debug!(path_id = %path_id, skills = graph.len(), "loaded skill graph");

        Ok(graph)
    }

    /// The path that owns a skill.
    pub async fn locate(&self, skill_id: &SkillId) -> Result<PathId, ProgressionError> {
        if let Some(path_id) = self.skill_index.get(skill_id) {
            return Ok(path_id.clone());
        }

        self.catalog
            .locate_skill(skill_id)
            .await
            .map_err(|e| ProgressionError::Persistence(e.to_string()))?
            .ok_or_else(|| ProgressionError::NotFound(format!("skill '{skill_id}'")))
    }

    /// Load the graph that owns a skill.
    pub async fn graph_for_skill(&self, skill_id: &SkillId) -> Result<Arc<SkillGraph>, ProgressionError> {
        let path_id = self.locate(skill_id).await?;
        let graph = self.load(&path_id).await?;
        if !graph.contains(skill_id) {
            return Err(ProgressionError::NotFound(format!("skill '{skill_id}'")));
        }
        Ok(graph)
    }
}
