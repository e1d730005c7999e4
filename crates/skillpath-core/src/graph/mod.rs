//! Prerequisite graph: validation, lock queries, and the per-path graph cache.
//!
//! Uses `petgraph` to model prerequisite edges as a directed graph
//! (prerequisite -> dependent). Topological sort detects cycles at load time,
//! so every `SkillGraph` that exists is acyclic.

pub mod store;

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use skillpath_types::error::GraphError;
use skillpath_types::path::{PathDefinition, PathId};
use skillpath_types::skill::{SkillDefinition, SkillId, SkillStatus};

pub use store::SkillGraphStore;

/// Validated prerequisite graph for one learning path.
#[derive(Debug)]
pub struct SkillGraph {
    definition: PathDefinition,
    index: HashMap<SkillId, usize>,
    dependents: HashMap<SkillId, Vec<SkillId>>,
}

impl SkillGraph {
    /// Validate a path definition and build its graph.
    ///
    /// Fails with a `GraphError` on duplicate ids, unknown or cross-path
    /// prerequisites, out-of-range definitions, or a cycle.
    pub fn load(definition: PathDefinition) -> Result<Self, GraphError> {
        validate_definitions(&definition)?;

        let mut index = HashMap::with_capacity(definition.skills.len());
        for (i, skill) in definition.skills.iter().enumerate() {
            if index.insert(skill.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateSkill(skill.id.clone()));
            }
        }

        // Edge from prerequisite -> dependent
        let mut graph = DiGraph::<usize, ()>::new();
        let nodes: Vec<NodeIndex> = (0..definition.skills.len()).map(|i| graph.add_node(i)).collect();
        let mut dependents: HashMap<SkillId, Vec<SkillId>> = HashMap::new();

        for (i, skill) in definition.skills.iter().enumerate() {
            for prereq in &skill.prerequisites {
                let from = index.get(prereq).ok_or_else(|| GraphError::UnknownPrerequisite {
                    skill: skill.id.clone(),
                    prerequisite: prereq.clone(),
                })?;
                graph.add_edge(nodes[*from], nodes[i], ());
                dependents
                    .entry(prereq.clone())
                    .or_default()
                    .push(skill.id.clone());
            }
        }

        // Depth-first topological sort -- detects cycles, including self-loops
        toposort(&graph, None).map_err(|cycle| {
            let skill = &definition.skills[graph[cycle.node_id()]];
            GraphError::CycleDetected(skill.id.clone())
        })?;

        Ok(Self {
            definition,
            index,
            dependents,
        })
    }

    pub fn path_id(&self) -> &PathId {
        &self.definition.id
    }

    pub fn definition(&self) -> &PathDefinition {
        &self.definition
    }

    /// Skill definitions in authored path order.
    pub fn skills(&self) -> &[SkillDefinition] {
        &self.definition.skills
    }

    pub fn skill(&self, id: &SkillId) -> Option<&SkillDefinition> {
        self.index.get(id).map(|&i| &self.definition.skills[i])
    }

    pub fn contains(&self, id: &SkillId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definition.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definition.skills.is_empty()
    }

    /// Skills listing `skill_id` as a direct prerequisite, in path order.
    pub fn dependents_of(&self, skill_id: &SkillId) -> &[SkillId] {
        self.dependents
            .get(skill_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Prerequisites of `skill_id` whose status is neither completed nor mastered.
    ///
    /// `status_of` returns `None` for skills the learner has never touched,
    /// which counts as not started.
    pub fn unmet_prerequisites<F>(&self, skill_id: &SkillId, status_of: F) -> Vec<SkillId>
    where
        F: Fn(&SkillId) -> Option<SkillStatus>,
    {
        match self.skill(skill_id) {
            Some(skill) => skill
                .prerequisites
                .iter()
                .filter(|p| !status_of(p).is_some_and(SkillStatus::is_finished))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// True iff any prerequisite's status is not completed/mastered.
    pub fn is_locked<F>(&self, skill_id: &SkillId, status_of: F) -> bool
    where
        F: Fn(&SkillId) -> Option<SkillStatus>,
    {
        self.skill(skill_id).is_some_and(|skill| {
            skill
                .prerequisites
                .iter()
                .any(|p| !status_of(p).is_some_and(SkillStatus::is_finished))
        })
    }
}

fn validate_definitions(definition: &PathDefinition) -> Result<(), GraphError> {
    if !(1..=5).contains(&definition.difficulty) {
        return Err(GraphError::InvalidDefinition(format!(
            "path '{}' has difficulty {} (expected 1-5)",
            definition.id, definition.difficulty
        )));
    }

    for skill in &definition.skills {
        if skill.learning_path_id != definition.id {
            return Err(GraphError::InvalidDefinition(format!(
                "skill '{}' belongs to path '{}', not '{}'",
                skill.id, skill.learning_path_id, definition.id
            )));
        }
        if skill.points == 0 {
            return Err(GraphError::InvalidDefinition(format!(
                "skill '{}' must award a positive number of points",
                skill.id
            )));
        }
        if !(1..=5).contains(&skill.difficulty) {
            return Err(GraphError::InvalidDefinition(format!(
                "skill '{}' has difficulty {} (expected 1-5)",
                skill.id, skill.difficulty
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
