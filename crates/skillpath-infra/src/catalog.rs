//! TOML file catalog.
//!
//! Layout of a catalog directory:
//!
//! ```text
//! catalog/
//!   achievements.toml     # optional, [[achievements]] tables
//!   intro-science.toml    # one learning path per file
//!   algebra-basics.toml
//! ```
//!
//! Files are read once at startup, in file name order. Skills may omit
//! `learning_path_id`; it defaults to the id of the path file they sit in.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use skillpath_core::repository::catalog::{InMemoryCatalog, PathCatalog};
use skillpath_types::achievement::AchievementDefinition;
use skillpath_types::error::RepositoryError;
use skillpath_types::path::{PathDefinition, PathId};
use skillpath_types::skill::{SkillDefinition, SkillId, SkillType};

const ACHIEVEMENTS_FILE: &str = "achievements.toml";

/// Errors from loading a catalog directory.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("path '{0}' is defined more than once")]
    DuplicatePath(PathId),

    #[error("skill '{skill}' appears in both '{first}' and '{second}'")]
    DuplicateSkill {
        skill: SkillId,
        first: PathId,
        second: PathId,
    },
}

#[derive(Debug, Deserialize)]
struct PathDocument {
    id: PathId,
    title: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    grade_level: String,
    #[serde(default = "default_difficulty")]
    difficulty: u8,
    #[serde(default)]
    skills: Vec<SkillDocument>,
}

#[derive(Debug, Deserialize)]
struct SkillDocument {
    id: SkillId,
    title: String,
    #[serde(rename = "type")]
    skill_type: SkillType,
    points: u32,
    #[serde(default = "default_difficulty")]
    difficulty: u8,
    #[serde(default)]
    estimated_minutes: u32,
    #[serde(default)]
    prerequisites: BTreeSet<SkillId>,
    learning_path_id: Option<PathId>,
}

#[derive(Debug, Default, Deserialize)]
struct AchievementsDocument {
    #[serde(default)]
    achievements: Vec<AchievementDefinition>,
}

fn default_difficulty() -> u8 {
    1
}

impl PathDocument {
    fn into_definition(self) -> PathDefinition {
        let path_id = self.id;
        let skills = self
            .skills
            .into_iter()
            .map(|s| SkillDefinition {
                id: s.id,
                title: s.title,
                skill_type: s.skill_type,
                points: s.points,
                difficulty: s.difficulty,
                estimated_minutes: s.estimated_minutes,
                prerequisites: s.prerequisites,
                // A mismatching explicit id is kept so graph validation reports it.
                learning_path_id: s.learning_path_id.unwrap_or_else(|| path_id.clone()),
            })
            .collect();

        PathDefinition {
            id: path_id,
            title: self.title,
            subject: self.subject,
            grade_level: self.grade_level,
            difficulty: self.difficulty,
            skills,
        }
    }
}

/// Catalog loaded from a directory of TOML files.
///
/// Prerequisite validation is not done here: an invalid path still loads,
/// and is refused later by the graph store with a `GraphError`.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    dir: PathBuf,
    inner: InMemoryCatalog,
}

impl FileCatalog {
    /// Read every `*.toml` file in `dir`.
    ///
    /// A missing directory yields an empty catalog.
    pub async fn load(dir: &Path) -> Result<Self, CatalogError> {
        let mut files = match list_toml_files(dir).await {
            Ok(files) => files,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Catalog directory {} does not exist, starting empty", dir.display());
                Vec::new()
            }
            Err(source) => {
                return Err(CatalogError::Io {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };
        files.sort();

        let mut paths: Vec<PathDefinition> = Vec::new();
        let mut owners: HashMap<SkillId, PathId> = HashMap::new();
        let mut achievements = Vec::new();

        for file in files {
            let content = tokio::fs::read_to_string(&file)
                .await
                .map_err(|source| CatalogError::Io {
                    path: file.clone(),
                    source,
                })?;

            if file.file_name().is_some_and(|n| n == ACHIEVEMENTS_FILE) {
                let document: AchievementsDocument =
                    toml::from_str(&content).map_err(|source| CatalogError::Parse {
                        path: file.clone(),
                        source,
                    })?;
                achievements.extend(document.achievements);
                continue;
            }

            let document: PathDocument =
                toml::from_str(&content).map_err(|source| CatalogError::Parse {
                    path: file.clone(),
                    source,
                })?;
            let definition = document.into_definition();

            if paths.iter().any(|p| p.id == definition.id) {
                return Err(CatalogError::DuplicatePath(definition.id));
            }
            for skill in &definition.skills {
                if let Some(first) = owners.get(&skill.id).filter(|owner| **owner != definition.id) {
                    return Err(CatalogError::DuplicateSkill {
                        skill: skill.id.clone(),
                        first: first.clone(),
                        second: definition.id.clone(),
                    });
                }
                owners.insert(skill.id.clone(), definition.id.clone());
            }

            tracing::debug!(
                path_id = %definition.id,
                skills = definition.skills.len(),
                file = %file.display(),
                "loaded catalog path"
            );
            paths.push(definition);
        }

        tracing::info!(
            paths = paths.len(),
            achievements = achievements.len(),
            "Loaded catalog from {}",
            dir.display()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            inner: InMemoryCatalog::new(paths, achievements),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_count(&self) -> usize {
        self.inner.path_count()
    }
}

async fn list_toml_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "toml") && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

impl PathCatalog for FileCatalog {
    async fn list_paths(&self) -> Result<Vec<PathDefinition>, RepositoryError> {
        self.inner.list_paths().await
    }

    async fn get_path(&self, id: &PathId) -> Result<Option<PathDefinition>, RepositoryError> {
        self.inner.get_path(id).await
    }

    async fn locate_skill(&self, skill_id: &SkillId) -> Result<Option<PathId>, RepositoryError> {
        self.inner.locate_skill(skill_id).await
    }

    async fn achievements(&self) -> Result<Vec<AchievementDefinition>, RepositoryError> {
        self.inner.achievements().await
    }
}
