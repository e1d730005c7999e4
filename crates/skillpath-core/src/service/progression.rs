//! Progression service.
//!
//! The single entry point for learner-facing operations. Every mutating call
//! runs as one logical transaction against a (learner, path) key:
//!
//! 1. take the key's async mutex
//! 2. clone the committed state into a working copy
//! 3. apply the engine transition and recompute the rollup
//! 4. take the learner's mutex, evaluate achievements against every path
//! 5. commit the batch through the `ProgressStore` (with bounded retry)
//! 6. swap the committed `Arc`, release both mutexes, publish events
//!
//! A failure at any step drops the working copy, so readers never observe a
//! partially applied transition. Reads clone the committed `Arc` and never
//! take the writer lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use skillpath_types::achievement::{Achievement, AchievementDefinition, AchievementUnlock};
use skillpath_types::config::GlobalConfig;
use skillpath_types::error::{ProgressionError, RepositoryError};
use skillpath_types::event::ProgressionEvent;
use skillpath_types::learner::{LearnerId, LearnerSummary, Recommendation};
use skillpath_types::path::{PathDefinition, PathId, PathSnapshot, PathStatus};
use skillpath_types::skill::{SkillId, SkillSnapshot};
use tokio::sync::{Mutex, OnceCell, broadcast};

use crate::achievement::{AchievementEvaluator, AchievementLedger, LearnerContext};
use crate::event::EventBus;
use crate::graph::{SkillGraph, SkillGraphStore};
use crate::progression::{LearnerPathState, PathAggregator, ProgressionEngine};
use crate::recommend::{FrontierRecommender, RecommendationProvider};
use crate::repository::catalog::PathCatalog;
use crate::repository::progress::{ProgressCommit, ProgressStore};
use crate::retry::CommitRetryPolicy;

type StateKey = (LearnerId, PathId);

/// Result of completing a skill.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub skill: SkillSnapshot,
    /// Achievements this completion unlocked for the first time.
    pub unlocked_achievements: Vec<Achievement>,
    /// Dependents that became available, in path order.
    pub unlocked_skills: Vec<SkillId>,
}

/// What a committed transaction produced.
struct Committed {
    graph: Arc<SkillGraph>,
    state: Arc<LearnerPathState>,
    unlocked_achievements: Vec<Achievement>,
    unlocked_skills: Vec<SkillId>,
}

pub struct ProgressionService<C, S, R = FrontierRecommender>
where
    C: PathCatalog,
    S: ProgressStore,
    R: RecommendationProvider,
{
    graphs: SkillGraphStore<C>,
    store: S,
    recommender: R,
    events: EventBus,
    retry: CommitRetryPolicy,
    default_recommendation_limit: usize,
    /// Committed state per (learner, path). Values are never mutated in place.
    states: DashMap<StateKey, Arc<LearnerPathState>>,
    /// Paths each hydrated learner has progress on.
    learner_paths: DashMap<LearnerId, BTreeSet<PathId>>,
    ledgers: DashMap<LearnerId, AchievementLedger>,
    locks: DashMap<StateKey, Arc<Mutex<()>>>,
    /// Serializes achievement evaluation and commit across a learner's paths.
    /// Always taken after the path lock.
    learner_locks: DashMap<LearnerId, Arc<Mutex<()>>>,
    achievements: OnceCell<Arc<Vec<AchievementDefinition>>>,
}

impl<C: PathCatalog, S: ProgressStore> ProgressionService<C, S, FrontierRecommender> {
    pub fn new(catalog: C, store: S) -> Self {
        Self::with_recommender(catalog, store, FrontierRecommender)
    }
}

impl<C, S, R> ProgressionService<C, S, R>
where
    C: PathCatalog,
    S: ProgressStore,
    R: RecommendationProvider,
{
    pub fn with_recommender(catalog: C, store: S, recommender: R) -> Self {
        let defaults = GlobalConfig::default();
        Self {
            graphs: SkillGraphStore::new(catalog),
            store,
            recommender,
            events: EventBus::new(defaults.event_bus_capacity),
            retry: CommitRetryPolicy::from(&defaults.commit_retry),
            default_recommendation_limit: defaults.default_recommendation_limit,
            states: DashMap::new(),
            learner_paths: DashMap::new(),
            ledgers: DashMap::new(),
            locks: DashMap::new(),
            learner_locks: DashMap::new(),
            achievements: OnceCell::new(),
        }
    }

    /// Apply retry, event bus and recommendation settings from config.
    pub fn with_config(mut self, config: &GlobalConfig) -> Self {
        self.retry = CommitRetryPolicy::from(&config.commit_retry);
        self.events = EventBus::new(config.event_bus_capacity);
        self.default_recommendation_limit = config.default_recommendation_limit;
        self
    }

    pub fn with_retry_policy(mut self, retry: CommitRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Receive events from every transaction committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressionEvent> {
        self.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Catalog reads
    // -----------------------------------------------------------------------

    /// All path definitions in the catalog.
    pub async fn list_paths(&self) -> Result<Vec<PathDefinition>, ProgressionError> {
        self.graphs
            .catalog()
            .list_paths()
            .await
            .map_err(persistence)
    }

    /// A learner-less view of a path: every skill not started, roots unlocked.
    ///
    /// Fails with `Graph` if the path's prerequisites are invalid.
    pub async fn load_path(&self, path_id: &PathId) -> Result<PathSnapshot, ProgressionError> {
        let graph = self.graphs.load(path_id).await?;
        let mut state = LearnerPathState::fresh(LearnerId::new("anonymous"), &graph);
        PathAggregator::recompute(&graph, &mut state);
        Ok(PathAggregator::snapshot(&graph, &state))
    }

    // -----------------------------------------------------------------------
    // Learner reads
    // -----------------------------------------------------------------------

    /// A learner's view of a path, taken from one committed version.
    #[tracing::instrument(skip(self), fields(learner_id = %learner_id, path_id = %path_id))]
    pub async fn get_path_snapshot(
        &self,
        learner_id: &LearnerId,
        path_id: &PathId,
    ) -> Result<PathSnapshot, ProgressionError> {
        validate_learner(learner_id)?;
        let graph = self.graphs.load(path_id).await?;
        self.ensure_learner(learner_id).await?;
        let state = self.committed_state(learner_id, &graph).await?;
        Ok(PathAggregator::snapshot(&graph, &state))
    }

    /// Every defined achievement with the learner's unlock state.
    pub async fn list_achievements(&self, learner_id: &LearnerId) -> Result<Vec<Achievement>, ProgressionError> {
        validate_learner(learner_id)?;
        let definitions = self.achievement_definitions().await?;
        self.ensure_learner(learner_id).await?;
        Ok(self.ledger_snapshot(learner_id).achievements(&definitions))
    }

    /// Learner-wide totals across every path with progress.
    pub async fn learner_summary(&self, learner_id: &LearnerId) -> Result<LearnerSummary, ProgressionError> {
        validate_learner(learner_id)?;
        self.ensure_learner(learner_id).await?;
        let context = self.learner_context(learner_id, None);
        let unlocked = self.ledger_snapshot(learner_id).len() as u32;
        Ok(context.summary(unlocked))
    }

    /// Suggested next skills on a path.
    ///
    /// Whatever the provider returns, only unlocked, unfinished skills of the
    /// path survive.
    pub async fn recommend(
        &self,
        learner_id: &LearnerId,
        path_id: &PathId,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>, ProgressionError> {
        let snapshot = self.get_path_snapshot(learner_id, path_id).await?;
        let graph = self.graphs.load(path_id).await?;
        let limit = limit.unwrap_or(self.default_recommendation_limit);

        Ok(self
            .recommender
            .recommend(&graph, &snapshot, limit)
            .into_iter()
            .filter(|r| {
                snapshot
                    .skill(&r.skill_id)
                    .is_some_and(|s| !s.is_locked && !s.status.is_finished())
            })
            .take(limit)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    #[tracing::instrument(skip(self), fields(learner_id = %learner_id, skill_id = %skill_id))]
    pub async fn start_skill(
        &self,
        learner_id: &LearnerId,
        skill_id: &SkillId,
    ) -> Result<SkillSnapshot, ProgressionError> {
        let committed = self
            .transact(learner_id, skill_id, |engine, state, now| {
                engine.start_skill(state, skill_id, now)
            })
            .await?;
        skill_snapshot(&committed, skill_id)
    }

    /// Report progress (0-100) on a skill. 100 completes it.
    #[tracing::instrument(skip(self), fields(learner_id = %learner_id, skill_id = %skill_id))]
    pub async fn update_skill_progress(
        &self,
        learner_id: &LearnerId,
        skill_id: &SkillId,
        percent: i32,
    ) -> Result<SkillSnapshot, ProgressionError> {
        let committed = self
            .transact(learner_id, skill_id, |engine, state, now| {
                engine.update_progress(state, skill_id, percent, now)
            })
            .await?;
        skill_snapshot(&committed, skill_id)
    }

    #[tracing::instrument(skip(self), fields(learner_id = %learner_id, skill_id = %skill_id))]
    pub async fn complete_skill(
        &self,
        learner_id: &LearnerId,
        skill_id: &SkillId,
    ) -> Result<CompletionOutcome, ProgressionError> {
        let committed = self
            .transact(learner_id, skill_id, |engine, state, now| {
                engine.complete_skill(state, skill_id, now)
            })
            .await?;
        let skill = skill_snapshot(&committed, skill_id)?;
        Ok(CompletionOutcome {
            skill,
            unlocked_achievements: committed.unlocked_achievements,
            unlocked_skills: committed.unlocked_skills,
        })
    }

    /// Apply an external mastery signal to a completed skill.
    #[tracing::instrument(skip(self), fields(learner_id = %learner_id, skill_id = %skill_id))]
    pub async fn promote_mastery(
        &self,
        learner_id: &LearnerId,
        skill_id: &SkillId,
    ) -> Result<SkillSnapshot, ProgressionError> {
        let committed = self
            .transact(learner_id, skill_id, |engine, state, now| {
                engine.promote_mastery(state, skill_id, now)
            })
            .await?;
        skill_snapshot(&committed, skill_id)
    }

    /// Run one transition as a transaction on the skill's (learner, path) key.
    async fn transact<F>(
        &self,
        learner_id: &LearnerId,
        skill_id: &SkillId,
        transition: F,
    ) -> Result<Committed, ProgressionError>
    where
        F: FnOnce(
                &ProgressionEngine<'_>,
                &mut LearnerPathState,
                DateTime<Utc>,
            ) -> Result<Vec<ProgressionEvent>, ProgressionError>
            + Send,
    {
        validate_learner(learner_id)?;
        let graph = self.graphs.graph_for_skill(skill_id).await?;
        let definitions = self.achievement_definitions().await?;
        self.ensure_learner(learner_id).await?;

        let key = (learner_id.clone(), graph.path_id().clone());
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let committed = self.committed_state(learner_id, &graph).await?;
        let mut working = LearnerPathState::clone(&committed);
        working.mark_clean();
        let now = Utc::now();

        let engine = ProgressionEngine::new(&graph);
        let mut events = transition(&engine, &mut working, now)?;

        let previous_status = PathAggregator::recompute(&graph, &mut working);
        if previous_status != PathStatus::Completed && working.rollup.status == PathStatus::Completed {
            events.push(ProgressionEvent::PathCompleted {
                learner_id: learner_id.clone(),
                path_id: working.path_id.clone(),
            });
        }

        // Held through the swap: rules see the latest commit of every other path.
        let learner_lock = self
            .learner_locks
            .entry(learner_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _learner_guard = learner_lock.lock().await;

        let context = self.learner_context(learner_id, Some(&working));
        let mut ledger = self.ledger_snapshot(learner_id);
        let candidates = AchievementEvaluator::evaluate(&definitions, &mut ledger, &context, now);

        let commit = ProgressCommit {
            learner_id: learner_id.clone(),
            path_id: working.path_id.clone(),
            expected_version: committed.version,
            rollup: working.rollup.clone(),
            skills: working.dirty_skills(),
            unlocks: candidates
                .iter()
                .map(|a| AchievementUnlock {
                    achievement_id: a.id.clone(),
                    unlocked_at: now,
                })
                .collect(),
        };

        let receipt = match self.retry.run(|| self.store.commit(&commit)).await {
            Ok(receipt) => receipt,
            Err(err) => {
                if matches!(err, RepositoryError::Conflict(_)) {
                    // Someone else wrote this key; rehydrate on next access.
                    self.states.remove(&key);
                }
                tracing::error!(error = %err, "commit failed, transition discarded");
                return Err(persistence(err));
            }
        };

        working.version = receipt.version;
        working.mark_clean();
        let state = Arc::new(working);
        self.states.insert(key.clone(), Arc::clone(&state));
        self.learner_paths
            .entry(learner_id.clone())
            .or_default()
            .insert(key.1.clone());

        let unlocked_achievements: Vec<Achievement> = candidates
            .into_iter()
            .filter(|a| receipt.inserted_unlocks.contains(&a.id))
            .collect();
        self.apply_unlocks(learner_id, &unlocked_achievements, commit.unlocks.len())
            .await;

        for achievement in &unlocked_achievements {
            events.push(ProgressionEvent::AchievementUnlocked {
                learner_id: learner_id.clone(),
                achievement_id: achievement.id.clone(),
                at: now,
            });
        }

        let unlocked_skills: Vec<SkillId> = events
            .iter()
            .filter_map(|e| match e {
                ProgressionEvent::SkillUnlocked { skill_id, .. } => Some(skill_id.clone()),
                _ => None,
            })
            .collect();

        tracing::info!(
            version = state.version,
            path_progress = state.rollup.progress_percentage,
            events = events.len(),
            achievements = unlocked_achievements.len(),
            "transition committed"
        );
        self.events.publish_all(events);

        Ok(Committed {
            graph,
            state,
            unlocked_achievements,
            unlocked_skills,
        })
    }

    // -----------------------------------------------------------------------
    // Hydration and caches
    // -----------------------------------------------------------------------

    async fn achievement_definitions(&self) -> Result<Arc<Vec<AchievementDefinition>>, ProgressionError> {
        self.achievements
            .get_or_try_init(|| async {
                let definitions = self
                    .graphs
                    .catalog()
                    .achievements()
                    .await
                    .map_err(persistence)?;
                Ok::<_, ProgressionError>(Arc::new(definitions))
            })
            .await
            .cloned()
    }

    /// Load every path and unlock a learner has, once per learner.
    ///
    /// Achievement rules span paths, so evaluation needs the whole learner.
    async fn ensure_learner(&self, learner_id: &LearnerId) -> Result<(), ProgressionError> {
        if self.learner_paths.contains_key(learner_id) {
            return Ok(());
        }

        let path_ids = self
            .store
            .list_learner_paths(learner_id)
            .await
            .map_err(persistence)?;
        let unlocks = self.store.load_unlocks(learner_id).await.map_err(persistence)?;

        let mut loaded = BTreeSet::new();
        for path_id in path_ids {
            let graph = match self.graphs.load(&path_id).await {
                Ok(graph) => graph,
                Err(ProgressionError::NotFound(_)) | Err(ProgressionError::Graph(_)) => {
                    tracing::warn!(learner_id = %learner_id, path_id = %path_id, "skipping progress on unavailable path");
                    continue;
                }
                Err(err) => return Err(err),
            };
            self.committed_state(learner_id, &graph).await?;
            loaded.insert(path_id);
        }

        tracing::debug!(
            learner_id = %learner_id,
            paths = loaded.len(),
            unlocks = unlocks.len(),
            "hydrated learner"
        );

        self.ledgers
            .entry(learner_id.clone())
            .or_insert_with(|| AchievementLedger::from_unlocks(unlocks));
        self.learner_paths
            .entry(learner_id.clone())
            .or_default()
            .extend(loaded);
        Ok(())
    }

    /// The committed state for a (learner, path), loading it on first use.
    async fn committed_state(
        &self,
        learner_id: &LearnerId,
        graph: &SkillGraph,
    ) -> Result<Arc<LearnerPathState>, ProgressionError> {
        let key = (learner_id.clone(), graph.path_id().clone());
        if let Some(state) = self.states.get(&key) {
            return Ok(Arc::clone(state.value()));
        }

        let stored = self
            .store
            .load_path_progress(learner_id, graph.path_id())
            .await
            .map_err(persistence)?;
        let mut state = match stored {
            Some(stored) => LearnerPathState::from_stored(learner_id.clone(), graph, stored),
            None => LearnerPathState::fresh(learner_id.clone(), graph),
        };
        PathAggregator::recompute(graph, &mut state);

        // A concurrent writer may have committed a newer state meanwhile.
        let state = self.states.entry(key).or_insert(Arc::new(state)).clone();
        Ok(state)
    }

    /// Learner-wide totals, with `working` standing in for its path.
    fn learner_context(&self, learner_id: &LearnerId, working: Option<&LearnerPathState>) -> LearnerContext {
        let path_ids: Vec<PathId> = self
            .learner_paths
            .get(learner_id)
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default();

        let mut states: Vec<Arc<LearnerPathState>> = path_ids
            .into_iter()
            .filter(|p| working.is_none_or(|w| &w.path_id != p))
            .filter_map(|p| {
                self.states
                    .get(&(learner_id.clone(), p))
                    .map(|s| Arc::clone(s.value()))
            })
            .collect();
        if let Some(working) = working {
            states.push(Arc::new(working.clone()));
        }

        LearnerContext::from_states(learner_id.clone(), states.iter().map(Arc::as_ref))
    }

    fn ledger_snapshot(&self, learner_id: &LearnerId) -> AchievementLedger {
        self.ledgers
            .get(learner_id)
            .map(|l| l.value().clone())
            .unwrap_or_default()
    }

    /// Fold committed unlocks into the cached ledger.
    ///
    /// When the store refused some of the attempted unlocks, another commit
    /// for the same learner recorded them first; reload so the cache carries
    /// the stored timestamps.
    async fn apply_unlocks(&self, learner_id: &LearnerId, inserted: &[Achievement], attempted: usize) {
        if inserted.len() < attempted {
            match self.store.load_unlocks(learner_id).await {
                Ok(unlocks) => {
                    self.ledgers
                        .insert(learner_id.clone(), AchievementLedger::from_unlocks(unlocks));
                    return;
                }
                Err(err) => {
                    tracing::warn!(learner_id = %learner_id, error = %err, "failed to reload achievement ledger");
                }
            }
        }

        let mut ledger = self.ledgers.entry(learner_id.clone()).or_default();
        for achievement in inserted {
            if let Some(at) = achievement.unlocked_at {
                ledger.record(achievement.id.clone(), at);
            }
        }
    }
}

fn validate_learner(learner_id: &LearnerId) -> Result<(), ProgressionError> {
    if learner_id.as_str().trim().is_empty() {
        return Err(ProgressionError::Validation("learner id must not be empty".to_string()));
    }
    Ok(())
}

fn persistence(err: RepositoryError) -> ProgressionError {
    ProgressionError::Persistence(err.to_string())
}

fn skill_snapshot(committed: &Committed, skill_id: &SkillId) -> Result<SkillSnapshot, ProgressionError> {
    PathAggregator::skill_snapshot(&committed.graph, &committed.state, skill_id)
        .ok_or_else(|| ProgressionError::NotFound(format!("skill '{skill_id}'")))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::graph::tests::{intro_science, path, skill};
    use crate::repository::catalog::InMemoryCatalog;
    use crate::repository::progress::{
        CommitReceipt, InMemoryProgressStore, StoredPathProgress,
    };
    use skillpath_types::achievement::{AchievementId, AchievementRule};
    use skillpath_types::skill::SkillStatus;

    fn achievement(id: &str, rule: AchievementRule) -> AchievementDefinition {
        AchievementDefinition {
            id: AchievementId::new(id),
            name: id.replace('-', " "),
            description: String::new(),
            rule,
        }
    }

    fn catalog() -> InMemoryCatalog {
        let algebra = path(
            "algebra",
            vec![skill("algebra", "x", &[]), skill("algebra", "y", &["x"])],
        );
        let broken = path(
            "broken",
            vec![skill("broken", "p", &["q"]), skill("broken", "q", &["p"])],
        );
        InMemoryCatalog::new(
            vec![intro_science(), algebra, broken],
            vec![
                achievement("first-steps", AchievementRule::SkillsCompleted { count: 1 }),
                achievement(
                    "science-graduate",
                    AchievementRule::PathCompleted { path_id: PathId::new("intro-science") },
                ),
                achievement("forty-points", AchievementRule::TotalPoints { points: 40 }),
            ],
        )
    }

    fn service() -> ProgressionService<InMemoryCatalog, InMemoryProgressStore> {
        ProgressionService::new(catalog(), InMemoryProgressStore::new())
    }

    fn learner() -> LearnerId {
        LearnerId::new("ada")
    }

    fn id(s: &str) -> SkillId {
        SkillId::new(s)
    }

    fn science() -> PathId {
        PathId::new("intro-science")
    }

    /// Fails the first `failures` commits with the given error, then delegates.
    struct FlakyStore {
        inner: InMemoryProgressStore,
        failures: AtomicU32,
        conflict: bool,
    }

    impl FlakyStore {
        fn new(failures: u32, conflict: bool) -> Self {
            Self {
                inner: InMemoryProgressStore::new(),
                failures: AtomicU32::new(failures),
                conflict,
            }
        }
    }

    impl ProgressStore for FlakyStore {
        async fn load_path_progress(
            &self,
            learner_id: &LearnerId,
            path_id: &PathId,
        ) -> Result<Option<StoredPathProgress>, RepositoryError> {
            self.inner.load_path_progress(learner_id, path_id).await
        }

        async fn list_learner_paths(&self, learner_id: &LearnerId) -> Result<Vec<PathId>, RepositoryError> {
            self.inner.list_learner_paths(learner_id).await
        }

        async fn load_unlocks(&self, learner_id: &LearnerId) -> Result<Vec<AchievementUnlock>, RepositoryError> {
            self.inner.load_unlocks(learner_id).await
        }

        async fn commit(&self, commit: &ProgressCommit) -> Result<CommitReceipt, RepositoryError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(if self.conflict {
                    RepositoryError::Conflict("version mismatch".into())
                } else {
                    RepositoryError::Connection
                });
            }
            self.inner.commit(commit).await
        }
    }

    #[tokio::test]
    async fn test_intro_science_scenario() {
        let service = service();
        let ada = learner();

        let err = service.start_skill(&ada, &id("b")).await.unwrap_err();
        assert!(matches!(err, ProgressionError::SkillLocked { .. }));

        let a = service.start_skill(&ada, &id("a")).await.unwrap();
        assert_eq!(a.status, SkillStatus::InProgress);

        let outcome = service.complete_skill(&ada, &id("a")).await.unwrap();
        assert_eq!(outcome.skill.points_earned, 10);
        assert_eq!(outcome.unlocked_skills, vec![id("b")]);
        let unlocked: Vec<&str> = outcome
            .unlocked_achievements
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(unlocked, vec!["first-steps"]);

        let snapshot = service.get_path_snapshot(&ada, &science()).await.unwrap();
        assert_eq!(snapshot.progress_percentage, 33);
        assert!(!snapshot.skill(&id("b")).unwrap().is_locked);
        assert!(snapshot.skill(&id("c")).unwrap().is_locked);

        let err = service.update_skill_progress(&ada, &id("b"), 150).await.unwrap_err();
        assert!(matches!(err, ProgressionError::Validation(_)));
        let b = service.get_path_snapshot(&ada, &science()).await.unwrap();
        assert_eq!(b.skill(&id("b")).unwrap().status, SkillStatus::NotStarted);

        service.complete_skill(&ada, &id("b")).await.unwrap();
        let snapshot = service.get_path_snapshot(&ada, &science()).await.unwrap();
        assert_eq!(snapshot.progress_percentage, 67);
        assert!(!snapshot.skill(&id("c")).unwrap().is_locked);

        let outcome = service.complete_skill(&ada, &id("c")).await.unwrap();
        let unlocked: Vec<&str> = outcome
            .unlocked_achievements
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert!(unlocked.contains(&"science-graduate"));

        let snapshot = service.get_path_snapshot(&ada, &science()).await.unwrap();
        assert_eq!(snapshot.progress_percentage, 100);
        assert_eq!(snapshot.status, PathStatus::Completed);
        assert_eq!(snapshot.completed_skills, 3);
        assert_eq!(snapshot.points_earned(), 30);
    }

    #[tokio::test]
    async fn test_complete_twice_terminal_and_no_duplicate_achievements() {
        let service = service();
        let ada = learner();
        service.complete_skill(&ada, &id("a")).await.unwrap();
        let before = service.get_path_snapshot(&ada, &science()).await.unwrap();

        let err = service.complete_skill(&ada, &id("a")).await.unwrap_err();
        assert!(matches!(err, ProgressionError::TerminalState { .. }));

        let after = service.get_path_snapshot(&ada, &science()).await.unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(after.progress_percentage, before.progress_percentage);

        let unlocked: Vec<Achievement> = service
            .list_achievements(&ada)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.is_unlocked)
            .collect();
        assert_eq!(unlocked.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_invariants_hold_after_each_step() {
        let service = service();
        let ada = learner();
        for skill in ["a", "b", "c"] {
            service.update_skill_progress(&ada, &id(skill), 40).await.unwrap();
            service.complete_skill(&ada, &id(skill)).await.unwrap();

            let snapshot = service.get_path_snapshot(&ada, &science()).await.unwrap();
            let finished = snapshot.skills.iter().filter(|s| s.status.is_finished()).count() as u32;
            assert_eq!(snapshot.completed_skills, finished);
            assert_eq!(
                snapshot.status == PathStatus::Completed,
                snapshot.progress_percentage == 100
            );
            for s in &snapshot.skills {
                let locked = s
                    .prerequisites
                    .iter()
                    .any(|p| !snapshot.skill(p).unwrap().status.is_finished());
                assert_eq!(s.is_locked, locked);
                assert!(s.points_earned <= s.points);
            }
        }
    }

    #[tokio::test]
    async fn test_achievements_never_relock() {
        let service = service();
        let ada = learner();
        service.complete_skill(&ada, &id("a")).await.unwrap();
        let first = service.list_achievements(&ada).await.unwrap();
        let first_steps = first.iter().find(|a| a.id.as_str() == "first-steps").unwrap();
        assert!(first_steps.is_unlocked);

        service.complete_skill(&ada, &id("x")).await.unwrap();
        let second = service.list_achievements(&ada).await.unwrap();
        let again = second.iter().find(|a| a.id.as_str() == "first-steps").unwrap();
        assert!(again.is_unlocked);
        assert_eq!(again.unlocked_at, first_steps.unlocked_at);
    }

    #[tokio::test]
    async fn test_points_across_paths_unlock_total_points_rule() {
        let service = service();
        let ada = learner();
        service.complete_skill(&ada, &id("a")).await.unwrap();
        service.complete_skill(&ada, &id("b")).await.unwrap();
        service.complete_skill(&ada, &id("x")).await.unwrap();
        let outcome = service.complete_skill(&ada, &id("y")).await.unwrap();
        assert!(outcome
            .unlocked_achievements
            .iter()
            .any(|a| a.id.as_str() == "forty-points"));

        let summary = service.learner_summary(&ada).await.unwrap();
        assert_eq!(summary.total_points, 40);
        assert_eq!(summary.completed_skills, 4);
        assert_eq!(summary.completed_paths, vec![PathId::new("algebra")]);
        assert_eq!(summary.unlocked_achievements, 2);
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back() {
        let service = ProgressionService::new(catalog(), FlakyStore::new(10, false))
            .with_retry_policy(CommitRetryPolicy::immediate(3));
        let ada = learner();
        let mut events = service.subscribe();

        let err = service.complete_skill(&ada, &id("a")).await.unwrap_err();
        assert!(matches!(err, ProgressionError::Persistence(_)));

        let snapshot = service.get_path_snapshot(&ada, &science()).await.unwrap();
        assert_eq!(snapshot.skill(&id("a")).unwrap().status, SkillStatus::NotStarted);
        assert_eq!(snapshot.progress_percentage, 0);
        assert!(snapshot.skill(&id("b")).unwrap().is_locked);
        assert!(service.list_achievements(&ada).await.unwrap().iter().all(|a| !a.is_unlocked));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_transient_commit_failure_is_retried() {
        let service = ProgressionService::new(catalog(), FlakyStore::new(2, false))
            .with_retry_policy(CommitRetryPolicy::immediate(3));
        let outcome = service.complete_skill(&learner(), &id("a")).await.unwrap();
        assert_eq!(outcome.skill.status, SkillStatus::Completed);
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let service = ProgressionService::new(catalog(), FlakyStore::new(1, true))
            .with_retry_policy(CommitRetryPolicy::immediate(3));
        let err = service.start_skill(&learner(), &id("a")).await.unwrap_err();
        assert!(matches!(err, ProgressionError::Persistence(_)));

        // The next attempt rehydrates and succeeds.
        service.start_skill(&learner(), &id("a")).await.unwrap();
    }

    #[tokio::test]
    async fn test_events_published_after_commit() {
        let service = service();
        let mut events = service.subscribe();
        service.complete_skill(&learner(), &id("a")).await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(match event {
                ProgressionEvent::SkillStarted { .. } => "started",
                ProgressionEvent::SkillCompleted { .. } => "completed",
                ProgressionEvent::SkillUnlocked { .. } => "unlocked",
                ProgressionEvent::AchievementUnlocked { .. } => "achievement",
                _ => "other",
            });
        }
        assert_eq!(kinds, vec!["started", "completed", "unlocked", "achievement"]);
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let store = Arc::new(InMemoryProgressStore::new());
        let ada = learner();
        {
            let first = ProgressionService::new(catalog(), SharedStore(Arc::clone(&store)));
            first.complete_skill(&ada, &id("a")).await.unwrap();
            first.update_skill_progress(&ada, &id("b"), 50).await.unwrap();
        }

        let second = ProgressionService::new(catalog(), SharedStore(store));
        let snapshot = second.get_path_snapshot(&ada, &science()).await.unwrap();
        assert_eq!(snapshot.skill(&id("a")).unwrap().status, SkillStatus::Completed);
        assert_eq!(snapshot.skill(&id("b")).unwrap().progress_percentage, 50);
        assert_eq!(snapshot.skill(&id("b")).unwrap().points_earned, 5);
        assert_eq!(snapshot.version, 2);

        // Unlocks were hydrated, so first-steps does not fire again.
        let outcome = second.complete_skill(&ada, &id("b")).await.unwrap();
        assert!(outcome.unlocked_achievements.is_empty());
    }

    struct SharedStore(Arc<InMemoryProgressStore>);

    impl ProgressStore for SharedStore {
        async fn load_path_progress(
            &self,
            learner_id: &LearnerId,
            path_id: &PathId,
        ) -> Result<Option<StoredPathProgress>, RepositoryError> {
            self.0.load_path_progress(learner_id, path_id).await
        }

        async fn list_learner_paths(&self, learner_id: &LearnerId) -> Result<Vec<PathId>, RepositoryError> {
            self.0.list_learner_paths(learner_id).await
        }

        async fn load_unlocks(&self, learner_id: &LearnerId) -> Result<Vec<AchievementUnlock>, RepositoryError> {
            self.0.load_unlocks(learner_id).await
        }

        async fn commit(&self, commit: &ProgressCommit) -> Result<CommitReceipt, RepositoryError> {
            self.0.commit(commit).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_updates_serialize_per_key() {
        let service = Arc::new(service());
        let ada = learner();
        service.start_skill(&ada, &id("a")).await.unwrap();

        let mut handles = Vec::new();
        for percent in [10, 20, 30, 40, 50, 60, 70, 80] {
            let service = Arc::clone(&service);
            let ada = ada.clone();
            handles.push(tokio::spawn(async move {
                service.update_skill_progress(&ada, &id("a"), percent).await
            }));
        }
        for result in futures_util::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        let snapshot = service.get_path_snapshot(&ada, &science()).await.unwrap();
        // One start plus eight serialized updates, none lost.
        assert_eq!(snapshot.version, 9);
        assert_eq!(snapshot.skill(&id("a")).unwrap().points_earned, 8);
    }

    #[tokio::test]
    async fn test_concurrent_paths_unlock_learner_achievement_once() {
        let service = Arc::new(service());
        let ada = learner();

        let s1 = Arc::clone(&service);
        let a1 = ada.clone();
        let science = tokio::spawn(async move { s1.complete_skill(&a1, &id("a")).await });
        let s2 = Arc::clone(&service);
        let a2 = ada.clone();
        let algebra = tokio::spawn(async move { s2.complete_skill(&a2, &id("x")).await });

        let first = science.await.unwrap().unwrap();
        let second = algebra.await.unwrap().unwrap();
        let fired = first
            .unlocked_achievements
            .iter()
            .chain(second.unlocked_achievements.iter())
            .filter(|a| a.id.as_str() == "first-steps")
            .count();
        assert_eq!(fired, 1);

        let unlocked = service
            .list_achievements(&ada)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.is_unlocked)
            .count();
        assert_eq!(unlocked, 1);
    }

    /// Delays every commit so concurrent transactions overlap.
    struct SlowStore(InMemoryProgressStore);

    impl ProgressStore for SlowStore {
        async fn load_path_progress(
            &self,
            learner_id: &LearnerId,
            path_id: &PathId,
        ) -> Result<Option<StoredPathProgress>, RepositoryError> {
            self.0.load_path_progress(learner_id, path_id).await
        }

        async fn list_learner_paths(&self, learner_id: &LearnerId) -> Result<Vec<PathId>, RepositoryError> {
            self.0.list_learner_paths(learner_id).await
        }

        async fn load_unlocks(&self, learner_id: &LearnerId) -> Result<Vec<AchievementUnlock>, RepositoryError> {
            self.0.load_unlocks(learner_id).await
        }

        async fn commit(&self, commit: &ProgressCommit) -> Result<CommitReceipt, RepositoryError> {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            self.0.commit(commit).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_threshold_crossed_by_parallel_paths_unlocks() {
        let algebra = path("algebra", vec![skill("algebra", "x", &[])]);
        let catalog = InMemoryCatalog::new(
            vec![intro_science(), algebra],
            vec![achievement("twenty-points", AchievementRule::TotalPoints { points: 20 })],
        );
        let service = Arc::new(ProgressionService::new(catalog, SlowStore(InMemoryProgressStore::new())));
        let ada = learner();

        let s1 = Arc::clone(&service);
        let a1 = ada.clone();
        let science = tokio::spawn(async move { s1.complete_skill(&a1, &id("a")).await });
        let s2 = Arc::clone(&service);
        let a2 = ada.clone();
        let algebra = tokio::spawn(async move { s2.complete_skill(&a2, &id("x")).await });

        let first = science.await.unwrap().unwrap();
        let second = algebra.await.unwrap().unwrap();
        let fired = first
            .unlocked_achievements
            .iter()
            .chain(second.unlocked_achievements.iter())
            .filter(|a| a.id.as_str() == "twenty-points")
            .count();
        assert_eq!(fired, 1);

        let summary = service.learner_summary(&ada).await.unwrap();
        assert_eq!(summary.total_points, 20);
        let achievements = service.list_achievements(&ada).await.unwrap();
        assert!(achievements[0].is_unlocked);
        assert_eq!(service.store().0.load_unlocks(&ada).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_promote_mastery() {
        let service = service();
        let ada = learner();
        let err = service.promote_mastery(&ada, &id("a")).await.unwrap_err();
        assert!(matches!(err, ProgressionError::InvalidTransition { .. }));

        service.complete_skill(&ada, &id("a")).await.unwrap();
        let mastered = service.promote_mastery(&ada, &id("a")).await.unwrap();
        assert_eq!(mastered.status, SkillStatus::Mastered);
        assert_eq!(service.learner_summary(&ada).await.unwrap().mastered_skills, 1);
    }

    #[tokio::test]
    async fn test_invalid_path_never_served() {
        let service = service();
        let err = service.load_path(&PathId::new("broken")).await.unwrap_err();
        assert!(matches!(err, ProgressionError::Graph(_)));
        let err = service.start_skill(&learner(), &id("p")).await.unwrap_err();
        assert!(matches!(err, ProgressionError::Graph(_)));
    }

    #[tokio::test]
    async fn test_load_path_and_list() {
        let service = service();
        let snapshot = service.load_path(&science()).await.unwrap();
        assert_eq!(snapshot.total_skills, 3);
        assert_eq!(snapshot.version, 0);
        assert!(!snapshot.skill(&id("a")).unwrap().is_locked);

        let err = service.load_path(&PathId::new("nope")).await.unwrap_err();
        assert!(matches!(err, ProgressionError::NotFound(_)));
        assert_eq!(service.list_paths().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_recommend_frontier() {
        let service = service();
        let ada = learner();
        let recs = service.recommend(&ada, &science(), None).await.unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].skill_id, id("a"));

        service.complete_skill(&ada, &id("a")).await.unwrap();
        let recs = service.recommend(&ada, &science(), Some(5)).await.unwrap();
        assert_eq!(recs.iter().map(|r| r.skill_id.as_str()).collect::<Vec<_>>(), vec!["b"]);
    }

    struct WildRecommender;

    impl RecommendationProvider for WildRecommender {
        fn recommend(&self, _graph: &SkillGraph, _snapshot: &PathSnapshot, _limit: usize) -> Vec<Recommendation> {
            ["c", "zz", "a"]
                .into_iter()
                .map(|s| Recommendation {
                    skill_id: SkillId::new(s),
                    score: 1.0,
                    rationale: String::new(),
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn test_recommend_filters_unactionable_suggestions() {
        let service = ProgressionService::with_recommender(catalog(), InMemoryProgressStore::new(), WildRecommender);
        let recs = service.recommend(&learner(), &science(), None).await.unwrap();
        assert_eq!(recs.iter().map(|r| r.skill_id.as_str()).collect::<Vec<_>>(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_completion_outcome_serializes() {
        let service = service();
        let outcome = service.complete_skill(&learner(), &id("a")).await.unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["skill"]["status"], "completed");
        assert_eq!(json["unlocked_skills"][0], "b");
        assert_eq!(json["unlocked_achievements"][0]["id"], "first-steps");
    }

    #[tokio::test]
    async fn test_empty_learner_rejected() {
        let service = service();
        let err = service.start_skill(&LearnerId::new("  "), &id("a")).await.unwrap_err();
        assert!(matches!(err, ProgressionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_skill_not_found() {
        let service = service();
        let err = service.complete_skill(&learner(), &id("nope")).await.unwrap_err();
        assert!(matches!(err, ProgressionError::NotFound(_)));
    }
}
