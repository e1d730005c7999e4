//! Next-skill recommendations.
//!
//! Recommendations are derived data: nothing else reads them, and a provider
//! may return anything reasonable. The built-in `FrontierRecommender` only
//! suggests skills the learner can act on right now.

use skillpath_types::learner::Recommendation;
use skillpath_types::path::PathSnapshot;
use skillpath_types::skill::{SkillSnapshot, SkillStatus};

use crate::graph::SkillGraph;

/// Pluggable source of "what next" suggestions for one path.
pub trait RecommendationProvider: Send + Sync {
    fn recommend(&self, graph: &SkillGraph, snapshot: &PathSnapshot, limit: usize) -> Vec<Recommendation>;
}

/// Ranks the unlocked, unfinished frontier of a path.
///
/// Skills already in progress come first, then skills that unlock the most
/// dependents, then easier skills. Ties keep path order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontierRecommender;

impl FrontierRecommender {
    fn score(skill: &SkillSnapshot, unlocks: usize, max_unlocks: usize) -> f32 {
        let momentum = match skill.status {
            SkillStatus::InProgress => 0.5 + 0.1 * f32::from(skill.progress_percentage) / 100.0,
            _ => 0.3,
        };
        let reach = if max_unlocks == 0 {
            0.0
        } else {
            0.2 * unlocks as f32 / max_unlocks as f32
        };
        let ease = 0.2 * f32::from(5u8.saturating_sub(skill.difficulty.clamp(1, 5))) / 4.0;
        (momentum + reach + ease).min(1.0)
    }

    fn rationale(skill: &SkillSnapshot, unlocks: usize) -> String {
        match (skill.status, unlocks) {
            (SkillStatus::InProgress, _) => {
                format!("continue where you left off ({}% done)", skill.progress_percentage)
            }
            (_, 0) => "ready to start".to_string(),
            (_, 1) => "ready to start; unlocks 1 more skill".to_string(),
            (_, n) => format!("ready to start; unlocks {n} more skills"),
        }
    }
}

impl RecommendationProvider for FrontierRecommender {
    fn recommend(&self, graph: &SkillGraph, snapshot: &PathSnapshot, limit: usize) -> Vec<Recommendation> {
        let frontier: Vec<(&SkillSnapshot, usize)> = snapshot
            .skills
            .iter()
            .filter(|s| !s.is_locked && !s.status.is_finished())
            .map(|s| (s, graph.dependents_of(&s.id).len()))
            .collect();
        let max_unlocks = frontier.iter().map(|(_, n)| *n).max().unwrap_or(0);

        let mut scored: Vec<(usize, Recommendation)> = frontier
            .into_iter()
            .enumerate()
            .map(|(order, (skill, unlocks))| {
                (
                    order,
                    Recommendation {
                        skill_id: skill.id.clone(),
                        score: Self::score(skill, unlocks, max_unlocks),
                        rationale: Self::rationale(skill, unlocks),
                    },
                )
            })
            .collect();

        scored.sort_by(|(ao, a), (bo, b)| b.score.total_cmp(&a.score).then(ao.cmp(bo)));
        scored.into_iter().take(limit).map(|(_, r)| r).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{intro_science, path, skill};
    use crate::progression::{LearnerPathState, PathAggregator, ProgressionEngine};
    use chrono::Utc;
    use skillpath_types::learner::LearnerId;
    use skillpath_types::skill::SkillId;

    fn ids(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.skill_id.as_str()).collect()
    }

    #[test]
    fn test_fresh_path_recommends_roots_only() {
        let graph = SkillGraph::load(intro_science()).unwrap();
        let state = LearnerPathState::fresh(LearnerId::new("ada"), &graph);
        let snapshot = PathAggregator::snapshot(&graph, &state);

        let recs = FrontierRecommender.recommend(&graph, &snapshot, 5);
        assert_eq!(ids(&recs), vec!["a"]);
        assert!(recs[0].rationale.contains("unlocks 2"));
    }

    #[test]
    fn test_in_progress_ranks_first_and_finished_excluded() {
        let definition = path(
            "p",
            vec![skill("p", "x", &[]), skill("p", "y", &[]), skill("p", "z", &["x"])],
        );
        let graph = SkillGraph::load(definition).unwrap();
        let engine = ProgressionEngine::new(&graph);
        let mut state = LearnerPathState::fresh(LearnerId::new("ada"), &graph);
        engine.update_progress(&mut state, &SkillId::new("y"), 40, Utc::now()).unwrap();
        PathAggregator::recompute(&graph, &mut state);

        let recs = FrontierRecommender.recommend(&graph, &PathAggregator::snapshot(&graph, &state), 5);
        assert_eq!(ids(&recs), vec!["y", "x"]);

        engine.complete_skill(&mut state, &SkillId::new("x"), Utc::now()).unwrap();
        let recs = FrontierRecommender.recommend(&graph, &PathAggregator::snapshot(&graph, &state), 5);
        assert_eq!(ids(&recs), vec!["y", "z"]);
    }

    #[test]
    fn test_limit_and_score_bounds() {
        let definition = path(
            "wide",
            (0..6).map(|i| skill("wide", &format!("s{i}"), &[])).collect(),
        );
        let graph = SkillGraph::load(definition).unwrap();
        let state = LearnerPathState::fresh(LearnerId::new("ada"), &graph);
        let recs = FrontierRecommender.recommend(&graph, &PathAggregator::snapshot(&graph, &state), 2);
        assert_eq!(ids(&recs), vec!["s0", "s1"]);
        assert!(recs.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    }
}
