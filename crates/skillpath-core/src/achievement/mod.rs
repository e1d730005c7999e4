//! Achievement rule evaluation and per-learner unlock ledgers.

pub mod evaluator;
pub mod ledger;

pub use evaluator::{AchievementEvaluator, LearnerContext};
pub use ledger::AchievementLedger;
