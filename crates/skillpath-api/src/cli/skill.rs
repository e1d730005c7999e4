//! Skill CLI commands: start, progress, complete, master.

use anyhow::Result;
use console::style;

use skillpath_core::service::CompletionOutcome;
use skillpath_types::learner::LearnerId;
use skillpath_types::skill::{SkillId, SkillSnapshot};

use super::path::progress_bar;
use crate::state::AppState;

/// Start a skill.
pub async fn start_skill(state: &AppState, learner_id: &LearnerId, skill_id: &str, json: bool) -> Result<()> {
    let skill_id = parse_skill_id(skill_id)?;
    let skill = state.progression.start_skill(learner_id, &skill_id).await?;
    print_skill(&skill, "Started", json)
}

/// Report progress on a skill.
pub async fn update_progress(
    state: &AppState,
    learner_id: &LearnerId,
    skill_id: &str,
    percent: i32,
    json: bool,
) -> Result<()> {
    let skill_id = parse_skill_id(skill_id)?;
    let skill = state
        .progression
        .update_skill_progress(learner_id, &skill_id, percent)
        .await?;
    print_skill(&skill, "Progress saved for", json)
}

/// Complete a skill and report anything it unlocked.
pub async fn complete_skill(
    state: &AppState,
    learner_id: &LearnerId,
    skill_id: &str,
    json: bool,
) -> Result<()> {
    let skill_id = parse_skill_id(skill_id)?;
    let outcome = state
        .progression
        .complete_skill(learner_id, &skill_id)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_skill(&outcome.skill, "Completed", false)?;
    print_unlocks(&outcome);
    Ok(())
}

/// Promote a completed skill to mastered.
pub async fn promote_mastery(
    state: &AppState,
    learner_id: &LearnerId,
    skill_id: &str,
    json: bool,
) -> Result<()> {
    let skill_id = parse_skill_id(skill_id)?;
    let skill = state
        .progression
        .promote_mastery(learner_id, &skill_id)
        .await?;
    print_skill(&skill, "Mastered", json)
}

fn parse_skill_id(raw: &str) -> Result<SkillId> {
    raw.parse::<SkillId>().map_err(|e| anyhow::anyhow!(e))
}

fn print_skill(skill: &SkillSnapshot, verb: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(skill)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} {}",
        style("✓").green().bold(),
        verb,
        style(&skill.title).cyan()
    );
    println!();
    println!(
        "  {}    {}",
        style("Status:").bold(),
        skill.status
    );
    println!(
        "  {}  {} {}%",
        style("Progress:").bold(),
        progress_bar(skill.progress_percentage),
        skill.progress_percentage
    );
    println!(
        "  {}    {}/{}",
        style("Points:").bold(),
        skill.points_earned,
        skill.points
    );
    println!();
    Ok(())
}

fn print_unlocks(outcome: &CompletionOutcome) {
    if !outcome.unlocked_skills.is_empty() {
        println!("  {}", style("── Unlocked ──").dim());
        for skill_id in &outcome.unlocked_skills {
            println!("  {} {}", style("🔓").bold(), skill_id);
        }
        println!();
    }

    if !outcome.unlocked_achievements.is_empty() {
        println!("  {}", style("── Achievements ──").dim());
        for achievement in &outcome.unlocked_achievements {
            println!(
                "  {} {}  {}",
                style("🏆").bold(),
                style(&achievement.name).yellow().bold(),
                style(&achievement.description).dim()
            );
        }
        println!();
    }
}
