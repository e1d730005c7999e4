//! Learner CLI commands: achievements, summary.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use skillpath_types::learner::LearnerId;

use crate::state::AppState;

/// List every achievement with the learner's unlock state.
pub async fn list_achievements(state: &AppState, learner_id: &LearnerId, json: bool) -> Result<()> {
    let achievements = state.progression.list_achievements(learner_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&achievements)?);
        return Ok(());
    }

    if achievements.is_empty() {
        println!();
        println!(
            "  {} No achievements defined. Add an achievements.toml to {}",
            style("i").blue().bold(),
            style(state.catalog_dir.display()).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("").fg(Color::White),
        Cell::new("Achievement").fg(Color::White),
        Cell::new("Description").fg(Color::White),
        Cell::new("Unlocked").fg(Color::White),
    ]);

    let mut unlocked = 0;
    for achievement in &achievements {
        let (marker, when) = match achievement.unlocked_at {
            Some(at) => {
                unlocked += 1;
                (
                    Cell::new("🏆"),
                    Cell::new(at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::Green),
                )
            }
            None => (Cell::new("·"), Cell::new("locked").fg(Color::DarkGrey)),
        };
        table.add_row(vec![
            marker,
            Cell::new(&achievement.name).fg(Color::Cyan),
            Cell::new(&achievement.description),
            when,
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} of {} unlocked",
        style(unlocked).bold(),
        achievements.len()
    );
    println!();

    Ok(())
}

/// Totals across every path the learner has touched.
pub async fn summary(state: &AppState, learner_id: &LearnerId, json: bool) -> Result<()> {
    let summary = state.progression.learner_summary(learner_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style("Learner").bold(),
        style(&summary.learner_id).cyan().bold()
    );
    println!();
    println!("  {}", style("── Progress ──").dim());
    println!("  Points:           {}", style(summary.total_points).bold());
    println!("  Skills completed: {}", summary.completed_skills);
    println!("  Skills mastered:  {}", summary.mastered_skills);
    println!("  Paths completed:  {}", summary.completed_paths.len());
    for path_id in &summary.completed_paths {
        println!("    {} {}", style("•").dim(), path_id);
    }
    println!("  Achievements:     {}", summary.unlocked_achievements);
    println!();

    Ok(())
}
