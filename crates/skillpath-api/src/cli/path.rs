//! Path CLI commands: list, show, recommend.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use skillpath_types::learner::LearnerId;
use skillpath_types::path::{PathId, PathSnapshot, PathStatus};
use skillpath_types::skill::{SkillSnapshot, SkillStatus};

use crate::state::AppState;

/// List every path in the catalog.
pub async fn list_paths(state: &AppState, json: bool) -> Result<()> {
    let paths = state.progression.list_paths().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    if paths.is_empty() {
        println!();
        println!(
            "  {} No paths found. Add path files to {}",
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
        Cell::new("Id").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Subject").fg(Color::White),
        Cell::new("Grade").fg(Color::White),
        Cell::new("Difficulty").fg(Color::White),
        Cell::new("Skills").fg(Color::White),
    ]);

    for path in &paths {
        table.add_row(vec![
            Cell::new(&path.id).fg(Color::Cyan),
            Cell::new(&path.title),
            Cell::new(&path.subject),
            Cell::new(&path.grade_level).fg(Color::DarkGrey),
            Cell::new(difficulty_stars(path.difficulty)).fg(Color::Yellow),
            Cell::new(path.skills.len()),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} path{}",
        style(paths.len()).bold(),
        if paths.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Show a path. With a learner, shows their progress; otherwise the
/// untouched catalog view.
pub async fn show_path(
    state: &AppState,
    learner_id: Option<&LearnerId>,
    path_id: &str,
    json: bool,
) -> Result<()> {
    let path_id = path_id.parse::<PathId>().map_err(|e| anyhow::anyhow!(e))?;
    let snapshot = match learner_id {
        Some(learner_id) => {
            state
                .progression
                .get_path_snapshot(learner_id, &path_id)
                .await?
        }
        None => state.progression.load_path(&path_id).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    print_path_header(&snapshot, learner_id);

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Skill").fg(Color::White),
        Cell::new("Type").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Progress").fg(Color::White),
        Cell::new("Points").fg(Color::White),
        Cell::new("Requires").fg(Color::White),
    ]);

    for skill in &snapshot.skills {
        let requires = skill
            .prerequisites
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(format!("{}\n{}", skill.title, skill.id)),
            Cell::new(skill.skill_type).fg(Color::DarkGrey),
            skill_status_cell(skill),
            Cell::new(format!("{:>3}%", skill.progress_percentage)),
            Cell::new(format!("{}/{}", skill.points_earned, skill.points)),
            Cell::new(requires).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    println!();

    Ok(())
}

/// Suggest next skills on a path.
pub async fn recommend(
    state: &AppState,
    learner_id: &LearnerId,
    path_id: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let path_id = path_id.parse::<PathId>().map_err(|e| anyhow::anyhow!(e))?;
    let suggestions = state
        .progression
        .recommend(learner_id, &path_id, limit)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    println!();
    if suggestions.is_empty() {
        println!(
            "  {} Nothing to suggest on {}: every available skill is finished.",
            style("i").blue().bold(),
            style(&path_id).cyan()
        );
        println!();
        return Ok(());
    }

    println!(
        "  {} Next up on {}",
        style("→").cyan().bold(),
        style(&path_id).cyan().bold()
    );
    println!();
    for (rank, suggestion) in suggestions.iter().enumerate() {
        println!(
            "  {}. {}  {}",
            rank + 1,
            style(&suggestion.skill_id).bold(),
            style(&suggestion.rationale).dim()
        );
    }
    println!();

    Ok(())
}

fn print_path_header(snapshot: &PathSnapshot, learner_id: Option<&LearnerId>) {
    println!();
    println!(
        "  {} {}",
        style(&snapshot.title).cyan().bold(),
        style(format!("({})", snapshot.id)).dim()
    );
    println!(
        "  {}",
        style(format!(
            "{} · grade {} · {}",
            snapshot.subject,
            snapshot.grade_level,
            difficulty_stars(snapshot.difficulty)
        ))
        .dim()
    );
    println!();

    if let Some(learner_id) = learner_id {
        println!(
            "  {}   {}",
            style("Learner:").bold(),
            learner_id
        );
        println!(
            "  {}    {}",
            style("Status:").bold(),
            format_path_status(snapshot.status)
        );
        println!(
            "  {}  {} {}% ({}/{} skills, {} points)",
            style("Progress:").bold(),
            progress_bar(snapshot.progress_percentage),
            snapshot.progress_percentage,
            snapshot.completed_skills,
            snapshot.total_skills,
            snapshot.points_earned()
        );
        println!();
    }
}

fn skill_status_cell(skill: &SkillSnapshot) -> Cell {
    if skill.is_locked {
        return Cell::new("🔒 locked").fg(Color::DarkGrey);
    }
    match skill.status {
        SkillStatus::NotStarted => Cell::new("○ available").fg(Color::White),
        SkillStatus::InProgress => Cell::new("◐ in progress").fg(Color::Yellow),
        SkillStatus::Completed => Cell::new("● completed").fg(Color::Green),
        SkillStatus::Mastered => Cell::new("★ mastered").fg(Color::Magenta),
    }
}

fn format_path_status(status: PathStatus) -> String {
    match status {
        PathStatus::NotStarted => format!("{}", style("not started").dim()),
        PathStatus::InProgress => format!("{}", style("in progress").yellow()),
        PathStatus::Completed => format!("{}", style("completed").green().bold()),
    }
}

/// Ten-cell bar for a 0-100 percentage.
pub(crate) fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) / 10;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

fn difficulty_stars(difficulty: u8) -> String {
    let filled = usize::from(difficulty.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}
