//! System status command.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Display data directory, catalog and configuration status.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let paths = state.progression.list_paths().await?;
    let skills: usize = paths.iter().map(|p| p.skills.len()).sum();

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "catalog_dir": state.catalog_dir.display().to_string(),
            "paths": paths.len(),
            "skills": skills,
            "commit_retry": state.config.commit_retry,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Skillpath v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Catalog ──").dim());
    println!("  Paths:  {}", style(paths.len()).bold());
    println!("  Skills: {}", style(skills).bold());
    println!("  Dir:    {}", style(state.catalog_dir.display()).dim());
    println!();

    println!("  {}", style("── System ──").dim());
    println!(
        "  Data dir: {}",
        style(state.data_dir.display()).dim()
    );
    println!(
        "  Database: {}",
        style("SQLite (WAL mode)").dim()
    );
    println!(
        "  Commit retry: {} attempts, {}ms initial backoff",
        state.config.commit_retry.max_attempts,
        state.config.commit_retry.initial_backoff_ms
    );
    println!();

    Ok(())
}
