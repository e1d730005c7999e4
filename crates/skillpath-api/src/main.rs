//! Skillpath CLI and REST API entry point.
//!
//! Binary name: `skillpath`
//!
//! Parses CLI arguments, loads the catalog and database, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use skillpath_observe::{LogFormat, init_tracing_with_filter, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,skillpath=debug",
        _ => "trace",
    };
    let format = std::env::var("SKILLPATH_LOG_FORMAT")
        .ok()
        .and_then(|f| f.parse::<LogFormat>().ok())
        .unwrap_or_default();
    let enable_otel = std::env::var("SKILLPATH_OTEL").is_ok_and(|v| v == "1" || v == "true");
    init_tracing_with_filter(format, enable_otel, filter)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "skillpath", &mut std::io::stdout());
        return Ok(());
    }

    // Initialize application state (config, catalog, DB)
    let state = AppState::init().await?;

    let result = run(&cli, state).await;
    shutdown_tracing();
    result
}

async fn run(cli: &Cli, state: AppState) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Paths => {
            cli::path::list_paths(&state, cli.json).await?;
        }

        Commands::Path { id } => {
            let learner_id = cli.learner_id()?;
            cli::path::show_path(&state, learner_id.as_ref(), id, cli.json).await?;
        }

        Commands::Start { skill } => {
            let learner_id = cli.require_learner()?;
            cli::skill::start_skill(&state, &learner_id, skill, cli.json).await?;
        }

        Commands::Progress { skill, percent } => {
            let learner_id = cli.require_learner()?;
            cli::skill::update_progress(&state, &learner_id, skill, *percent, cli.json).await?;
        }

        Commands::Complete { skill } => {
            let learner_id = cli.require_learner()?;
            cli::skill::complete_skill(&state, &learner_id, skill, cli.json).await?;
        }

        Commands::Master { skill } => {
            let learner_id = cli.require_learner()?;
            cli::skill::promote_mastery(&state, &learner_id, skill, cli.json).await?;
        }

        Commands::Achievements => {
            let learner_id = cli.require_learner()?;
            cli::learner::list_achievements(&state, &learner_id, cli.json).await?;
        }

        Commands::Summary => {
            let learner_id = cli.require_learner()?;
            cli::learner::summary(&state, &learner_id, cli.json).await?;
        }

        Commands::Recommend { path, limit } => {
            let learner_id = cli.require_learner()?;
            cli::path::recommend(&state, &learner_id, path, *limit, cli.json).await?;
        }

        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Skillpath API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {}",
                console::style("Press Ctrl+C to stop").dim()
            );

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
