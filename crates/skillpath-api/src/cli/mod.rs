//! CLI command definitions for the `skillpath` binary.
//!
//! Uses clap derive macros for argument parsing. Learner-scoped commands
//! name their learner with `--learner` (or `SKILLPATH_LEARNER`).

pub mod learner;
pub mod path;
pub mod skill;
pub mod status;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_complete::Shell;

use skillpath_types::learner::LearnerId;

/// Track learners through skill paths.
#[derive(Parser)]
#[command(name = "skillpath", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Learner the command acts for.
    #[arg(long, global = true, env = "SKILLPATH_LEARNER")]
    pub learner: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The learner named on the command line, required for learner-scoped commands.
    pub fn require_learner(&self) -> Result<LearnerId> {
        let raw = self
            .learner
            .as_deref()
            .context("this command needs a learner: pass --learner <id> or set SKILLPATH_LEARNER")?;
        raw.parse::<LearnerId>().map_err(|e| anyhow::anyhow!(e))
    }

    /// The learner, if one was named.
    pub fn learner_id(&self) -> Result<Option<LearnerId>> {
        match &self.learner {
            Some(raw) => Ok(Some(raw.parse::<LearnerId>().map_err(|e| anyhow::anyhow!(e))?)),
            None => Ok(None),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every learning path in the catalog.
    #[command(alias = "ls")]
    Paths,

    /// Show a path with its skills (learner view when --learner is set).
    Path {
        /// Path id (e.g. intro-science).
        id: String,
    },

    /// Start a skill.
    Start {
        /// Skill id.
        skill: String,
    },

    /// Report progress (0-100) on a skill. 100 completes it.
    Progress {
        /// Skill id.
        skill: String,

        /// Percentage complete.
        #[arg(allow_negative_numbers = true)]
        percent: i32,
    },

    /// Mark a skill completed.
    #[command(alias = "done")]
    Complete {
        /// Skill id.
        skill: String,
    },

    /// Promote a completed skill to mastered.
    Master {
        /// Skill id.
        skill: String,
    },

    /// List achievements and the learner's unlock state.
    Achievements,

    /// Show the learner's totals across every path.
    Summary,

    /// Suggest next skills on a path.
    Recommend {
        /// Path id.
        path: String,

        /// Maximum suggestions.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show data directory, catalog and database status.
    Status,

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
