//! Global configuration types for Skillpath.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls
//! catalog location, commit retry behaviour, and event bus sizing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.skillpath/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Directory holding path catalog files. Defaults to `{data_dir}/catalog`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_dir: Option<PathBuf>,

    /// Bounded retry applied to persistence commits.
    #[serde(default)]
    pub commit_retry: CommitRetryConfig,

    /// Capacity of the progression event broadcast channel.
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Number of recommendations returned when the caller does not ask.
    #[serde(default = "default_recommendation_limit")]
    pub default_recommendation_limit: usize,
}

fn default_event_bus_capacity() -> usize {
    256
}

fn default_recommendation_limit() -> usize {
    3
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            catalog_dir: None,
            commit_retry: CommitRetryConfig::default(),
            event_bus_capacity: default_event_bus_capacity(),
            default_recommendation_limit: default_recommendation_limit(),
        }
    }
}

/// Exponential backoff settings for persistence commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRetryConfig {
    /// Total attempts including the first (default 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    50
}

fn default_max_backoff_ms() -> u64 {
    1_000
}

impl Default for CommitRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
