//! Convergence state ledger
//!
//! Tracks when the host last converged and what the last walk changed.
//! One-time step markers (the data migration) are plain files under
//! `<state>/markers/` so they double as idempotency guards.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use converge::ExecuteSummary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// State tracked across convergence runs
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConvergeState {
    /// Last time a convergence run completed
    pub last_converged: Option<DateTime<Utc>>,

    /// Number of completed convergence runs
    #[serde(default)]
    pub runs: u64,

    /// Changes made by the most recent run
    #[serde(default)]
    pub last_changes: usize,

    /// Whether the most recent run failed
    #[serde(default)]
    pub last_run_failed: bool,
}

impl ConvergeState {
    fn state_file() -> Result<PathBuf> {
        Ok(crate::paths::state_dir()?.join("state.toml"))
    }

    /// Load state from disk, or return default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::state_file()?;

        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))
    }

    /// Save state to disk
    pub fn save(&self) -> Result<()> {
        let dir = crate::paths::state_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;

        let path = Self::state_file()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize state")?;

        fs::write(&path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Record a completed convergence run
    pub fn record_run(&mut self, summary: &ExecuteSummary) {
        self.last_converged = Some(Utc::now());
        self.runs += 1;
        self.last_changes = summary.total_changes();
        self.last_run_failed = !summary.is_success();
    }
}

/// Path of the one-time marker for a named step
pub fn marker_path(name: &str) -> Result<PathBuf> {
    Ok(crate::paths::markers_dir()?.join(format!("{name}.done")))
}
