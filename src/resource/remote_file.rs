//! Remote file resource - download if missing

use anyhow::{Context, Result};
use converge::{ApplyContext, ApplyResult, Resource, ResourceState};
use std::fs;
use std::path::PathBuf;

/// Maximum download size (source tarballs stay well below this).
const MAX_BODY_SIZE: u64 = 256 * 1024 * 1024;

/// A file downloaded from a URL when absent
///
/// Create-if-missing semantics: an existing file is never re-downloaded or
/// compared against the origin.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub url: String,
    pub dest: PathBuf,
}

impl RemoteFile {
    pub fn new(url: &str, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.to_string(),
            dest: dest.into(),
        }
    }

    fn download(&self) -> Result<()> {
        let agent = ureq::Agent::new_with_defaults();
        let mut response = agent
            .get(&self.url)
            .call()
            .with_context(|| format!("Failed to download {}", self.url))?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .with_context(|| format!("Failed to read response body from {}", self.url))?;

        if let Some(parent) = self.dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(&self.dest, &bytes)
            .with_context(|| format!("Failed to write {}", self.dest.display()))?;

        log::info!("Downloaded {} ({} bytes)", self.dest.display(), bytes.len());
        Ok(())
    }
}

impl Resource for RemoteFile {
    fn id(&self) -> String {
        self.dest.to_string_lossy().to_string()
    }

    fn description(&self) -> String {
        format!("Download {} to {}", self.url, self.dest.display())
    }

    fn resource_type(&self) -> &'static str {
        "remote_file"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.dest.is_file() {
            Ok(ResourceState::Present { details: None })
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present { details: None }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        if self.dest.is_file() {
            return Ok(ApplyResult::NoChange);
        }

        self.download()?;
        Ok(ApplyResult::Created)
    }
}
