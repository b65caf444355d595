//! Git checkout resource

use anyhow::{Context, Result, bail};
use converge::{ApplyContext, ApplyResult, Resource, ResourceState};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

/// A git repository checked out at a revision
///
/// An existing checkout is left alone; the resource pins the initial
/// clone, not continuous tracking of the remote.
#[derive(Debug, Clone)]
pub struct GitCheckout {
    pub url: String,
    pub revision: String,
    pub dest: PathBuf,
    pub user: Option<String>,
}

impl GitCheckout {
    pub fn new(url: &str, revision: &str, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.to_string(),
            revision: revision.to_string(),
            dest: dest.into(),
            user: None,
        }
    }

    pub fn user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    fn is_checked_out(&self) -> bool {
        self.dest.join(".git").exists()
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let mut command = Command::new("git");
        command.args(args);

        if let Some(user) = &self.user {
            let account = crate::users::lookup_user(user)?;
            command
                .uid(account.uid)
                .gid(account.gid)
                .env("USER", &account.name)
                .env("HOME", &account.home);
        }

        let output = command
            .output()
            .with_context(|| format!("Failed to execute: git {}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} failed: {}", args.first().unwrap_or(&""), stderr.trim());
        }

        Ok(())
    }
}

impl Resource for GitCheckout {
    fn id(&self) -> String {
        self.dest.to_string_lossy().to_string()
    }

    fn description(&self) -> String {
        format!(
            "Checkout {} ({}) into {}",
            self.url,
            self.revision,
            self.dest.display()
        )
    }

    fn resource_type(&self) -> &'static str {
        "git_checkout"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.is_checked_out() {
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

        if self.is_checked_out() {
            return Ok(ApplyResult::NoChange);
        }

        if let Some(parent) = self.dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let dest = self.dest.to_string_lossy();
        self.git(&["clone", &self.url, dest.as_ref()])?;
        self.git(&["-C", dest.as_ref(), "checkout", &self.revision])?;

        Ok(ApplyResult::Created)
    }
}
