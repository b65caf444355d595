//! OS package resource

use anyhow::{Context, Result};
use converge::{ApplyContext, ApplyResult, Resource, ResourceState};
use zypp::{PackageBackend, ZypperBackend};

/// Desired end-state of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageAction {
    Install,
    Remove,
}

/// An OS package managed through zypper
#[derive(Debug)]
pub struct Package {
    pub name: String,
    pub action: PackageAction,
    backend: ZypperBackend,
}

impl Package {
    pub fn install(name: &str) -> Self {
        Self {
            name: name.to_string(),
            action: PackageAction::Install,
            backend: ZypperBackend::new(),
        }
    }

    pub fn remove(name: &str) -> Self {
        Self {
            name: name.to_string(),
            action: PackageAction::Remove,
            backend: ZypperBackend::new(),
        }
    }

    fn is_installed(&self) -> Result<bool> {
        self.backend
            .is_installed(&self.name)
            .with_context(|| format!("Failed to probe package {}", self.name))
    }
}

impl Resource for Package {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        match self.action {
            PackageAction::Install => format!("Install package {} via zypper", self.name),
            PackageAction::Remove => format!("Remove package {} via zypper", self.name),
        }
    }

    fn resource_type(&self) -> &'static str {
        "package"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.is_installed()? {
            Ok(ResourceState::Present { details: None })
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        match self.action {
            PackageAction::Install => ResourceState::Present { details: None },
            PackageAction::Remove => ResourceState::Absent,
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        match (self.action, self.is_installed()?) {
            (PackageAction::Install, true) | (PackageAction::Remove, false) => {
                Ok(ApplyResult::NoChange)
            }
            (PackageAction::Install, false) => {
                self.backend
                    .install(&self.name)
                    .with_context(|| format!("Failed to install {}", self.name))?;
                Ok(ApplyResult::Created)
            }
            (PackageAction::Remove, true) => {
                self.backend
                    .remove(&self.name)
                    .with_context(|| format!("Failed to remove {}", self.name))?;
                Ok(ApplyResult::Removed)
            }
        }
    }
}
