//! Package repository resource

use anyhow::{Context, Result};
use converge::{ApplyContext, ApplyResult, Resource, ResourceState};
use zypp::{PackageBackend, Repository, ZypperBackend};

/// A zypper package repository to configure
#[derive(Debug)]
pub struct PackageRepo {
    pub repo: Repository,
    backend: ZypperBackend,
}

impl PackageRepo {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            backend: ZypperBackend::new(),
        }
    }

    fn exists(&self) -> Result<bool> {
        self.backend
            .repo_exists(&self.repo.alias)
            .with_context(|| format!("Failed to list repositories for {}", self.repo.alias))
    }
}

impl Resource for PackageRepo {
    fn id(&self) -> String {
        self.repo.alias.clone()
    }

    fn description(&self) -> String {
        format!("Configure package repository {}", self.repo.alias)
    }

    fn resource_type(&self) -> &'static str {
        "package_repo"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.exists()? {
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

        if self.exists()? {
            return Ok(ApplyResult::NoChange);
        }

        self.backend
            .add_repo(&self.repo)
            .with_context(|| format!("Failed to add repository {}", self.repo.alias))?;
        Ok(ApplyResult::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let repo = PackageRepo::new(Repository {
            alias: "devel:languages:ruby:extensions".into(),
            baseurl: "https://download.opensuse.org".into(),
            path: "/repositories/devel:languages:ruby:extensions/openSUSE_Leap_42.3/".into(),
            autorefresh: true,
            gpgcheck: false,
        });

        assert_eq!(repo.id(), "devel:languages:ruby:extensions");
        assert_eq!(repo.resource_type(), "package_repo");
        assert_eq!(
            repo.desired_state(),
            ResourceState::Present { details: None }
        );
    }
}
