//! Directory resource - existence, ownership, mode

use anyhow::{Context, Result};
use converge::{ApplyContext, ApplyResult, Resource, ResourceState};
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::PathBuf;

/// A directory with the expected owner, group and mode
#[derive(Debug, Clone)]
pub struct Directory {
    pub path: PathBuf,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: u32,
}

impl Directory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owner: None,
            group: None,
            mode: 0o755,
        }
    }

    pub fn owner(mut self, owner: &str) -> Self {
        self.owner = Some(owner.to_string());
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    fn chown_ids(&self) -> Result<(Option<u32>, Option<u32>)> {
        let uid = match &self.owner {
            Some(owner) => Some(crate::users::lookup_user(owner)?.uid),
            None => None,
        };
        let gid = match &self.group {
            Some(group) => Some(crate::users::lookup_group(group)?),
            None => None,
        };
        Ok((uid, gid))
    }
}

impl Resource for Directory {
    fn id(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    fn description(&self) -> String {
        format!("Create directory {}", self.path.display())
    }

    fn resource_type(&self) -> &'static str {
        "directory"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.path.is_dir() {
            return Ok(ResourceState::Absent);
        }

        let metadata = fs::metadata(&self.path)
            .with_context(|| format!("Failed to stat {}", self.path.display()))?;
        let mode = metadata.permissions().mode() & 0o7777;

        if mode != self.mode {
            return Ok(ResourceState::Modified {
                from: format!("mode {mode:04o}"),
                to: format!("mode {:04o}", self.mode),
            });
        }

        if let Some(owner) = &self.owner {
            let expected = crate::users::lookup_user(owner)?;
            if metadata.uid() != expected.uid {
                return Ok(ResourceState::Modified {
                    from: format!("uid {}", metadata.uid()),
                    to: format!("uid {} ({owner})", expected.uid),
                });
            }
        }

        Ok(ResourceState::Present { details: None })
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

        let existed = self.path.is_dir();
        if !existed {
            fs::create_dir_all(&self.path)
                .with_context(|| format!("Failed to create {}", self.path.display()))?;
        }

        fs::set_permissions(&self.path, fs::Permissions::from_mode(self.mode))
            .with_context(|| format!("Failed to chmod {}", self.path.display()))?;

        let (uid, gid) = self.chown_ids()?;
        if uid.is_some() || gid.is_some() {
            std::os::unix::fs::chown(&self.path, uid, gid)
                .with_context(|| format!("Failed to chown {}", self.path.display()))?;
        }

        if existed {
            Ok(ApplyResult::Modified)
        } else {
            Ok(ApplyResult::Created)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let resource = Directory::new(dir.path().join("staging")).mode(0o755);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Absent);
    }

    #[test]
    fn test_apply_creates_with_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging");
        let resource = Directory::new(&path).mode(0o750);

        let mut ctx = ApplyContext::new(false, false);
        let result = resource.apply(&mut ctx).unwrap();
        assert_eq!(result, ApplyResult::Created);

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o750);
        assert_eq!(
            resource.current_state().unwrap(),
            ResourceState::Present { details: None }
        );
    }

    #[test]
    fn test_wrong_mode_reports_modified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging");
        fs::create_dir(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o700)).unwrap();

        let resource = Directory::new(&path).mode(0o755);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Modified { .. }
        ));
    }

    #[test]
    fn test_dry_run_skips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging");
        let resource = Directory::new(&path);

        let mut ctx = ApplyContext::new(true, false);
        let result = resource.apply(&mut ctx).unwrap();
        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert!(!path.exists());
    }
}
