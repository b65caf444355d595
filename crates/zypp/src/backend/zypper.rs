//! Real zypper/rpm CLI backend.

use crate::backend::PackageBackend;
use crate::error::{Error, Result};
use crate::types::Repository;
use std::process::{Command, Output, Stdio};

/// Backend that executes real `zypper` and `rpm` commands.
///
/// Install and remove run non-interactively; presence is probed through
/// the rpm database, which is much cheaper than a zypper search.
pub struct ZypperBackend {
    zypper_path: String,
    rpm_path: String,
}

impl ZypperBackend {
    /// Create a backend using the binaries from PATH.
    pub fn new() -> Self {
        Self {
            zypper_path: "zypper".to_string(),
            rpm_path: "rpm".to_string(),
        }
    }

    /// Run a zypper command and return output.
    fn run_zypper(&self, args: &[&str]) -> Result<Output> {
        Command::new(&self.zypper_path)
            .args(args)
            .output()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute zypper: {e}"),
                stderr: String::new(),
            })
    }

    /// Run a zypper command and check for success.
    fn run_zypper_checked(&self, args: &[&str], package_name: Option<&str>) -> Result<String> {
        let output = self.run_zypper(args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_zypper_output(&stderr, package_name));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Default for ZypperBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ZypperBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZypperBackend")
            .field("zypper_path", &self.zypper_path)
            .finish()
    }
}

impl PackageBackend for ZypperBackend {
    fn is_available(&self) -> bool {
        Command::new(&self.zypper_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn is_installed(&self, name: &str) -> Result<bool> {
        let status = Command::new(&self.rpm_path)
            .args(["-q", name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute rpm: {e}"),
                stderr: String::new(),
            })?;
        Ok(status.success())
    }

    fn install(&self, name: &str) -> Result<()> {
        self.run_zypper_checked(&["--non-interactive", "install", name], Some(name))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.run_zypper_checked(&["--non-interactive", "remove", name], Some(name))?;
        Ok(())
    }

    fn list_repos(&self) -> Result<Vec<String>> {
        let output = self.run_zypper_checked(&["lr"], None)?;
        Ok(parse_repo_aliases(&output))
    }

    fn add_repo(&self, repo: &Repository) -> Result<()> {
        let url = repo.url();
        let mut args = vec!["--non-interactive", "addrepo"];
        if repo.autorefresh {
            args.push("--refresh");
        }
        if !repo.gpgcheck {
            args.push("--no-gpgcheck");
        }
        args.push(&url);
        args.push(&repo.alias);

        self.run_zypper_checked(&args, None)?;
        Ok(())
    }
}

/// Parse repository aliases out of `zypper lr` table output.
///
/// The table has `#ated | Alias | Name | ...` columns; separator and header
/// lines carry no alias.
fn parse_repo_aliases(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut cols = line.split('|');
            let first = cols.next()?.trim();
            // Data rows start with a repo number
            if first.is_empty() || first.parse::<u32>().is_err() {
                return None;
            }
            cols.next().map(|alias| alias.trim().to_string())
        })
        .filter(|alias| !alias.is_empty())
        .collect()
}
