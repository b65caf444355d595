//! Idempotency guards
//!
//! A guard is a cheap predicate that tells the walk a resource's end-state
//! already holds, so the action can be skipped. Guards carry the same
//! semantics as the classic recipe idioms: `creates` (skip when a path the
//! action would produce exists) and `not_if` (skip when a probe command
//! succeeds).

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A skip predicate evaluated before a resource is diffed or applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Skip when this file exists (the action creates it)
    FileExists(PathBuf),
    /// Skip when this directory exists (the action creates it)
    DirExists(PathBuf),
    /// Skip when this shell command exits successfully
    CommandSucceeds(String),
}

impl Guard {
    /// Guard on a file the action produces
    pub fn creates(path: impl AsRef<Path>) -> Self {
        Self::FileExists(path.as_ref().to_path_buf())
    }

    /// Guard on a directory the action produces
    pub fn creates_dir(path: impl AsRef<Path>) -> Self {
        Self::DirExists(path.as_ref().to_path_buf())
    }

    /// Guard on a probe command (skip the action when it succeeds)
    pub fn not_if(command: impl Into<String>) -> Self {
        Self::CommandSucceeds(command.into())
    }

    /// Evaluate the guard. `true` means the end-state already holds and
    /// the action should be skipped.
    pub fn is_satisfied(&self) -> Result<bool> {
        match self {
            Self::FileExists(path) => Ok(path.is_file()),
            Self::DirExists(path) => Ok(path.is_dir()),
            Self::CommandSucceeds(command) => {
                let status = Command::new("sh")
                    .args(["-c", command.as_str()])
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .with_context(|| format!("Failed to run guard command: {command}"))?;
                Ok(status.success())
            }
        }
    }

    /// Short description for diff/status output
    pub fn describe(&self) -> String {
        match self {
            Self::FileExists(path) => format!("creates {}", path.display()),
            Self::DirExists(path) => format!("creates {}/", path.display()),
            Self::CommandSucceeds(command) => format!("not_if `{command}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_guard() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("done");

        let guard = Guard::creates(&marker);
        assert!(!guard.is_satisfied().unwrap());

        std::fs::write(&marker, "x").unwrap();
        assert!(guard.is_satisfied().unwrap());
    }

    #[test]
    fn test_dir_guard_ignores_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build");

        let guard = Guard::creates_dir(&path);
        assert!(!guard.is_satisfied().unwrap());

        // A file at the path does not satisfy a directory guard
        std::fs::write(&path, "x").unwrap();
        assert!(!guard.is_satisfied().unwrap());

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        assert!(guard.is_satisfied().unwrap());
    }

    #[test]
    fn test_command_guard() {
        assert!(Guard::not_if("true").is_satisfied().unwrap());
        assert!(!Guard::not_if("false").is_satisfied().unwrap());
    }

    #[test]
    fn test_describe() {
        let guard = Guard::not_if("getcap /usr/bin/ruby | grep -q net_bind");
        assert!(guard.describe().starts_with("not_if"));
    }
}
