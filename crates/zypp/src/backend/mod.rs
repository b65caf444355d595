//! Backend abstraction for package operations.
//!
//! The [`PackageBackend`] trait defines the interface for interacting with
//! the package manager, allowing for different implementations (real CLI,
//! mock for testing).

pub mod zypper;

use crate::error::Result;
use crate::types::Repository;

/// Backend trait for package manager operations.
pub trait PackageBackend: Send + Sync {
    /// Check if the package manager is available.
    fn is_available(&self) -> bool;

    /// Check if a package is installed.
    fn is_installed(&self, name: &str) -> Result<bool>;

    /// Install a package.
    fn install(&self, name: &str) -> Result<()>;

    /// Remove a package.
    fn remove(&self, name: &str) -> Result<()>;

    /// List configured repository aliases.
    fn list_repos(&self) -> Result<Vec<String>>;

    /// Check if a repository with the given alias is configured.
    fn repo_exists(&self, alias: &str) -> Result<bool> {
        Ok(self.list_repos()?.iter().any(|a| a == alias))
    }

    /// Add a repository.
    fn add_repo(&self, repo: &Repository) -> Result<()>;
}
