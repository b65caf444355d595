//! Error types for zypper/rpm operations.

use thiserror::Error;

/// Result alias for zypp operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during package operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Package not found in any configured repository
    #[error("package not found: {name}")]
    NotFound {
        /// Name of the package that could not be found
        name: String,
    },

    /// zypper is not installed or not found in PATH
    #[error("zypper not found in PATH")]
    ZypperNotFound,

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// Repository listing could not be parsed
    #[error("could not parse repository list: {message}")]
    RepoParse {
        /// Description of the parse problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify a failed zypper invocation from its stderr.
    pub fn from_zypper_output(stderr: &str, package_name: Option<&str>) -> Self {
        let lower = stderr.to_lowercase();

        if lower.contains("not found in package names")
            || lower.contains("no provider of")
            || lower.contains("not found")
        {
            if let Some(name) = package_name {
                return Self::NotFound {
                    name: name.to_string(),
                };
            }
        }

        Self::CommandFailed {
            message: "zypper exited with an error".to_string(),
            stderr: stderr.trim().to_string(),
        }
    }
}
