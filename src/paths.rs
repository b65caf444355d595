//! Centralized path resolution for wikistead
//!
//! This module provides path resolution with environment variable support,
//! so configs can live in /etc on a converged host or in a user directory
//! during development.
//!
//! # Environment Variables
//!
//! - `WIKISTEAD_CONFIG_DIR` - Override config directory
//! - `WIKISTEAD_STATE_DIR` - Override state directory
//! - `WIKISTEAD_SECRETS_DIR` - Override secrets directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `WIKISTEAD_CONFIG_DIR` environment variable
//! 2. Existing `/etc/wikistead` (the converged-host location)
//! 3. `XDG_CONFIG_HOME/wikistead` (if set)
//! 4. Default: `~/.config/wikistead`
//!
//! For state_dir():
//! 1. `WIKISTEAD_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/wikistead` (if set)
//! 3. Default: `~/.local/state/wikistead`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "WIKISTEAD_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "WIKISTEAD_STATE_DIR";

/// Environment variable for secrets directory override
pub const ENV_SECRETS_DIR: &str = "WIKISTEAD_SECRETS_DIR";

/// System-wide config location used on converged hosts
const ETC_CONFIG_DIR: &str = "/etc/wikistead";

/// Get the wikistead config directory path
pub fn config_dir() -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    // 2. Check for the system-wide location
    let etc = PathBuf::from(ETC_CONFIG_DIR);
    if etc.exists() {
        log::debug!("Using system config dir: {}", etc.display());
        return Ok(etc);
    }

    // 3. Check XDG_CONFIG_HOME
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("wikistead");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 4. Default: ~/.config/wikistead
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("wikistead");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the wikistead state directory path
pub fn state_dir() -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    // 2. Check XDG_STATE_HOME
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("wikistead");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Default: ~/.local/state/wikistead
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join("wikistead");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Get the secrets directory path
///
/// Priority:
/// 1. `WIKISTEAD_SECRETS_DIR` env var
/// 2. Default: `<config_dir>/secrets`
pub fn secrets_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_SECRETS_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using secrets dir from {}: {}",
            ENV_SECRETS_DIR,
            path.display()
        );
        return Ok(path);
    }

    Ok(config_dir()?.join("secrets"))
}

/// Directory holding one-time convergence markers
pub fn markers_dir() -> Result<PathBuf> {
    Ok(state_dir()?.join("markers"))
}

/// Expand ~ and environment variables in a path string.
///
/// This is the canonical path expansion function for wikistead. All modules
/// should use this instead of calling shellexpand directly.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause
    /// issues if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/config/path", || {
            let result = config_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/config/path"));
        });
    }

    #[test]
    fn test_state_dir_env_override() {
        with_env_var(ENV_STATE_DIR, "/custom/state/path", || {
            let result = state_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/state/path"));
        });
    }

    #[test]
    fn test_secrets_dir_env_override() {
        with_env_var(ENV_SECRETS_DIR, "/custom/secrets", || {
            let result = secrets_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/secrets"));
        });
    }

    #[test]
    fn test_markers_dir_under_state() {
        with_env_var(ENV_STATE_DIR, "/custom/state/path", || {
            let result = markers_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/state/path/markers"));
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_absolute() {
        let result = expand("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("WIKISTEAD_TEST_VAR", "test_value", || {
            let result = expand("/path/$WIKISTEAD_TEST_VAR/file");
            assert_eq!(result, PathBuf::from("/path/test_value/file"));
        });
    }

    #[test]
    fn test_env_var_constants() {
        assert_eq!(ENV_CONFIG_DIR, "WIKISTEAD_CONFIG_DIR");
        assert_eq!(ENV_STATE_DIR, "WIKISTEAD_STATE_DIR");
        assert_eq!(ENV_SECRETS_DIR, "WIKISTEAD_SECRETS_DIR");
    }
}
