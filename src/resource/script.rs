//! Script resource - guarded shell steps

use anyhow::{Context, Result, bail};
use converge::{ApplyContext, ApplyResult, Guard, Resource, ResourceState};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

/// A shell step with an idempotency guard
///
/// The code runs under `sh -c` with an optional working directory,
/// environment and run-as user. Without a guard the step would run on
/// every converge; the recipe gives every script one.
#[derive(Debug, Clone)]
pub struct Script {
    pub name: String,
    pub code: String,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub user: Option<String>,
    pub guard: Option<Guard>,
}

impl Script {
    pub fn new(name: &str, code: &str) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            cwd: None,
            env: Vec::new(),
            user: None,
            guard: None,
        }
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    pub fn creates(mut self, path: impl Into<PathBuf>) -> Self {
        self.guard = Some(Guard::creates(path.into()));
        self
    }

    pub fn not_if(mut self, command: &str) -> Self {
        self.guard = Some(Guard::not_if(command));
        self
    }

    fn run(&self) -> Result<()> {
        let mut command = Command::new("sh");
        command.args(["-c", self.code.as_str()]);

        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

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
            .with_context(|| format!("Failed to execute script '{}'", self.name))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("script '{}' failed: {}", self.name, stderr.trim());
        }

        Ok(())
    }
}

impl Resource for Script {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        match &self.guard {
            Some(guard) => format!("Run '{}' ({})", self.name, guard.describe()),
            None => format!("Run '{}'", self.name),
        }
    }

    fn resource_type(&self) -> &'static str {
        "script"
    }

    fn guard(&self) -> Option<Guard> {
        self.guard.clone()
    }

    fn current_state(&self) -> Result<ResourceState> {
        match &self.guard {
            Some(guard) if guard.is_satisfied()? => Ok(ResourceState::Present { details: None }),
            _ => Ok(ResourceState::Absent),
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

        if let Some(guard) = &self.guard
            && guard.is_satisfied()?
        {
            return Ok(ApplyResult::NoChange);
        }

        self.run()?;
        Ok(ApplyResult::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_script_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("built");

        let script = Script::new(
            "touch marker",
            &format!("echo done > {}", marker.display()),
        )
        .creates(&marker);

        let mut ctx = ApplyContext::new(false, false);
        assert_eq!(script.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert!(marker.is_file());

        // Guard satisfied now: at most once across repeated runs
        assert_eq!(script.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
        assert!(!script.needs_apply().unwrap());
    }

    #[test]
    fn test_script_failure_carries_stderr() {
        let script = Script::new("broken", "echo kaput >&2; exit 1");
        let mut ctx = ApplyContext::new(false, false);
        let err = script.apply(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("kaput"));
    }

    #[test]
    fn test_cwd_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let script = Script::new("pwd check", "test \"$(pwd)\" = \"$EXPECTED\"")
            .cwd(dir.path())
            .env("EXPECTED", &dir.path().to_string_lossy());

        let mut ctx = ApplyContext::new(false, false);
        assert_eq!(script.apply(&mut ctx).unwrap(), ApplyResult::Created);
    }

    #[test]
    fn test_not_if_guard_skips() {
        let script = Script::new("skipped", "exit 1").not_if("true");
        let mut ctx = ApplyContext::new(false, false);
        assert_eq!(script.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
    }
}
