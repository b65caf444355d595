//! Systemd unit resource - render, install, enable, start

use anyhow::{Context, Result, bail};
use converge::{ApplyContext, ApplyResult, Resource, ResourceState};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use crate::runner;

/// A unit file as ordered INI sections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFile {
    pub name: String,
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl UnitFile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sections: Vec::new(),
        }
    }

    /// Append a section with its key/value entries
    pub fn section<const N: usize>(mut self, name: &str, entries: [(&str, &str); N]) -> Self {
        self.sections.push((
            name.to_string(),
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        self
    }

    /// Render to unit file syntax, sections in declaration order
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, (section, entries)) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "[{section}]");
            for (key, value) in entries {
                let _ = writeln!(out, "{key}={value}");
            }
        }
        out
    }
}

/// A systemd unit installed under /etc/systemd/system
///
/// Converged when the rendered content matches the installed file and the
/// unit is enabled and active. Content changes trigger a daemon-reload
/// and restart.
#[derive(Debug, Clone)]
pub struct SystemdUnit {
    pub unit: UnitFile,
    unit_dir: PathBuf,
}

/// Probe outcome for a unit
#[derive(Debug, PartialEq, Eq)]
enum UnitProbe {
    Missing,
    ContentDrift,
    Stopped,
    Running,
}

impl SystemdUnit {
    pub fn new(unit: UnitFile) -> Self {
        Self {
            unit,
            unit_dir: PathBuf::from("/etc/systemd/system"),
        }
    }

    #[cfg(test)]
    fn with_unit_dir(unit: UnitFile, unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            unit,
            unit_dir: unit_dir.into(),
        }
    }

    fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(&self.unit.name)
    }

    fn probe(&self) -> Result<UnitProbe> {
        let path = self.unit_path();
        if !path.is_file() {
            return Ok(UnitProbe::Missing);
        }

        let on_disk = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if on_disk != self.unit.render() {
            return Ok(UnitProbe::ContentDrift);
        }

        let enabled = runner::run_quiet("systemctl", &["is-enabled", "--quiet", &self.unit.name]);
        let active = runner::run_quiet("systemctl", &["is-active", "--quiet", &self.unit.name]);
        if enabled && active {
            Ok(UnitProbe::Running)
        } else {
            Ok(UnitProbe::Stopped)
        }
    }

    fn systemctl(&self, args: &[&str]) -> Result<()> {
        let output = std::process::Command::new("systemctl")
            .args(args)
            .output()
            .with_context(|| format!("Failed to execute: systemctl {}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("systemctl {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(())
    }
}

impl Resource for SystemdUnit {
    fn id(&self) -> String {
        self.unit.name.clone()
    }

    fn description(&self) -> String {
        format!("Install and start unit {}", self.unit.name)
    }

    fn resource_type(&self) -> &'static str {
        "systemd_unit"
    }

    fn current_state(&self) -> Result<ResourceState> {
        match self.probe()? {
            UnitProbe::Missing => Ok(ResourceState::Absent),
            UnitProbe::ContentDrift => Ok(ResourceState::Modified {
                from: "stale unit content".to_string(),
                to: "updated unit content".to_string(),
            }),
            UnitProbe::Stopped => Ok(ResourceState::Present {
                details: Some("installed".to_string()),
            }),
            UnitProbe::Running => Ok(ResourceState::Present {
                details: Some("enabled, active".to_string()),
            }),
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some("enabled, active".to_string()),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        let probe = self.probe()?;
        if probe == UnitProbe::Running {
            return Ok(ApplyResult::NoChange);
        }

        let content_changed = matches!(probe, UnitProbe::Missing | UnitProbe::ContentDrift);
        if content_changed {
            let path = self.unit_path();
            fs::create_dir_all(&self.unit_dir)
                .with_context(|| format!("Failed to create {}", self.unit_dir.display()))?;
            fs::write(&path, self.unit.render())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            self.systemctl(&["daemon-reload"])?;
        }

        self.systemctl(&["enable", &self.unit.name])?;
        if content_changed {
            self.systemctl(&["restart", &self.unit.name])?;
        } else {
            self.systemctl(&["start", &self.unit.name])?;
        }

        match probe {
            UnitProbe::Missing => Ok(ApplyResult::Created),
            _ => Ok(ApplyResult::Modified),
        }
    }

    fn render_diff(&self) -> Option<(String, String)> {
        let current = fs::read_to_string(self.unit_path()).unwrap_or_default();
        Some((current, self.unit.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wiki_unit() -> UnitFile {
        UnitFile::new("wiki.service")
            .section(
                "Unit",
                [
                    ("Description", "Wiki daemon"),
                    ("After", "network.target"),
                ],
            )
            .section(
                "Service",
                [
                    ("WorkingDirectory", "/home/wiki/wiki"),
                    (
                        "ExecStart",
                        "/usr/bin/bundler.ruby2.3 exec instiki -e production --port=80",
                    ),
                    ("Restart", "always"),
                    ("Type", "simple"),
                    ("User", "wiki"),
                    ("Group", "users"),
                ],
            )
            .section("Install", [("WantedBy", "multi-user.target")])
    }

    #[test]
    fn test_render_preserves_section_order() {
        let rendered = wiki_unit().render();
        let expected = "\
[Unit]
Description=Wiki daemon
After=network.target

[Service]
WorkingDirectory=/home/wiki/wiki
ExecStart=/usr/bin/bundler.ruby2.3 exec instiki -e production --port=80
Restart=always
Type=simple
User=wiki
Group=users

[Install]
WantedBy=multi-user.target
";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_missing_unit_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let unit = SystemdUnit::with_unit_dir(wiki_unit(), dir.path());
        assert_eq!(unit.current_state().unwrap(), ResourceState::Absent);
    }

    #[test]
    fn test_content_drift_detected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("wiki.service"), "[Unit]\nstale\n").unwrap();

        let unit = SystemdUnit::with_unit_dir(wiki_unit(), dir.path());
        assert!(matches!(
            unit.current_state().unwrap(),
            ResourceState::Modified { .. }
        ));
    }

    #[test]
    fn test_render_diff_exposes_unit_content() {
        let dir = tempfile::tempdir().unwrap();
        let unit = SystemdUnit::with_unit_dir(wiki_unit(), dir.path());
        let (current, desired) = unit.render_diff().unwrap();
        assert!(current.is_empty());
        assert!(desired.contains("ExecStart="));
    }
}
