//! Template file resource - rendered configuration files

use anyhow::{Context, Result};
use converge::{ApplyContext, ApplyResult, Resource, ResourceState};
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

/// A configuration file rendered from a template
///
/// Variables are substituted at construction time, so a missing
/// placeholder fails while the plan is being built rather than halfway
/// through a walk. Drift is detected by content hash.
#[derive(Clone)]
pub struct TemplateFile {
    pub dest: PathBuf,
    rendered: String,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: u32,
}

// Rendered content can hold credentials; keep it out of debug output.
impl std::fmt::Debug for TemplateFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateFile")
            .field("dest", &self.dest)
            .field("owner", &self.owner)
            .field("group", &self.group)
            .field("mode", &format_args!("{:04o}", self.mode))
            .finish()
    }
}

impl TemplateFile {
    pub fn new(
        dest: impl Into<PathBuf>,
        template: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let dest = dest.into();
        let rendered = crate::template::render(template, variables)
            .with_context(|| format!("Failed to render template for {}", dest.display()))?;
        Ok(Self {
            dest,
            rendered,
            owner: None,
            group: None,
            mode: 0o644,
        })
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

    /// Rendered content (for tests and diff display)
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    fn content_hash(content: &[u8]) -> String {
        let hash = blake3::hash(content);
        hash.to_hex()[..8].to_string()
    }

    fn write(&self) -> Result<()> {
        if let Some(parent) = self.dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(&self.dest, &self.rendered)
            .with_context(|| format!("Failed to write {}", self.dest.display()))?;
        fs::set_permissions(&self.dest, fs::Permissions::from_mode(self.mode))
            .with_context(|| format!("Failed to chmod {}", self.dest.display()))?;

        let uid = match &self.owner {
            Some(owner) => Some(crate::users::lookup_user(owner)?.uid),
            None => None,
        };
        let gid = match &self.group {
            Some(group) => Some(crate::users::lookup_group(group)?),
            None => None,
        };
        if uid.is_some() || gid.is_some() {
            std::os::unix::fs::chown(&self.dest, uid, gid)
                .with_context(|| format!("Failed to chown {}", self.dest.display()))?;
        }

        Ok(())
    }
}

impl Resource for TemplateFile {
    fn id(&self) -> String {
        self.dest.to_string_lossy().to_string()
    }

    fn description(&self) -> String {
        format!("Render {}", self.dest.display())
    }

    fn resource_type(&self) -> &'static str {
        "template"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.dest.is_file() {
            return Ok(ResourceState::Absent);
        }

        let on_disk = fs::read(&self.dest)
            .with_context(|| format!("Failed to read {}", self.dest.display()))?;
        Ok(ResourceState::Present {
            details: Some(Self::content_hash(&on_disk)),
        })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(Self::content_hash(self.rendered.as_bytes())),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        let existed = self.dest.is_file();
        if existed && self.current_state()? == self.desired_state() {
            return Ok(ApplyResult::NoChange);
        }

        self.write()?;

        if existed {
            Ok(ApplyResult::Modified)
        } else {
            Ok(ApplyResult::Created)
        }
    }

    fn render_diff(&self) -> Option<(String, String)> {
        let current = fs::read_to_string(&self.dest).unwrap_or_default();
        Some((current, self.rendered.clone()))
    }
}
