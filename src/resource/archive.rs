//! Archive resource - .tar.gz extraction

use anyhow::{Context, Result};
use converge::{ApplyContext, ApplyResult, Guard, Resource, ResourceState};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::PathBuf;

/// A .tar.gz unpacked into a directory
///
/// `creates` names the directory the tarball produces; it doubles as the
/// idempotency guard, so an unpacked tree is never extracted again.
#[derive(Debug, Clone)]
pub struct Archive {
    pub archive: PathBuf,
    pub unpack_into: PathBuf,
    pub creates: PathBuf,
}

impl Archive {
    pub fn new(
        archive: impl Into<PathBuf>,
        unpack_into: impl Into<PathBuf>,
        creates: impl Into<PathBuf>,
    ) -> Self {
        Self {
            archive: archive.into(),
            unpack_into: unpack_into.into(),
            creates: creates.into(),
        }
    }

    fn extract(&self) -> Result<()> {
        let file = File::open(&self.archive)
            .with_context(|| format!("Failed to open archive {}", self.archive.display()))?;
        let decoder = GzDecoder::new(file);
        let mut tar = tar::Archive::new(decoder);
        tar.unpack(&self.unpack_into).with_context(|| {
            format!(
                "Failed to extract {} into {}",
                self.archive.display(),
                self.unpack_into.display()
            )
        })?;
        Ok(())
    }
}

impl Resource for Archive {
    fn id(&self) -> String {
        self.archive.to_string_lossy().to_string()
    }

    fn description(&self) -> String {
        format!(
            "Extract {} into {}",
            self.archive.display(),
            self.unpack_into.display()
        )
    }

    fn resource_type(&self) -> &'static str {
        "archive"
    }

    fn guard(&self) -> Option<Guard> {
        Some(Guard::creates_dir(&self.creates))
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.creates.is_dir() {
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

        if self.creates.is_dir() {
            return Ok(ApplyResult::NoChange);
        }

        self.extract()?;
        Ok(ApplyResult::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    /// Build a small .tar.gz holding `dir_name/configure`
    fn make_tarball(path: &std::path::Path, dir_name: &str) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let content = b"#!/bin/sh\nexit 0\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(
                &mut header,
                format!("{dir_name}/configure"),
                content.as_slice(),
            )
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
    }

    #[test]
    fn test_extract_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tarball = dir.path().join("libiconv-1.15.tar.gz");
        make_tarball(&tarball, "libiconv-1.15");

        let unpacked = dir.path().join("libiconv-1.15");
        let resource = Archive::new(&tarball, dir.path(), &unpacked);

        assert_eq!(resource.current_state().unwrap(), ResourceState::Absent);
        assert!(!resource.guard().unwrap().is_satisfied().unwrap());

        let mut ctx = ApplyContext::new(false, false);
        assert_eq!(resource.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert!(unpacked.join("configure").is_file());

        // Second apply is a no-op and the guard now short-circuits
        assert_eq!(resource.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
        assert!(resource.guard().unwrap().is_satisfied().unwrap());
        assert!(!resource.needs_apply().unwrap());
    }
}
