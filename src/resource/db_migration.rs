//! One-time database migration resource
//!
//! Dumps the application's SQLite database, rewrites the dump into
//! PostgreSQL SQL, recreates the target database and loads it, then
//! realigns the id sequences. Guarded by a marker file so the whole
//! migration runs at most once per host.

use anyhow::{Context, Result, bail};
use converge::{ApplyContext, ApplyResult, Guard, Resource, ResourceState};
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use crate::migrate;
use crate::secrets::DatabaseCredentials;

/// The SQLite → PostgreSQL migration step
#[derive(Debug)]
pub struct DbMigration {
    /// SQLite database file to migrate
    pub sqlite_path: PathBuf,
    /// Where the transformed dump is written
    pub dump_path: PathBuf,
    /// Target PostgreSQL database name
    pub database: String,
    /// Marker file recording a completed migration
    pub marker: PathBuf,
    creds: DatabaseCredentials,
}

impl DbMigration {
    pub fn new(
        sqlite_path: impl Into<PathBuf>,
        dump_path: impl Into<PathBuf>,
        database: &str,
        marker: impl Into<PathBuf>,
        creds: DatabaseCredentials,
    ) -> Self {
        Self {
            sqlite_path: sqlite_path.into(),
            dump_path: dump_path.into(),
            database: database.to_string(),
            marker: marker.into(),
            creds,
        }
    }

    /// Connection arguments shared by the postgres CLIs
    fn conn_args(&self) -> Vec<String> {
        vec![
            "-U".to_string(),
            self.creds.user.clone(),
            "-h".to_string(),
            self.creds.host.clone(),
            "-p".to_string(),
            self.creds.port.to_string(),
        ]
    }

    /// Run a postgres CLI with the credential bundle's password
    fn run_pg(&self, program: &str, args: &[String]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .env("PGPASSWORD", &self.creds.password)
            .output()
            .with_context(|| format!("Failed to execute {program}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{program} failed: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn psql(&self, extra: &[String]) -> Result<String> {
        let mut args = self.conn_args();
        args.push("-d".to_string());
        args.push(self.database.clone());
        args.extend_from_slice(extra);
        self.run_pg("psql", &args)
    }

    /// Dump the SQLite database and write the transformed SQL
    fn write_converted_dump(&self) -> Result<()> {
        let sqlite = self.sqlite_path.to_string_lossy();
        let dump = crate::runner::run_capture("sqlite3", &[sqlite.as_ref(), ".dump"])
            .with_context(|| format!("Failed to dump {}", self.sqlite_path.display()))?;

        let converted = migrate::transform_dump(&dump);
        fs::write(&self.dump_path, converted)
            .with_context(|| format!("Failed to write {}", self.dump_path.display()))?;
        Ok(())
    }

    /// Drop and recreate the target database, then load the dump
    fn load_dump(&self) -> Result<()> {
        let mut drop_args = self.conn_args();
        drop_args.push("--if-exists".to_string());
        drop_args.push(self.database.clone());
        self.run_pg("dropdb", &drop_args)?;

        let mut create_args = self.conn_args();
        create_args.extend(
            [
                "--encoding=UTF8",
                "-T",
                "template0",
                "--lc-collate=C",
                "--lc-ctype=C",
            ]
            .map(String::from),
        );
        create_args.push(self.database.clone());
        self.run_pg("createdb", &create_args)?;

        self.psql(&[
            "-f".to_string(),
            self.dump_path.to_string_lossy().to_string(),
        ])?;
        Ok(())
    }

    /// Realign every id sequence with its table's max id
    fn fix_sequences(&self) -> Result<()> {
        let listing = self.psql(&[
            "-At".to_string(),
            "-c".to_string(),
            "select sequence_name from information_schema.sequences \
             where sequence_schema = 'public'"
                .to_string(),
        ])?;

        let sequences: Vec<String> = listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        for statement in migrate::sequence_fixups(&sequences) {
            self.psql(&["-c".to_string(), statement])?;
        }
        Ok(())
    }

    fn write_marker(&self) -> Result<()> {
        if let Some(parent) = self.marker.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.marker, "migrated\n")
            .with_context(|| format!("Failed to write {}", self.marker.display()))?;
        Ok(())
    }
}

impl Resource for DbMigration {
    fn id(&self) -> String {
        self.database.clone()
    }

    fn description(&self) -> String {
        format!(
            "Migrate {} to PostgreSQL database {}",
            self.sqlite_path.display(),
            self.database
        )
    }

    fn resource_type(&self) -> &'static str {
        "db_migration"
    }

    fn guard(&self) -> Option<Guard> {
        Some(Guard::creates(&self.marker))
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.marker.is_file() {
            Ok(ResourceState::Present {
                details: Some("migrated".to_string()),
            })
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some("migrated".to_string()),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        if self.marker.is_file() {
            return Ok(ApplyResult::NoChange);
        }

        self.write_converted_dump()?;
        self.load_dump()?;
        self.fix_sequences()?;
        self.write_marker()?;

        Ok(ApplyResult::Created)
    }
}
