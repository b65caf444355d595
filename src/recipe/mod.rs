//! The wiki host recipe
//!
//! Assembles the ordered execution plan from node attributes and the
//! secrets store. The ordering is the dependency declaration: repositories
//! before packages, the toolchain before the source build, the checkout
//! before the templates rendered into it, everything before the service
//! unit that starts the application.

use anyhow::{Context, Result};
use converge::ExecutionPlan;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::NodeConfig;
use crate::resource::{
    Archive, DbMigration, Directory, GitCheckout, Package, PackageRepo, RemoteFile, Script,
    SystemdUnit, TemplateFile, UnitFile,
};
use crate::secrets::SecretsStore;
use crate::state;

const DATABASE_YML: &str = include_str!("templates/database.yml.tmpl");
const PGPASS: &str = include_str!("templates/pgpass.tmpl");
const GEMFILE: &str = include_str!("templates/Gemfile.tmpl");

/// Build the convergence plan for this node
pub fn build_plan(node: &NodeConfig, secrets: &SecretsStore) -> Result<ExecutionPlan> {
    let mut plan = ExecutionPlan::new();

    let home = node.host.home_dir();
    let app_dir = node.app.install_dir(&home);
    let user = node.host.user.as_str();
    let group = node.host.group.as_str();

    // Package repositories, gated on the node's platform version
    for repo in node.active_repos() {
        plan.push(Box::new(PackageRepo::new(repo.clone())));
    }

    // Toolchain for the source build
    for name in &node.packages.build {
        plan.push(Box::new(Package::install(name)));
    }

    // Library built from source: staging dir, tarball, extract, build.
    // The installed shared object guards the build.
    let staging = PathBuf::from(&node.library.staging_dir);
    plan.push(Box::new(
        Directory::new(&staging).owner(user).group(group).mode(0o755),
    ));

    let tarball = staging.join(node.library.archive_name());
    plan.push(Box::new(RemoteFile::new(&node.library.url, &tarball)));

    let unpacked = staging.join(&node.library.unpacked_dir);
    plan.push(Box::new(Archive::new(&tarball, &staging, &unpacked)));

    plan.push(Box::new(
        Script::new("build library", "./configure\nmake\nmake install")
            .cwd(&unpacked)
            .creates(&node.library.installed_artifact),
    ));

    // Runtime stack
    for name in &node.packages.runtime {
        plan.push(Box::new(Package::install(name)));
    }

    // Credentials are fetched at plan build time and flow only into
    // rendered templates and the migration step.
    let creds = secrets
        .database_credentials(&node.secrets)
        .context("Failed to fetch database credentials")?;
    let db_vars = database_vars(node, &creds);

    // Application checkout as the service account
    plan.push(Box::new(
        GitCheckout::new(&node.app.repo_url, &node.app.revision, &app_dir).user(user),
    ));

    // Rendered configuration: manifest and database config before the
    // dependency install, credential file alongside.
    plan.push(Box::new(
        TemplateFile::new(app_dir.join("Gemfile"), GEMFILE, &BTreeMap::new())?
            .owner(user)
            .group(group),
    ));
    plan.push(Box::new(
        TemplateFile::new(app_dir.join("config/database.yml"), DATABASE_YML, &db_vars)?
            .owner(user)
            .group(group),
    ));
    plan.push(Box::new(
        Script::new("bundle install", "bundle install")
            .cwd(&app_dir)
            .user(user)
            .creates(app_dir.join("Gemfile.lock")),
    ));
    plan.push(Box::new(
        TemplateFile::new(home.join(".pgpass"), PGPASS, &db_vars)?
            .owner(user)
            .group(group)
            .mode(0o600),
    ));

    // Let the unprivileged interpreter bind the service port
    let ruby = &node.app.ruby_bin;
    plan.push(Box::new(
        Script::new(
            "grant port bind capability",
            &format!("setcap 'cap_net_bind_service=+ep' {ruby}"),
        )
        .not_if(&format!("getcap {ruby} | grep -q cap_net_bind_service")),
    ));

    // One-time data migration on development nodes: install the conversion
    // tools, migrate, remove the tools again. The whole block disappears
    // once the marker exists.
    if node.environment.is_development() {
        let marker = state::marker_path("db_migration")?;
        if !marker.is_file() {
            for name in &node.packages.migration {
                plan.push(Box::new(Package::install(name)));
            }
            plan.push(Box::new(DbMigration::new(
                app_dir.join(&node.database.sqlite_path),
                app_dir.join(&node.database.dump_path),
                &node.database.name,
                marker,
                creds,
            )));
            for name in &node.packages.migration {
                plan.push(Box::new(Package::remove(name)));
            }
        }
    }

    // The service unit, created, enabled and started last
    plan.push(Box::new(SystemdUnit::new(service_unit(node, &app_dir))));

    Ok(plan)
}

/// Variables for the database-facing templates
fn database_vars(
    node: &NodeConfig,
    creds: &crate::secrets::DatabaseCredentials,
) -> BTreeMap<String, String> {
    crate::template::vars([
        ("database", node.database.name.as_str()),
        ("user", creds.user.as_str()),
        ("password", creds.password.as_str()),
        ("host", creds.host.as_str()),
        ("port", &creds.port.to_string()),
    ])
}

/// The application's systemd unit
fn service_unit(node: &NodeConfig, app_dir: &std::path::Path) -> UnitFile {
    let working_dir = app_dir.to_string_lossy();
    let exec_start = node.app.exec_start();

    UnitFile::new(&node.app.unit_name)
        .section(
            "Unit",
            [
                ("Description", "Wiki application daemon"),
                ("After", "network.target"),
            ],
        )
        .section(
            "Service",
            [
                ("WorkingDirectory", working_dir.as_ref()),
                ("ExecStart", exec_start.as_str()),
                ("Restart", "always"),
                ("Type", "simple"),
                ("User", node.host.user.as_str()),
                ("Group", node.host.group.as_str()),
            ],
        )
        .section("Install", [("WantedBy", "multi-user.target")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    fn test_secrets() -> (SecretsStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ns = dir.path().join("wiki");
        std::fs::create_dir_all(&ns).unwrap();
        std::fs::write(
            ns.join("postgres.json"),
            r#"{"user": "wiki", "passwd": "s3cret", "host": "db.internal", "port": 5432}"#,
        )
        .unwrap();
        (SecretsStore::at(dir.path()), dir)
    }

    fn types_of(plan: &ExecutionPlan) -> Vec<&'static str> {
        plan.resources.iter().map(|r| r.resource_type()).collect()
    }

    #[test]
    fn test_production_plan_shape() {
        let (store, _dir) = test_secrets();
        let node = NodeConfig::default();

        let plan = build_plan(&node, &store).unwrap();
        let types = types_of(&plan);

        // Default platform version matches no gated repo
        assert!(!types.contains(&"package_repo"));
        // 3 toolchain + 11 runtime packages
        assert_eq!(types.iter().filter(|t| **t == "package").count(), 14);
        // No migration outside development
        assert!(!types.contains(&"db_migration"));
        // The unit comes last
        assert_eq!(*types.last().unwrap(), "systemd_unit");
        // Source build pipeline is ordered download → extract → build
        let dl = types.iter().position(|t| *t == "remote_file").unwrap();
        let ar = types.iter().position(|t| *t == "archive").unwrap();
        let sc = types.iter().position(|t| *t == "script").unwrap();
        assert!(dl < ar && ar < sc);
    }

    #[test]
    fn test_platform_gated_repo_included() {
        let (store, _dir) = test_secrets();
        let node = NodeConfig {
            platform_version: "42.3".to_string(),
            ..Default::default()
        };

        let plan = build_plan(&node, &store).unwrap();
        assert_eq!(plan.resources[0].resource_type(), "package_repo");
        assert_eq!(plan.resources[0].id(), "devel:languages:ruby:extensions");
    }

    #[test]
    fn test_development_plan_includes_migration() {
        let (store, _dir) = test_secrets();
        let node = NodeConfig {
            environment: Environment::Development,
            ..Default::default()
        };

        let plan = build_plan(&node, &store).unwrap();
        let types = types_of(&plan);

        assert!(types.contains(&"db_migration"));
        // Conversion tools are installed before and removed after
        let migration = types.iter().position(|t| *t == "db_migration").unwrap();
        let removes: Vec<_> = plan
            .resources
            .iter()
            .enumerate()
            .filter(|(_, r)| r.description().starts_with("Remove"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(removes.len(), 2);
        assert!(removes.iter().all(|i| *i > migration));
    }

    #[test]
    fn test_templates_render_credentials() {
        let (store, _dir) = test_secrets();
        let node = NodeConfig::default();

        let plan = build_plan(&node, &store).unwrap();
        let pgpass = plan
            .resources
            .iter()
            .find(|r| r.id().ends_with(".pgpass"))
            .unwrap();

        let (_, desired) = pgpass.render_diff().unwrap();
        assert_eq!(desired, "db.internal:5432:*:wiki:s3cret\n");
    }

    #[test]
    fn test_service_unit_content() {
        let node = NodeConfig::default();
        let app_dir = node.app.install_dir(&node.host.home_dir());
        let unit = service_unit(&node, &app_dir);
        let rendered = unit.render();

        assert!(rendered.contains("WorkingDirectory=/home/wiki/wiki"));
        assert!(rendered.contains(
            "ExecStart=/usr/bin/bundler.ruby2.3 exec instiki -e production --port=80"
        ));
        assert!(rendered.contains("Restart=always"));
        assert!(rendered.contains("WantedBy=multi-user.target"));
    }
}
