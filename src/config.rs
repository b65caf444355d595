//! Node attributes
//!
//! `node.toml` describes the target host: platform, deployment environment,
//! the account the application runs under, package sets, the library built
//! from source, and where the application is checked out. Defaults describe
//! the stock openSUSE Leap wiki host, so an empty config file (or none at
//! all) converges the standard setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use zypp::Repository;

/// Deployment environment of the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
        }
    }
}

/// The unified node configuration structure
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Platform version of the target host (e.g. "42.3")
    #[serde(default)]
    pub platform_version: String,

    /// Deployment stage
    #[serde(default)]
    pub environment: Environment,

    /// Account the application runs under
    #[serde(default)]
    pub host: HostConfig,

    /// Application checkout and service settings
    #[serde(default)]
    pub app: AppConfig,

    /// Package sets
    #[serde(default)]
    pub packages: PackagesConfig,

    /// Extra package repositories, optionally gated on platform version
    #[serde(default = "default_repos")]
    pub repos: Vec<RepoEntry>,

    /// Library compiled from source
    #[serde(default)]
    pub library: LibraryConfig,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Secrets store reference for database credentials
    #[serde(default)]
    pub secrets: SecretsRef,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            platform_version: String::new(),
            environment: Environment::default(),
            host: HostConfig::default(),
            app: AppConfig::default(),
            packages: PackagesConfig::default(),
            repos: default_repos(),
            library: LibraryConfig::default(),
            database: DatabaseConfig::default(),
            secrets: SecretsRef::default(),
        }
    }
}

impl NodeConfig {
    /// Load node.toml from the config directory, or defaults if absent
    pub fn load() -> Result<Self> {
        let config_path = crate::paths::config_dir()?.join("node.toml");

        if !config_path.exists() {
            log::debug!("No node.toml, using default node attributes");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Could not read config file: {}", config_path.display()))?;

        let config: Self =
            toml::from_str(&content).context("Invalid TOML format in node config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.user.is_empty() {
            anyhow::bail!("host.user cannot be empty");
        }
        if self.host.group.is_empty() {
            anyhow::bail!("host.group cannot be empty");
        }
        if self.app.repo_url.is_empty() {
            anyhow::bail!("app.repo_url cannot be empty");
        }
        for repo in &self.repos {
            if repo.repo.alias.is_empty() {
                anyhow::bail!("repository alias cannot be empty");
            }
        }
        Ok(())
    }

    /// Repositories active for this node's platform version
    pub fn active_repos(&self) -> Vec<&Repository> {
        self.repos
            .iter()
            .filter(|entry| {
                entry
                    .platform_version
                    .as_deref()
                    .is_none_or(|v| v == self.platform_version)
            })
            .map(|entry| &entry.repo)
            .collect()
    }
}

/// Account the application runs under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Service account name
    #[serde(default = "default_user")]
    pub user: String,

    /// Service account group
    #[serde(default = "default_group")]
    pub group: String,

    /// Home directory override (defaults to /home/<user>)
    #[serde(default)]
    pub home: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            user: default_user(),
            group: default_group(),
            home: None,
        }
    }
}

impl HostConfig {
    /// Home directory of the service account
    pub fn home_dir(&self) -> PathBuf {
        match &self.home {
            Some(home) => crate::paths::expand(home),
            None => PathBuf::from("/home").join(&self.user),
        }
    }
}

fn default_user() -> String {
    "wiki".to_string()
}

fn default_group() -> String {
    "users".to_string()
}

/// Application checkout and service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Git URL of the application repository
    #[serde(default = "default_repo_url")]
    pub repo_url: String,

    /// Revision to check out
    #[serde(default = "default_revision")]
    pub revision: String,

    /// Checkout directory name under the service account's home
    #[serde(default = "default_app_dir")]
    pub dir: String,

    /// Port the application binds
    #[serde(default = "default_port")]
    pub port: u16,

    /// Ruby interpreter installed by the runtime packages
    #[serde(default = "default_ruby_bin")]
    pub ruby_bin: String,

    /// Bundler executable installed by the runtime packages
    #[serde(default = "default_bundler_bin")]
    pub bundler_bin: String,

    /// Server executable the service unit runs
    #[serde(default = "default_server_bin")]
    pub server_bin: String,

    /// Name of the systemd unit
    #[serde(default = "default_unit_name")]
    pub unit_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            repo_url: default_repo_url(),
            revision: default_revision(),
            dir: default_app_dir(),
            port: default_port(),
            ruby_bin: default_ruby_bin(),
            bundler_bin: default_bundler_bin(),
            server_bin: default_server_bin(),
            unit_name: default_unit_name(),
        }
    }
}

impl AppConfig {
    /// Checkout directory under the given home
    pub fn install_dir(&self, home: &std::path::Path) -> PathBuf {
        home.join(&self.dir)
    }

    /// ExecStart line for the service unit
    pub fn exec_start(&self) -> String {
        format!(
            "{} exec {} -e production --port={}",
            self.bundler_bin, self.server_bin, self.port
        )
    }
}

fn default_repo_url() -> String {
    "https://github.com/parasew/instiki".to_string()
}

fn default_revision() -> String {
    "master".to_string()
}

fn default_app_dir() -> String {
    "wiki".to_string()
}

fn default_port() -> u16 {
    80
}

fn default_ruby_bin() -> String {
    "/usr/bin/ruby.ruby2.3".to_string()
}

fn default_bundler_bin() -> String {
    "/usr/bin/bundler.ruby2.3".to_string()
}

fn default_server_bin() -> String {
    "instiki".to_string()
}

fn default_unit_name() -> String {
    "wiki.service".to_string()
}

/// Package sets installed during convergence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagesConfig {
    /// Toolchain needed to build the source library
    #[serde(default = "default_build_packages")]
    pub build: Vec<String>,

    /// Runtime stack for the application
    #[serde(default = "default_runtime_packages")]
    pub runtime: Vec<String>,

    /// Conversion tools installed only for the one-time migration
    #[serde(default = "default_migration_packages")]
    pub migration: Vec<String>,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            build: default_build_packages(),
            runtime: default_runtime_packages(),
            migration: default_migration_packages(),
        }
    }
}

fn default_build_packages() -> Vec<String> {
    ["gcc", "glibc-devel", "make"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_runtime_packages() -> Vec<String> {
    [
        "ruby2.3",
        "ruby2.3-devel",
        "ruby2.3-rubygem-RedCloth",
        "ruby2.3-rubygem-bundler",
        "ruby2.3-rubygem-eventmachine",
        "ruby2.3-rubygem-sqlite3",
        "zlib-devel",
        "ruby2.3-rubygem-pg",
        "postgresql-devel",
        "libxslt1",
        "libcap-progs",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_migration_packages() -> Vec<String> {
    ["postgresql", "sqlite3"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// A package repository, optionally gated on a platform version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoEntry {
    /// Only configure this repo when the node matches this platform version
    #[serde(default)]
    pub platform_version: Option<String>,

    #[serde(flatten)]
    pub repo: Repository,
}

fn default_repos() -> Vec<RepoEntry> {
    vec![RepoEntry {
        platform_version: Some("42.3".to_string()),
        repo: Repository {
            alias: "devel:languages:ruby:extensions".to_string(),
            baseurl: "https://download.opensuse.org".to_string(),
            path: "/repositories/devel:languages:ruby:extensions/openSUSE_Leap_42.3/".to_string(),
            autorefresh: true,
            gpgcheck: false,
        },
    }]
}

/// Library compiled from source during convergence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Source tarball URL
    #[serde(default = "default_library_url")]
    pub url: String,

    /// Directory the tarball unpacks to
    #[serde(default = "default_library_dir")]
    pub unpacked_dir: String,

    /// Artifact whose presence marks the build as done
    #[serde(default = "default_library_artifact")]
    pub installed_artifact: String,

    /// Staging directory for download and build
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            url: default_library_url(),
            unpacked_dir: default_library_dir(),
            installed_artifact: default_library_artifact(),
            staging_dir: default_staging_dir(),
        }
    }
}

impl LibraryConfig {
    /// Tarball file name, taken from the URL
    pub fn archive_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(self.url.as_str())
    }
}

fn default_library_url() -> String {
    "https://ftp.gnu.org/pub/gnu/libiconv/libiconv-1.15.tar.gz".to_string()
}

fn default_library_dir() -> String {
    "libiconv-1.15".to_string()
}

fn default_library_artifact() -> String {
    "/usr/local/lib64/libiconv.so".to_string()
}

fn default_staging_dir() -> String {
    "/tmp/.wikistead_installer".to_string()
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL database name
    #[serde(default = "default_db_name")]
    pub name: String,

    /// SQLite file to migrate, relative to the application checkout
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Transformed dump file, relative to the application checkout
    #[serde(default = "default_dump_path")]
    pub dump_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: default_db_name(),
            sqlite_path: default_sqlite_path(),
            dump_path: default_dump_path(),
        }
    }
}

fn default_db_name() -> String {
    "wiki_production".to_string()
}

fn default_sqlite_path() -> String {
    "db/production.db.sqlite3".to_string()
}

fn default_dump_path() -> String {
    "db/production.db.psql".to_string()
}

/// Reference into the secrets store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsRef {
    /// Secrets namespace
    #[serde(default = "default_secrets_namespace")]
    pub namespace: String,

    /// Item within the namespace
    #[serde(default = "default_secrets_item")]
    pub item: String,
}

impl Default for SecretsRef {
    fn default() -> Self {
        Self {
            namespace: default_secrets_namespace(),
            item: default_secrets_item(),
        }
    }
}

fn default_secrets_namespace() -> String {
    "wiki".to_string()
}

fn default_secrets_item() -> String {
    "postgres".to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_example_config() {
        let toml = r#"
platform_version = "42.3"
environment = "development"

[host]
user = "wiki"
group = "users"

[app]
repo_url = "https://github.com/parasew/instiki"
revision = "master"
port = 80

[[repos]]
platform_version = "42.3"
alias = "devel:languages:ruby:extensions"
baseurl = "https://download.opensuse.org"
path = "/repositories/devel:languages:ruby:extensions/openSUSE_Leap_42.3/"
autorefresh = true
gpgcheck = false

[database]
name = "wiki_production"

[secrets]
namespace = "wiki"
item = "postgres"
"#;

        let config: NodeConfig = toml::from_str(toml).expect("Failed to parse config");

        assert_eq!(config.platform_version, "42.3");
        assert!(config.environment.is_development());
        assert_eq!(config.host.user, "wiki");
        assert_eq!(config.host.home_dir(), PathBuf::from("/home/wiki"));
        assert_eq!(config.repos.len(), 1);
        assert_eq!(config.active_repos().len(), 1);
        assert_eq!(config.database.name, "wiki_production");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_reproduce_stock_recipe() {
        let config = NodeConfig::default();

        assert_eq!(config.packages.build, vec!["gcc", "glibc-devel", "make"]);
        assert!(config.packages.runtime.contains(&"ruby2.3".to_string()));
        assert!(config.packages.runtime.contains(&"libcap-progs".to_string()));
        assert_eq!(config.packages.migration, vec!["postgresql", "sqlite3"]);
        assert_eq!(config.library.archive_name(), "libiconv-1.15.tar.gz");
        assert_eq!(
            config.app.exec_start(),
            "/usr/bin/bundler.ruby2.3 exec instiki -e production --port=80"
        );
        assert!(!config.environment.is_development());
    }

    #[test]
    fn test_repo_platform_gating() {
        let mut config = NodeConfig {
            platform_version: "15.0".to_string(),
            ..Default::default()
        };
        // The stock repo entry is pinned to 42.3
        assert!(config.active_repos().is_empty());

        config.platform_version = "42.3".to_string();
        assert_eq!(config.active_repos().len(), 1);

        // Ungated repos apply everywhere
        config.repos.push(RepoEntry {
            platform_version: None,
            repo: Repository {
                alias: "extra".into(),
                baseurl: "https://mirror.example.org".into(),
                path: String::new(),
                autorefresh: false,
                gpgcheck: true,
            },
        });
        config.platform_version = "15.0".to_string();
        assert_eq!(config.active_repos().len(), 1);
        assert_eq!(config.active_repos()[0].alias, "extra");
    }

    #[test]
    fn test_validation_rejects_empty_user() {
        let config = NodeConfig {
            host: HostConfig {
                user: String::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_home_overrides_derived() {
        let host = HostConfig {
            user: "wiki".into(),
            group: "users".into(),
            home: Some("/srv/wiki".into()),
        };
        assert_eq!(host.home_dir(), PathBuf::from("/srv/wiki"));
    }
}
