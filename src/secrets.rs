//! Secrets store
//!
//! Credentials live outside the recipe in JSON bundles under the secrets
//! directory, addressed by namespace and item:
//! `<secrets>/<namespace>/<item>.json`. Bundles are fetched at convergence
//! time and never written back; values stay out of state files and logs.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::{Deserializer, Error as DeError};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::config::SecretsRef;

/// Handle to the on-disk secrets store
#[derive(Debug, Clone)]
pub struct SecretsStore {
    root: PathBuf,
}

impl SecretsStore {
    /// Open the store at the configured secrets directory
    pub fn open() -> Result<Self> {
        Ok(Self {
            root: crate::paths::secrets_dir()?,
        })
    }

    /// Open a store at an explicit root
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Fetch a raw secrets item
    pub fn load(&self, namespace: &str, item: &str) -> Result<serde_json::Value> {
        let path = self.root.join(namespace).join(format!("{item}.json"));
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read secrets item: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in secrets item: {}", path.display()))
    }

    /// Fetch and type the database credential bundle
    pub fn database_credentials(&self, secrets: &SecretsRef) -> Result<DatabaseCredentials> {
        let value = self.load(&secrets.namespace, &secrets.item)?;
        serde_json::from_value(value).with_context(|| {
            format!(
                "Malformed credential bundle {}/{}",
                secrets.namespace, secrets.item
            )
        })
    }
}

/// Database credential bundle
///
/// Field names follow the stored bundle (`user`, `passwd`, `host`, `port`);
/// `port` is accepted as either a number or a string.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub user: String,
    #[serde(rename = "passwd")]
    pub password: String,
    pub host: String,
    #[serde(deserialize_with = "port_from_value", default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    5432
}

fn port_from_value<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(port) => Ok(port),
        PortValue::Text(text) => text
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid port: {text}"))),
    }
}

// Keep the password out of debug output and error chains.
impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(namespace: &str, item: &str, json: &str) -> (tempfile::TempDir, SecretsStore) {
        let dir = tempfile::tempdir().unwrap();
        let ns_dir = dir.path().join(namespace);
        fs::create_dir_all(&ns_dir).unwrap();
        fs::write(ns_dir.join(format!("{item}.json")), json).unwrap();
        let store = SecretsStore::at(dir.path());
        (dir, store)
    }

    #[test]
    fn test_load_database_credentials() {
        let (_dir, store) = store_with(
            "wiki",
            "postgres",
            r#"{"user": "wiki", "passwd": "s3cret", "host": "db.internal", "port": 5432}"#,
        );

        let creds = store
            .database_credentials(&SecretsRef::default())
            .unwrap();
        assert_eq!(creds.user, "wiki");
        assert_eq!(creds.password, "s3cret");
        assert_eq!(creds.host, "db.internal");
        assert_eq!(creds.port, 5432);
    }

    #[test]
    fn test_port_accepts_string() {
        let (_dir, store) = store_with(
            "wiki",
            "postgres",
            r#"{"user": "wiki", "passwd": "x", "host": "localhost", "port": "5433"}"#,
        );

        let creds = store
            .database_credentials(&SecretsRef::default())
            .unwrap();
        assert_eq!(creds.port, 5433);
    }

    #[test]
    fn test_missing_item_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretsStore::at(dir.path());
        assert!(store.load("wiki", "postgres").is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = DatabaseCredentials {
            user: "wiki".into(),
            password: "s3cret".into(),
            host: "localhost".into(),
            port: 5432,
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }
}
