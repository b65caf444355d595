//! Types shared across zypp operations.

use serde::{Deserialize, Serialize};

/// A zypper package repository.
///
/// The repository URL is split into `baseurl` and `path` the way mirror
/// hierarchies are usually published; [`Repository::url`] joins them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository alias (also used as the display name)
    pub alias: String,

    /// Mirror base, e.g. `https://download.opensuse.org`
    pub baseurl: String,

    /// Path below the mirror base, e.g. `/repositories/x/y/`
    #[serde(default)]
    pub path: String,

    /// Refresh metadata automatically
    #[serde(default)]
    pub autorefresh: bool,

    /// Verify repository GPG signatures
    #[serde(default = "default_true")]
    pub gpgcheck: bool,
}

fn default_true() -> bool {
    true
}

impl Repository {
    /// Full repository URL (baseurl + path).
    pub fn url(&self) -> String {
        let base = self.baseurl.trim_end_matches('/');
        if self.path.is_empty() {
            base.to_string()
        } else if self.path.starts_with('/') {
            format!("{base}{}", self.path)
        } else {
            format!("{base}/{}", self.path)
        }
    }
}
