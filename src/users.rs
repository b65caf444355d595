//! Local account lookups for ownership and run-as-user
//!
//! Resources chown rendered files to the application user and run checkout
//! and build steps under that account. Lookups parse /etc/passwd and
//! /etc/group directly; the recipe runs as root on hosts where NSS holds
//! local accounts only.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::PathBuf;

/// A local user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

/// Look up a user by name in /etc/passwd
pub fn lookup_user(name: &str) -> Result<User> {
    let content = fs::read_to_string("/etc/passwd").context("Failed to read /etc/passwd")?;
    match find_user(&content, name) {
        Some(user) => Ok(user),
        None => bail!("Unknown user: {name}"),
    }
}

/// Look up a group id by name in /etc/group
pub fn lookup_group(name: &str) -> Result<u32> {
    let content = fs::read_to_string("/etc/group").context("Failed to read /etc/group")?;
    match find_group(&content, name) {
        Some(gid) => Ok(gid),
        None => bail!("Unknown group: {name}"),
    }
}

/// Find a user entry in passwd-format content
fn find_user(content: &str, name: &str) -> Option<User> {
    content.lines().find_map(|line| {
        let mut fields = line.split(':');
        let entry_name = fields.next()?;
        if entry_name != name {
            return None;
        }
        let _password = fields.next()?;
        let uid = fields.next()?.parse().ok()?;
        let gid = fields.next()?.parse().ok()?;
        let _gecos = fields.next()?;
        let home = fields.next()?;
        Some(User {
            name: entry_name.to_string(),
            uid,
            gid,
            home: PathBuf::from(home),
        })
    })
}

/// Find a group id in group-format content
fn find_group(content: &str, name: &str) -> Option<u32> {
    content.lines().find_map(|line| {
        let mut fields = line.split(':');
        let entry_name = fields.next()?;
        if entry_name != name {
            return None;
        }
        let _password = fields.next()?;
        fields.next()?.parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWD: &str = "\
root:x:0:0:root:/root:/bin/bash
wiki:x:1001:100:Wiki service:/home/wiki:/bin/bash
nobody:x:65534:65533:nobody:/var/lib/nobody:/bin/false
";

    const GROUP: &str = "\
root:x:0:
users:x:100:wiki
wiki:x:1001:
";

    #[test]
    fn test_find_user() {
        let user = find_user(PASSWD, "wiki").unwrap();
        assert_eq!(user.uid, 1001);
        assert_eq!(user.gid, 100);
        assert_eq!(user.home, PathBuf::from("/home/wiki"));
    }

    #[test]
    fn test_find_user_missing() {
        assert!(find_user(PASSWD, "ghost").is_none());
    }

    #[test]
    fn test_find_group() {
        assert_eq!(find_group(GROUP, "users"), Some(100));
        assert_eq!(find_group(GROUP, "root"), Some(0));
        assert_eq!(find_group(GROUP, "ghost"), None);
    }
}
