//! # zypp
//!
//! A small library for managing packages and repositories on zypper-based
//! systems (openSUSE, SLES).
//!
//! Presence is probed through the rpm database (`rpm -q`), mutations go
//! through the `zypper` CLI in non-interactive mode. The [`PackageBackend`]
//! trait abstracts the CLI so callers can substitute a mock in tests.
//!
//! ## Example
//!
//! ```no_run
//! use zypp::{PackageBackend, ZypperBackend};
//!
//! let backend = ZypperBackend::new();
//! if !backend.is_installed("gcc")? {
//!     backend.install("gcc")?;
//! }
//! # Ok::<(), zypp::Error>(())
//! ```

pub mod backend;
pub mod error;
pub mod types;

pub use backend::{PackageBackend, zypper::ZypperBackend};
pub use error::{Error, Result};
pub use types::Repository;
