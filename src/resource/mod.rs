//! Resource implementations for the wiki host recipe
//!
//! Every step of the recipe is a [`converge::Resource`]: state detection,
//! a guarded apply, and nothing else. The recipe module assembles them
//! into an ordered plan.

pub mod archive;
pub mod db_migration;
pub mod directory;
pub mod git_checkout;
pub mod package;
pub mod remote_file;
pub mod repository;
pub mod script;
pub mod systemd_unit;
pub mod template_file;

pub use archive::Archive;
pub use db_migration::DbMigration;
pub use directory::Directory;
pub use git_checkout::GitCheckout;
pub use package::Package;
pub use remote_file::RemoteFile;
pub use repository::PackageRepo;
pub use script::Script;
pub use systemd_unit::{SystemdUnit, UnitFile};
pub use template_file::TemplateFile;
