//! # Converge
//!
//! A small framework for declarative resource convergence.
//!
//! A recipe is an ordered list of resources, each declaring a desired
//! end-state and optionally an idempotency guard. The executor walks the
//! list top to bottom, compares current state to desired state, and applies
//! only the necessary changes. A satisfied guard skips the resource
//! entirely; a failed apply aborts the walk.
//!
//! ## Core Concepts
//!
//! - **Resource**: something with state that can be managed (a package, a
//!   rendered file, a service unit)
//! - **Guard**: a predicate that skips the action when the end-state
//!   already holds (`creates` a path, `not_if` a command)
//! - **ExecutionPlan**: an ordered list of resources
//! - **Executor**: the sequential convergence walk
//!
//! ## Example
//!
//! ```ignore
//! use converge::{
//!     Resource, ResourceState, ApplyResult, ApplyContext,
//!     ExecutionPlan, ExecuteOptions, execute_simple,
//! };
//!
//! #[derive(Debug)]
//! struct FileResource { path: String, content: String }
//!
//! impl Resource for FileResource {
//!     fn id(&self) -> String { self.path.clone() }
//!     fn description(&self) -> String { format!("File: {}", self.path) }
//!     fn resource_type(&self) -> &'static str { "file" }
//!
//!     fn current_state(&self) -> anyhow::Result<ResourceState> {
//!         if std::path::Path::new(&self.path).exists() {
//!             Ok(ResourceState::Present { details: None })
//!         } else {
//!             Ok(ResourceState::Absent)
//!         }
//!     }
//!
//!     fn desired_state(&self) -> ResourceState {
//!         ResourceState::Present { details: None }
//!     }
//!
//!     fn apply(&self, ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
//!         if ctx.dry_run {
//!             return Ok(ApplyResult::Skipped { reason: "Dry run".into() });
//!         }
//!         std::fs::write(&self.path, &self.content)?;
//!         Ok(ApplyResult::Created)
//!     }
//! }
//!
//! let mut plan = ExecutionPlan::new();
//! plan.push(Box::new(FileResource {
//!     path: "/tmp/test.txt".into(),
//!     content: "hello".into(),
//! }));
//!
//! let summary = execute_simple(plan, ExecuteOptions::default())?;
//! ```
//!
//! ## Provider Traits
//!
//! [`ProgressCallback`] and [`ConfirmCallback`] let a CLI attach progress
//! bars and confirmation prompts without the engine depending on any UI
//! framework.

pub mod context;
pub mod diff;
pub mod executor;
pub mod guard;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use executor::{execute, execute_simple};
pub use guard::Guard;
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, ResourceState};
