//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state.

use crate::context::ApplyContext;
use crate::guard::Guard;
use crate::types::{ApplyResult, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource in the system implements this trait, which provides:
/// - Identity (id, description, type)
/// - An optional idempotency guard
/// - State detection (current vs desired)
/// - State convergence (apply)
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier for this resource
    ///
    /// This should be stable and uniquely identify the resource
    /// within its type. Examples:
    /// - "ruby2.3" for a package
    /// - "/etc/systemd/system/wiki.service" for a unit file
    /// - "build libiconv" for a script
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category
    ///
    /// Used for grouping and filtering. Examples:
    /// - "package", "package_repo"
    /// - "template", "script"
    /// - "systemd_unit"
    fn resource_type(&self) -> &'static str;

    /// Idempotency guard for this resource
    ///
    /// A satisfied guard means the end-state already holds and the
    /// resource is skipped without probing or applying.
    fn guard(&self) -> Option<Guard> {
        None
    }

    /// Detect the current state of this resource
    ///
    /// This should query the system to determine what state
    /// the resource is currently in.
    fn current_state(&self) -> Result<ResourceState>;

    /// Get the desired state for this resource
    ///
    /// This is typically derived from configuration.
    fn desired_state(&self) -> ResourceState;

    /// Check if the resource needs changes to reach desired state
    ///
    /// Default implementation evaluates the guard first, then compares
    /// current and desired states.
    fn needs_apply(&self) -> Result<bool> {
        if let Some(guard) = self.guard()
            && guard.is_satisfied()?
        {
            return Ok(false);
        }
        let current = self.current_state()?;
        let desired = self.desired_state();
        Ok(current != desired)
    }

    /// Apply changes to reach the desired state
    ///
    /// This method should:
    /// 1. Check if already in desired state (return NoChange)
    /// 2. Respect ctx.dry_run (return Skipped if true)
    /// 3. Make the necessary changes
    /// 4. Return the appropriate ApplyResult
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;

    /// Current and desired file content, for resources that render files
    ///
    /// Used by diff display to show a line-level content diff. Returns
    /// `None` for resources without a meaningful text rendering.
    fn render_diff(&self) -> Option<(String, String)> {
        None
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;
