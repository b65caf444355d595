//! Convergence walk - applies resources sequentially, in order
//!
//! The walk visits every resource top to bottom. Resources whose guard is
//! satisfied or whose state already matches are counted as unchanged; a
//! failed apply stops the walk immediately, leaving later resources
//! untouched.

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::compute_diffs;
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;

/// Execute a plan with the given options and callbacks
///
/// # Arguments
/// * `plan` - The execution plan to walk
/// * `opts` - Execution options (dry_run, verbose)
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
///
/// # Returns
/// Summary of the walk. A summary with `failed > 0` means the walk was
/// aborted at the failing resource.
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let diffs = compute_diffs(&plan.resources);

    if diffs.is_empty() {
        return Ok(ExecuteSummary::default());
    }

    // Confirm before proceeding (unless dry_run)
    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: diffs.len(),
            ..Default::default()
        });
    }

    if opts.dry_run {
        return Ok(ExecuteSummary::default());
    }

    let mut summary = ExecuteSummary::default();

    progress.on_walk_start(diffs.len());
    for resource in &plan.resources {
        if !resource.needs_apply()? {
            summary.add_result(&ApplyResult::NoChange);
            continue;
        }

        progress.on_resource_start(&resource.id(), &resource.description());
        let result = apply_resource(resource.as_ref(), opts.verbose);
        progress.on_resource_complete(&resource.id(), &result);

        let failed = !result.is_success();
        summary.add_result(&result);

        // First failure aborts the walk
        if failed {
            break;
        }
    }
    progress.on_walk_complete();

    Ok(summary)
}

/// Apply a single resource
fn apply_resource(resource: &dyn Resource, verbose: bool) -> ApplyResult {
    let mut ctx = ApplyContext::new(false, verbose);

    match resource.apply(&mut ctx) {
        Ok(result) => result,
        Err(e) => ApplyResult::Failed {
            error: format!("{e:#}"),
        },
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::types::ResourceState;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestResource {
        id: String,
        should_change: bool,
        fail: bool,
        applies: Arc<AtomicUsize>,
    }

    impl TestResource {
        fn new(id: &str, should_change: bool, applies: &Arc<AtomicUsize>) -> Self {
            Self {
                id: id.into(),
                should_change,
                fail: false,
                applies: Arc::clone(applies),
            }
        }

        fn failing(id: &str, applies: &Arc<AtomicUsize>) -> Self {
            Self {
                id: id.into(),
                should_change: true,
                fail: true,
                applies: Arc::clone(applies),
            }
        }
    }

    impl Resource for TestResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.id)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn current_state(&self) -> Result<ResourceState> {
            if self.should_change {
                Ok(ResourceState::Absent)
            } else {
                Ok(ResourceState::Present { details: None })
            }
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Present { details: None }
        }

        fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
            if ctx.dry_run {
                return Ok(ApplyResult::Skipped {
                    reason: "Dry run".into(),
                });
            }
            self.applies.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("intentional failure");
            }
            if self.should_change {
                Ok(ApplyResult::Created)
            } else {
                Ok(ApplyResult::NoChange)
            }
        }
    }

    #[test]
    fn test_execute_empty_plan() {
        let plan = ExecutionPlan::new();
        let result = execute_simple(plan, ExecuteOptions::default()).unwrap();
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_no_drift_means_no_mutations() {
        let applies = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.push(Box::new(TestResource::new("a", false, &applies)));
        plan.push(Box::new(TestResource::new("b", false, &applies)));

        let result = execute_simple(plan, ExecuteOptions::default()).unwrap();

        // No diff means no execution at all
        assert_eq!(result.total(), 0);
        assert_eq!(applies.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_execute_with_changes() {
        let applies = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.push(Box::new(TestResource::new("a", true, &applies)));
        plan.push(Box::new(TestResource::new("b", false, &applies)));

        let result = execute_simple(plan, ExecuteOptions::default()).unwrap();

        assert_eq!(result.created, 1);
        assert_eq!(result.no_change, 1);
        assert_eq!(applies.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dry_run_applies_nothing() {
        let applies = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.push(Box::new(TestResource::new("a", true, &applies)));

        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        execute_simple(plan, opts).unwrap();
        assert_eq!(applies.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_declined_confirmation_skips_all() {
        let applies = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.push(Box::new(TestResource::new("a", true, &applies)));

        let result = execute(
            plan,
            ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(result.skipped, 1);
        assert_eq!(applies.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failure_aborts_walk() {
        let applies = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.push(Box::new(TestResource::failing("a", &applies)));
        plan.push(Box::new(TestResource::new("b", true, &applies)));

        let result = execute(
            plan,
            ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(result.failed, 1);
        assert_eq!(result.created, 0);
        // Only the failing resource ran; the walk stopped before "b"
        assert_eq!(applies.load(Ordering::SeqCst), 1);
    }
}
