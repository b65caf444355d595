//! Convergence walk with UI integration
//!
//! Walks the plan sequentially, top to bottom. The first failing resource
//! aborts the walk; everything after it is left untouched and the process
//! exits non-zero.

use anyhow::Result;
use colored::Colorize;
use converge::{ApplyContext, ApplyResult, ExecutionPlan, Resource};

use crate::engine::differ::{compute_diffs, display_diff};
use crate::progress;

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Execute the plan with progress display
pub fn execute(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<converge::ExecuteSummary> {
    // 1. Compute and display what will change
    let diffs = compute_diffs(&plan.resources);
    display_diff(&diffs);

    if diffs.is_empty() {
        return Ok(converge::ExecuteSummary::default());
    }

    // 2. Confirm (unless --yes)
    if !opts.yes && !opts.dry_run && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(converge::ExecuteSummary {
            skipped: diffs.len(),
            ..Default::default()
        });
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(converge::ExecuteSummary::default());
    }

    // 3. Sequential walk
    println!();
    println!("  {} Converging {} resources...", "→".cyan(), diffs.len());

    let pb = progress::bar(diffs.len() as u64, "Converging");
    let mut summary = converge::ExecuteSummary::default();

    for resource in &plan.resources {
        if !resource.needs_apply()? {
            summary.add_result(&ApplyResult::NoChange);
            continue;
        }

        pb.set_message(resource.id());
        let result = apply_resource(resource.as_ref(), opts.verbose);

        let symbol = match &result {
            ApplyResult::NoChange => "○",
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓",
            ApplyResult::Failed { .. } => "✗",
            ApplyResult::Skipped { .. } => "⊘",
        };
        pb.set_message(format!("{} {}", symbol, resource.id()));
        pb.inc(1);

        let failed = !result.is_success();
        if let ApplyResult::Failed { error } = &result {
            pb.suspend(|| {
                crate::ui::error(&format!("{}: {}", resource.id(), error));
            });
        }
        summary.add_result(&result);

        if failed {
            break;
        }
    }

    pb.finish_and_clear();

    // 4. Summary
    print_summary(&summary);

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

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
fn print_summary(summary: &converge::ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Host converged successfully!", "✓".green().bold());
    } else {
        println!(
            "  {} Convergence aborted at first failure",
            "✗".red().bold()
        );
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
