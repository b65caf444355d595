//! Core declarative commands
//!
//! - `status` - node summary and pending drift
//! - `apply` - converge current state to desired state
//! - `diff` - preview what apply would change

use anyhow::Result;
use converge::{DiffSummary, compute_diffs, group_by_type};

use crate::Context;
use crate::config::NodeConfig;
use crate::engine::differ::{display_content_diff, display_diff};
use crate::engine::executor::{ExecuteOptions, execute};
use crate::recipe;
use crate::secrets::SecretsStore;
use crate::state::ConvergeState;
use crate::ui;

/// Build the plan for this node, filtered to an optional target
fn load_plan(target: Option<&str>) -> Result<(NodeConfig, converge::ExecutionPlan)> {
    let node = NodeConfig::load()?;
    let secrets = SecretsStore::open()?;
    let plan = recipe::build_plan(&node, &secrets)?.filter_by_target(target);
    Ok((node, plan))
}

pub fn status(ctx: &Context, target: Option<&str>) -> Result<()> {
    ui::header("Wiki Host Status");

    let (node, plan) = load_plan(target)?;
    let state = ConvergeState::load()?;

    ui::kv("Environment", &node.environment.to_string());
    ui::kv(
        "Platform",
        if node.platform_version.is_empty() {
            "(unset)"
        } else {
            node.platform_version.as_str()
        },
    );
    ui::kv("Resources", &plan.total_resources().to_string());
    match state.last_converged {
        Some(when) => ui::kv("Last converged", &when.to_rfc3339()),
        None => ui::kv("Last converged", "never"),
    }

    let pb = crate::progress::spinner("Probing current state...");
    let diffs = compute_diffs(&plan.resources);
    pb.finish_and_clear();

    if diffs.is_empty() {
        println!();
        ui::success("In sync - current state matches desired state");
        return Ok(());
    }

    let summary = DiffSummary::from_diffs(&diffs);
    ui::section("Pending changes");
    for (resource_type, type_diffs) in group_by_type(&diffs) {
        println!("  {:<20} {}", resource_type, type_diffs.len());
    }
    println!();
    ui::warn(&format!(
        "{} resources drifted ({} to add, {} to remove, {} to modify)",
        summary.total(),
        summary.additions,
        summary.removals,
        summary.modifications
    ));
    if !ctx.quiet {
        ui::dim("Run 'wikistead diff' for details, 'wikistead apply' to converge");
    }

    Ok(())
}

pub fn diff(ctx: &Context, target: Option<&str>) -> Result<()> {
    ui::header("Convergence Diff");

    let (_node, plan) = load_plan(target)?;

    let pb = crate::progress::spinner("Probing current state...");
    let diffs = compute_diffs(&plan.resources);
    pb.finish_and_clear();

    display_diff(&diffs);

    // With -v, show line-level diffs for file-shaped resources
    if ctx.verbose > 0 {
        let drifted: std::collections::HashSet<_> =
            diffs.iter().map(|d| d.resource_id.clone()).collect();
        for resource in &plan.resources {
            if !drifted.contains(&resource.id()) {
                continue;
            }
            if let Some((current, desired)) = resource.render_diff() {
                display_content_diff(&resource.id(), &current, &desired);
            }
        }
    }

    Ok(())
}

pub fn apply(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    ui::header("Converging Wiki Host");

    if dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let (_node, plan) = load_plan(target)?;

    let summary = execute(
        plan,
        ExecuteOptions {
            dry_run,
            yes,
            verbose: ctx.verbose > 0,
        },
    )?;

    if !dry_run && summary.total() > 0 {
        let mut state = ConvergeState::load()?;
        state.record_run(&summary);
        state.save()?;
    }

    if !summary.is_success() {
        anyhow::bail!("convergence aborted: {} resource(s) failed", summary.failed);
    }

    Ok(())
}
