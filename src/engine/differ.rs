//! Diff computation and display

use colored::Colorize;
use converge::{Resource, ResourceDiff, ResourceState};
use similar::{ChangeTag, TextDiff};

/// Compute diffs for all resources
pub fn compute_diffs(resources: &[Box<dyn Resource>]) -> Vec<ResourceDiff> {
    converge::compute_diffs(resources)
}

/// Human label for a resource type
fn type_label(resource_type: &str) -> &str {
    match resource_type {
        "package" => "Packages",
        "package_repo" => "Package repositories",
        "directory" => "Directories",
        "remote_file" => "Downloads",
        "archive" => "Archives",
        "script" => "Scripts",
        "git_checkout" => "Checkouts",
        "template" => "Templates",
        "systemd_unit" => "Service units",
        "db_migration" => "Database migrations",
        other => other,
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Convergence Diff".bold()
    );
    println!("│");

    let mut last_type: Option<&str> = None;
    for diff in diffs {
        // Diffs arrive in walk order; emit a heading per type run
        if last_type != Some(diff.resource_type.as_str()) {
            if last_type.is_some() {
                println!("│");
            }
            println!("│ {}", type_label(&diff.resource_type).bold());
            last_type = Some(diff.resource_type.as_str());
        }

        let symbol = match (&diff.current, &diff.desired) {
            (ResourceState::Absent, ResourceState::Present { .. }) => "+".green(),
            (ResourceState::Present { .. }, ResourceState::Absent) => "-".red(),
            _ => "~".yellow(),
        };

        let state_desc = match (&diff.current, &diff.desired) {
            (ResourceState::Absent, ResourceState::Present { details }) => format!(
                "(absent){}",
                details
                    .as_ref()
                    .map(|d| format!(" → {d}"))
                    .unwrap_or_default()
            ),
            (ResourceState::Present { details: from }, ResourceState::Present { details: to }) => {
                format!(
                    "{} → {}",
                    from.as_deref().unwrap_or("current"),
                    to.as_deref().unwrap_or("desired")
                )
            }
            (ResourceState::Present { .. }, ResourceState::Absent) => "(will remove)".to_string(),
            (ResourceState::Modified { from, to }, _) => format!("{from} → {to}"),
            _ => String::new(),
        };

        println!("│   {} {:<40} {}", symbol, diff.resource_id, state_desc.dimmed());
    }

    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!("│ Summary: {} changes", diffs.len().to_string().bold());
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display a unified content diff for a file-shaped resource
pub fn display_content_diff(id: &str, current: &str, desired: &str) {
    if current == desired {
        return;
    }

    println!();
    println!("  {}", id.bold());
    let diff = TextDiff::from_lines(current, desired);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => print!("    {}", format!("-{change}").red()),
            ChangeTag::Insert => print!("    {}", format!("+{change}").green()),
            ChangeTag::Equal => print!("    {}", format!(" {change}").dimmed()),
        }
    }
}
