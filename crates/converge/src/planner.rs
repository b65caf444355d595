//! Execution planner - ordered resource plans

use crate::resource::{BoxedResource, Resource};

/// An ordered execution plan
///
/// Resources are walked in insertion order; a recipe's ordering is its
/// dependency declaration.
pub struct ExecutionPlan {
    /// Resources in walk order
    pub resources: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
        }
    }

    /// Append a resource to the plan
    pub fn push(&mut self, resource: BoxedResource) {
        self.resources.push(resource);
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            resources: self
                .resources
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.resources.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(
    resource: &dyn Resource,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let matches_type = match rt {
            "packages" => resource.resource_type().starts_with("package"),
            "repos" => resource.resource_type() == "package_repo",
            "templates" => resource.resource_type() == "template",
            "scripts" => resource.resource_type() == "script",
            "units" | "services" => resource.resource_type() == "systemd_unit",
            _ => resource.resource_type() == rt || resource.resource_type().starts_with(rt),
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.id().contains(n)
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::types::{ApplyResult, ResourceState};
    use anyhow::Result;

    #[derive(Debug)]
    struct NamedResource {
        id: String,
        rtype: &'static str,
    }

    impl Resource for NamedResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn description(&self) -> String {
            self.id.clone()
        }

        fn resource_type(&self) -> &'static str {
            self.rtype
        }

        fn current_state(&self) -> Result<ResourceState> {
            Ok(ResourceState::Absent)
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Present { details: None }
        }

        fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
            Ok(ApplyResult::Created)
        }
    }

    fn sample_plan() -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        plan.push(Box::new(NamedResource {
            id: "gcc".into(),
            rtype: "package",
        }));
        plan.push(Box::new(NamedResource {
            id: "make".into(),
            rtype: "package",
        }));
        plan.push(Box::new(NamedResource {
            id: "/home/wiki/app/Gemfile".into(),
            rtype: "template",
        }));
        plan
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("package"), (Some("package".to_string()), None));
        assert_eq!(
            parse_target("package.gcc"),
            (Some("package".to_string()), Some("gcc".to_string()))
        );
        assert_eq!(parse_target("a.b.c"), (None, Some("a.b.c".to_string())));
    }

    #[test]
    fn test_filter_by_type() {
        let plan = sample_plan().filter_by_target(Some("packages"));
        assert_eq!(plan.total_resources(), 2);

        let plan = sample_plan().filter_by_target(Some("templates"));
        assert_eq!(plan.total_resources(), 1);
    }

    #[test]
    fn test_filter_by_type_and_name() {
        let plan = sample_plan().filter_by_target(Some("package.gcc"));
        assert_eq!(plan.total_resources(), 1);
        assert_eq!(plan.resources[0].id(), "gcc");
    }

    #[test]
    fn test_no_target_keeps_all() {
        let plan = sample_plan().filter_by_target(None);
        assert_eq!(plan.total_resources(), 3);
    }
}
