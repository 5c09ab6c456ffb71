//! Execution planner - an ordered list of resources

use crate::resource::{BoxedResource, Resource};

/// An execution plan: resources applied strictly in insertion order
#[derive(Default)]
pub struct ExecutionPlan {
    /// Resources in dependency order
    pub steps: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource after every resource already planned
    pub fn push(&mut self, resource: BoxedResource) {
        self.steps.push(resource);
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no resources
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Resource ids in order
    pub fn ids(&self) -> Vec<String> {
        self.steps.iter().map(|r| r.id()).collect()
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            steps: self
                .steps
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type:name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        let Some(target) = target else {
            return self;
        };

        self.filter(|r| {
            if let Some((rtype, name)) = target.split_once(':') {
                r.resource_type() == rtype && r.id() == format!("{rtype}:{name}")
            } else {
                r.resource_type() == target
            }
        })
    }
}

impl std::fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("steps", &self.ids())
            .finish()
    }
}
