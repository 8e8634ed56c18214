#![forbid(unsafe_code)]

use statelink_core::{EvaluationHost, Resources};

/// Evaluation host with a fixed resource registry and no call limiting.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    resources: Resources,
}

impl StaticHost {
    /// Host exposing `resources`.
    #[must_use]
    pub fn new(resources: Resources) -> Self {
        Self { resources }
    }
}

impl EvaluationHost for StaticHost {
    fn resources(&self) -> &Resources {
        &self.resources
    }
}
