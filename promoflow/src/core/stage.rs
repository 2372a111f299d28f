//! Stages and their upstream subscriptions.

use super::meta::{NamespacedName, ObjectMeta};
use serde::{Deserialize, Serialize};

/// A reference to an upstream stage in the same project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageSubscription {
    /// Name of the upstream stage.
    pub name: String,
}

impl StageSubscription {
    /// Creates a subscription to the named upstream stage.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Where a stage gets its freight from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriptions {
    /// Warehouse producing new freight, for stages at the head of a pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    /// Upstream stages this stage consumes freight from, in declared order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstream_stages: Vec<StageSubscription>,
}

/// Desired state of a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Absent subscriptions mean the stage has no upstream dependency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<Subscriptions>,
}

/// A named deployment environment within a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Identity and metadata.
    pub metadata: ObjectMeta,
    /// Absent for stages that were created without a spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<StageSpec>,
}

impl Stage {
    /// Resource kind name.
    pub const KIND: &'static str = "Stage";

    /// Creates a stage with no subscriptions.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: None,
        }
    }

    /// Adds an upstream stage subscription.
    #[must_use]
    pub fn with_upstream(mut self, upstream: impl Into<String>) -> Self {
        self.spec
            .get_or_insert_with(StageSpec::default)
            .subscriptions
            .get_or_insert_with(Subscriptions::default)
            .upstream_stages
            .push(StageSubscription::new(upstream));
        self
    }

    /// Adds several upstream stage subscriptions, in order.
    #[must_use]
    pub fn with_upstreams<I, S>(self, upstreams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        upstreams
            .into_iter()
            .fold(self, |stage, upstream| stage.with_upstream(upstream))
    }

    /// Sets the warehouse subscription.
    #[must_use]
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.spec
            .get_or_insert_with(StageSpec::default)
            .subscriptions
            .get_or_insert_with(Subscriptions::default)
            .warehouse = Some(warehouse.into());
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns the project namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Returns the namespaced name of the stage.
    #[must_use]
    pub fn namespaced_name(&self) -> NamespacedName {
        self.metadata.namespaced_name()
    }

    /// Returns the declared upstream subscriptions, empty if none.
    #[must_use]
    pub fn upstream_stages(&self) -> &[StageSubscription] {
        self.spec
            .as_ref()
            .and_then(|spec| spec.subscriptions.as_ref())
            .map_or(&[], |subs| subs.upstream_stages.as_slice())
    }

    /// Returns the names of the declared upstream stages, in order.
    pub fn upstream_names(&self) -> impl Iterator<Item = &str> {
        self.upstream_stages().iter().map(|s| s.name.as_str())
    }

    /// Returns true if this stage declares `upstream` as one of its upstreams.
    #[must_use]
    pub fn subscribes_to(&self, upstream: &str) -> bool {
        self.upstream_names().any(|name| name == upstream)
    }
}
