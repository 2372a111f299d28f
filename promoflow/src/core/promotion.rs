//! Promotions: requests to move a stage onto a piece of freight.

use super::meta::{NamespacedName, ObjectMeta};
use super::resource::Resource;
use serde::{Deserialize, Serialize};

/// Desired transition of a promotion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionSpec {
    /// Name of the target stage, in the promotion's namespace.
    pub stage: String,
    /// Name of the freight to promote, in the promotion's namespace.
    pub freight: String,
}

/// A request to transition a stage to a specific freight.
///
/// Created once and never updated by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    /// Identity and metadata.
    pub metadata: ObjectMeta,
    /// Target stage and freight.
    pub spec: PromotionSpec,
}

impl Promotion {
    /// Resource kind name.
    pub const KIND: &'static str = "Promotion";

    /// Returns the promotion name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns the namespaced name of the promotion.
    #[must_use]
    pub fn namespaced_name(&self) -> NamespacedName {
        self.metadata.namespaced_name()
    }

    /// Returns the target stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.spec.stage
    }

    /// Returns the freight name.
    #[must_use]
    pub fn freight(&self) -> &str {
        &self.spec.freight
    }
}

impl Resource for Promotion {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
