//! The shape every stored resource exposes to a resource creator.

use super::freight::Freight;
use super::meta::ObjectMeta;
use super::stage::Stage;

/// A resource that can be handed to a store for creation.
pub trait Resource: Send + Sync {
    /// Kind name, e.g. `"Promotion"`.
    fn kind(&self) -> &'static str;

    /// Identity and metadata.
    fn metadata(&self) -> &ObjectMeta;

    /// Encodes the full resource.
    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl Resource for Stage {
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

impl Resource for Freight {
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
