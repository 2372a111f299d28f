//! Freight and its qualification evidence.

use super::meta::{NamespacedName, ObjectMeta};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Evidence that a freight verified successfully in a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    /// When the verification that produced this evidence finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

/// An immutable artifact bundle.
///
/// Freight is produced and qualified elsewhere. The orchestrator only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freight {
    /// Identity and metadata.
    pub metadata: ObjectMeta,
    /// Stage name to qualification evidence.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub qualifications: BTreeMap<String, Qualification>,
}

impl Freight {
    /// Resource kind name.
    pub const KIND: &'static str = "Freight";

    /// Creates freight with no qualifications.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            qualifications: BTreeMap::new(),
        }
    }

    /// Records qualification for a stage.
    #[must_use]
    pub fn qualified_for(mut self, stage: impl Into<String>) -> Self {
        self.qualifications.insert(
            stage.into(),
            Qualification {
                verified_at: Some(Utc::now()),
            },
        );
        self
    }

    /// Returns the freight name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns the namespaced name of the freight.
    #[must_use]
    pub fn namespaced_name(&self) -> NamespacedName {
        self.metadata.namespaced_name()
    }

    /// Returns true if the freight is qualified for the named stage.
    #[must_use]
    pub fn is_qualified_for(&self, stage: &str) -> bool {
        self.qualifications.contains_key(stage)
    }

    /// Returns true if the freight is qualified for any of the candidates.
    #[must_use]
    pub fn is_qualified_for_any<S: AsRef<str>>(&self, candidates: &[S]) -> bool {
        candidates.iter().any(|c| self.is_qualified_for(c.as_ref()))
    }
}
