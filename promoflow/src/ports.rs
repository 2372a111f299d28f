//! Collaborator ports - capabilities the surrounding system injects.
//!
//! Each port is a narrow async trait so the orchestrator only depends on
//! what it calls. Every method receives the caller's [`RequestContext`].
//! "Not found" is `Ok(None)`, never an error.

use crate::cancellation::RequestContext;
use crate::core::{Freight, NamespacedName, Resource, Stage};
use crate::errors::{PromotionError, StoreError};
use async_trait::async_trait;

/// Checks that a project exists and that the caller may act on it.
///
/// Errors are returned to the caller verbatim, with whatever code the
/// validator chose.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectValidator: Send + Sync {
    /// Validates the project.
    async fn validate_project(
        &self,
        ctx: &RequestContext,
        project: &str,
    ) -> Result<(), PromotionError>;
}

/// Reads a single stage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageReader: Send + Sync {
    /// Returns the stage, or `None` if it does not exist.
    async fn get_stage(
        &self,
        ctx: &RequestContext,
        key: &NamespacedName,
    ) -> Result<Option<Stage>, StoreError>;
}

/// Lists every stage in a project namespace.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageLister: Send + Sync {
    /// Returns all stages in the namespace, in store order.
    async fn list_stages(
        &self,
        ctx: &RequestContext,
        namespace: &str,
    ) -> Result<Vec<Stage>, StoreError>;
}

/// Answers whether a freight is qualified for any of a set of stages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QualifiedFreightReader: Send + Sync {
    /// Returns the freight if it exists and is qualified for at least one
    /// candidate stage, `None` otherwise.
    async fn get_qualified_freight(
        &self,
        ctx: &RequestContext,
        key: &NamespacedName,
        candidate_stages: &[String],
    ) -> Result<Option<Freight>, StoreError>;
}

/// Persists a new resource.
#[async_trait]
pub trait ResourceCreator: Send + Sync {
    /// Creates the resource. An identity collision is an error.
    async fn create(&self, ctx: &RequestContext, resource: &dyn Resource) -> Result<(), StoreError>;
}

/// A project validator that accepts every project.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllProjects;

#[async_trait]
impl ProjectValidator for AllowAllProjects {
    async fn validate_project(
        &self,
        _ctx: &RequestContext,
        _project: &str,
    ) -> Result<(), PromotionError> {
        Ok(())
    }
}
