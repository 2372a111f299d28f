//! In-memory resource store implementing every collaborator port.
//!
//! Useful for embedding the orchestrator in tests and local tools. Create
//! enforces unique names and DNS-subdomain naming the way a cluster API
//! server would. Failures can be injected per target stage or for the whole
//! store.

use crate::cancellation::RequestContext;
use crate::core::{Freight, NamespacedName, Promotion, Resource, Stage};
use crate::errors::{PromotionError, StoreError};
use crate::factory::MAX_RESOURCE_NAME_LEN;
use crate::ports::{
    ProjectValidator, QualifiedFreightReader, ResourceCreator, StageLister, StageReader,
};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use regex::Regex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::LazyLock;

static DNS_SUBDOMAIN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").ok()
});

fn is_dns_subdomain(name: &str) -> bool {
    name.len() <= MAX_RESOURCE_NAME_LEN
        && DNS_SUBDOMAIN
            .as_ref()
            .map_or(true, |re| re.is_match(name))
}

type ResourceKey = (&'static str, NamespacedName);

/// A thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    projects: DashSet<String>,
    stages: DashMap<NamespacedName, Stage>,
    freight: DashMap<NamespacedName, Freight>,
    created: DashMap<ResourceKey, serde_json::Value>,
    write_failures: DashMap<NamespacedName, String>,
    unavailable: AtomicBool,
    create_attempts: AtomicUsize,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a project.
    pub fn add_project(&self, project: impl Into<String>) {
        self.projects.insert(project.into());
    }

    /// Inserts or replaces a stage. Its project is registered too.
    pub fn put_stage(&self, stage: Stage) {
        self.add_project(stage.namespace());
        self.stages.insert(stage.namespaced_name(), stage);
    }

    /// Removes a stage.
    pub fn remove_stage(&self, key: &NamespacedName) -> Option<Stage> {
        self.stages.remove(key).map(|(_, stage)| stage)
    }

    /// Inserts or replaces a freight. Its project is registered too.
    pub fn put_freight(&self, freight: Freight) {
        self.add_project(&freight.metadata.namespace);
        self.freight.insert(freight.namespaced_name(), freight);
    }

    /// Makes every create of a promotion targeting `stage` fail with `message`.
    pub fn fail_writes_for(&self, stage: &NamespacedName, message: impl Into<String>) {
        self.write_failures.insert(stage.clone(), message.into());
    }

    /// Makes every call fail as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns how many creates were attempted, successful or not.
    #[must_use]
    pub fn create_attempts(&self) -> usize {
        self.create_attempts.load(Ordering::SeqCst)
    }

    /// Returns the stored promotions in a namespace, sorted by name.
    pub fn promotions(&self, namespace: &str) -> Result<Vec<Promotion>, StoreError> {
        let mut promotions = self
            .created
            .iter()
            .filter(|entry| entry.key().0 == Promotion::KIND && entry.key().1.namespace == namespace)
            .map(|entry| serde_json::from_value::<Promotion>(entry.value().clone()))
            .collect::<Result<Vec<_>, _>>()?;
        promotions.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(promotions)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::backend("store unavailable"));
        }
        Ok(())
    }

    fn injected_failure(&self, resource: &dyn Resource) -> Option<StoreError> {
        if resource.kind() != Promotion::KIND {
            return None;
        }
        let value = resource.to_value().ok()?;
        let stage = value.get("spec")?.get("stage")?.as_str()?;
        let key = NamespacedName::new(&resource.metadata().namespace, stage);
        self.write_failures
            .get(&key)
            .map(|message| StoreError::backend(message.value().clone()))
    }
}

#[async_trait]
impl ProjectValidator for InMemoryStore {
    async fn validate_project(
        &self,
        _ctx: &RequestContext,
        project: &str,
    ) -> Result<(), PromotionError> {
        self.ensure_available()?;
        if self.projects.contains(project) {
            Ok(())
        } else {
            Err(PromotionError::not_found(format!("project {project:?} not found")))
        }
    }
}

#[async_trait]
impl StageReader for InMemoryStore {
    async fn get_stage(
        &self,
        _ctx: &RequestContext,
        key: &NamespacedName,
    ) -> Result<Option<Stage>, StoreError> {
        self.ensure_available()?;
        Ok(self.stages.get(key).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl StageLister for InMemoryStore {
    async fn list_stages(
        &self,
        _ctx: &RequestContext,
        namespace: &str,
    ) -> Result<Vec<Stage>, StoreError> {
        self.ensure_available()?;
        let mut stages: Vec<Stage> = self
            .stages
            .iter()
            .filter(|entry| entry.key().namespace == namespace)
            .map(|entry| entry.value().clone())
            .collect();
        stages.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(stages)
    }
}

#[async_trait]
impl QualifiedFreightReader for InMemoryStore {
    async fn get_qualified_freight(
        &self,
        _ctx: &RequestContext,
        key: &NamespacedName,
        candidate_stages: &[String],
    ) -> Result<Option<Freight>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .freight
            .get(key)
            .filter(|entry| entry.value().is_qualified_for_any(candidate_stages))
            .map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl ResourceCreator for InMemoryStore {
    async fn create(&self, _ctx: &RequestContext, resource: &dyn Resource) -> Result<(), StoreError> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let meta = resource.metadata();
        if !is_dns_subdomain(&meta.name) {
            return Err(StoreError::Invalid(format!(
                "{} name {:?} is not a valid DNS subdomain",
                resource.kind(),
                meta.name
            )));
        }
        if let Some(err) = self.injected_failure(resource) {
            return Err(err);
        }

        let value = resource.to_value()?;
        match self.created.entry((resource.kind(), meta.namespaced_name())) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                kind: resource.kind().to_string(),
                namespace: meta.namespace.clone(),
                name: meta.name.clone(),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }
}
