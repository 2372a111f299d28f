//! Builder wiring collaborators into a [`PromotionService`].

use super::PromotionService;
use crate::config::{ConfigError, OrchestratorConfig};
use crate::directory::StageDirectory;
use crate::events::{EventSink, NoOpEventSink};
use crate::factory::{PromotionFactory, UuidPromotionFactory};
use crate::gate::QualificationGate;
use crate::graph::{ScanResolver, SubscriberResolver};
use crate::ports::{
    ProjectValidator, QualifiedFreightReader, ResourceCreator, StageLister, StageReader,
};
use std::sync::Arc;

/// Builder for [`PromotionService`].
///
/// The stage reader, stage lister, qualified-freight reader and resource
/// creator are required. Without an explicit resolver, subscribers are found
/// by scanning the namespace through the stage lister. Promotions are named
/// by [`UuidPromotionFactory`] and events are discarded unless configured.
#[derive(Default)]
pub struct PromotionServiceBuilder {
    validator: Option<Arc<dyn ProjectValidator>>,
    reader: Option<Arc<dyn StageReader>>,
    lister: Option<Arc<dyn StageLister>>,
    freight: Option<Arc<dyn QualifiedFreightReader>>,
    creator: Option<Arc<dyn ResourceCreator>>,
    resolver: Option<Arc<dyn SubscriberResolver>>,
    factory: Option<Arc<dyn PromotionFactory>>,
    events: Option<Arc<dyn EventSink>>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for PromotionServiceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromotionServiceBuilder")
            .field("has_validator", &self.validator.is_some())
            .field("has_reader", &self.reader.is_some())
            .field("has_lister", &self.lister.is_some())
            .field("has_freight_reader", &self.freight.is_some())
            .field("has_creator", &self.creator.is_some())
            .field("has_resolver", &self.resolver.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PromotionServiceBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses one store for every port, including project validation.
    #[must_use]
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: ProjectValidator
            + StageReader
            + StageLister
            + QualifiedFreightReader
            + ResourceCreator
            + 'static,
    {
        self.project_validator(store.clone())
            .stage_reader(store.clone())
            .stage_lister(store.clone())
            .freight_reader(store.clone())
            .resource_creator(store)
    }

    /// Sets the project validator. Defaults to accepting every project.
    #[must_use]
    pub fn project_validator(mut self, validator: Arc<dyn ProjectValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Sets the stage reader.
    #[must_use]
    pub fn stage_reader(mut self, reader: Arc<dyn StageReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Sets the stage lister.
    #[must_use]
    pub fn stage_lister(mut self, lister: Arc<dyn StageLister>) -> Self {
        self.lister = Some(lister);
        self
    }

    /// Sets the qualified-freight reader.
    #[must_use]
    pub fn freight_reader(mut self, reader: Arc<dyn QualifiedFreightReader>) -> Self {
        self.freight = Some(reader);
        self
    }

    /// Sets the resource creator.
    #[must_use]
    pub fn resource_creator(mut self, creator: Arc<dyn ResourceCreator>) -> Self {
        self.creator = Some(creator);
        self
    }

    /// Replaces the namespace-scan subscriber resolver.
    #[must_use]
    pub fn subscriber_resolver(mut self, resolver: Arc<dyn SubscriberResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replaces the promotion factory.
    #[must_use]
    pub fn promotion_factory(mut self, factory: Arc<dyn PromotionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the service.
    pub fn build(self) -> Result<PromotionService, ConfigError> {
        self.config.validate()?;

        let reader = self
            .reader
            .ok_or(ConfigError::MissingCollaborator("stage reader"))?;
        let lister = self
            .lister
            .ok_or(ConfigError::MissingCollaborator("stage lister"))?;
        let freight = self
            .freight
            .ok_or(ConfigError::MissingCollaborator("qualified freight reader"))?;
        let creator = self
            .creator
            .ok_or(ConfigError::MissingCollaborator("resource creator"))?;

        let directory = StageDirectory::new(reader, lister);
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(ScanResolver::new(directory.clone())));

        Ok(PromotionService {
            validator: self
                .validator
                .unwrap_or_else(|| Arc::new(crate::ports::AllowAllProjects)),
            directory,
            gate: QualificationGate::new(freight),
            resolver,
            factory: self
                .factory
                .unwrap_or_else(|| Arc::new(UuidPromotionFactory)),
            creator,
            events: self.events.unwrap_or_else(|| Arc::new(NoOpEventSink)),
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn test_missing_collaborator() {
        let store = Arc::new(InMemoryStore::new());
        let err = PromotionServiceBuilder::new()
            .stage_reader(store.clone())
            .stage_lister(store)
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing collaborator: qualified freight reader"
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = PromotionServiceBuilder::new()
            .store(Arc::new(InMemoryStore::new()))
            .config(OrchestratorConfig::new().with_max_concurrent_writes(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_oversized_call_timeout_is_rejected() {
        let config = OrchestratorConfig {
            call_timeout_seconds: Some(1e30),
            ..OrchestratorConfig::default()
        };
        let err = PromotionServiceBuilder::new()
            .store(Arc::new(InMemoryStore::new()))
            .config(config)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must be at most"));
    }

    #[test]
    fn test_store_wires_everything() {
        let service = PromotionServiceBuilder::new()
            .store(Arc::new(InMemoryStore::new()))
            .build()
            .unwrap();
        assert_eq!(service.config(), &OrchestratorConfig::default());
    }
}
