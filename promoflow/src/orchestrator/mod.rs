//! Promotion orchestration.
//!
//! [`PromotionService`] exposes the two entry operations:
//!
//! - [`PromotionService::promote_stage`] moves one stage onto a freight that
//!   is already qualified for the stage or for one of its upstreams.
//! - [`PromotionService::promote_subscribers`] moves every stage that
//!   subscribes to a stage onto a freight qualified for that stage. Each
//!   subscriber write succeeds or fails on its own.
//!
//! Both check their inputs before any I/O, then consult the project
//! validator, the stage directory and the qualification gate, in that order.

mod builder;

pub use builder::PromotionServiceBuilder;

use crate::cancellation::RequestContext;
use crate::config::OrchestratorConfig;
use crate::core::{Promotion, Stage};
use crate::directory::StageDirectory;
use crate::errors::{PromotionError, StoreError};
use crate::events::{self, EventSink};
use crate::factory::PromotionFactory;
use crate::fanout::{CascadeResult, FailureCollector};
use crate::gate::{cascade_candidates, promotion_candidates, QualificationGate};
use crate::graph::SubscriberResolver;
use crate::observability::OperationTimer;
use crate::ports::{ProjectValidator, ResourceCreator};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Orchestrates single-stage and subscriber-cascade promotions.
pub struct PromotionService {
    validator: Arc<dyn ProjectValidator>,
    directory: StageDirectory,
    gate: QualificationGate,
    resolver: Arc<dyn SubscriberResolver>,
    factory: Arc<dyn PromotionFactory>,
    creator: Arc<dyn ResourceCreator>,
    events: Arc<dyn EventSink>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for PromotionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromotionService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PromotionService {
    /// Starts building a service.
    #[must_use]
    pub fn builder() -> PromotionServiceBuilder {
        PromotionServiceBuilder::new()
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Creates a promotion moving `stage_name` onto `freight_name`.
    ///
    /// The freight must be qualified for the stage itself or for one of the
    /// stages it subscribes to. Calling twice creates two promotions.
    pub async fn promote_stage(
        &self,
        ctx: &RequestContext,
        project: &str,
        stage_name: &str,
        freight_name: &str,
    ) -> Result<Promotion, PromotionError> {
        let timer = OperationTimer::start("promote_stage");
        tracing::debug!(project, stage = stage_name, freight = freight_name, "Promoting stage");

        let stage = self
            .eligible_stage(ctx, project, stage_name, freight_name, promotion_candidates)
            .await?;

        let promotion = self.factory.new_promotion(&stage, freight_name);
        if let Err(err) = self.write(ctx, &promotion).await {
            tracing::error!(
                project,
                stage = stage_name,
                freight = freight_name,
                promotion = promotion.name(),
                error = %err,
                "Failed to create promotion"
            );
            self.emit_failed(&promotion, &err).await;
            return Err(PromotionError::Internal(err));
        }

        tracing::info!(
            project,
            stage = stage_name,
            freight = freight_name,
            promotion = promotion.name(),
            operation = timer.name(),
            duration_ms = timer.elapsed_ms(),
            "Created promotion"
        );
        self.emit_created(&promotion).await;
        Ok(promotion)
    }

    /// Creates a promotion for every subscriber of `stage_name`, each moving
    /// onto `freight_name`.
    ///
    /// The freight must be qualified for `stage_name` itself. A failed write
    /// never prevents the others from being attempted. When some writes
    /// fail, the result carries both the created promotions and an error
    /// listing every failure.
    pub async fn promote_subscribers(
        &self,
        ctx: &RequestContext,
        project: &str,
        stage_name: &str,
        freight_name: &str,
    ) -> CascadeResult {
        match self.cascade(ctx, project, stage_name, freight_name).await {
            Ok(result) => result,
            Err(err) => CascadeResult::rejected(err),
        }
    }

    async fn cascade(
        &self,
        ctx: &RequestContext,
        project: &str,
        stage_name: &str,
        freight_name: &str,
    ) -> Result<CascadeResult, PromotionError> {
        let timer = OperationTimer::start("promote_subscribers");
        tracing::debug!(project, stage = stage_name, freight = freight_name, "Promoting subscribers");

        let stage = self
            .eligible_stage(ctx, project, stage_name, freight_name, cascade_candidates)
            .await?;

        let call_ctx = self.call_context(ctx);
        let subscribers = self
            .resolver
            .find_subscribers(&call_ctx, &stage)
            .await
            .map_err(|err| self.internal(project, stage_name, "resolving subscribers", err))?;
        if subscribers.is_empty() {
            tracing::warn!(project, stage = stage_name, "Stage has no subscribers");
            return Err(PromotionError::not_found(format!(
                "Stage {stage_name:?} has no subscribers"
            )));
        }

        let total = subscribers.len();
        let promotions: Vec<Promotion> = subscribers
            .iter()
            .map(|subscriber| self.factory.new_promotion(subscriber, freight_name))
            .collect();

        let mut outcomes = stream::iter(promotions)
            .map(|promotion| async move {
                let outcome = self.write(ctx, &promotion).await;
                (promotion, outcome)
            })
            .buffered(self.config.max_concurrent_writes.max(1));

        let mut collector = FailureCollector::with_capacity(total);
        while let Some((promotion, outcome)) = outcomes.next().await {
            match &outcome {
                Ok(()) => {
                    tracing::info!(
                        project,
                        stage = promotion.stage(),
                        freight = freight_name,
                        promotion = promotion.name(),
                        "Created subscriber promotion"
                    );
                    self.emit_created(&promotion).await;
                }
                Err(err) => {
                    tracing::warn!(
                        project,
                        stage = promotion.stage(),
                        freight = freight_name,
                        error = %err,
                        "Failed to create subscriber promotion"
                    );
                    self.emit_failed(&promotion, err).await;
                }
            }
            collector.record(promotion, outcome);
        }

        let failed = collector.failed();
        let result = collector.finish();
        tracing::info!(
            project,
            stage = stage_name,
            freight = freight_name,
            subscribers = total,
            created = result.promotions.len(),
            failed,
            operation = timer.name(),
            duration_ms = timer.elapsed_ms(),
            "Subscriber cascade finished"
        );
        self.emit(
            events::CASCADE_COMPLETED,
            serde_json::json!({
                "project": project,
                "stage": stage_name,
                "freight": freight_name,
                "status": result.status(),
                "created": result.promotions.len(),
                "failed": failed,
            }),
        )
        .await;
        Ok(result)
    }

    /// Shared prefix of both operations: input checks, project validation,
    /// stage lookup and the qualification gate.
    async fn eligible_stage(
        &self,
        ctx: &RequestContext,
        project: &str,
        stage_name: &str,
        freight_name: &str,
        candidates: fn(&Stage) -> Vec<String>,
    ) -> Result<Stage, PromotionError> {
        validate_non_empty(project, stage_name, freight_name)?;

        let call_ctx = self.call_context(ctx);
        call_ctx
            .run(|| async {
                Ok::<_, StoreError>(self.validator.validate_project(&call_ctx, project).await)
            })
            .await
            .map_err(|err| self.internal(project, stage_name, "validating project", err))??;

        let call_ctx = self.call_context(ctx);
        let stage = self
            .directory
            .get_stage(&call_ctx, project, stage_name)
            .await
            .map_err(|err| self.internal(project, stage_name, "getting stage", err))?
            .ok_or_else(|| {
                tracing::warn!(project, stage = stage_name, "Stage not found");
                PromotionError::not_found(format!(
                    "Stage {stage_name:?} not found in namespace {project:?}"
                ))
            })?;

        let candidates = candidates(&stage);
        let call_ctx = self.call_context(ctx);
        self.gate
            .qualified_freight(&call_ctx, project, freight_name, &candidates)
            .await
            .map_err(|err| self.internal(project, stage_name, "getting qualified freight", err))?
            .ok_or_else(|| {
                tracing::warn!(
                    project,
                    stage = stage_name,
                    freight = freight_name,
                    ?candidates,
                    "No qualified freight"
                );
                PromotionError::not_found(format!(
                    "no qualified Freight {freight_name:?} found in namespace {project:?}"
                ))
            })?;

        Ok(stage)
    }

    async fn write(&self, ctx: &RequestContext, promotion: &Promotion) -> Result<(), StoreError> {
        let call_ctx = self.call_context(ctx);
        call_ctx
            .run(|| self.creator.create(&call_ctx, promotion))
            .await
    }

    fn call_context(&self, ctx: &RequestContext) -> RequestContext {
        match self.config.call_timeout() {
            Some(timeout) => ctx.clone().with_timeout(timeout),
            None => ctx.clone(),
        }
    }

    fn internal(
        &self,
        project: &str,
        stage: &str,
        action: &'static str,
        err: StoreError,
    ) -> PromotionError {
        tracing::error!(project, stage, action, error = %err, "Collaborator call failed");
        PromotionError::Internal(err)
    }

    async fn emit_created(&self, promotion: &Promotion) {
        self.emit(
            events::PROMOTION_CREATED,
            serde_json::json!({
                "project": promotion.metadata.namespace,
                "stage": promotion.stage(),
                "freight": promotion.freight(),
                "promotion": promotion.name(),
            }),
        )
        .await;
    }

    async fn emit_failed(&self, promotion: &Promotion, err: &StoreError) {
        self.emit(
            events::PROMOTION_FAILED,
            serde_json::json!({
                "project": promotion.metadata.namespace,
                "stage": promotion.stage(),
                "freight": promotion.freight(),
                "error": err.to_string(),
                "error_type": err.type_name(),
            }),
        )
        .await;
    }

    async fn emit(&self, event_type: &str, data: serde_json::Value) {
        if self.config.emit_events {
            self.events.emit(event_type, Some(data)).await;
        }
    }
}

fn validate_non_empty(project: &str, stage: &str, freight: &str) -> Result<(), PromotionError> {
    if project.is_empty() {
        return Err(PromotionError::invalid_argument("project should not be empty"));
    }
    if stage.is_empty() {
        return Err(PromotionError::invalid_argument("stage should not be empty"));
    }
    if freight.is_empty() {
        return Err(PromotionError::invalid_argument("freight should not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Freight;
    use crate::errors::ErrorCode;
    use crate::events::CollectingEventSink;
    use crate::ports::{
        MockProjectValidator, MockQualifiedFreightReader, MockStageLister, MockStageReader,
    };
    use crate::store::InMemoryStore;
    use tokio_test::{assert_err, assert_ok};

    /// Mocks for every read port, with no expectations set. Any call that a
    /// test did not expect panics.
    struct Mocks {
        validator: MockProjectValidator,
        reader: MockStageReader,
        lister: MockStageLister,
        freight: MockQualifiedFreightReader,
        store: Arc<InMemoryStore>,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                validator: MockProjectValidator::new(),
                reader: MockStageReader::new(),
                lister: MockStageLister::new(),
                freight: MockQualifiedFreightReader::new(),
                store: Arc::new(InMemoryStore::new()),
            }
        }

        fn project_ok(mut self) -> Self {
            self.validator
                .expect_validate_project()
                .returning(|_, _| Ok(()));
            self
        }

        fn stage(mut self, stage: Option<Stage>) -> Self {
            self.reader
                .expect_get_stage()
                .returning(move |_, _| Ok(stage.clone()));
            self
        }

        fn qualified(mut self, qualified: bool) -> Self {
            self.freight
                .expect_get_qualified_freight()
                .returning(move |_, key, _| {
                    Ok(qualified.then(|| Freight::new(&key.namespace, &key.name)))
                });
            self
        }

        fn service(self) -> (PromotionService, Arc<InMemoryStore>) {
            let store = self.store.clone();
            let service = PromotionService::builder()
                .project_validator(Arc::new(self.validator))
                .stage_reader(Arc::new(self.reader))
                .stage_lister(Arc::new(self.lister))
                .freight_reader(Arc::new(self.freight))
                .resource_creator(self.store)
                .build()
                .unwrap();
            (service, store)
        }
    }

    fn stage_with_upstream() -> Stage {
        Stage::new("fake-project", "fake-stage").with_upstream("fake-upstream-stage")
    }

    #[tokio::test]
    async fn test_empty_inputs_are_rejected_before_any_call() {
        // No expectations: any collaborator call would panic.
        let (service, store) = Mocks::new().service();
        let ctx = RequestContext::new();

        for (project, stage, freight) in [
            ("", "fake-stage", "fake-freight"),
            ("fake-project", "", "fake-freight"),
            ("fake-project", "fake-stage", ""),
        ] {
            let err = assert_err!(service.promote_stage(&ctx, project, stage, freight).await);
            assert_eq!(err.code(), ErrorCode::InvalidArgument);

            let result = service.promote_subscribers(&ctx, project, stage, freight).await;
            assert!(result.promotions.is_empty());
            assert_eq!(result.error.unwrap().code(), ErrorCode::InvalidArgument);
        }
        assert_eq!(store.create_attempts(), 0);
    }

    #[tokio::test]
    async fn test_project_validation_error_is_returned_verbatim() {
        let mut mocks = Mocks::new();
        mocks
            .validator
            .expect_validate_project()
            .returning(|_, _| Err(PromotionError::permission_denied("something went wrong")));
        let (service, _) = mocks.service();

        let err = assert_err!(
            service
                .promote_stage(&RequestContext::new(), "fake-project", "fake-stage", "fake-freight")
                .await
        );
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[tokio::test]
    async fn test_error_getting_stage_is_internal() {
        let mut mocks = Mocks::new().project_ok();
        mocks
            .reader
            .expect_get_stage()
            .returning(|_, _| Err(StoreError::backend("something went wrong")));
        let (service, _) = mocks.service();

        let err = assert_err!(
            service
                .promote_stage(&RequestContext::new(), "fake-project", "fake-stage", "fake-freight")
                .await
        );
        assert_eq!(err.code(), ErrorCode::Internal);
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[tokio::test]
    async fn test_stage_not_found_skips_qualification_and_write() {
        // The freight reader has no expectation and would panic if called.
        let (service, store) = Mocks::new().project_ok().stage(None).service();

        let err = assert_err!(
            service
                .promote_stage(&RequestContext::new(), "fake-project", "fake-stage", "fake-freight")
                .await
        );
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(
            err.to_string(),
            "Stage \"fake-stage\" not found in namespace \"fake-project\""
        );
        assert_eq!(store.create_attempts(), 0);
    }

    #[tokio::test]
    async fn test_cascade_stage_not_found_skips_qualification_and_writes() {
        // Neither the freight reader nor the lister has an expectation.
        let (service, store) = Mocks::new().project_ok().stage(None).service();

        let result = service
            .promote_subscribers(&RequestContext::new(), "fake-project", "fake-stage", "fake-freight")
            .await;
        assert!(result.promotions.is_empty());
        let err = result.error.unwrap();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(
            err.to_string(),
            "Stage \"fake-stage\" not found in namespace \"fake-project\""
        );
        assert_eq!(store.create_attempts(), 0);
    }

    #[tokio::test]
    async fn test_error_getting_qualified_freight_is_internal() {
        let mut mocks = Mocks::new().project_ok().stage(Some(stage_with_upstream()));
        mocks
            .freight
            .expect_get_qualified_freight()
            .returning(|_, _, _| Err(StoreError::backend("something went wrong")));
        let (service, _) = mocks.service();

        let err = assert_err!(
            service
                .promote_stage(&RequestContext::new(), "fake-project", "fake-stage", "fake-freight")
                .await
        );
        assert_eq!(err.code(), ErrorCode::Internal);
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[tokio::test]
    async fn test_unqualified_freight_is_not_found_and_writes_nothing() {
        let (service, store) = Mocks::new()
            .project_ok()
            .stage(Some(stage_with_upstream()))
            .qualified(false)
            .service();

        let err = assert_err!(
            service
                .promote_stage(&RequestContext::new(), "fake-project", "fake-stage", "fake-freight")
                .await
        );
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(err.to_string().contains("no qualified Freight"));
        assert!(err.to_string().contains("found in namespace"));
        assert_eq!(store.create_attempts(), 0);
    }

    #[tokio::test]
    async fn test_promote_stage_asks_for_stage_and_upstreams() {
        let mut mocks = Mocks::new().project_ok().stage(Some(
            Stage::new("fake-project", "prod").with_upstreams(["u1", "u2"]),
        ));
        mocks
            .freight
            .expect_get_qualified_freight()
            .withf(|_, _, candidates| {
                candidates.to_vec() == vec!["prod".to_string(), "u1".to_string(), "u2".to_string()]
            })
            .times(1)
            .returning(|_, key, _| Ok(Some(Freight::new(&key.namespace, &key.name))));
        let (service, store) = mocks.service();

        let promo = assert_ok!(
            service
                .promote_stage(&RequestContext::new(), "fake-project", "prod", "fakefreight")
                .await
        );
        assert_eq!(promo.stage(), "prod");
        assert_eq!(promo.freight(), "fakefreight");
        assert_eq!(store.promotions("fake-project").unwrap(), vec![promo]);
    }

    #[tokio::test]
    async fn test_error_creating_promotion_is_internal() {
        let (service, store) = Mocks::new()
            .project_ok()
            .stage(Some(stage_with_upstream()))
            .qualified(true)
            .service();
        store.fail_writes_for(
            &crate::core::NamespacedName::new("fake-project", "fake-stage"),
            "something went wrong",
        );

        let err = assert_err!(
            service
                .promote_stage(&RequestContext::new(), "fake-project", "fake-stage", "fake-freight")
                .await
        );
        assert_eq!(err.code(), ErrorCode::Internal);
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[tokio::test]
    async fn test_promote_subscribers_asks_for_stage_only() {
        let mut mocks = Mocks::new().project_ok().stage(Some(stage_with_upstream()));
        mocks
            .freight
            .expect_get_qualified_freight()
            .withf(|_, _, candidates| candidates.to_vec() == vec!["fake-stage".to_string()])
            .times(1)
            .returning(|_, _, _| Ok(None));
        let (service, _) = mocks.service();

        let result = service
            .promote_subscribers(&RequestContext::new(), "fake-project", "fake-stage", "fake-freight")
            .await;
        assert_eq!(result.error.unwrap().code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_subscriber_listing_failure_is_internal() {
        let mut mocks = Mocks::new()
            .project_ok()
            .stage(Some(stage_with_upstream()))
            .qualified(true);
        mocks
            .lister
            .expect_list_stages()
            .returning(|_, _| Err(StoreError::backend("list failed")));
        let (service, store) = mocks.service();

        let result = service
            .promote_subscribers(&RequestContext::new(), "fake-project", "fake-stage", "fake-freight")
            .await;
        let err = result.error.unwrap();
        assert_eq!(err.code(), ErrorCode::Internal);
        assert_eq!(err.to_string(), "list failed");
        assert_eq!(store.create_attempts(), 0);
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let store = Arc::new(InMemoryStore::new());
        store.put_stage(Stage::new("proj", "dev"));
        store.put_freight(Freight::new("proj", "abcdef0").qualified_for("dev"));
        let sink = Arc::new(CollectingEventSink::new());

        let service = PromotionService::builder()
            .store(store)
            .event_sink(sink.clone())
            .build()
            .unwrap();
        service
            .promote_stage(&RequestContext::new(), "proj", "dev", "abcdef0")
            .await
            .unwrap();

        let created = sink.events_of_type(events::PROMOTION_CREATED);
        assert_eq!(created.len(), 1);
        let data = created[0].1.as_ref().unwrap();
        assert_eq!(data["stage"], "dev");
        assert_eq!(data["freight"], "abcdef0");
    }

    #[tokio::test]
    async fn test_events_can_be_disabled() {
        let store = Arc::new(InMemoryStore::new());
        store.put_stage(Stage::new("proj", "dev"));
        store.put_freight(Freight::new("proj", "abcdef0").qualified_for("dev"));
        let sink = Arc::new(CollectingEventSink::new());

        let service = PromotionService::builder()
            .store(store)
            .event_sink(sink.clone())
            .config(OrchestratorConfig::new().with_events(false))
            .build()
            .unwrap();
        service
            .promote_stage(&RequestContext::new(), "proj", "dev", "abcdef0")
            .await
            .unwrap();

        assert!(sink.is_empty());
    }
}
