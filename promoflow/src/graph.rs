//! Subscriber resolution over the stage dependency graph.
//!
//! Stages record their own upstreams, not their downstreams, so finding the
//! stages that consume from a given stage means scanning the namespace.
//! [`ScanResolver`] does that on every call. [`IndexedResolver`] answers the
//! same question from a forward index that its owner keeps up to date.

use crate::cancellation::RequestContext;
use crate::core::Stage;
use crate::directory::StageDirectory;
use crate::errors::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};

/// Finds the stages that declare a given stage as an upstream.
#[async_trait]
pub trait SubscriberResolver: Send + Sync {
    /// Returns the subscribers of `stage`. Order is unspecified.
    async fn find_subscribers(
        &self,
        ctx: &RequestContext,
        stage: &Stage,
    ) -> Result<Vec<Stage>, StoreError>;
}

/// Keeps the stages that subscribe to `upstream`, each at most once.
///
/// A stage that lists itself as an upstream is its own subscriber.
pub fn subscribers_of<I>(stages: I, upstream: &str) -> Vec<Stage>
where
    I: IntoIterator<Item = Stage>,
{
    stages
        .into_iter()
        .filter(|candidate| candidate.subscribes_to(upstream))
        .collect()
}

/// Resolves subscribers by listing the whole namespace on each call.
#[derive(Debug, Clone)]
pub struct ScanResolver {
    directory: StageDirectory,
}

impl ScanResolver {
    /// Creates a scan resolver over a stage directory.
    #[must_use]
    pub fn new(directory: StageDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl SubscriberResolver for ScanResolver {
    async fn find_subscribers(
        &self,
        ctx: &RequestContext,
        stage: &Stage,
    ) -> Result<Vec<Stage>, StoreError> {
        let all = self.directory.list_stages(ctx, stage.namespace()).await?;
        let scanned = all.len();
        let subscribers = subscribers_of(all, stage.name());
        tracing::debug!(
            project = stage.namespace(),
            stage = stage.name(),
            scanned,
            subscribers = subscribers.len(),
            "Resolved subscribers by namespace scan"
        );
        Ok(subscribers)
    }
}

/// Forward index from upstream stage name to its subscribers, built from
/// one namespace listing.
#[derive(Debug, Clone, Default)]
pub struct SubscriberIndex {
    by_upstream: HashMap<String, Vec<Stage>>,
}

impl SubscriberIndex {
    /// Builds the index from a namespace listing.
    #[must_use]
    pub fn build<I>(stages: I) -> Self
    where
        I: IntoIterator<Item = Stage>,
    {
        let mut by_upstream: HashMap<String, Vec<Stage>> = HashMap::new();
        for stage in stages {
            let mut seen = HashSet::new();
            let upstreams: Vec<String> = stage
                .upstream_names()
                .filter(|name| seen.insert(*name))
                .map(String::from)
                .collect();
            for upstream in upstreams {
                by_upstream.entry(upstream).or_default().push(stage.clone());
            }
        }
        Self { by_upstream }
    }

    /// Returns the subscribers of the named upstream.
    #[must_use]
    pub fn subscribers(&self, upstream: &str) -> &[Stage] {
        self.by_upstream.get(upstream).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of upstream names with at least one subscriber.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_upstream.len()
    }

    /// Returns true if no stage subscribes to anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_upstream.is_empty()
    }
}

/// Resolves subscribers from per-namespace forward indexes.
///
/// Namespaces that were never indexed have no subscribers.
#[derive(Debug, Default)]
pub struct IndexedResolver {
    indexes: DashMap<String, SubscriberIndex>,
}

impl IndexedResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the index for a namespace.
    pub fn replace(&self, namespace: impl Into<String>, index: SubscriberIndex) {
        self.indexes.insert(namespace.into(), index);
    }

    /// Rebuilds the index for a namespace from a fresh directory listing.
    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        directory: &StageDirectory,
        namespace: &str,
    ) -> Result<(), StoreError> {
        let stages = directory.list_stages(ctx, namespace).await?;
        self.replace(namespace, SubscriberIndex::build(stages));
        Ok(())
    }
}

#[async_trait]
impl SubscriberResolver for IndexedResolver {
    async fn find_subscribers(
        &self,
        ctx: &RequestContext,
        stage: &Stage,
    ) -> Result<Vec<Stage>, StoreError> {
        ctx.check()?;
        Ok(self
            .indexes
            .get(stage.namespace())
            .map(|index| index.subscribers(stage.name()).to_vec())
            .unwrap_or_default())
    }
}
