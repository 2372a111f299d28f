//! Read-only access to the stages of a project.
//!
//! Every call goes straight to the injected reader or lister. Nothing is
//! cached, so two calls within one operation may observe different states
//! of the store.

use crate::cancellation::RequestContext;
use crate::core::{NamespacedName, Stage};
use crate::errors::StoreError;
use crate::ports::{StageLister, StageReader};
use std::sync::Arc;

/// Fetches and lists stages.
#[derive(Clone)]
pub struct StageDirectory {
    reader: Arc<dyn StageReader>,
    lister: Arc<dyn StageLister>,
}

impl std::fmt::Debug for StageDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageDirectory").finish_non_exhaustive()
    }
}

impl StageDirectory {
    /// Creates a directory over the given reader and lister.
    #[must_use]
    pub fn new(reader: Arc<dyn StageReader>, lister: Arc<dyn StageLister>) -> Self {
        Self { reader, lister }
    }

    /// Returns the named stage, or `None` if it does not exist.
    pub async fn get_stage(
        &self,
        ctx: &RequestContext,
        project: &str,
        name: &str,
    ) -> Result<Option<Stage>, StoreError> {
        let key = NamespacedName::new(project, name);
        tracing::debug!(stage = %key, "Fetching stage");
        ctx.run(|| self.reader.get_stage(ctx, &key)).await
    }

    /// Returns every stage in the project, in store order.
    pub async fn list_stages(
        &self,
        ctx: &RequestContext,
        project: &str,
    ) -> Result<Vec<Stage>, StoreError> {
        let stages = ctx.run(|| self.lister.list_stages(ctx, project)).await?;
        tracing::debug!(project, count = stages.len(), "Listed stages");
        Ok(stages)
    }
}
