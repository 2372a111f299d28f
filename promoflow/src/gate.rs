//! Freight qualification gate.
//!
//! The gate asks an external reader whether a freight may move, and returns
//! either the freight or `None`. It never looks at qualification evidence
//! itself; "does not exist" and "not qualified" are the same answer.

use crate::cancellation::RequestContext;
use crate::core::{Freight, NamespacedName, Stage};
use crate::errors::StoreError;
use crate::ports::QualifiedFreightReader;
use std::collections::HashSet;
use std::sync::Arc;

/// Candidate stages for promoting freight into `stage` itself: the stage
/// plus every upstream it consumes from, in declared order, without repeats.
#[must_use]
pub fn promotion_candidates(stage: &Stage) -> Vec<String> {
    let mut seen = HashSet::new();
    std::iter::once(stage.name())
        .chain(stage.upstream_names())
        .filter(|name| seen.insert(*name))
        .map(String::from)
        .collect()
}

/// Candidate stages for cascading freight from `stage` to its subscribers:
/// only the stage itself.
#[must_use]
pub fn cascade_candidates(stage: &Stage) -> Vec<String> {
    vec![stage.name().to_string()]
}

/// Consumes the external qualification answer.
#[derive(Clone)]
pub struct QualificationGate {
    reader: Arc<dyn QualifiedFreightReader>,
}

impl std::fmt::Debug for QualificationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualificationGate").finish_non_exhaustive()
    }
}

impl QualificationGate {
    /// Creates a gate over a qualified-freight reader.
    #[must_use]
    pub fn new(reader: Arc<dyn QualifiedFreightReader>) -> Self {
        Self { reader }
    }

    /// Returns the freight if it is qualified for at least one candidate.
    pub async fn qualified_freight(
        &self,
        ctx: &RequestContext,
        project: &str,
        freight: &str,
        candidates: &[String],
    ) -> Result<Option<Freight>, StoreError> {
        let key = NamespacedName::new(project, freight);
        let found = ctx
            .run(|| self.reader.get_qualified_freight(ctx, &key, candidates))
            .await?;
        tracing::debug!(
            freight = %key,
            ?candidates,
            qualified = found.is_some(),
            "Checked freight qualification"
        );
        Ok(found)
    }
}
