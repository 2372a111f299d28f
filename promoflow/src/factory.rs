//! Promotion construction.
//!
//! Names follow `<stage>.<id>.<freight-prefix>`, lowercase, and never exceed
//! the 253-character resource name limit. The id is a time-ordered UUID, so
//! two promotions built from identical inputs still get distinct names.

use crate::core::{ObjectMeta, OwnerReference, Promotion, PromotionSpec, Stage};
use chrono::Utc;
use uuid::Uuid;

/// Longest name a stored resource may have.
pub const MAX_RESOURCE_NAME_LEN: usize = 253;

/// Characters of the freight name kept in a promotion name.
pub const FREIGHT_PREFIX_LEN: usize = 7;

// Simple-form UUID length.
const ID_LEN: usize = 32;

/// Longest stage-name prefix that still leaves room for the id, the freight
/// prefix and two separators.
pub const MAX_STAGE_PREFIX_LEN: usize = MAX_RESOURCE_NAME_LEN - ID_LEN - FREIGHT_PREFIX_LEN - 2;

/// Builds promotions.
pub trait PromotionFactory: Send + Sync {
    /// Builds a promotion moving `stage` onto `freight`. Performs no I/O.
    fn new_promotion(&self, stage: &Stage, freight: &str) -> Promotion;
}

/// The default factory, naming promotions with UUIDv7 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidPromotionFactory;

impl PromotionFactory for UuidPromotionFactory {
    fn new_promotion(&self, stage: &Stage, freight: &str) -> Promotion {
        new_promotion(stage, freight)
    }
}

/// Builds a promotion with a fresh identity.
#[must_use]
pub fn new_promotion(stage: &Stage, freight: &str) -> Promotion {
    build_promotion(stage, freight, Uuid::now_v7())
}

/// Builds a promotion with the given id. Identical inputs give identical
/// promotions apart from the creation timestamp.
#[must_use]
pub fn build_promotion(stage: &Stage, freight: &str, id: Uuid) -> Promotion {
    let mut metadata = ObjectMeta::new(stage.namespace(), promotion_name(stage.name(), freight, id));
    metadata.owner_references.push(OwnerReference {
        kind: Stage::KIND.to_string(),
        name: stage.name().to_string(),
    });
    metadata.creation_timestamp = Some(Utc::now());

    Promotion {
        metadata,
        spec: PromotionSpec {
            stage: stage.name().to_string(),
            freight: freight.to_string(),
        },
    }
}

fn promotion_name(stage: &str, freight: &str, id: Uuid) -> String {
    let stage_prefix: String = stage.chars().take(MAX_STAGE_PREFIX_LEN).collect();
    let freight_prefix: String = freight.chars().take(FREIGHT_PREFIX_LEN).collect();
    format!("{stage_prefix}.{}.{freight_prefix}", id.simple()).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_promotion_targets_stage_and_freight() {
        let stage = Stage::new("proj", "prod").with_upstream("uat");
        let promo = new_promotion(&stage, "f3b2c1d0e9a8");

        assert_eq!(promo.metadata.namespace, "proj");
        assert_eq!(promo.stage(), "prod");
        assert_eq!(promo.freight(), "f3b2c1d0e9a8");
        assert_eq!(
            promo.metadata.owner_references,
            vec![OwnerReference {
                kind: "Stage".to_string(),
                name: "prod".to_string()
            }]
        );
        assert!(promo.metadata.creation_timestamp.is_some());
    }

    #[test]
    fn test_promotion_name_layout() {
        let id = Uuid::parse_str("01890a5d-ac96-774b-bcce-b302099a8057").unwrap();
        let promo = build_promotion(&Stage::new("proj", "QA"), "ABCDEF0123", id);
        assert_eq!(promo.name(), "qa.01890a5dac96774bbcceb302099a8057.abcdef0");
    }

    #[test]
    fn test_short_freight_name_is_kept_whole() {
        let id = Uuid::nil();
        let promo = build_promotion(&Stage::new("proj", "dev"), "abc", id);
        assert!(promo.name().ends_with(".abc"));
    }

    #[test]
    fn test_long_stage_name_is_truncated() {
        let long = "s".repeat(400);
        let promo = new_promotion(&Stage::new("proj", long.as_str()), "abcdef0123");

        assert_eq!(promo.name().len(), MAX_RESOURCE_NAME_LEN);
        assert_eq!(promo.stage(), long);
    }

    #[test]
    fn test_each_call_gets_a_distinct_identity() {
        let stage = Stage::new("proj", "dev");
        let a = new_promotion(&stage, "abcdef0");
        let b = new_promotion(&stage, "abcdef0");

        assert_ne!(a.name(), b.name());
        assert_eq!(a.spec, b.spec);
    }

    #[test]
    fn test_factory_trait_object() {
        let factory: &dyn PromotionFactory = &UuidPromotionFactory;
        let promo = factory.new_promotion(&Stage::new("proj", "dev"), "abcdef0");
        assert!(promo.name().starts_with("dev."));
    }
}
