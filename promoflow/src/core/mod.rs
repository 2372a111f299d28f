//! Core resource types for promotion orchestration.
//!
//! This module contains the resources the orchestrator reads and writes:
//! - Object identity and metadata
//! - Stages and their upstream subscriptions
//! - Freight and its qualification evidence
//! - Promotions

mod freight;
mod meta;
mod promotion;
mod resource;
mod stage;

pub use freight::{Freight, Qualification};
pub use meta::{NamespacedName, ObjectMeta, OwnerReference};
pub use promotion::{Promotion, PromotionSpec};
pub use resource::Resource;
pub use stage::{Stage, StageSpec, StageSubscription, Subscriptions};
