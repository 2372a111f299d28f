//! # Promoflow
//!
//! Promotion orchestration core for GitOps-style continuous delivery.
//!
//! A project is a namespace of **stages** linked into a directed graph by
//! upstream subscriptions. A **freight** is a versioned bundle of artifacts
//! that becomes *qualified* for a stage once verified there. Promoflow
//! creates **promotion** resources that move stages onto qualified freight:
//!
//! - **Single-stage promotion**: the freight must be qualified for the stage
//!   or for one of its upstreams
//! - **Subscriber cascade**: every stage that subscribes to a stage is
//!   promoted, with per-subscriber failure isolation
//! - **Cancellation**: every collaborator call honours the request's
//!   cancellation token and deadline
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use promoflow::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! store.put_stage(Stage::new("demo", "dev"));
//! store.put_stage(Stage::new("demo", "qa").with_upstream("dev"));
//! store.put_freight(Freight::new("demo", "abc1234").qualified_for("dev"));
//!
//! let service = PromotionService::builder().store(store).build()?;
//! let result = service
//!     .promote_subscribers(&RequestContext::new(), "demo", "dev", "abc1234")
//!     .await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod directory;
pub mod errors;
pub mod events;
pub mod factory;
pub mod fanout;
pub mod gate;
pub mod graph;
pub mod observability;
pub mod orchestrator;
pub mod ports;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancellationToken, RequestContext};
    pub use crate::config::{ConfigError, OrchestratorConfig};
    pub use crate::core::{Freight, NamespacedName, Promotion, Resource, Stage};
    pub use crate::errors::{ErrorCode, JoinedError, PromotionError, StoreError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::factory::{PromotionFactory, UuidPromotionFactory};
    pub use crate::fanout::{CascadeResult, CascadeStatus};
    pub use crate::graph::{IndexedResolver, ScanResolver, SubscriberResolver};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::orchestrator::{PromotionService, PromotionServiceBuilder};
    pub use crate::ports::{
        ProjectValidator, QualifiedFreightReader, ResourceCreator, StageLister, StageReader,
    };
    pub use crate::store::InMemoryStore;
}
