//! Cancellation and deadline propagation.
//!
//! This module provides:
//! - CancellationToken for cooperative cancellation
//! - RequestContext, which every collaborator call runs under

mod context;
mod token;

pub use context::RequestContext;
pub use token::CancellationToken;
