#![forbid(unsafe_code)]
//! gaiwan-graph library.
//!
//! Builds the structural side of retrieval: user-to-user affinity signals,
//! the post-to-post relationship graph (replies, quotes, siblings,
//! conversations, projected affinity), the structural/text mix, and the
//! bounded personalized propagation run over the result.
//!
//! # Conventions
//!
//! - **Errors**: typed errors from `gaiwan_core::error`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod affinity;
pub mod combine;
pub mod propagation;
pub mod relationship;

pub use affinity::{AffinitySignal, UserAffinity, UserAffinityBuilder, combine};
pub use combine::GraphCombiner;
pub use propagation::{
    PropagationConfig, PropagationResult, TransitionMatrix, personalized_propagation,
};
pub use relationship::{EdgeKind, RelationshipGraph, RelationshipGraphBuilder};
