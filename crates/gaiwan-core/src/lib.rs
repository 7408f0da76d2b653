#![forbid(unsafe_code)]
//! gaiwan-core library.
//!
//! Shared vocabulary for the retrieval crates: the post model, derived
//! per-author profiles, conversation threads, the symmetric [`SparseGraph`]
//! every similarity signal is expressed in, and the validated configuration
//! values passed into each component.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums from [`error`]; `anyhow::Result`
//!   only for helpers that wrap foreign parse errors.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).
//! - **Indices**: posts and authors are dense `usize` indices into arrays;
//!   nothing holds references into another record.

pub mod config;
pub mod error;
pub mod model;
pub mod sparse;
pub mod text;
pub mod thread;

pub use config::{AffinityConfig, ClassifierConfig, EngineConfig, RetrievalConfig};
pub use error::{ConfigError, ErrorCode, GraphError};
pub use model::post::{Entities, Post, Provenance};
pub use model::profile::{SocialGraph, UserProfile, UserProfiles};
pub use sparse::SparseGraph;
pub use thread::Threads;
