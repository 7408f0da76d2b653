#![forbid(unsafe_code)]
//! gaiwan-search library.
//!
//! Hybrid retrieval over a social-post corpus: a TF-IDF text similarity
//! graph mixed with the conversation and user-affinity structure from
//! `gaiwan-graph`, queried either by local personalized propagation or by
//! direct one-hop ranking depending on how the query post reads.
//!
//! ```no_run
//! use gaiwan_core::{EngineConfig, Post};
//! use gaiwan_search::{Corpus, RetrievalEngine};
//!
//! # fn main() -> Result<(), gaiwan_search::RetrievalError> {
//! let mut engine = RetrievalEngine::new(EngineConfig::default())?;
//! engine.fit(Corpus::new(vec![
//!     Post::original("1", "amy", "How do I pin a future?"),
//!     Post::original("2", "bob", "Box::pin it first").with_reply_to("1"),
//! ]))?;
//! for hit in engine.retrieve("1", 5, None)? {
//!     println!("{} {:.3}", hit.post.id(), hit.score);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Conventions
//!
//! - **Errors**: [`RetrievalError`] for engine operations.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod classify;
pub mod engine;
pub mod error;
pub mod lexical;

pub use classify::{QueryClassifier, RetrievalMode};
pub use engine::{Corpus, FitSummary, RetrievalEngine, RetrievalResult, ScoreBreakdown};
pub use error::RetrievalError;
pub use lexical::TextSimilarityIndex;
