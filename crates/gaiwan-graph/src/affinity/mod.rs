//! User-to-user affinity.
//!
//! Six independent signals, each a symmetric [`SparseGraph`] over the
//! author table of a [`UserProfiles`]:
//!
//! | Signal | Source | Scaled by |
//! |---|---|---|
//! | [`AffinitySignal::Content`] | compression similarity of authored + favorited text | `content_weight` |
//! | [`AffinitySignal::Interaction`] | favorites, reshares, shared conversations | `interaction_weight` |
//! | [`AffinitySignal::Engagement`] | mentions, replies, quotes | `engagement_weight` |
//! | [`AffinitySignal::Temporal`] | hour-of-day posting histograms | `temporal_weight` |
//! | [`AffinitySignal::MutualFollow`] | follower / following sets | `mutual_follow_weight` |
//! | [`AffinitySignal::Overlap`] | communities, media types, link domains | `overlap_weight` |
//!
//! Every signal reads only immutable per-author aggregates, so
//! [`UserAffinityBuilder::build`] computes them concurrently and then
//! folds them with [`combine`].

mod content;
mod follow;
mod interaction;
mod overlap;
mod temporal;

use std::fmt;

use gaiwan_core::{AffinityConfig, ConfigError, GraphError, Post, SparseGraph, UserProfiles};
use rayon::prelude::*;
use tracing::{debug, instrument};

pub use content::{compressed_len, compression_distance, compression_similarity};
pub use follow::jaccard;

/// One user-to-user signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AffinitySignal {
    Content,
    Interaction,
    Engagement,
    Temporal,
    MutualFollow,
    Overlap,
}

impl AffinitySignal {
    pub const ALL: [Self; 6] = [
        Self::Content,
        Self::Interaction,
        Self::Engagement,
        Self::Temporal,
        Self::MutualFollow,
        Self::Overlap,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Interaction => "interaction",
            Self::Engagement => "engagement",
            Self::Temporal => "temporal",
            Self::MutualFollow => "mutual_follow",
            Self::Overlap => "overlap",
        }
    }
}

impl fmt::Display for AffinitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every signal matrix plus their weighted sum.
#[derive(Debug, Clone)]
pub struct UserAffinity {
    /// Unweighted signal matrices in [`AffinitySignal::ALL`] order.
    pub signals: Vec<(AffinitySignal, SparseGraph)>,
    pub combined: SparseGraph,
}

impl UserAffinity {
    /// The unweighted matrix for one signal.
    #[must_use]
    pub fn signal(&self, signal: AffinitySignal) -> Option<&SparseGraph> {
        self.signals
            .iter()
            .find(|(s, _)| *s == signal)
            .map(|(_, graph)| graph)
    }
}

/// Linear combination `Σ wᵢ·Mᵢ`.
///
/// The result has the node count of the first matrix; an empty input
/// yields an empty graph. Combining a single matrix with weight `1.0`
/// returns that matrix unchanged.
///
/// # Errors
///
/// Returns [`GraphError::ShapeMismatch`] if the matrices differ in size and
/// [`GraphError::NegativeWeight`] for a negative or non-finite weight.
pub fn combine(parts: &[(&SparseGraph, f64)]) -> Result<SparseGraph, GraphError> {
    let n = parts.first().map_or(0, |(graph, _)| graph.len());
    let mut out = SparseGraph::new(n);
    for (graph, weight) in parts {
        out.add_scaled(graph, *weight)?;
    }
    Ok(out)
}

/// Computes user affinity signals under one [`AffinityConfig`].
#[derive(Debug, Clone)]
pub struct UserAffinityBuilder {
    config: AffinityConfig,
}

impl UserAffinityBuilder {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config fails validation.
    pub fn new(config: AffinityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &AffinityConfig {
        &self.config
    }

    /// Compression similarity of each author's authored and favorited text.
    #[must_use]
    pub fn content_similarity(&self, posts: &[Post], profiles: &UserProfiles) -> SparseGraph {
        content::content_similarity(&self.config, posts, profiles)
    }

    #[must_use]
    pub fn interaction_strength(&self, posts: &[Post], profiles: &UserProfiles) -> SparseGraph {
        interaction::interaction_strength(&self.config, posts, profiles)
    }

    #[must_use]
    pub fn engagement_strength(&self, posts: &[Post], profiles: &UserProfiles) -> SparseGraph {
        interaction::engagement_strength(&self.config, posts, profiles)
    }

    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn temporal_similarity(&self, profiles: &UserProfiles) -> SparseGraph {
        temporal::temporal_similarity(profiles)
    }

    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn mutual_follow_strength(&self, profiles: &UserProfiles) -> SparseGraph {
        follow::mutual_follow_strength(profiles)
    }

    #[must_use]
    pub fn overlap_similarity(&self, profiles: &UserProfiles) -> SparseGraph {
        overlap::overlap_similarity(&self.config, profiles)
    }

    /// One signal by name.
    #[must_use]
    pub fn signal(
        &self,
        signal: AffinitySignal,
        posts: &[Post],
        profiles: &UserProfiles,
    ) -> SparseGraph {
        match signal {
            AffinitySignal::Content => self.content_similarity(posts, profiles),
            AffinitySignal::Interaction => self.interaction_strength(posts, profiles),
            AffinitySignal::Engagement => self.engagement_strength(posts, profiles),
            AffinitySignal::Temporal => self.temporal_similarity(profiles),
            AffinitySignal::MutualFollow => self.mutual_follow_strength(profiles),
            AffinitySignal::Overlap => self.overlap_similarity(profiles),
        }
    }

    /// Configured weight of a whole signal in the combined matrix.
    #[must_use]
    pub const fn signal_weight(&self, signal: AffinitySignal) -> f64 {
        match signal {
            AffinitySignal::Content => self.config.content_weight,
            AffinitySignal::Interaction => self.config.interaction_weight,
            AffinitySignal::Engagement => self.config.engagement_weight,
            AffinitySignal::Temporal => self.config.temporal_weight,
            AffinitySignal::MutualFollow => self.config.mutual_follow_weight,
            AffinitySignal::Overlap => self.config.overlap_weight,
        }
    }

    /// Compute every signal concurrently and combine them.
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from [`combine`]; with a validated config
    /// and matrices built from one `profiles` this does not happen.
    #[instrument(skip_all, fields(posts = posts.len(), authors = profiles.len()))]
    pub fn build(&self, posts: &[Post], profiles: &UserProfiles) -> Result<UserAffinity, GraphError> {
        let signals: Vec<(AffinitySignal, SparseGraph)> = AffinitySignal::ALL
            .par_iter()
            .map(|&signal| (signal, self.signal(signal, posts, profiles)))
            .collect();

        for (signal, graph) in &signals {
            debug!(signal = %signal, edges = graph.edge_count(), "affinity signal built");
        }

        let weighted: Vec<(&SparseGraph, f64)> = signals
            .iter()
            .map(|(signal, graph)| (graph, self.signal_weight(*signal)))
            .collect();
        let combined = combine(&weighted)?;

        Ok(UserAffinity { signals, combined })
    }
}

/// Evaluate `score` on every unordered author pair `i < j` in parallel.
///
/// Rows are split across the rayon pool; each row's edges are gathered in
/// order so the resulting graph does not depend on scheduling.
pub(crate) fn pairwise<F>(n: usize, score: F) -> SparseGraph
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    let rows: Vec<Vec<(usize, usize, f64)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            ((i + 1)..n)
                .filter_map(|j| {
                    let w = score(i, j);
                    (w.is_finite() && w > 0.0).then_some((i, j, w))
                })
                .collect()
        })
        .collect();
    SparseGraph::from_edges(n, rows.into_iter().flatten())
}

/// Geometric-mean normalization clamped to `[0, 1]`.
///
/// Zero whenever either total is zero.
pub(crate) fn normalized(count: u64, total_a: u64, total_b: u64) -> f64 {
    if count == 0 || total_a == 0 || total_b == 0 {
        return 0.0;
    }
    let denom = (total_a as f64 * total_b as f64).sqrt();
    (count as f64 / denom).clamp(0.0, 1.0)
}
