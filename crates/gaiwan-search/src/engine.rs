//! Fit-once, query-many retrieval over a post corpus.
//!
//! # Lifecycle
//!
//! A [`RetrievalEngine`] starts unfitted. [`RetrievalEngine::fit`] builds
//! every index exactly once; a second call fails with
//! [`RetrievalError::AlreadyFitted`]. After fitting, the engine is
//! read-only and `retrieve` can be called from many threads at once.
//!
//! # Fit pipeline
//!
//! ```text
//!            ┌─ TextSimilarityIndex ───────────────────────────┐
//! posts ─────┤                                                 ├─ GraphCombiner ─ TransitionMatrix
//!            └─ Threads → UserProfiles → UserAffinity ─────────┤
//!                                   RelationshipGraphBuilder ──┘
//! ```
//!
//! The text branch and the structural branch run concurrently.
//!
//! # Ranking
//!
//! Exploratory queries run personalized propagation from the query post;
//! declarative queries read the query's row of the combined graph. Either
//! way the query itself and non-positive scores are dropped, and results
//! sort by descending score, then ascending post id.

use std::collections::{BTreeMap, HashMap};

use gaiwan_core::{EngineConfig, Post, SocialGraph, SparseGraph, Threads, UserProfiles};
use gaiwan_graph::{
    GraphCombiner, PropagationConfig, RelationshipGraph, RelationshipGraphBuilder,
    TransitionMatrix, UserAffinity, UserAffinityBuilder, personalized_propagation,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::classify::{QueryClassifier, RetrievalMode};
use crate::error::RetrievalError;
use crate::lexical::TextSimilarityIndex;

/// L1 tolerance for local propagation.
const PROPAGATION_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Everything `fit` consumes: posts plus optional per-author social data.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub posts: Vec<Post>,
    pub social: BTreeMap<String, SocialGraph>,
}

impl Corpus {
    #[must_use]
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts,
            social: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_social(mut self, social: BTreeMap<String, SocialGraph>) -> Self {
        self.social = social;
        self
    }
}

impl From<Vec<Post>> for Corpus {
    fn from(posts: Vec<Post>) -> Self {
        Self::new(posts)
    }
}

/// Counts describing a completed fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FitSummary {
    pub posts: usize,
    pub authors: usize,
    pub threads: usize,
    /// Threads with at least two posts.
    pub conversations: usize,
    pub vocabulary: usize,
    pub text_edges: usize,
    pub structural_edges: usize,
    pub combined_edges: usize,
    /// BLAKE3 of the sorted post id list, `blake3:<hex>`.
    pub corpus_hash: String,
}

/// One ranked post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult<'a> {
    pub post: &'a Post,
    pub score: f64,
}

/// Per-layer weights between two posts.
///
/// Layer weights are already multiplied by their configured edge weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub text: f64,
    pub reply: f64,
    pub quote: f64,
    pub sibling: f64,
    pub conversation: f64,
    pub user_affinity: f64,
    /// Sum of the structural layers.
    pub structural: f64,
    /// `structural` divided by the largest structural weight in the corpus.
    pub normalized_structural: f64,
    /// Weight in the combined graph used for ranking.
    pub combined: f64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct FittedIndex {
    posts: Vec<Post>,
    index: HashMap<String, usize>,
    threads: Threads,
    profiles: UserProfiles,
    text: TextSimilarityIndex,
    affinity: UserAffinity,
    relationships: RelationshipGraph,
    structural_max: f64,
    combined: SparseGraph,
    transition: TransitionMatrix,
    summary: FitSummary,
}

struct Structure {
    threads: Threads,
    profiles: UserProfiles,
    affinity: UserAffinity,
    relationships: RelationshipGraph,
}

/// Hybrid text + structure retrieval engine.
#[derive(Debug)]
pub struct RetrievalEngine {
    config: EngineConfig,
    classifier: QueryClassifier,
    affinity: UserAffinityBuilder,
    relationships: RelationshipGraphBuilder,
    combiner: GraphCombiner,
    fitted: Option<FittedIndex>,
}

impl RetrievalEngine {
    /// Validate `config` and build an unfitted engine.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] if any value is out of range.
    pub fn new(config: EngineConfig) -> Result<Self, RetrievalError> {
        config.validate()?;
        Ok(Self {
            classifier: QueryClassifier::new(config.classifier.clone()),
            affinity: UserAffinityBuilder::new(config.affinity.clone())?,
            relationships: RelationshipGraphBuilder::new(&config.retrieval)?,
            combiner: GraphCombiner::new(config.retrieval.graph_weight)?,
            config,
            fitted: None,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Summary of the completed fit, if any.
    #[must_use]
    pub fn summary(&self) -> Option<&FitSummary> {
        self.fitted.as_ref().map(|f| &f.summary)
    }

    /// Look up a fitted post by id.
    #[must_use]
    pub fn post(&self, id: &str) -> Option<&Post> {
        let fitted = self.fitted.as_ref()?;
        fitted.index.get(id).map(|&idx| &fitted.posts[idx])
    }

    /// Thread reconstruction of the fitted corpus.
    #[must_use]
    pub fn threads(&self) -> Option<&Threads> {
        self.fitted.as_ref().map(|f| &f.threads)
    }

    /// Author table and per-author aggregates of the fitted corpus.
    #[must_use]
    pub fn profiles(&self) -> Option<&UserProfiles> {
        self.fitted.as_ref().map(|f| &f.profiles)
    }

    /// User affinity signals of the fitted corpus.
    #[must_use]
    pub fn user_affinity(&self) -> Option<&UserAffinity> {
        self.fitted.as_ref().map(|f| &f.affinity)
    }

    /// Build every index over `corpus`.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::AlreadyFitted`] if this engine was fitted before.
    /// - [`RetrievalError::DuplicatePost`] if two posts share an id.
    #[instrument(skip_all, fields(posts = corpus.posts.len()))]
    pub fn fit(&mut self, corpus: Corpus) -> Result<FitSummary, RetrievalError> {
        if self.fitted.is_some() {
            return Err(RetrievalError::AlreadyFitted);
        }
        let Corpus { posts, social } = corpus;

        let mut index = HashMap::with_capacity(posts.len());
        for (idx, post) in posts.iter().enumerate() {
            if index.insert(post.id().to_string(), idx).is_some() {
                return Err(RetrievalError::DuplicatePost(post.id().to_string()));
            }
        }

        let (text, structure) = rayon::join(
            || TextSimilarityIndex::fit(&posts, &self.config.retrieval),
            || self.build_structure(&posts, &social),
        );
        let text = text?;
        let Structure {
            threads,
            profiles,
            affinity,
            relationships,
        } = structure?;

        let combined = self
            .combiner
            .combine(&relationships.structural, text.similarity_matrix())?;
        let transition = TransitionMatrix::from_graph(&combined);

        let summary = FitSummary {
            posts: posts.len(),
            authors: profiles.len(),
            threads: threads.len(),
            conversations: threads.conversations().count(),
            vocabulary: text.vocabulary_len(),
            text_edges: text.similarity_matrix().edge_count(),
            structural_edges: relationships.structural.edge_count(),
            combined_edges: combined.edge_count(),
            corpus_hash: corpus_hash(&posts),
        };

        info!(
            posts = summary.posts,
            authors = summary.authors,
            text_edges = summary.text_edges,
            structural_edges = summary.structural_edges,
            combined_edges = summary.combined_edges,
            corpus_hash = %summary.corpus_hash,
            "corpus fitted"
        );

        self.fitted = Some(FittedIndex {
            posts,
            index,
            threads,
            profiles,
            structural_max: relationships.structural.max_weight(),
            text,
            affinity,
            relationships,
            combined,
            transition,
            summary: summary.clone(),
        });
        Ok(summary)
    }

    fn build_structure(
        &self,
        posts: &[Post],
        social: &BTreeMap<String, SocialGraph>,
    ) -> Result<Structure, RetrievalError> {
        let threads = Threads::build(posts);
        let profiles = UserProfiles::build(posts, social, &threads);
        let affinity = self.affinity.build(posts, &profiles)?;
        let relationships = self
            .relationships
            .build(posts, &threads, &profiles, &affinity.combined);
        Ok(Structure {
            threads,
            profiles,
            affinity,
            relationships,
        })
    }

    /// Mode the classifier assigns to a fitted post.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::NotFitted`] before `fit`.
    pub fn classify(&self, post_id: &str) -> Result<Option<RetrievalMode>, RetrievalError> {
        let fitted = self.fitted.as_ref().ok_or(RetrievalError::NotFitted)?;
        Ok(fitted
            .index
            .get(post_id)
            .map(|&idx| self.classifier.classify(&fitted.posts[idx])))
    }

    /// Top `k` posts related to `post_id`.
    ///
    /// `mode` overrides the classifier. An id not in the corpus yields an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::NotFitted`] before `fit`.
    #[instrument(skip(self))]
    pub fn retrieve(
        &self,
        post_id: &str,
        k: usize,
        mode: Option<RetrievalMode>,
    ) -> Result<Vec<RetrievalResult<'_>>, RetrievalError> {
        let fitted = self.fitted.as_ref().ok_or(RetrievalError::NotFitted)?;
        let Some(&seed) = fitted.index.get(post_id) else {
            debug!("query post not in corpus");
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let mode = mode.unwrap_or_else(|| self.classifier.classify(&fitted.posts[seed]));
        let scores: Vec<(usize, f64)> = match mode {
            RetrievalMode::Exploratory => {
                let result =
                    personalized_propagation(&fitted.transition, seed, &self.propagation_config());
                debug!(
                    %mode,
                    iterations = result.iterations,
                    converged = result.converged,
                    "local propagation finished"
                );
                result.scores.into_iter().enumerate().collect()
            }
            RetrievalMode::Declarative => {
                debug!(%mode, "global one-hop ranking");
                fitted.combined.row(seed).collect()
            }
        };

        Ok(rank(&fitted.posts, scores, seed, k))
    }

    /// Per-layer weights between two fitted posts, or `None` if either id is
    /// unknown.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::NotFitted`] before `fit`.
    pub fn explain(
        &self,
        query_id: &str,
        candidate_id: &str,
    ) -> Result<Option<ScoreBreakdown>, RetrievalError> {
        let fitted = self.fitted.as_ref().ok_or(RetrievalError::NotFitted)?;
        let (Some(&q), Some(&c)) = (fitted.index.get(query_id), fitted.index.get(candidate_id))
        else {
            return Ok(None);
        };
        let layers = &fitted.relationships;
        let structural = layers.structural.get(q, c);
        let normalized_structural = GraphCombiner::normalized(structural, fitted.structural_max);
        Ok(Some(ScoreBreakdown {
            text: fitted.text.similarity(q, c),
            reply: layers.reply.get(q, c),
            quote: layers.quote.get(q, c),
            sibling: layers.sibling.get(q, c),
            conversation: layers.conversation.get(q, c),
            user_affinity: layers.user.get(q, c),
            structural,
            normalized_structural,
            combined: fitted.combined.get(q, c),
        }))
    }

    fn propagation_config(&self) -> PropagationConfig {
        PropagationConfig {
            alpha: self.config.retrieval.local_alpha,
            tolerance: PROPAGATION_TOLERANCE,
            max_iter: self.config.retrieval.max_iterations,
        }
    }
}

/// Drop `exclude` and non-positive scores, sort by score descending then
/// post id ascending, keep `k`.
fn rank(
    posts: &[Post],
    scores: Vec<(usize, f64)>,
    exclude: usize,
    k: usize,
) -> Vec<RetrievalResult<'_>> {
    let mut ranked: Vec<(usize, f64)> = scores
        .into_iter()
        .filter(|&(idx, score)| idx != exclude && score.is_finite() && score > 0.0)
        .collect();
    ranked.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| posts[a.0].id().cmp(posts[b.0].id()))
    });
    ranked.truncate(k);
    ranked
        .into_iter()
        .map(|(idx, score)| RetrievalResult {
            post: &posts[idx],
            score,
        })
        .collect()
}

fn corpus_hash(posts: &[Post]) -> String {
    let mut ids: Vec<&str> = posts.iter().map(Post::id).collect();
    ids.sort_unstable();
    let mut hasher = blake3::Hasher::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}
