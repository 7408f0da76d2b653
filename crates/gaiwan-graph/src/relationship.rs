//! Post-to-post structural graph.
//!
//! # Overview
//!
//! Five edge layers, each pre-multiplied by its configured weight:
//!
//! | Layer | Connects | Weight |
//! |---|---|---|
//! | [`EdgeKind::Reply`] | a reply and its parent | `reply_weight` |
//! | [`EdgeKind::Quote`] | a quoting post and the quoted post | `quote_weight` |
//! | [`EdgeKind::Sibling`] | posts replying to the same parent id | `sibling_weight` |
//! | [`EdgeKind::Conversation`] | every pair inside one thread | `conversation_weight` |
//! | [`EdgeKind::UserAffinity`] | posts by affinity-linked authors | affinity × `user_similarity_weight` |
//!
//! Author pairs with affinity below `user_affinity_floor` are dropped
//! before projection; every surviving pair fans out to all pairs of the
//! two authors' posts.
//!
//! The structural graph is the sum of all layers. Conversation edges are
//! flat: depth inside the thread does not change the weight.
//!
//! ## Missing parents
//!
//! A reply whose parent is not in the corpus gets no reply edge, but still
//! links to its siblings because sibling grouping uses the parent
//! identifier rather than the parent post.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use gaiwan_core::{ConfigError, Post, RetrievalConfig, SparseGraph, Threads, UserProfiles};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// One structural edge layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Reply,
    Quote,
    Sibling,
    Conversation,
    UserAffinity,
}

impl EdgeKind {
    pub const ALL: [Self; 5] = [
        Self::Reply,
        Self::Quote,
        Self::Sibling,
        Self::Conversation,
        Self::UserAffinity,
    ];
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Reply => "reply",
            Self::Quote => "quote",
            Self::Sibling => "sibling",
            Self::Conversation => "conversation",
            Self::UserAffinity => "user_affinity",
        };
        f.write_str(s)
    }
}

/// Weighted layers and their sum.
#[derive(Debug, Clone)]
pub struct RelationshipGraph {
    pub reply: SparseGraph,
    pub quote: SparseGraph,
    pub sibling: SparseGraph,
    pub conversation: SparseGraph,
    pub user: SparseGraph,
    /// Sum of every layer.
    pub structural: SparseGraph,
}

impl RelationshipGraph {
    #[must_use]
    pub const fn layer(&self, kind: EdgeKind) -> &SparseGraph {
        match kind {
            EdgeKind::Reply => &self.reply,
            EdgeKind::Quote => &self.quote,
            EdgeKind::Sibling => &self.sibling,
            EdgeKind::Conversation => &self.conversation,
            EdgeKind::UserAffinity => &self.user,
        }
    }
}

/// Builds a [`RelationshipGraph`] from posts, threads and user affinity.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipGraphBuilder {
    reply_weight: f64,
    quote_weight: f64,
    sibling_weight: f64,
    conversation_weight: f64,
    user_similarity_weight: f64,
    user_affinity_floor: f64,
}

impl RelationshipGraphBuilder {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config fails validation.
    pub fn new(config: &RetrievalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            reply_weight: config.reply_weight,
            quote_weight: config.quote_weight,
            sibling_weight: config.sibling_weight,
            conversation_weight: config.conversation_weight,
            user_similarity_weight: config.user_similarity_weight,
            user_affinity_floor: config.user_affinity_floor,
        })
    }

    /// Build every layer and their sum.
    ///
    /// `affinity` is a user-by-user graph over the author table of
    /// `profiles`.
    #[must_use]
    #[instrument(skip_all, fields(posts = posts.len()))]
    pub fn build(
        &self,
        posts: &[Post],
        threads: &Threads,
        profiles: &UserProfiles,
        affinity: &SparseGraph,
    ) -> RelationshipGraph {
        let n = posts.len();
        let index: HashMap<&str, usize> = posts
            .iter()
            .enumerate()
            .map(|(idx, post)| (post.id(), idx))
            .collect();

        let reply = link_layer(n, self.reply_weight, posts, |post| {
            post.reply_to().and_then(|id| index.get(id).copied())
        });
        let quote = link_layer(n, self.quote_weight, posts, |post| {
            post.quoted().and_then(|id| index.get(id).copied())
        });
        let sibling = self.sibling_layer(posts);
        let conversation = self.conversation_layer(n, threads);
        let user = self.user_layer(n, profiles, affinity);

        let mut structural = SparseGraph::new(n);
        for layer in [&reply, &quote, &sibling, &conversation, &user] {
            for (i, j, w) in layer.edges() {
                structural.add(i, j, w);
            }
        }

        debug!(
            reply = reply.edge_count(),
            quote = quote.edge_count(),
            sibling = sibling.edge_count(),
            conversation = conversation.edge_count(),
            user = user.edge_count(),
            structural = structural.edge_count(),
            "relationship layers built"
        );

        RelationshipGraph {
            reply,
            quote,
            sibling,
            conversation,
            user,
            structural,
        }
    }

    fn sibling_layer(&self, posts: &[Post]) -> SparseGraph {
        let mut layer = SparseGraph::new(posts.len());
        if self.sibling_weight <= 0.0 {
            return layer;
        }
        let mut by_parent: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, post) in posts.iter().enumerate() {
            if let Some(parent) = post.reply_to() {
                by_parent.entry(parent).or_default().push(idx);
            }
        }
        for children in by_parent.values() {
            connect_all(&mut layer, children, self.sibling_weight);
        }
        layer
    }

    fn conversation_layer(&self, n: usize, threads: &Threads) -> SparseGraph {
        let mut layer = SparseGraph::new(n);
        if self.conversation_weight <= 0.0 {
            return layer;
        }
        for (_, members) in threads.conversations() {
            connect_all(&mut layer, members, self.conversation_weight);
        }
        layer
    }

    fn user_layer(&self, n: usize, profiles: &UserProfiles, affinity: &SparseGraph) -> SparseGraph {
        let mut layer = SparseGraph::new(n);
        if self.user_similarity_weight <= 0.0 {
            return layer;
        }
        let mut affinity = affinity.clone();
        affinity.prune_below(self.user_affinity_floor);
        for (a, b, w) in affinity.edges() {
            if a >= profiles.len() || b >= profiles.len() {
                continue;
            }
            let weight = w * self.user_similarity_weight;
            for &pa in &profiles.profile(a).authored {
                for &pb in &profiles.profile(b).authored {
                    layer.add(pa, pb, weight);
                }
            }
        }
        layer
    }
}

/// One edge per post toward the post `target` resolves, at `weight`.
fn link_layer<F>(n: usize, weight: f64, posts: &[Post], target: F) -> SparseGraph
where
    F: Fn(&Post) -> Option<usize>,
{
    let mut layer = SparseGraph::new(n);
    if weight <= 0.0 {
        return layer;
    }
    for (idx, post) in posts.iter().enumerate() {
        if let Some(other) = target(post) {
            layer.set(idx, other, weight);
        }
    }
    layer
}

fn connect_all(layer: &mut SparseGraph, nodes: &[usize], weight: f64) {
    for (k, &a) in nodes.iter().enumerate() {
        for &b in &nodes[k + 1..] {
            layer.set(a, b, weight);
        }
    }
}
