//! Interaction and engagement strength between authors.
//!
//! Both signals count directed events between two authors, sum the two
//! directions, and normalize each count by the geometric mean of the
//! authors' own totals (see [`super::normalized`]).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use gaiwan_core::{AffinityConfig, Post, SparseGraph, UserProfiles};
use tracing::instrument;

use super::normalized;

/// Unordered author pair, smaller index first.
const fn pair(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

/// Event counts per unordered pair, one slot per event kind.
type Counts = BTreeMap<(usize, usize), [u64; 3]>;

fn bump(counts: &mut Counts, a: usize, b: usize, slot: usize) {
    if a == b {
        return;
    }
    counts.entry(pair(a, b)).or_insert([0; 3])[slot] += 1;
}

fn reported(observed: usize, total: Option<u64>) -> u64 {
    (observed as u64).max(total.unwrap_or(0))
}

const FAVORITES: usize = 0;
const RESHARES: usize = 1;
const CONVERSATIONS: usize = 2;

/// Favorites exchanged, reshares of each other, and conversations shared.
///
/// Totals per author: favorites given (at least the reported like total),
/// reshares made, and conversation threads joined.
#[instrument(skip_all, fields(authors = profiles.len()))]
pub(super) fn interaction_strength(
    config: &AffinityConfig,
    posts: &[Post],
    profiles: &UserProfiles,
) -> SparseGraph {
    let n = profiles.len();
    let mut counts = Counts::new();
    let mut favorites_given = vec![0u64; n];
    let mut reshares_made = vec![0u64; n];
    let mut conversations_joined = vec![0u64; n];

    for (liker, _, profile) in profiles.iter() {
        let like_total = profile.social.as_ref().and_then(|s| s.like_total);
        favorites_given[liker] = reported(profile.favorited.len(), like_total);
        for &post in &profile.favorited {
            if let Some(author) = profiles.post_author(post) {
                bump(&mut counts, liker, author, FAVORITES);
            }
        }

        for &post in &profile.authored {
            let Some(original) = posts[post].reshare_of() else {
                continue;
            };
            reshares_made[liker] += 1;
            if let Some(author) = profiles.author_index(original) {
                bump(&mut counts, liker, author, RESHARES);
            }
        }
    }

    // Threads each author wrote into, restricted to real conversations.
    let mut participants: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    for (author, _, profile) in profiles.iter() {
        for &thread in &profile.threads {
            participants.entry(thread).or_default().insert(author);
        }
    }
    for authors in participants.values().filter(|a| a.len() > 1) {
        let authors: Vec<usize> = authors.iter().copied().collect();
        for (k, &a) in authors.iter().enumerate() {
            conversations_joined[a] += 1;
            for &b in &authors[k + 1..] {
                bump(&mut counts, a, b, CONVERSATIONS);
            }
        }
    }

    let mut graph = SparseGraph::new(n);
    for (&(a, b), c) in &counts {
        let score = config.like_weight
            * normalized(c[FAVORITES], favorites_given[a], favorites_given[b])
            + config.retweet_weight * normalized(c[RESHARES], reshares_made[a], reshares_made[b])
            + config.conversation_weight
                * normalized(
                    c[CONVERSATIONS],
                    conversations_joined[a],
                    conversations_joined[b],
                );
        graph.set(a, b, score);
    }
    graph
}

const MENTIONS: usize = 0;
const REPLIES: usize = 1;
const QUOTES: usize = 2;

/// Mentions, replies and quotes directed at each other, normalized by the
/// authors' post totals.
#[instrument(skip_all, fields(authors = profiles.len()))]
pub(super) fn engagement_strength(
    config: &AffinityConfig,
    posts: &[Post],
    profiles: &UserProfiles,
) -> SparseGraph {
    let n = profiles.len();
    let by_id: HashMap<&str, usize> = posts
        .iter()
        .enumerate()
        .map(|(idx, post)| (post.id(), idx))
        .collect();
    let target_author = |id: Option<&str>| {
        id.and_then(|id| by_id.get(id))
            .and_then(|&idx| profiles.post_author(idx))
    };

    let mut counts = Counts::new();
    let mut post_totals = vec![0u64; n];

    for (author, _, profile) in profiles.iter() {
        let post_total = profile.social.as_ref().and_then(|s| s.post_total);
        post_totals[author] = reported(profile.authored.len(), post_total);

        for &idx in &profile.authored {
            let post = &posts[idx];
            for mention in &post.entities().mentions {
                if let Some(other) = profiles.author_index(mention) {
                    bump(&mut counts, author, other, MENTIONS);
                }
            }
            if let Some(other) = target_author(post.reply_to()) {
                bump(&mut counts, author, other, REPLIES);
            }
            if let Some(other) = target_author(post.quoted()) {
                bump(&mut counts, author, other, QUOTES);
            }
        }
    }

    let mut graph = SparseGraph::new(n);
    for (&(a, b), c) in &counts {
        let (ta, tb) = (post_totals[a], post_totals[b]);
        let score = config.mention_weight * normalized(c[MENTIONS], ta, tb)
            + config.reply_weight * normalized(c[REPLIES], ta, tb)
            + config.quote_weight * normalized(c[QUOTES], ta, tb);
        graph.set(a, b, score);
    }
    graph
}
