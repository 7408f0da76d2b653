//! Per-author aggregates derived once at fit time.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::post::Post;
use crate::text::url_domain;
use crate::thread::Threads;

/// Social-graph data for one author, supplied by an external collaborator.
///
/// Every field is optional in practice: an author with no entry, or with
/// empty sets, simply scores zero on the follow-based signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialGraph {
    #[serde(default)]
    pub followers: BTreeSet<String>,
    #[serde(default)]
    pub following: BTreeSet<String>,
    /// Lifetime post count reported by the archive, if known.
    #[serde(default)]
    pub post_total: Option<u64>,
    /// Lifetime favorite count reported by the archive, if known.
    #[serde(default)]
    pub like_total: Option<u64>,
}

impl SocialGraph {
    /// `true` when `self` follows `other_id`, or `other` lists `self_id`
    /// as a follower.
    #[must_use]
    pub fn follows(&self, other: &Self, self_id: &str, other_id: &str) -> bool {
        self.following.contains(other_id) || other.followers.contains(self_id)
    }
}

/// Everything the affinity signals need to know about one author.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    /// Indices of posts this author wrote.
    pub authored: Vec<usize>,
    /// Indices of posts this author favorited.
    pub favorited: Vec<usize>,
    pub social: Option<SocialGraph>,
    /// Communities this author has posted into.
    pub communities: BTreeSet<String>,
    pub media_counts: BTreeMap<String, u64>,
    pub domain_counts: BTreeMap<String, u64>,
    /// Authored posts by UTC hour of day. Posts without a timestamp are
    /// not counted.
    pub hour_histogram: [u32; 24],
    /// Conversation threads this author wrote into.
    pub threads: BTreeSet<usize>,
}

/// Dense author table plus one [`UserProfile`] per author.
///
/// Authors are the distinct authors of posts in the corpus, sorted by id so
/// author indices are stable across runs.
#[derive(Debug, Clone, Default)]
pub struct UserProfiles {
    authors: Vec<String>,
    index: HashMap<String, usize>,
    profiles: Vec<UserProfile>,
    /// Author index per post (`None` for posts with no known author).
    post_authors: Vec<Option<usize>>,
}

impl UserProfiles {
    #[must_use]
    #[instrument(skip_all, fields(posts = posts.len()))]
    pub fn build(
        posts: &[Post],
        social: &BTreeMap<String, SocialGraph>,
        threads: &Threads,
    ) -> Self {
        let authors: Vec<String> = posts
            .iter()
            .filter_map(Post::author)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let index: HashMap<String, usize> = authors
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();

        let mut profiles: Vec<UserProfile> = authors
            .iter()
            .map(|id| UserProfile {
                social: social.get(id).cloned(),
                ..UserProfile::default()
            })
            .collect();

        let mut post_authors = Vec::with_capacity(posts.len());
        for (post_idx, post) in posts.iter().enumerate() {
            let author = post.author().and_then(|a| index.get(a).copied());
            post_authors.push(author);

            for liker in post.favorited_by() {
                if let Some(&liker_idx) = index.get(liker) {
                    profiles[liker_idx].favorited.push(post_idx);
                }
            }

            let Some(author) = author else {
                continue;
            };
            let profile = &mut profiles[author];
            profile.authored.push(post_idx);
            if let Some(community) = post.community_id() {
                profile.communities.insert(community.to_string());
            }
            for media in &post.entities().media {
                *profile.media_counts.entry(media.clone()).or_default() += 1;
            }
            for url in &post.entities().urls {
                if let Some(domain) = url_domain(url) {
                    *profile.domain_counts.entry(domain).or_default() += 1;
                }
            }
            if let Some(at) = post.created_at() {
                profile.hour_histogram[at.hour() as usize] += 1;
            }
            if let Some(thread) = threads.thread_of(post_idx) {
                profile.threads.insert(thread);
            }
        }

        Self {
            authors,
            index,
            profiles,
            post_authors,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.authors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    #[must_use]
    pub fn author_index(&self, author: &str) -> Option<usize> {
        self.index.get(author).copied()
    }

    /// Author id for an index. Panics on an out-of-range index, like slice
    /// indexing.
    #[must_use]
    pub fn author_id(&self, idx: usize) -> &str {
        &self.authors[idx]
    }

    #[must_use]
    pub fn profile(&self, idx: usize) -> &UserProfile {
        &self.profiles[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &UserProfile)> {
        self.authors
            .iter()
            .zip(&self.profiles)
            .enumerate()
            .map(|(idx, (id, profile))| (idx, id.as_str(), profile))
    }

    /// Author index of a post.
    #[must_use]
    pub fn post_author(&self, post: usize) -> Option<usize> {
        self.post_authors.get(post).copied().flatten()
    }

    /// Concatenated authored and favorited text for one author.
    #[must_use]
    pub fn combined_text(&self, idx: usize, posts: &[Post]) -> String {
        let profile = &self.profiles[idx];
        profile
            .authored
            .iter()
            .chain(&profile.favorited)
            .map(|&p| posts[p].text())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
