//! Mutual-follow strength from supplied social-graph data.

use std::collections::BTreeSet;

use gaiwan_core::{SparseGraph, UserProfiles};
use tracing::instrument;

/// Jaccard similarity of two sets: `|A ∩ B| / |A ∪ B|`.
///
/// Returns `0.0` when both sets are empty.
#[must_use]
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// `(mutual + jaccard(followers) + jaccard(following)) / 3` per author pair.
///
/// Authors without social-graph data score zero against everyone.
#[instrument(skip_all, fields(authors = profiles.len()))]
pub(super) fn mutual_follow_strength(profiles: &UserProfiles) -> SparseGraph {
    super::pairwise(profiles.len(), |i, j| {
        let (Some(a), Some(b)) = (
            profiles.profile(i).social.as_ref(),
            profiles.profile(j).social.as_ref(),
        ) else {
            return 0.0;
        };
        let (id_a, id_b) = (profiles.author_id(i), profiles.author_id(j));
        let mutual = if a.follows(b, id_a, id_b) && b.follows(a, id_b, id_a) {
            1.0
        } else {
            0.0
        };
        (mutual + jaccard(&a.followers, &b.followers) + jaccard(&a.following, &b.following))
            / 3.0
    })
}
