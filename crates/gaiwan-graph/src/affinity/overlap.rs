//! Community, media-type and link-domain overlap.

use std::collections::BTreeMap;

use gaiwan_core::{AffinityConfig, SparseGraph, UserProfiles};
use tracing::instrument;

use super::follow::jaccard;

/// `Σ min(a_k, b_k) / Σ max(a_k, b_k)` over the union of keys.
fn count_overlap(a: &BTreeMap<String, u64>, b: &BTreeMap<String, u64>) -> f64 {
    let mut shared = 0u64;
    let mut total = 0u64;
    for (key, &x) in a {
        let y = b.get(key).copied().unwrap_or(0);
        shared += x.min(y);
        total += x.max(y);
    }
    total += b
        .iter()
        .filter(|(key, _)| !a.contains_key(*key))
        .map(|(_, &y)| y)
        .sum::<u64>();
    if total == 0 {
        return 0.0;
    }
    shared as f64 / total as f64
}

#[instrument(skip_all, fields(authors = profiles.len()))]
pub(super) fn overlap_similarity(config: &AffinityConfig, profiles: &UserProfiles) -> SparseGraph {
    super::pairwise(profiles.len(), |i, j| {
        let (a, b) = (profiles.profile(i), profiles.profile(j));
        config.community_weight * jaccard(&a.communities, &b.communities)
            + config.media_weight * count_overlap(&a.media_counts, &b.media_counts)
            + config.url_weight * count_overlap(&a.domain_counts, &b.domain_counts)
    })
}
