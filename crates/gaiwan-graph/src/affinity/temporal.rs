//! Hour-of-day posting pattern similarity.

use gaiwan_core::{SparseGraph, UserProfiles};
use tracing::instrument;

fn cosine(a: &[u32; 24], b: &[u32; 24]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Cosine similarity of authors' 24-bucket posting histograms.
///
/// Authors with no timestamped posts score zero.
#[instrument(skip_all, fields(authors = profiles.len()))]
pub(super) fn temporal_similarity(profiles: &UserProfiles) -> SparseGraph {
    super::pairwise(profiles.len(), |i, j| {
        cosine(
            &profiles.profile(i).hour_histogram,
            &profiles.profile(j).hour_histogram,
        )
    })
}
