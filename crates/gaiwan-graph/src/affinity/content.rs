//! Content-compression similarity between authors.
//!
//! Normalized compression distance over zstd:
//!
//! ```text
//! ncd(a, b) = (C(a ‖ b) − min(C(a), C(b))) / max(C(a), C(b))
//! sim(a, b) = 1 − ncd(a, b)
//! ```
//!
//! `C` is the compressed size minus the size of an empty frame, so short
//! texts are not dominated by header bytes. The pair is always
//! concatenated in lexicographic order, which makes `sim` exactly
//! symmetric.

use std::sync::OnceLock;

use gaiwan_core::{AffinityConfig, Post, SparseGraph, UserProfiles};
use rayon::prelude::*;
use tracing::{instrument, warn};

const COMPRESSION_LEVEL: i32 = 3;

/// Size of `data` after zstd compression, or `None` if the compressor
/// reports an error. Any pair involving a failed compression is treated as
/// maximally distant.
#[must_use]
pub fn compressed_len(data: &[u8]) -> Option<usize> {
    match zstd::bulk::compress(data, COMPRESSION_LEVEL) {
        Ok(out) => Some(out.len()),
        Err(err) => {
            warn!(error = %err, bytes = data.len(), "compression failed, pair scored as maximally distant");
            None
        }
    }
}

fn frame_overhead() -> usize {
    static OVERHEAD: OnceLock<usize> = OnceLock::new();
    *OVERHEAD.get_or_init(|| compressed_len(&[]).unwrap_or(0))
}

fn payload_len(text: &str) -> Option<usize> {
    compressed_len(text.as_bytes()).map(|len| len.saturating_sub(frame_overhead()))
}

/// Normalized compression distance in `[0, 1]`.
///
/// `1.0` when either text is empty.
#[must_use]
pub fn compression_distance(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 1.0;
    }
    match (payload_len(a), payload_len(b)) {
        (Some(len_a), Some(len_b)) => distance_with(a, len_a, b, len_b),
        _ => 1.0,
    }
}

/// `1 − compression_distance(a, b)`.
#[must_use]
pub fn compression_similarity(a: &str, b: &str) -> f64 {
    1.0 - compression_distance(a, b)
}

fn distance_with(a: &str, len_a: usize, b: &str, len_b: usize) -> f64 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let mut joined = String::with_capacity(a.len() + b.len());
    joined.push_str(first);
    joined.push_str(second);

    let Some(joint) = payload_len(&joined) else {
        return 1.0;
    };
    let joint = joint as f64;
    let lo = len_a.min(len_b) as f64;
    let hi = len_a.max(len_b);
    if hi == 0 {
        return 1.0;
    }
    ((joint - lo) / hi as f64).clamp(0.0, 1.0)
}

#[instrument(skip_all, fields(authors = profiles.len()))]
pub(super) fn content_similarity(
    config: &AffinityConfig,
    posts: &[Post],
    profiles: &UserProfiles,
) -> SparseGraph {
    let texts: Vec<Option<String>> = (0..profiles.len())
        .into_par_iter()
        .map(|idx| {
            if profiles.profile(idx).authored.len() < config.min_posts_per_user {
                return None;
            }
            let text = profiles.combined_text(idx, posts);
            (!text.trim().is_empty()).then_some(text)
        })
        .collect();
    let lens: Vec<Option<usize>> = texts
        .par_iter()
        .map(|text| text.as_deref().and_then(payload_len))
        .collect();

    let threshold = config.ncd_threshold;
    super::pairwise(profiles.len(), |i, j| {
        let (Some(a), Some(b), Some(len_a), Some(len_b)) = (&texts[i], &texts[j], lens[i], lens[j])
        else {
            return 0.0;
        };
        let sim = 1.0 - distance_with(a, len_a, b, len_b);
        if sim > threshold { sim } else { 0.0 }
    })
}
