//! Ranking properties over randomly generated corpora.
//!
//! Whatever the corpus shape, a result list must:
//! - hold at most `k` posts and never the query itself
//! - carry finite, strictly positive scores in non-increasing order
//! - order equal scores by ascending post id
//! - be identical across independent fits of the same corpus

use gaiwan_core::{EngineConfig, Post, RetrievalConfig};
use gaiwan_search::{Corpus, FitSummary, RetrievalEngine, RetrievalMode, RetrievalResult};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const WORDS: &[&str] = &[
    "ferry", "harbour", "tide", "storm", "gull", "lantern", "rope", "anchor", "what", "why",
];
const AUTHORS: &[&str] = &["amy", "bob", "cat", "dan"];

#[derive(Debug, Clone)]
struct PostShape {
    words: Vec<usize>,
    author: usize,
    parent: Option<usize>,
    question: bool,
}

fn post_shape() -> impl Strategy<Value = PostShape> {
    (
        proptest::collection::vec(0..WORDS.len(), 0..6),
        0..AUTHORS.len(),
        proptest::option::of(0usize..64),
        any::<bool>(),
    )
        .prop_map(|(words, author, parent, question)| PostShape {
            words,
            author,
            parent,
            question,
        })
}

/// Parents always point at an earlier post, so threads stay acyclic.
fn build(shapes: &[PostShape]) -> Vec<Post> {
    shapes
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut text: Vec<&str> = s.words.iter().map(|&w| WORDS[w]).collect();
            if s.question {
                text.push("?");
            }
            let post = Post::original(format!("p{i:03}"), AUTHORS[s.author], text.join(" "));
            match s.parent {
                Some(p) if i > 0 => post.with_reply_to(format!("p{:03}", p % i)),
                _ => post,
            }
        })
        .collect()
}

fn config() -> EngineConfig {
    EngineConfig {
        retrieval: RetrievalConfig {
            min_df: 1,
            similarity_threshold: 0.1,
            batch_size: 7,
            ..RetrievalConfig::default()
        },
        ..EngineConfig::default()
    }
}

fn fit(posts: Vec<Post>) -> (RetrievalEngine, FitSummary) {
    let mut engine = RetrievalEngine::new(config()).expect("valid config");
    let summary = engine.fit(Corpus::new(posts)).expect("fit succeeds");
    (engine, summary)
}

fn check_ordering(results: &[RetrievalResult<'_>], query: &str, k: usize) -> Result<(), TestCaseError> {
    prop_assert!(results.len() <= k);
    for r in results {
        prop_assert_ne!(r.post.id(), query);
        prop_assert!(r.score.is_finite() && r.score > 0.0);
    }
    for pair in results.windows(2) {
        prop_assert!(pair[0].score >= pair[1].score);
        if pair[0].score == pair[1].score {
            prop_assert!(pair[0].post.id() < pair[1].post.id());
        }
    }
    Ok(())
}

fn as_pairs(results: &[RetrievalResult<'_>]) -> Vec<(String, f64)> {
    results
        .iter()
        .map(|r| (r.post.id().to_string(), r.score))
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn results_are_bounded_and_ordered(
        shapes in proptest::collection::vec(post_shape(), 1..24),
        query in 0usize..24,
        k in 0usize..12,
    ) {
        let posts = build(&shapes);
        let query = posts[query % posts.len()].id().to_string();
        let (engine, _) = fit(posts);

        for mode in [None, Some(RetrievalMode::Exploratory), Some(RetrievalMode::Declarative)] {
            let results = engine.retrieve(&query, k, mode).expect("fitted");
            check_ordering(&results, &query, k)?;
        }
    }

    #[test]
    fn refits_are_deterministic(
        shapes in proptest::collection::vec(post_shape(), 1..16),
        query in 0usize..16,
    ) {
        let posts = build(&shapes);
        let query = posts[query % posts.len()].id().to_string();
        let (first, first_summary) = fit(posts.clone());
        let (second, second_summary) = fit(posts);

        prop_assert_eq!(first_summary, second_summary);
        for mode in [RetrievalMode::Exploratory, RetrievalMode::Declarative] {
            let a = first.retrieve(&query, 10, Some(mode)).expect("fitted");
            let b = second.retrieve(&query, 10, Some(mode)).expect("fitted");
            prop_assert_eq!(as_pairs(&a), as_pairs(&b));
        }
    }
}

// ---------------------------------------------------------------------------
// Summary serialization
// ---------------------------------------------------------------------------

#[test]
fn fit_summary_serializes_to_json() {
    let posts = build(&[
        PostShape { words: vec![0, 1], author: 0, parent: None, question: false },
        PostShape { words: vec![0, 2], author: 1, parent: Some(0), question: true },
    ]);
    let (_, summary) = fit(posts);
    let value = serde_json::to_value(&summary).expect("serializes");
    assert_eq!(value["posts"], 2);
    assert_eq!(value["authors"], 2);
    assert_eq!(value["threads"], 1);
    assert!(
        value["corpus_hash"]
            .as_str()
            .is_some_and(|hash| hash.starts_with("blake3:"))
    );
}
