//! Lexical similarity between posts.
//!
//! # Overview
//!
//! Each post's text is cleaned with [`gaiwan_core::text::tokenize`]
//! (mentions, hashtags and URLs dropped, lowercased) and embedded as an
//! L2-normalized TF-IDF vector:
//!
//! ```text
//! w(t, d) = tf(t, d) · (ln((1 + n) / (1 + df(t))) + 1)
//! ```
//!
//! The vocabulary keeps terms that occur in at least `min_df` posts and in
//! at most `max_df · n` posts.
//!
//! Pairwise cosine similarity is accumulated through an inverted index,
//! one batch of `batch_size` rows at a time. Within a batch rows run on the
//! rayon pool. Each row only scores partners with a higher index and sums
//! its terms in a fixed order, so the matrix is identical for every batch
//! size. Scores below `similarity_threshold` are not stored.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet};

use gaiwan_core::text::tokenize;
use gaiwan_core::{ConfigError, Post, RetrievalConfig, SparseGraph};
use rayon::prelude::*;
use tracing::{debug, instrument};

/// A sparse TF-IDF vector as `(term id, weight)` pairs, ascending by term.
pub type TermVector = Vec<(usize, f64)>;

/// Fitted TF-IDF vectors and the thresholded cosine-similarity graph.
#[derive(Debug, Clone)]
pub struct TextSimilarityIndex {
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    vectors: Vec<TermVector>,
    similarity: SparseGraph,
}

impl TextSimilarityIndex {
    /// Build the index over `posts`.
    ///
    /// Post order defines node indices in [`Self::similarity_matrix`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    #[instrument(skip_all, fields(posts = posts.len()))]
    pub fn fit(posts: &[Post], config: &RetrievalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = posts.len();

        let documents: Vec<Vec<String>> = posts.par_iter().map(|p| tokenize(p.text())).collect();

        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &documents {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *df.entry(term).or_default() += 1;
            }
        }

        let max_count = config.max_df * n as f64;
        let n_f64 = n as f64;
        let mut vocabulary = Vec::new();
        let mut idf = Vec::new();
        let mut term_ids: BTreeMap<&str, usize> = BTreeMap::new();
        for (term, count) in df {
            if count < config.min_df || count as f64 > max_count {
                continue;
            }
            term_ids.insert(term, vocabulary.len());
            vocabulary.push(term.to_string());
            idf.push(((1.0 + n_f64) / (1.0 + count as f64)).ln() + 1.0);
        }

        let vectors: Vec<TermVector> = documents
            .par_iter()
            .map(|tokens| {
                let mut tf: BTreeMap<usize, u32> = BTreeMap::new();
                for token in tokens {
                    if let Some(&id) = term_ids.get(token.as_str()) {
                        *tf.entry(id).or_default() += 1;
                    }
                }
                let mut vector: TermVector = tf
                    .into_iter()
                    .map(|(id, count)| (id, f64::from(count) * idf[id]))
                    .collect();
                let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in &mut vector {
                        *w /= norm;
                    }
                }
                vector
            })
            .collect();

        let similarity = cosine_graph(
            &vectors,
            vocabulary.len(),
            config.similarity_threshold,
            config.batch_size,
        );

        debug!(
            vocabulary = vocabulary.len(),
            edges = similarity.edge_count(),
            "text index fitted"
        );

        Ok(Self {
            vocabulary,
            idf,
            vectors,
            similarity,
        })
    }

    /// Thresholded cosine similarity over posts.
    #[must_use]
    pub const fn similarity_matrix(&self) -> &SparseGraph {
        &self.similarity
    }

    /// Stored similarity of two posts (zero when pruned).
    #[must_use]
    pub fn similarity(&self, a: usize, b: usize) -> f64 {
        self.similarity.get(a, b)
    }

    #[must_use]
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    #[must_use]
    pub fn term(&self, id: usize) -> Option<&str> {
        self.vocabulary.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn idf(&self, id: usize) -> Option<f64> {
        self.idf.get(id).copied()
    }

    /// TF-IDF vector of one post; empty when its cleaned text has no
    /// vocabulary terms.
    #[must_use]
    pub fn vector(&self, post: usize) -> &[(usize, f64)] {
        self.vectors.get(post).map_or(&[], Vec::as_slice)
    }
}

fn cosine_graph(
    vectors: &[TermVector],
    vocabulary: usize,
    threshold: f64,
    batch_size: usize,
) -> SparseGraph {
    let n = vectors.len();
    let mut postings: Vec<Vec<(usize, f64)>> = vec![Vec::new(); vocabulary];
    for (doc, vector) in vectors.iter().enumerate() {
        for &(term, weight) in vector {
            postings[term].push((doc, weight));
        }
    }

    let mut graph = SparseGraph::new(n);
    let rows: Vec<usize> = (0..n).collect();
    for batch in rows.chunks(batch_size.max(1)) {
        let edges: Vec<Vec<(usize, usize, f64)>> = batch
            .par_iter()
            .map(|&row| row_similarities(row, &vectors[row], &postings, threshold))
            .collect();
        for (i, j, score) in edges.into_iter().flatten() {
            graph.set(i, j, score);
        }
    }
    graph
}

fn row_similarities(
    row: usize,
    vector: &[(usize, f64)],
    postings: &[Vec<(usize, f64)>],
    threshold: f64,
) -> Vec<(usize, usize, f64)> {
    let mut scores: BTreeMap<usize, f64> = BTreeMap::new();
    for &(term, weight) in vector {
        let list = &postings[term];
        let start = list.partition_point(|&(doc, _)| doc <= row);
        for &(other, other_weight) in &list[start..] {
            *scores.entry(other).or_insert(0.0) += weight * other_weight;
        }
    }
    scores
        .into_iter()
        .filter(|&(_, score)| score > 0.0 && score >= threshold)
        .map(|(other, score)| (row, other, score.min(1.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> RetrievalConfig {
        RetrievalConfig {
            min_df: 1,
            max_df: 1.0,
            similarity_threshold: 0.0,
            ..RetrievalConfig::default()
        }
    }

    fn posts(texts: &[&str]) -> Vec<Post> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| Post::original(i.to_string(), "u", *text))
            .collect()
    }

    fn assert_approx_eq(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta < 1e-9,
            "actual={actual}, expected={expected}, delta={delta}"
        );
    }

    // -----------------------------------------------------------------------
    // Vocabulary
    // -----------------------------------------------------------------------

    #[test]
    fn vocabulary_skips_entities() {
        let index = TextSimilarityIndex::fit(
            &posts(&["hello @bob #tag https://x.com/y world"]),
            &config(),
        )
        .unwrap();
        assert_eq!(index.vocabulary_len(), 2);
        assert_eq!(index.term(0), Some("hello"));
        assert_eq!(index.term(1), Some("world"));
    }

    #[test]
    fn min_df_drops_rare_terms() {
        let config = RetrievalConfig {
            min_df: 2,
            ..config()
        };
        let index =
            TextSimilarityIndex::fit(&posts(&["rust async", "rust tokio"]), &config).unwrap();
        assert_eq!(index.vocabulary_len(), 1);
        assert_eq!(index.term(0), Some("rust"));
    }

    #[test]
    fn max_df_drops_ubiquitous_terms() {
        let config = RetrievalConfig {
            max_df: 0.5,
            ..config()
        };
        let index = TextSimilarityIndex::fit(
            &posts(&["the cat", "the dog", "the fish", "the cat"]),
            &config,
        )
        .unwrap();
        assert!((0..index.vocabulary_len()).all(|id| index.term(id) != Some("the")));
    }

    #[test]
    fn idf_is_smoothed() {
        let index = TextSimilarityIndex::fit(&posts(&["a b", "a"]), &config()).unwrap();
        // "a" in both posts, "b" in one.
        assert_approx_eq(index.idf(0).unwrap(), 1.0);
        assert_approx_eq(index.idf(1).unwrap(), (3.0_f64 / 2.0).ln() + 1.0);
    }

    // -----------------------------------------------------------------------
    // Vectors and similarity
    // -----------------------------------------------------------------------

    #[test]
    fn vectors_are_unit_length() {
        let index =
            TextSimilarityIndex::fit(&posts(&["rust rust async", "async io"]), &config()).unwrap();
        let norm: f64 = index.vector(0).iter().map(|(_, w)| w * w).sum();
        assert_approx_eq(norm, 1.0);
    }

    #[test]
    fn empty_after_cleaning_has_no_edges() {
        let index = TextSimilarityIndex::fit(
            &posts(&["@alice #rust https://example.com", "rust is great", "rust is great"]),
            &config(),
        )
        .unwrap();
        assert!(index.vector(0).is_empty());
        assert_eq!(index.similarity_matrix().row(0).count(), 0);
        assert_approx_eq(index.similarity(1, 2), 1.0);
    }

    #[test]
    fn disjoint_texts_do_not_link() {
        let index =
            TextSimilarityIndex::fit(&posts(&["apples pears", "boats trains"]), &config()).unwrap();
        assert_eq!(index.similarity_matrix().edge_count(), 0);
    }

    #[test]
    fn threshold_prunes_weak_pairs() {
        let texts = ["rust async tokio runtime", "rust gardening soil compost"];
        let loose = TextSimilarityIndex::fit(&posts(&texts), &config()).unwrap();
        let weak = loose.similarity(0, 1);
        assert!(weak > 0.0 && weak < 0.5);

        let strict = RetrievalConfig {
            similarity_threshold: 0.5,
            ..config()
        };
        let index = TextSimilarityIndex::fit(&posts(&texts), &strict).unwrap();
        assert_eq!(index.similarity(0, 1), 0.0);
    }

    #[test]
    fn rejects_invalid_config() {
        let bad = RetrievalConfig {
            batch_size: 0,
            ..config()
        };
        assert_eq!(
            TextSimilarityIndex::fit(&[], &bad).unwrap_err(),
            ConfigError::ZeroBatchSize
        );
    }

    #[test]
    fn empty_corpus() {
        let index = TextSimilarityIndex::fit(&[], &config()).unwrap();
        assert!(index.similarity_matrix().is_empty());
        assert_eq!(index.vocabulary_len(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn batch_size_never_changes_matrix(
            texts in proptest::collection::vec(
                proptest::collection::vec(
                    proptest::sample::select(vec!["rust", "async", "tokio", "garden", "soil", "the"]),
                    1..6,
                ),
                1..20,
            ),
            batch in 1usize..8,
        ) {
            let corpus: Vec<Post> = texts
                .iter()
                .enumerate()
                .map(|(i, words)| Post::original(i.to_string(), "u", words.join(" ")))
                .collect();
            let whole = TextSimilarityIndex::fit(&corpus, &config()).unwrap();
            let batched = TextSimilarityIndex::fit(
                &corpus,
                &RetrievalConfig { batch_size: batch, ..config() },
            )
            .unwrap();
            prop_assert_eq!(whole.similarity_matrix(), batched.similarity_matrix());
        }
    }
}
