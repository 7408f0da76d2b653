//! Personalized propagation (personalized PageRank) over an affinity graph.
//!
//! # Algorithm
//!
//! The affinity graph is row-normalized into a transition matrix `P`. Mass
//! starts entirely on the seed and is spread by power iteration:
//!
//! ```text
//! x₀      = e_seed
//! x_{t+1} = α · e_seed + (1 − α) · Pᵀ x_t
//! ```
//!
//! where `α` is the restart probability. Mass sitting on a node with no
//! neighbours returns to the seed, so every iterate sums to one.
//!
//! Iteration stops when the L1 change between iterates drops below
//! `tolerance` or after `max_iter` rounds, whichever comes first. Hitting
//! the cap is not an error; the last iterate is returned with
//! `converged = false`.

use gaiwan_core::SparseGraph;
use tracing::{instrument, trace};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for one propagation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationConfig {
    /// Probability of jumping back to the seed at each step.
    /// Default: 0.6.
    pub alpha: f64,
    /// Convergence threshold on the L1 norm of the score delta.
    /// Default: 1e-6.
    pub tolerance: f64,
    /// Hard cap on iterations.
    /// Default: 18.
    pub max_iter: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            tolerance: 1e-6,
            max_iter: 18,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Result of a propagation run.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationResult {
    /// Score per node index. Non-negative, sums to one for a valid seed.
    pub scores: Vec<f64>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the L1 delta fell below tolerance within `max_iter`.
    pub converged: bool,
}

// ---------------------------------------------------------------------------
// Transition matrix
// ---------------------------------------------------------------------------

/// Row-normalized adjacency, built once per fitted graph.
#[derive(Debug, Clone, Default)]
pub struct TransitionMatrix {
    rows: Vec<Vec<(usize, f64)>>,
}

impl TransitionMatrix {
    #[must_use]
    pub fn from_graph(graph: &SparseGraph) -> Self {
        let rows = (0..graph.len())
            .map(|i| {
                let total = graph.row_sum(i);
                if total <= 0.0 {
                    return Vec::new();
                }
                graph.row(i).map(|(j, w)| (j, w / total)).collect()
            })
            .collect();
        Self { rows }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Outgoing transition probabilities of `node`.
    #[must_use]
    pub fn row(&self, node: usize) -> &[(usize, f64)] {
        self.rows.get(node).map_or(&[], Vec::as_slice)
    }
}

// ---------------------------------------------------------------------------
// Power iteration
// ---------------------------------------------------------------------------

/// Propagate from `seed` over `transition`.
///
/// An out-of-range seed yields an all-zero score vector after zero
/// iterations.
#[must_use]
#[instrument(skip(transition, config), fields(nodes = transition.len()))]
pub fn personalized_propagation(
    transition: &TransitionMatrix,
    seed: usize,
    config: &PropagationConfig,
) -> PropagationResult {
    let n = transition.len();
    if seed >= n {
        return PropagationResult {
            scores: vec![0.0; n],
            iterations: 0,
            converged: true,
        };
    }

    let alpha = config.alpha.clamp(0.0, 1.0);
    let spread = 1.0 - alpha;

    let mut scores = vec![0.0_f64; n];
    scores[seed] = 1.0;
    let mut next = vec![0.0_f64; n];

    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..config.max_iter {
        iterations += 1;

        next.fill(0.0);
        next[seed] = alpha;

        let mut dangling = 0.0;
        for (node, &mass) in scores.iter().enumerate() {
            if mass <= 0.0 {
                continue;
            }
            let row = transition.row(node);
            if row.is_empty() {
                dangling += mass;
                continue;
            }
            for &(neighbor, p) in row {
                next[neighbor] += spread * mass * p;
            }
        }
        next[seed] += spread * dangling;

        let delta: f64 = scores
            .iter()
            .zip(next.iter())
            .map(|(old, new)| (old - new).abs())
            .sum();

        std::mem::swap(&mut scores, &mut next);
        trace!(iteration = iterations, delta, "propagation step");

        if delta < config.tolerance {
            converged = true;
            break;
        }
    }

    PropagationResult {
        scores,
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn assert_approx_eq(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta < 1e-9,
            "actual={actual}, expected={expected}, delta={delta}"
        );
    }

    fn config(alpha: f64, max_iter: usize) -> PropagationConfig {
        PropagationConfig {
            alpha,
            tolerance: 1e-9,
            max_iter,
        }
    }

    /// a - b - c, plus isolated d.
    fn chain() -> TransitionMatrix {
        TransitionMatrix::from_graph(&SparseGraph::from_edges(4, [(0, 1, 1.0), (1, 2, 1.0)]))
    }

    // -----------------------------------------------------------------------
    // Transition matrix
    // -----------------------------------------------------------------------

    #[test]
    fn rows_are_stochastic() {
        let t = TransitionMatrix::from_graph(&SparseGraph::from_edges(
            3,
            [(0, 1, 3.0), (0, 2, 1.0)],
        ));
        let row: f64 = t.row(0).iter().map(|(_, p)| p).sum();
        assert_approx_eq(row, 1.0);
        assert_approx_eq(t.row(0)[0].1, 0.75);
        assert_eq!(t.row(1), &[(0, 1.0)]);
        assert!(t.row(9).is_empty());
    }

    // -----------------------------------------------------------------------
    // Propagation
    // -----------------------------------------------------------------------

    #[test]
    fn empty_graph_out_of_range_seed() {
        let result = personalized_propagation(&TransitionMatrix::default(), 0, &config(0.5, 10));
        assert!(result.scores.is_empty());
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn mass_is_conserved_and_reaches_neighbors() {
        let result = personalized_propagation(&chain(), 0, &config(0.6, 100));
        let total: f64 = result.scores.iter().sum();
        assert_approx_eq(total, 1.0);
        assert!(result.scores[1] > 0.0);
        assert!(result.scores[2] > 0.0);
        assert_eq!(result.scores[3], 0.0);
        assert!(result.scores[1] > result.scores[2]);
        assert!(result.converged);
    }

    #[test]
    fn isolated_seed_keeps_all_mass() {
        let result = personalized_propagation(&chain(), 3, &config(0.6, 50));
        assert_approx_eq(result.scores[3], 1.0);
        assert_eq!(result.scores[0], 0.0);
        assert!(result.converged);
    }

    #[test]
    fn iteration_cap_is_hard() {
        let result = personalized_propagation(&chain(), 0, &config(0.0, 1));
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
        assert_approx_eq(result.scores[1], 1.0);
    }

    #[test]
    fn alpha_one_never_leaves_seed() {
        let result = personalized_propagation(&chain(), 1, &config(1.0, 10));
        assert_approx_eq(result.scores[1], 1.0);
        assert_eq!(result.scores[0], 0.0);
    }

    #[test]
    fn periodic_graph_without_restart_stops_at_cap() {
        // Two nodes bouncing mass back and forth never converge.
        let t = TransitionMatrix::from_graph(&SparseGraph::from_edges(2, [(0, 1, 1.0)]));
        let result = personalized_propagation(&t, 0, &config(0.0, 7));
        assert_eq!(result.iterations, 7);
        assert!(!result.converged);
        assert!(result.scores.iter().all(|s| s.is_finite() && *s >= 0.0));
    }

    #[test]
    fn random_graphs_stay_finite_at_any_cap() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 40;
        let edges: Vec<(usize, usize, f64)> = (0..120)
            .map(|_| {
                (
                    rng.gen_range(0..n),
                    rng.gen_range(0..n),
                    rng.gen_range(0.01..2.0),
                )
            })
            .collect();
        let t = TransitionMatrix::from_graph(&SparseGraph::from_edges(n, edges));
        for max_iter in [1, 100] {
            let result = personalized_propagation(&t, 0, &config(0.6, max_iter));
            assert!(result.iterations <= max_iter);
            assert!(result.scores.iter().all(|s| s.is_finite() && *s >= 0.0));
            assert_approx_eq(result.scores.iter().sum::<f64>(), 1.0);
        }
    }

    proptest! {
        #[test]
        fn scores_are_a_distribution(
            edges in proptest::collection::vec((0usize..10, 0usize..10, 0.01f64..3.0), 0..30),
            seed in 0usize..10,
            alpha in 0.0f64..=1.0,
            max_iter in 1usize..40,
        ) {
            let t = TransitionMatrix::from_graph(&SparseGraph::from_edges(10, edges));
            let result = personalized_propagation(&t, seed, &config(alpha, max_iter));
            prop_assert_eq!(result.scores.len(), 10);
            prop_assert!(result.scores.iter().all(|s| s.is_finite() && *s >= 0.0));
            let total: f64 = result.scores.iter().sum();
            prop_assert!((total - 1.0).abs() < 1e-9);
        }
    }
}
