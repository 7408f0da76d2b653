//! Symmetric sparse weighted graph over dense node indices.
//!
//! Every similarity signal in gaiwan, whether over posts or over authors,
//! is a [`SparseGraph`]:
//!
//! - the node count is fixed at construction,
//! - weights are symmetric (`w(i, j) == w(j, i)`),
//! - the diagonal is always zero,
//! - only strictly positive, finite weights are stored.
//!
//! Rows are ordered maps, so iteration order (and therefore any float
//! summation built on top of it) is deterministic.

use std::collections::BTreeMap;

use crate::error::GraphError;

#[derive(Debug, Clone, PartialEq)]
pub struct SparseGraph {
    rows: Vec<BTreeMap<usize, f64>>,
}

impl SparseGraph {
    /// An edgeless graph over `n` nodes.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            rows: vec![BTreeMap::new(); n],
        }
    }

    /// Build from an edge list, accumulating repeated pairs.
    ///
    /// # Panics
    ///
    /// Panics if an endpoint is out of range.
    #[must_use]
    pub fn from_edges(n: usize, edges: impl IntoIterator<Item = (usize, usize, f64)>) -> Self {
        let mut graph = Self::new(n);
        for (i, j, w) in edges {
            graph.add(i, j, w);
        }
        graph
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of undirected edges stored.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.rows.iter().map(BTreeMap::len).sum::<usize>() / 2
    }

    /// Add `weight` to the undirected edge `(i, j)`.
    ///
    /// Self-loops and non-positive or non-finite weights are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is out of range.
    pub fn add(&mut self, i: usize, j: usize, weight: f64) {
        if i == j || !weight.is_finite() || weight <= 0.0 {
            return;
        }
        *self.rows[i].entry(j).or_insert(0.0) += weight;
        *self.rows[j].entry(i).or_insert(0.0) += weight;
    }

    /// Overwrite the undirected edge `(i, j)`. A non-positive weight removes
    /// it.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is out of range.
    pub fn set(&mut self, i: usize, j: usize, weight: f64) {
        if i == j {
            return;
        }
        if weight.is_finite() && weight > 0.0 {
            self.rows[i].insert(j, weight);
            self.rows[j].insert(i, weight);
        } else {
            self.rows[i].remove(&j);
            self.rows[j].remove(&i);
        }
    }

    /// Weight of `(i, j)`; zero when absent or out of range.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows
            .get(i)
            .and_then(|row| row.get(&j))
            .copied()
            .unwrap_or(0.0)
    }

    /// Neighbours of `i` with their weights, ascending by index.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.rows
            .get(i)
            .into_iter()
            .flat_map(|row| row.iter().map(|(&j, &w)| (j, w)))
    }

    /// Sum of the weights on row `i`.
    #[must_use]
    pub fn row_sum(&self, i: usize) -> f64 {
        self.row(i).map(|(_, w)| w).sum()
    }

    /// Each undirected edge once, as `(i, j, w)` with `i < j`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows.iter().enumerate().flat_map(|(i, row)| {
            row.range(i + 1..).map(move |(&j, &w)| (i, j, w))
        })
    }

    /// Largest stored weight, or `0.0` for an edgeless graph.
    #[must_use]
    pub fn max_weight(&self) -> f64 {
        self.rows
            .iter()
            .flat_map(BTreeMap::values)
            .copied()
            .fold(0.0, f64::max)
    }

    /// Add `factor * other` into `self`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ShapeMismatch`] if the node counts differ and
    /// [`GraphError::NegativeWeight`] for a negative or non-finite factor.
    pub fn add_scaled(&mut self, other: &Self, factor: f64) -> Result<(), GraphError> {
        if other.len() != self.len() {
            return Err(GraphError::ShapeMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        if !factor.is_finite() || factor < 0.0 {
            return Err(GraphError::NegativeWeight { weight: factor });
        }
        if factor == 0.0 {
            return Ok(());
        }
        for (i, j, w) in other.edges() {
            self.add(i, j, w * factor);
        }
        Ok(())
    }

    /// Drop every edge whose weight is below `threshold`.
    pub fn prune_below(&mut self, threshold: f64) {
        for row in &mut self.rows {
            row.retain(|_, w| *w >= threshold);
        }
    }
}
