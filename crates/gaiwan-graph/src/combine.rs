//! Structural/text mix.
//!
//! ```text
//! combined = graph_weight · (structural / max(structural))
//!          + (1 − graph_weight) · text
//! ```
//!
//! Text cosine scores already lie in `[0, 1]`; dividing the structural
//! graph by its largest weight puts it on the same scale. Min-max
//! normalization is not used because it would zero out the weakest
//! structural edge.

use std::collections::BTreeSet;

use gaiwan_core::{ConfigError, GraphError, SparseGraph};
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphCombiner {
    graph_weight: f64,
}

impl GraphCombiner {
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `graph_weight` is outside `[0, 1]`.
    pub fn new(graph_weight: f64) -> Result<Self, ConfigError> {
        if !graph_weight.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "graph_weight",
            });
        }
        if !(0.0..=1.0).contains(&graph_weight) {
            return Err(ConfigError::OutOfRange {
                field: "graph_weight",
                value: graph_weight,
                expected: "[0, 1]",
            });
        }
        Ok(Self { graph_weight })
    }

    #[must_use]
    pub const fn graph_weight(&self) -> f64 {
        self.graph_weight
    }

    /// One structural weight on the unit scale of its graph.
    ///
    /// A structural maximum of (near) zero maps everything to `0.0`.
    #[must_use]
    pub fn normalized(structural: f64, structural_max: f64) -> f64 {
        if structural_max > f64::EPSILON {
            structural / structural_max
        } else {
            0.0
        }
    }

    /// Mix the structural and text graphs into one affinity graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ShapeMismatch`] if the graphs differ in size.
    #[instrument(skip_all, fields(graph_weight = self.graph_weight))]
    pub fn combine(
        &self,
        structural: &SparseGraph,
        text: &SparseGraph,
    ) -> Result<SparseGraph, GraphError> {
        if text.len() != structural.len() {
            return Err(GraphError::ShapeMismatch {
                expected: structural.len(),
                actual: text.len(),
            });
        }
        let structural_max = structural.max_weight();
        let pairs: BTreeSet<(usize, usize)> = structural
            .edges()
            .chain(text.edges())
            .map(|(i, j, _)| (i, j))
            .collect();

        let mut combined = SparseGraph::new(structural.len());
        for (i, j) in pairs {
            let weight = self.mix(structural.get(i, j), structural_max, text.get(i, j));
            combined.set(i, j, weight);
        }
        Ok(combined)
    }

    /// Combined weight for one pair from its raw structural weight, the
    /// largest structural weight in the graph and its text similarity.
    #[must_use]
    pub fn mix(&self, structural: f64, structural_max: f64, text: f64) -> f64 {
        let normalized = Self::normalized(structural, structural_max);
        self.graph_weight.mul_add(normalized, (1.0 - self.graph_weight) * text)
    }
}
