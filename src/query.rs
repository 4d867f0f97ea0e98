//! Approximate k-NN queries against a built forest.
//!
//! Traversal keeps a single max-heap of pending subtrees across all trees,
//! prioritized by how far the query sits from the split planes above them.
//! Popping the heap therefore interleaves each tree's primary descent with
//! the most promising near-boundary siblings, exactly the recall/latency
//! trade-off the `search_k` knob controls.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::ArrayView1;

use crate::error::{ForestError, Result};
use crate::forest::ForestIndex;
use crate::metrics::QueryTimer;
use crate::store::VectorStore;
use crate::tree::Node;

/// A single nearest-neighbor result.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Internal index of the matched vector.
    pub index: usize,
    /// Distance from the query vector (lower is closer).
    pub distance: f32,
}

/// Pending subtree in the traversal backlog, ordered by priority.
struct Visit<'a> {
    priority: f32,
    node: &'a Node,
}

impl PartialEq for Visit<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for Visit<'_> {}

impl PartialOrd for Visit<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Visit<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .partial_cmp(&other.priority)
            .unwrap_or(Ordering::Equal)
    }
}

impl ForestIndex {
    /// Find the `k` approximate nearest neighbors of the stored vector at
    /// `index`, excluding the vector itself.
    ///
    /// Uses the default candidate-pool size `k * num_trees`.
    pub fn query(&self, store: &VectorStore, index: usize, k: usize) -> Result<Vec<Neighbor>> {
        self.query_with(store, index, k, self.default_search_k(k))
    }

    /// Like [`query`](Self::query) with an explicit candidate-pool size.
    ///
    /// `search_k >= n` degenerates to an exact scan: every leaf is visited.
    pub fn query_with(
        &self,
        store: &VectorStore,
        index: usize,
        k: usize,
        search_k: usize,
    ) -> Result<Vec<Neighbor>> {
        self.check_store(store)?;
        if index >= self.n {
            return Err(ForestError::UnknownIndex(index));
        }
        let query = store.get(index).expect("index checked against n");
        self.search(store, &query, k, search_k, Some(index))
    }

    /// Find the `k` approximate nearest neighbors of an arbitrary vector.
    pub fn query_vector(
        &self,
        store: &VectorStore,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        self.query_vector_with(store, vector, k, self.default_search_k(k))
    }

    /// Like [`query_vector`](Self::query_vector) with an explicit
    /// candidate-pool size.
    pub fn query_vector_with(
        &self,
        store: &VectorStore,
        vector: &[f32],
        k: usize,
        search_k: usize,
    ) -> Result<Vec<Neighbor>> {
        self.check_store(store)?;
        if vector.len() != self.dim {
            return Err(ForestError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        let query = ndarray::ArrayView1::from(vector);
        self.search(store, &query, k, search_k, None)
    }

    fn default_search_k(&self, k: usize) -> usize {
        k.saturating_mul(self.trees.len()).max(k)
    }

    fn check_store(&self, store: &VectorStore) -> Result<()> {
        if self.trees.is_empty() {
            return Err(ForestError::EmptyForest);
        }
        if store.dim() != self.dim {
            return Err(ForestError::DimensionMismatch {
                expected: self.dim,
                got: store.dim(),
            });
        }
        if store.len() != self.n {
            return Err(ForestError::InvalidParameter(format!(
                "store holds {} vectors but forest was built over {}",
                store.len(),
                self.n
            )));
        }
        Ok(())
    }

    fn search(
        &self,
        store: &VectorStore,
        query: &ArrayView1<f32>,
        k: usize,
        search_k: usize,
        exclude: Option<usize>,
    ) -> Result<Vec<Neighbor>> {
        let timer = self.metrics.as_ref().map(|_| QueryTimer::new());

        // Every root starts at infinite priority: each tree contributes at
        // least its primary leaf before any near-miss branch is expanded.
        let mut backlog: BinaryHeap<Visit> = self
            .trees
            .iter()
            .map(|tree| Visit {
                priority: f32::INFINITY,
                node: &tree.root,
            })
            .collect();

        // One extra candidate when the query's own index will be excluded,
        // so the pool still yields search_k usable results.
        let target = match exclude {
            Some(_) => search_k.saturating_add(1),
            None => search_k,
        };

        let mut seen = vec![false; self.n];
        let mut candidates: Vec<usize> = Vec::with_capacity(target.min(self.n));
        let mut leaves_visited = 0u64;

        while candidates.len() < target {
            let Some(Visit { priority, node }) = backlog.pop() else {
                break;
            };
            match node {
                Node::Leaf { items } => {
                    leaves_visited += 1;
                    for &i in items {
                        if !seen[i] {
                            seen[i] = true;
                            candidates.push(i);
                        }
                    }
                }
                Node::Internal { left, right, .. } => {
                    let margin = node.margin(query);
                    backlog.push(Visit {
                        priority: priority.min(margin),
                        node: right,
                    });
                    backlog.push(Visit {
                        priority: priority.min(-margin),
                        node: left,
                    });
                }
            }
        }

        let num_candidates = candidates.len() as u64;

        let mut results: Vec<Neighbor> = candidates
            .into_iter()
            .filter(|&i| exclude != Some(i))
            .map(|i| {
                let stored = store.get(i).expect("leaf index in range");
                Neighbor {
                    index: i,
                    distance: self.metric.compute(query, &stored),
                }
            })
            .collect();

        // Ascending true distance, ties broken by ascending internal index.
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.index.cmp(&b.index))
        });
        results.truncate(k);

        if let Some(ref m) = self.metrics {
            if let Some(t) = timer {
                m.record_query(num_candidates, leaves_visited, t.elapsed_ns());
            }
        }

        Ok(results)
    }
}
