use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::distance::DistanceMetric;
use crate::error::{ForestError, Result};
use crate::metrics::MetricsCollector;
use crate::store::VectorStore;
use crate::tree::PartitionTree;

/// Configuration for building a forest.
#[derive(Debug, Clone)]
pub struct ForestConfig {
    /// Number of independent partition trees. More trees give higher recall.
    pub ntree: usize,
    /// Maximum number of vector indices held by one leaf.
    pub leaf_capacity: usize,
    /// Distance metric for re-ranking candidates.
    pub metric: DistanceMetric,
    /// Optional base seed; tree `t` uses `seed + t`. Entropy-seeded if unset.
    pub seed: Option<u64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            ntree: 10,
            leaf_capacity: 16,
            metric: DistanceMetric::Angular,
            seed: None,
        }
    }
}

/// Aggregate statistics about a built forest.
#[derive(Debug, Clone)]
pub struct ForestStats {
    pub num_vectors: usize,
    pub num_trees: usize,
    pub dimension: usize,
    pub leaf_count: usize,
    pub avg_leaf_size: f64,
    pub max_leaf_size: usize,
    pub max_depth: usize,
    pub memory_estimate_bytes: usize,
}

impl std::fmt::Display for ForestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ForestIndex {{ vectors: {}, trees: {}, dim: {}, leaves: {}, \
             avg_leaf: {:.1}, max_leaf: {}, depth: {}, mem: ~{:.1}MB }}",
            self.num_vectors,
            self.num_trees,
            self.dimension,
            self.leaf_count,
            self.avg_leaf_size,
            self.max_leaf_size,
            self.max_depth,
            self.memory_estimate_bytes as f64 / (1024.0 * 1024.0),
        )
    }
}

/// An immutable forest of randomized partition trees.
///
/// Built once over a [`VectorStore`] snapshot, then read-only: any number of
/// queries may run concurrently without synchronization. Leaves reference
/// vectors by internal index only, so a persisted forest can be reloaded and
/// queried against a reloaded store of the same snapshot.
pub struct ForestIndex {
    pub(crate) dim: usize,
    pub(crate) n: usize,
    pub(crate) metric: DistanceMetric,
    pub(crate) trees: Vec<PartitionTree>,
    pub(crate) metrics: Option<Arc<MetricsCollector>>,
}

impl std::fmt::Debug for ForestIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForestIndex")
            .field("dim", &self.dim)
            .field("n", &self.n)
            .field("metric", &self.metric)
            .field("num_trees", &self.trees.len())
            .field("has_metrics", &self.metrics.is_some())
            .finish()
    }
}

impl PartialEq for ForestIndex {
    /// Structural equality: dimension, size, metric, and per-tree node
    /// content. The metrics handle is runtime-only state and not compared.
    fn eq(&self, other: &Self) -> bool {
        self.dim == other.dim
            && self.n == other.n
            && self.metric == other.metric
            && self.trees == other.trees
    }
}

impl ForestIndex {
    /// Start building a forest with the builder pattern.
    pub fn builder() -> ForestBuilder {
        ForestBuilder::new()
    }

    /// Build a forest directly from a [`ForestConfig`].
    pub fn build(config: ForestConfig, store: &VectorStore) -> Result<Self> {
        Self::build_with_metrics(config, store, false)
    }

    fn build_with_metrics(
        config: ForestConfig,
        store: &VectorStore,
        enable_metrics: bool,
    ) -> Result<Self> {
        if config.ntree == 0 {
            return Err(ForestError::InvalidParameter(
                "ntree must be > 0".into(),
            ));
        }
        if config.leaf_capacity == 0 {
            return Err(ForestError::InvalidParameter(
                "leaf_capacity must be > 0".into(),
            ));
        }
        if store.is_empty() {
            return Err(ForestError::InvalidParameter(
                "vector store is empty".into(),
            ));
        }

        debug!(
            ntree = config.ntree,
            leaf_capacity = config.leaf_capacity,
            n = store.len(),
            dim = store.dim(),
            "building forest"
        );

        let rng_for = |tree_index: usize| match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(tree_index as u64)),
            None => StdRng::from_entropy(),
        };
        let build_one = |tree_index: usize| {
            PartitionTree::build(store, config.leaf_capacity, &mut rng_for(tree_index))
        };

        // Trees share no mutable state; the collect is the join barrier.
        #[cfg(feature = "parallel")]
        let trees: Vec<PartitionTree> = {
            use rayon::prelude::*;
            (0..config.ntree).into_par_iter().map(build_one).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let trees: Vec<PartitionTree> = (0..config.ntree).map(build_one).collect();

        debug!(ntree = trees.len(), "forest built");

        let metrics = if enable_metrics {
            Some(Arc::new(MetricsCollector::new()))
        } else {
            None
        };

        Ok(Self {
            dim: store.dim(),
            n: store.len(),
            metric: config.metric,
            trees,
            metrics,
        })
    }

    /// Vector dimension the forest was built for.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of vectors the forest was built over.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Number of trees in the forest.
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Distance metric used for re-ranking.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Compute aggregate statistics over all trees.
    pub fn stats(&self) -> ForestStats {
        let mut leaf_count = 0;
        let mut member_count = 0;
        let mut max_leaf_size = 0;
        let mut max_depth = 0;
        for tree in &self.trees {
            let s = tree.leaf_stats();
            leaf_count += s.leaf_count;
            member_count += s.member_count;
            max_leaf_size = max_leaf_size.max(s.max_leaf_size);
            max_depth = max_depth.max(s.max_depth);
        }

        let avg_leaf_size = if leaf_count > 0 {
            member_count as f64 / leaf_count as f64
        } else {
            0.0
        };

        // Leaves store indices; internal nodes store a dim-length normal.
        let internal_count = leaf_count.saturating_sub(self.trees.len());
        let member_mem = member_count * std::mem::size_of::<usize>();
        let plane_mem = internal_count * (self.dim * 4 + 4);

        ForestStats {
            num_vectors: self.n,
            num_trees: self.trees.len(),
            dimension: self.dim,
            leaf_count,
            avg_leaf_size,
            max_leaf_size,
            max_depth,
            memory_estimate_bytes: member_mem + plane_mem,
        }
    }

    /// Snapshot of runtime query metrics (`None` if metrics were not enabled).
    pub fn metrics(&self) -> Option<crate::metrics::MetricsSnapshot> {
        self.metrics.as_ref().map(|m| m.snapshot())
    }

    /// Reset metrics counters.
    pub fn reset_metrics(&self) {
        if let Some(ref m) = self.metrics {
            m.reset();
        }
    }
}

/// Fluent builder for [`ForestIndex`].
#[derive(Debug, Default)]
pub struct ForestBuilder {
    config: ForestConfig,
    enable_metrics: bool,
}

impl ForestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ntree(mut self, n: usize) -> Self {
        self.config.ntree = n;
        self
    }

    pub fn leaf_capacity(mut self, n: usize) -> Self {
        self.config.leaf_capacity = n;
        self
    }

    pub fn metric(mut self, m: DistanceMetric) -> Self {
        self.config.metric = m;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn enable_metrics(mut self) -> Self {
        self.enable_metrics = true;
        self
    }

    /// Build the forest, returning an error on invalid configuration.
    pub fn build(self, store: &VectorStore) -> Result<ForestIndex> {
        ForestIndex::build_with_metrics(self.config, store, self.enable_metrics)
    }
}
