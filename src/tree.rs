//! A single randomized space-partitioning tree.
//!
//! Each tree recursively bisects the full index set with random hyperplanes.
//! A split plane is the normalized difference of two randomly sampled member
//! vectors, thresholded at the median projection so both halves stay roughly
//! balanced regardless of the data distribution.

use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;

use crate::distance;
use crate::store::VectorStore;

/// Retries before giving up on finding a usable random hyperplane.
const SPLIT_ATTEMPTS: usize = 3;

/// A split is rejected when one side holds more than this share of the set.
const MAX_SPLIT_SHARE: f32 = 0.95;

/// One node of a partition tree: an internal split or a leaf index set.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Internal {
        normal: Array1<f32>,
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        items: Vec<usize>,
    },
}

impl Node {
    /// Signed distance of `query` from this node's split plane.
    pub(crate) fn margin(&self, query: &ArrayView1<f32>) -> f32 {
        match self {
            Node::Internal {
                normal, threshold, ..
            } => normal.dot(query) - threshold,
            Node::Leaf { .. } => 0.0,
        }
    }
}

/// One binary space-partitioning tree over the full vector set.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionTree {
    pub(crate) root: Node,
}

impl PartitionTree {
    /// Build a tree over every index of `store`.
    pub(crate) fn build(store: &VectorStore, leaf_capacity: usize, rng: &mut StdRng) -> Self {
        let indices: Vec<usize> = (0..store.len()).collect();
        Self {
            root: split(store, indices, leaf_capacity, rng),
        }
    }

    /// Count of leaves, sum of leaf sizes, largest leaf, and depth.
    pub(crate) fn leaf_stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        walk(&self.root, 1, &mut stats);
        stats
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TreeStats {
    pub leaf_count: usize,
    pub member_count: usize,
    pub max_leaf_size: usize,
    pub max_depth: usize,
}

fn walk(node: &Node, depth: usize, stats: &mut TreeStats) {
    match node {
        Node::Leaf { items } => {
            stats.leaf_count += 1;
            stats.member_count += items.len();
            stats.max_leaf_size = stats.max_leaf_size.max(items.len());
            stats.max_depth = stats.max_depth.max(depth);
        }
        Node::Internal { left, right, .. } => {
            walk(left, depth + 1, stats);
            walk(right, depth + 1, stats);
        }
    }
}

fn split(
    store: &VectorStore,
    indices: Vec<usize>,
    leaf_capacity: usize,
    rng: &mut StdRng,
) -> Node {
    if indices.len() <= leaf_capacity {
        return Node::Leaf { items: indices };
    }

    for _ in 0..SPLIT_ATTEMPTS {
        let Some((normal, threshold)) = pick_hyperplane(store, &indices, rng) else {
            continue;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| normal.dot(&store.get(i).expect("index in range")) < threshold);

        if !balanced(left.len(), right.len(), indices.len()) {
            continue;
        }

        return Node::Internal {
            normal,
            threshold,
            left: Box::new(split(store, left, leaf_capacity, rng)),
            right: Box::new(split(store, right, leaf_capacity, rng)),
        };
    }

    // Zero spread (or persistently degenerate projections): alternate members
    // between the children under a zero-normal plane so recursion terminates.
    let mut left = Vec::with_capacity(indices.len() / 2 + 1);
    let mut right = Vec::with_capacity(indices.len() / 2 + 1);
    for (pos, index) in indices.into_iter().enumerate() {
        if pos % 2 == 0 {
            left.push(index);
        } else {
            right.push(index);
        }
    }
    Node::Internal {
        normal: Array1::zeros(store.dim()),
        threshold: 0.0,
        left: Box::new(split(store, left, leaf_capacity, rng)),
        right: Box::new(split(store, right, leaf_capacity, rng)),
    }
}

/// Sample a random split plane from the difference of two member vectors.
///
/// Returns `None` when the sampled pair coincides, which the caller treats
/// as a failed attempt.
fn pick_hyperplane(
    store: &VectorStore,
    indices: &[usize],
    rng: &mut StdRng,
) -> Option<(Array1<f32>, f32)> {
    let a = indices[rng.gen_range(0..indices.len())];
    let b = indices[rng.gen_range(0..indices.len())];
    if a == b {
        return None;
    }

    let va = store.get(a).expect("index in range");
    let vb = store.get(b).expect("index in range");
    let mut normal: Array1<f32> = &va - &vb;
    distance::normalize(&mut normal);
    if normal.dot(&normal) < f32::EPSILON {
        // Identical vectors under distinct indices.
        return None;
    }

    let mut projections: Vec<f32> = indices
        .iter()
        .map(|&i| normal.dot(&store.get(i).expect("index in range")))
        .collect();
    projections.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    let threshold = projections[projections.len() / 2];

    Some((normal, threshold))
}

fn balanced(left: usize, right: usize, total: usize) -> bool {
    let cap = (total as f32 * MAX_SPLIT_SHARE).ceil() as usize;
    left > 0 && right > 0 && left <= cap && right <= cap
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn store_of(vectors: &[Vec<f32>]) -> VectorStore {
        let mut store = VectorStore::new(vectors[0].len()).unwrap();
        for v in vectors {
            store.push(v).unwrap();
        }
        store
    }

    fn collect_members(node: &Node, out: &mut Vec<usize>) {
        match node {
            Node::Leaf { items } => out.extend_from_slice(items),
            Node::Internal { left, right, .. } => {
                collect_members(left, out);
                collect_members(right, out);
            }
        }
    }

    #[test]
    fn test_every_index_in_exactly_one_leaf() {
        let vectors: Vec<Vec<f32>> = (0..200)
            .map(|i| vec![(i % 17) as f32, (i % 5) as f32, i as f32 * 0.1])
            .collect();
        let store = store_of(&vectors);
        let mut rng = StdRng::seed_from_u64(7);
        let tree = PartitionTree::build(&store, 8, &mut rng);

        let mut members = Vec::new();
        collect_members(&tree.root, &mut members);
        members.sort_unstable();
        let expected: Vec<usize> = (0..200).collect();
        assert_eq!(members, expected, "leaves must partition 0..n exactly");
    }

    #[test]
    fn test_leaf_capacity_respected() {
        let vectors: Vec<Vec<f32>> = (0..500)
            .map(|i| vec![(i as f32).sin(), (i as f32).cos(), i as f32 * 0.01])
            .collect();
        let store = store_of(&vectors);
        let mut rng = StdRng::seed_from_u64(11);
        let tree = PartitionTree::build(&store, 10, &mut rng);
        let stats = tree.leaf_stats();
        assert!(stats.max_leaf_size <= 10, "leaf over capacity: {stats:?}");
        assert_eq!(stats.member_count, 500);
    }

    #[test]
    fn test_identical_vectors_terminate() {
        let vectors: Vec<Vec<f32>> = (0..64).map(|_| vec![1.0, 2.0, 3.0]).collect();
        let store = store_of(&vectors);
        let mut rng = StdRng::seed_from_u64(3);
        let tree = PartitionTree::build(&store, 4, &mut rng);
        let stats = tree.leaf_stats();
        assert_eq!(stats.member_count, 64);
        assert!(stats.max_leaf_size <= 4);
    }

    #[test]
    fn test_tiny_set_is_single_leaf() {
        let store = store_of(&[vec![1.0, 0.0], vec![0.0, 1.0]]);
        let mut rng = StdRng::seed_from_u64(1);
        let tree = PartitionTree::build(&store, 16, &mut rng);
        assert!(matches!(&tree.root, Node::Leaf { items } if items.len() == 2));
    }

    #[test]
    fn test_seeded_build_is_deterministic() {
        let vectors: Vec<Vec<f32>> = (0..100)
            .map(|i| vec![i as f32, (i * i % 31) as f32])
            .collect();
        let store = store_of(&vectors);
        let t1 = PartitionTree::build(&store, 5, &mut StdRng::seed_from_u64(42));
        let t2 = PartitionTree::build(&store, 5, &mut StdRng::seed_from_u64(42));
        assert_eq!(t1, t2);
    }
}
