//! # annforest
//!
//! A forest of randomized space-partitioning trees for approximate
//! nearest-neighbor (ANN) search over a static vector set.
//!
//! Built for batch workloads: ingest a vector dump once, build the forest,
//! persist it, then serve repeated "k closest vectors" lookups by external
//! identifier without recomputing exact pairwise distances.
//!
//! ## Quick start
//!
//! ```rust
//! use annforest::{ingest, DistanceMetric, ForestIndex};
//!
//! // Ingest (external id, vector) pairs; internal indices are 0..n-1.
//! let items = (0..64).map(|i| (format!("item-{i}"), vec![i as f32, 1.0, 0.5, 0.0]));
//! let (store, ids) = ingest(4, items).unwrap();
//!
//! // Build an immutable forest of independent partition trees.
//! let forest = ForestIndex::builder()
//!     .ntree(8)
//!     .leaf_capacity(8)
//!     .metric(DistanceMetric::Angular)
//!     .seed(42)
//!     .build(&store)
//!     .unwrap();
//!
//! // Approximate k-NN by internal index; map results back to external ids.
//! let neighbors = forest.query(&store, 0, 5).unwrap();
//! for n in &neighbors {
//!     println!("{} dist={:.4}", ids.id_of(n.index).unwrap(), n.distance);
//! }
//! ```
//!
//! ## Feature flags
//!
//! | Flag          | Effect                                                  |
//! |---------------|---------------------------------------------------------|
//! | `persistence` | Save/load the forest blob and id map (on by default)    |
//! | `parallel`    | Parallel tree construction via rayon                    |
//! | `full`        | Enables `persistence` + `parallel`                      |

pub mod distance;
pub mod error;
pub mod forest;
pub mod metrics;
pub mod query;
pub mod store;
pub mod tree;
pub mod tuning;

#[cfg(feature = "persistence")]
pub mod persist;

// Re-exports for convenience.
pub use distance::DistanceMetric;
pub use error::{ForestError, Result};
pub use forest::{ForestBuilder, ForestConfig, ForestIndex, ForestStats};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use query::Neighbor;
pub use store::{ingest, ingest_with_progress, IdIndexMap, VectorStore, PROGRESS_INTERVAL};
pub use tree::PartitionTree;
pub use tuning::{estimate_recall, suggest_params, SuggestedParams};
