//! End-to-end walkthrough: ingest, build, query, tune, persist, reload.
//!
//! Run with: cargo run --example basic_usage

use annforest::{
    estimate_recall, ingest_with_progress, suggest_params, DistanceMetric, ForestIndex,
    IdIndexMap,
};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Approximate nearest-neighbor forest demo ===\n");

    // 1. Ingest (external id, vector) pairs.
    let dim = 64;
    let n = 5_000;
    let mut rng = StdRng::seed_from_u64(42);
    let items = (0..n).map(|i| {
        let v: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
        (format!("track-{i}"), v)
    });
    let (store, ids) = ingest_with_progress(dim, items, |count| {
        println!("  ingested {count} vectors...");
    })?;
    println!("Ingested {} vectors of dimension {}\n", store.len(), dim);

    // 2. Build a forest of randomized partition trees.
    let forest = ForestIndex::builder()
        .ntree(10)
        .leaf_capacity(16)
        .metric(DistanceMetric::Angular)
        .seed(7)
        .enable_metrics()
        .build(&store)?;
    println!("Built: {}\n", forest.stats());

    // 3. Query by internal index and map results back to external ids.
    let query_id = "track-123";
    let query_index = ids.index_of(query_id).ok_or("unknown id")?;
    let neighbors = forest.query(&store, query_index, 10)?;
    println!("Nearest neighbors of {query_id}:");
    for n in &neighbors {
        println!(
            "  {:<12} dist={:.4}",
            ids.id_of(n.index).unwrap_or("?"),
            n.distance
        );
    }
    if let Some(m) = forest.metrics() {
        println!("Metrics after 1 query: {m}\n");
    }

    // 4. Auto-tune for a target recall.
    let params = suggest_params(0.95, n);
    println!(
        "For 95% recall over {n} vectors: ntree={}, search_factor={} (est. recall {:.3})",
        params.ntree, params.search_factor, params.estimated_recall
    );
    println!(
        "Current forest's estimated recall: {:.3}\n",
        estimate_recall(forest.num_trees(), 1)
    );

    // 5. Persist the forest and the id map, then reload and re-query.
    let dir = std::env::temp_dir().join("annforest-demo");
    std::fs::create_dir_all(&dir)?;
    let forest_path = dir.join("forest.ann");
    let idmap_path = dir.join("ids.jsonl");
    forest.save_to_path(&forest_path)?;
    ids.save_to_path(&idmap_path)?;
    println!("Saved forest to {}", forest_path.display());

    let forest = ForestIndex::load_from_path(&forest_path)?;
    let ids = IdIndexMap::load_from_path(&idmap_path)?;
    let reloaded = forest.query(&store, query_index, 10)?;
    println!(
        "Reloaded and re-queried: top match is {} (dist={:.4})",
        ids.id_of(reloaded[0].index).unwrap_or("?"),
        reloaded[0].distance
    );

    Ok(())
}
