/// Suggested build/query parameters, produced by auto-tuning.
#[derive(Debug, Clone)]
pub struct SuggestedParams {
    pub ntree: usize,
    /// Candidate-pool multiplier: query with `search_k = k * search_factor`.
    pub search_factor: usize,
    pub estimated_recall: f64,
}

/// Heuristic probability that one tree's primary leaf contains a given true
/// neighbor, for median-split random hyperplanes on embedding-like data.
const P_LEAF: f64 = 0.25;

/// Suggest forest parameters for a desired recall.
///
/// A neighbor is found when at least one tree surfaces it, so recall follows
/// the union bound over independent trees:
///   P_total = 1 - (1 - p)^ntree
/// where `p` grows with the candidate-pool expansion factor (each extra
/// near-boundary branch behaves like a diminishing extra chance per tree).
///
/// # Arguments
/// * `target_recall` - Desired recall in [0.5, 0.999]
/// * `dataset_size` - Expected number of vectors
pub fn suggest_params(target_recall: f64, dataset_size: usize) -> SuggestedParams {
    let target_recall = target_recall.clamp(0.5, 0.999);

    let mut best = SuggestedParams {
        ntree: 10,
        search_factor: 1,
        estimated_recall: 0.0,
    };
    let mut best_cost = f64::MAX;

    for &search_factor in &[1usize, 2, 4, 8, 16] {
        let p = per_tree_probability(search_factor);

        // Minimum ntree so that 1 - (1 - p)^ntree >= target_recall
        let t_frac = (1.0 - target_recall).ln() / (1.0 - p).ln();
        let ntree = (t_frac.ceil() as usize).clamp(1, 256);

        let recall = 1.0 - (1.0 - p).powi(ntree as i32);

        // Cost heuristic balancing build time (ntree) and query time
        // (ntree * search_factor leaves inspected).
        let cost = ntree as f64 * (1.0 + search_factor as f64);

        if recall >= target_recall && cost < best_cost {
            best_cost = cost;
            best = SuggestedParams {
                ntree,
                search_factor,
                estimated_recall: recall,
            };
        }
    }

    // Larger datasets dilute each leaf's coverage; compensate with trees.
    if dataset_size > 100_000 {
        let scale = ((dataset_size as f64 / 100_000.0).ln() + 1.0).ceil() as usize;
        best.ntree = (best.ntree * scale).min(512);
    }

    best
}

/// Estimate recall for a given forest size and candidate-pool factor.
pub fn estimate_recall(ntree: usize, search_factor: usize) -> f64 {
    let p = per_tree_probability(search_factor);
    1.0 - (1.0 - p).powi(ntree as i32)
}

fn per_tree_probability(search_factor: usize) -> f64 {
    let bonus = (search_factor.max(1) as f64).ln();
    (P_LEAF * (1.0 + 0.5 * bonus)).min(0.95)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_params_reasonable() {
        let params = suggest_params(0.9, 100_000);
        assert!(params.ntree >= 1);
        assert!(params.ntree <= 512);
        assert!(params.search_factor >= 1);
        assert!(params.estimated_recall >= 0.9);
    }

    #[test]
    fn test_higher_recall_needs_more_resources() {
        let low = suggest_params(0.8, 10_000);
        let high = suggest_params(0.99, 10_000);
        assert!(
            high.ntree >= low.ntree || high.search_factor >= low.search_factor,
            "high recall params should use more resources: low={low:?} high={high:?}"
        );
    }

    #[test]
    fn test_estimate_recall_increases_with_trees() {
        let r4 = estimate_recall(4, 2);
        let r8 = estimate_recall(8, 2);
        let r16 = estimate_recall(16, 2);
        assert!(r8 > r4, "r8={r8} should be > r4={r4}");
        assert!(r16 > r8, "r16={r16} should be > r8={r8}");
    }

    #[test]
    fn test_estimate_recall_increases_with_search_factor() {
        let r1 = estimate_recall(8, 1);
        let r8 = estimate_recall(8, 8);
        assert!(r8 >= r1, "more expansion should not decrease recall");
    }

    #[test]
    fn test_estimate_recall_bounded() {
        let r = estimate_recall(256, 16);
        assert!((0.0..=1.0).contains(&r), "recall should be in [0, 1], got {r}");
    }
}
