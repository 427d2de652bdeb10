use crate::matrix::{DenseMatrix, SparseMatrix};

use super::*;

const INDEXED: [Algorithm; 3] = [
    Algorithm::Threshold,
    Algorithm::Enhanced,
    Algorithm::Partial,
];

fn example_dense() -> DenseMatrix {
    DenseMatrix::from_rows(&[
        vec![3.0, 1.0],
        vec![0.0, 5.0],
        vec![2.0, 2.0],
        vec![4.0, 0.0],
        vec![1.0, 1.0],
    ])
    .expect("matrix should be valid")
}

fn mixed(seed: u64, index: u64) -> u64 {
    let value = seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(index.wrapping_mul(1_442_695_040_888_963_407))
        .wrapping_add(0x9e37_79b9);
    value ^ (value >> 29)
}

/// Small integers in `-span..=span`, so every product and sum stays exact.
fn deterministic_integers(seed: u64, len: usize, span: u64) -> Vec<f32> {
    (0..len as u64)
        .map(|index| (mixed(seed, index) % (2 * span + 1)) as f32 - span as f32)
        .collect()
}

fn deterministic_dense(items: usize, features: usize) -> DenseMatrix {
    DenseMatrix::new(
        items,
        features,
        deterministic_integers(7, items * features, 4),
    )
    .expect("matrix should be valid")
}

fn deterministic_sparse_as_dense(items: usize, features: usize) -> DenseMatrix {
    let values = deterministic_integers(11, items * features, 4)
        .into_iter()
        .enumerate()
        .map(|(position, value)| {
            if mixed(23, position as u64) % 10 < 7 {
                0.0
            } else {
                value
            }
        })
        .collect();
    DenseMatrix::new(items, features, values).expect("matrix should be valid")
}

fn deterministic_queries(count: usize, features: usize) -> Vec<Vec<f32>> {
    (0..count as u64)
        .map(|seed| {
            deterministic_integers(100 + seed, features, 3)
                .into_iter()
                .map(|value| value * 0.5)
                .collect()
        })
        .collect()
}

fn engine_for(matrix: impl Into<ScoreMatrix>) -> TopKEngine {
    TopKEngine::new(matrix.into(), true)
}

fn scores(items: &[ScoredItem]) -> Vec<f32> {
    items.iter().map(|scored| scored.score).collect()
}

fn pairs(items: &[ScoredItem]) -> Vec<(ItemId, f32)> {
    items
        .iter()
        .map(|scored| (scored.item, scored.score))
        .collect()
}

fn assert_matches_naive(engine: &TopKEngine, query: &[f32], k: usize) {
    let naive = engine
        .top_k(query, k, Algorithm::Naive)
        .expect("naive query should succeed");
    assert_eq!(naive.len(), k);
    for algorithm in INDEXED {
        let indexed = engine
            .top_k(query, k, algorithm)
            .expect("indexed query should succeed");
        assert_eq!(
            pairs(&indexed),
            pairs(&naive),
            "{algorithm} diverged from naive for query {query:?} k={k}"
        );
    }
}

#[test]
fn worked_example_returns_same_top_two_for_every_algorithm() {
    let dense = example_dense();
    let sparse = SparseMatrix::from_dense(&dense);
    for engine in [engine_for(dense), engine_for(sparse)] {
        for algorithm in Algorithm::ALL {
            let top = engine
                .top_k(&[1.0, 1.0], 2, algorithm)
                .expect("query should succeed");
            assert_eq!(pairs(&top), vec![(1, 5.0), (0, 4.0)], "{algorithm}");
        }
    }
}

#[test]
fn negative_coefficients_scan_from_the_smallest_values() {
    let engine = engine_for(example_dense());
    for algorithm in Algorithm::ALL {
        let top = engine
            .top_k(&[-1.0, 0.0], 2, algorithm)
            .expect("query should succeed");
        assert_eq!(pairs(&top), vec![(1, 0.0), (4, -1.0)], "{algorithm}");
    }
}

#[test]
fn negative_scan_keeps_lowest_id_among_tied_rows() {
    let dense = DenseMatrix::from_rows(&[vec![1.0, 1.0], vec![1.0, 1.0], vec![3.0, 3.0]])
        .expect("matrix should be valid");
    let sparse = SparseMatrix::from_dense(&dense);
    for engine in [engine_for(dense), engine_for(sparse)] {
        for algorithm in Algorithm::ALL {
            let top = engine
                .top_k(&[-1.0, -1.0], 1, algorithm)
                .expect("query should succeed");
            assert_eq!(pairs(&top), vec![(0, -2.0)], "{algorithm}");
        }
    }
}

#[test]
fn unread_lower_id_tying_the_threshold_is_still_read() {
    // Enhanced reads item 1 first; item 0 ties it and sits next in every list.
    let dense = DenseMatrix::from_rows(&[vec![1.0, 1.0], vec![2.0, 0.0]])
        .expect("matrix should be valid");
    let engine = engine_for(dense);
    assert!(!engine.matrix().is_sparse());
    for algorithm in Algorithm::ALL {
        let top = engine
            .top_k(&[1.0, 1.0], 1, algorithm)
            .expect("query should succeed");
        assert_eq!(pairs(&top), vec![(0, 2.0)], "{algorithm}");
    }
}

#[test]
fn mixed_sign_queries_over_tied_rows_match_naive_items() {
    let values = deterministic_integers(31, 48 * 4, 1);
    let dense = DenseMatrix::new(48, 4, values).expect("matrix should be valid");
    let sparse = SparseMatrix::from_dense(&dense);
    let queries = [
        [-1.0f32, -1.0, -1.0, -1.0],
        [1.0, -1.0, 0.0, 1.0],
        [-1.0, 0.0, 1.0, 0.0],
        [0.5, -0.5, -1.0, 1.0],
    ];
    for engine in [engine_for(dense), engine_for(sparse)] {
        for query in &queries {
            for k in [1usize, 2, 5, 13, 48] {
                assert_matches_naive(&engine, query, k);
            }
        }
    }
}

#[test]
fn indexed_algorithms_match_naive_on_dense_matrix() {
    let engine = engine_for(deterministic_dense(60, 6));
    for query in deterministic_queries(16, 6) {
        for k in [1usize, 3, 7, 20, 60] {
            assert_matches_naive(&engine, &query, k);
        }
    }
}

#[test]
fn indexed_algorithms_match_naive_on_sparse_matrix() {
    let dense = deterministic_sparse_as_dense(80, 9);
    let engine = engine_for(SparseMatrix::from_dense(&dense));
    for query in deterministic_queries(16, 9) {
        for k in [1usize, 4, 10, 40, 80] {
            assert_matches_naive(&engine, &query, k);
        }
    }
}

#[test]
fn sparse_and_dense_engines_agree() {
    let dense = deterministic_sparse_as_dense(50, 7);
    let sparse_engine = engine_for(SparseMatrix::from_dense(&dense));
    let dense_engine = engine_for(dense);

    for query in deterministic_queries(10, 7) {
        for k in [1usize, 5, 12] {
            let dense_naive = dense_engine
                .top_k(&query, k, Algorithm::Naive)
                .expect("query should succeed");
            let sparse_naive = sparse_engine
                .top_k(&query, k, Algorithm::Naive)
                .expect("query should succeed");
            assert_eq!(pairs(&dense_naive), pairs(&sparse_naive));

            for algorithm in INDEXED {
                let dense_top = dense_engine
                    .top_k(&query, k, algorithm)
                    .expect("query should succeed");
                let sparse_top = sparse_engine
                    .top_k(&query, k, algorithm)
                    .expect("query should succeed");
                assert_eq!(pairs(&dense_top), pairs(&sparse_top), "{algorithm}");
            }
        }
    }
}

#[test]
fn exhausted_sparse_lists_fill_with_zero_score_items() {
    let sparse = SparseMatrix::from_triplets(6, 2, [(0, 0, -2.0), (3, 0, 1.0), (5, 1, -1.0)])
        .expect("matrix should be valid");
    let engine = engine_for(sparse);

    for algorithm in Algorithm::ALL {
        let top = engine
            .top_k(&[1.0, 1.0], 4, algorithm)
            .expect("query should succeed");
        assert_eq!(
            pairs(&top),
            vec![(3, 1.0), (1, 0.0), (2, 0.0), (4, 0.0)],
            "{algorithm}"
        );
    }
}

#[test]
fn sparse_features_without_entries_yield_zero_scores() {
    let sparse =
        SparseMatrix::from_triplets(4, 3, [(1, 0, 2.0), (2, 0, 1.0)]).expect("valid matrix");
    let engine = engine_for(sparse);
    for algorithm in Algorithm::ALL {
        let top = engine
            .top_k(&[0.0, 0.0, -3.0], 2, algorithm)
            .expect("query should succeed");
        assert_eq!(pairs(&top), vec![(0, 0.0), (1, 0.0)], "{algorithm}");
    }
}

#[test]
fn all_zero_query_returns_first_items_without_scoring() {
    let engine = engine_for(deterministic_dense(30, 4));
    let query = [0.0f32; 4];

    for algorithm in INDEXED {
        let outcome = engine
            .top_k_profiled(&query, 3, algorithm)
            .expect("query should succeed");
        assert_eq!(pairs(&outcome.items), vec![(0, 0.0), (1, 0.0), (2, 0.0)]);
        assert_eq!(outcome.stats.items_scored, 0);
        assert_eq!(outcome.stats.rounds, 0);
    }

    let naive = engine
        .top_k_profiled(&query, 3, Algorithm::Naive)
        .expect("query should succeed");
    assert_eq!(pairs(&naive.items), vec![(0, 0.0), (1, 0.0), (2, 0.0)]);
    assert_eq!(naive.stats.items_scored, 30);
}

#[test]
fn concentrated_query_scores_fewer_items_than_naive() {
    let rows: Vec<Vec<f32>> = (0..200)
        .map(|item| vec![item as f32, (item % 3) as f32, (item % 5) as f32])
        .collect();
    let engine = engine_for(DenseMatrix::from_rows(&rows).expect("valid matrix"));
    let query = [1.0f32, 0.25, 0.25];
    let k = 5;

    let naive = engine
        .top_k_profiled(&query, k, Algorithm::Naive)
        .expect("query should succeed");
    assert_eq!(naive.stats.items_scored, 200);
    assert_eq!(naive.items[0].item, 199);

    for algorithm in INDEXED {
        let outcome = engine
            .top_k_profiled(&query, k, algorithm)
            .expect("query should succeed");
        assert_eq!(scores(&outcome.items), scores(&naive.items), "{algorithm}");
        assert!(
            outcome.stats.items_scored >= k && outcome.stats.items_scored < 200,
            "{algorithm} scored {} items",
            outcome.stats.items_scored
        );
        assert!(outcome.stats.rounds <= 200);
    }
}

#[test]
fn scored_item_counts_stay_within_k_and_m() {
    let engine = engine_for(deterministic_dense(40, 5));
    for query in deterministic_queries(8, 5) {
        if query.iter().all(|value| *value == 0.0) {
            continue;
        }
        for algorithm in [Algorithm::Naive, Algorithm::Threshold, Algorithm::Enhanced] {
            let outcome = engine
                .top_k_profiled(&query, 6, algorithm)
                .expect("query should succeed");
            assert!(outcome.stats.items_scored >= 6, "{algorithm}");
            assert!(outcome.stats.items_scored <= 40, "{algorithm}");
        }
    }
}

#[test]
fn partial_scoring_reports_feature_work() {
    let engine = engine_for(deterministic_dense(60, 6));
    for query in deterministic_queries(6, 6) {
        let active = query.iter().filter(|value| **value != 0.0).count();
        let naive = engine
            .top_k_profiled(&query, 3, Algorithm::Naive)
            .expect("query should succeed");
        assert_eq!(naive.stats.average_features_per_item(), active as f64);

        let partial = engine
            .top_k_profiled(&query, 3, Algorithm::Partial)
            .expect("query should succeed");
        assert!(partial.stats.items_scored <= partial.stats.items_examined);
        assert!(partial.stats.average_features_per_item() <= active as f64);
    }
}

#[test]
fn indexed_algorithms_require_initialized_index() {
    let mut engine = TopKEngine::new(ScoreMatrix::from(example_dense()), false);
    assert!(!engine.is_index_initialized());
    for algorithm in INDEXED {
        let error = engine
            .top_k(&[1.0, 1.0], 2, algorithm)
            .expect_err("must fail");
        assert_eq!(error, QueryError::UninitializedIndex);
    }
    engine
        .top_k(&[1.0, 1.0], 2, Algorithm::Naive)
        .expect("naive needs no index");

    engine.initialize_index();
    assert!(engine.is_index_initialized());
    engine
        .top_k(&[1.0, 1.0], 2, Algorithm::Threshold)
        .expect("index is ready");
}

#[test]
fn initialize_index_is_idempotent() {
    let mut engine = engine_for(deterministic_sparse_as_dense(40, 5));
    let first = engine.index().cloned().expect("index should exist");
    engine.initialize_index();
    let second = engine.index().expect("index should exist");
    assert_eq!(&first, second);
}

#[test]
fn invalid_requests_are_rejected() {
    let engine = engine_for(example_dense());

    let error = engine
        .top_k(&[1.0], 1, Algorithm::Naive)
        .expect_err("must fail");
    assert_eq!(
        error,
        QueryError::DimensionMismatch {
            expected: 2,
            got: 1
        }
    );

    for k in [0usize, 6] {
        let error = engine
            .top_k(&[1.0, 1.0], k, Algorithm::Threshold)
            .expect_err("must fail");
        assert_eq!(error, QueryError::InvalidK { k, items: 5 });
    }

    let error = engine
        .top_k(&[1.0, f32::NAN], 1, Algorithm::Enhanced)
        .expect_err("must fail");
    assert!(matches!(error, QueryError::NonFiniteQuery { index: 1, .. }));
}

#[test]
fn k_equal_to_item_count_returns_every_item() {
    let engine = engine_for(example_dense());
    for algorithm in Algorithm::ALL {
        let top = engine
            .top_k(&[1.0, 1.0], 5, algorithm)
            .expect("query should succeed");
        assert_eq!(
            pairs(&top),
            vec![(1, 5.0), (0, 4.0), (2, 4.0), (3, 4.0), (4, 2.0)],
            "{algorithm}"
        );
    }
}

#[test]
fn algorithm_tags_parse_and_serialize() {
    for algorithm in Algorithm::ALL {
        let parsed: Algorithm = algorithm.as_str().parse().expect("tag should parse");
        assert_eq!(parsed, algorithm);
        let encoded = serde_json::to_string(&algorithm).expect("serialization should succeed");
        assert_eq!(encoded, format!("\"{algorithm}\""));
    }
    assert_eq!(
        " Enhanced ".parse::<Algorithm>().expect("tag should parse"),
        Algorithm::Enhanced
    );

    let error = "fagin".parse::<Algorithm>().expect_err("must fail");
    assert_eq!(error, QueryError::InvalidAlgorithm("fagin".to_string()));
    assert!(error.to_string().contains("fagin"));
}

#[test]
fn engine_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TopKEngine>();
}
