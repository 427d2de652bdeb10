#![forbid(unsafe_code)]
//! Top-K algorithm comparison for septa.
//!
//! Scenarios:
//! - `dense`: random dense matrix, non-negative queries
//! - `sparse`: random sparse matrix, mixed-sign queries
//!
//! Every selected algorithm runs the same query batch; each run prints one
//! `key=value` line with latency percentiles and scored-item counts.

use std::env;
use std::process;
use std::time::Instant;

use anyhow::{Context, Result};
use septa_core::{
    Algorithm, BatchOptions, DenseMatrix, ScoreMatrix, ScoredItem, SparseMatrix, TopKEngine,
};
use tracing_subscriber::EnvFilter;

mod config;

use crate::config::BenchConfig;

fn main() -> Result<()> {
    init_tracing();

    if cfg!(debug_assertions) && env::var("SEPTA_ALLOW_DEBUG_BENCH").as_deref() != Ok("1") {
        eprintln!(
            "error=debug_build_not_allowed message=\"run `cargo run --release -p septa-bench`\""
        );
        process::exit(2);
    }
    let mode = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };

    let config = BenchConfig::from_env().context("invalid bench configuration")?;
    tracing::info!(
        scenario = ?config.scenario,
        items = config.items,
        top_k = config.top_k,
        queries = config.queries,
        parallel = config.parallel,
        "septa bench started"
    );

    if config.scenario.runs_dense() {
        let matrix = generate_dense(config.items, config.features)?;
        let queries = generate_queries(config.queries, config.features, true);
        run_scenario("topk_dense", matrix.into(), &queries, &config, mode)?;
    }
    if config.scenario.runs_sparse() {
        let matrix = generate_sparse(config.items, config.sparse_features, config.sparse_density)?;
        let queries = generate_queries(config.queries, config.sparse_features, false);
        run_scenario("topk_sparse", matrix.into(), &queries, &config, mode)?;
    }

    Ok(())
}

fn run_scenario(
    bench: &str,
    matrix: ScoreMatrix,
    queries: &[Vec<f32>],
    config: &BenchConfig,
    mode: &str,
) -> Result<()> {
    let items = matrix.rows();
    let features = matrix.cols();
    let index_started = Instant::now();
    let engine = TopKEngine::new(matrix, true);
    let index_build_ms = index_started.elapsed().as_secs_f64() * 1_000.0;
    tracing::info!(bench, items, features, index_build_ms, "index ready");

    let options = BatchOptions {
        profile: true,
        parallel: config.parallel,
    };
    let reference = engine
        .top_k_batch(queries, config.top_k, Algorithm::Naive, BatchOptions::default())
        .context("naive reference batch failed")?
        .results;

    for algorithm in &config.algorithms {
        let output = engine
            .top_k_batch(queries, config.top_k, *algorithm, options)
            .with_context(|| format!("{algorithm} batch failed"))?;
        let profile = output
            .profile
            .context("profiled batch returned no profile")?;

        let elapsed_ms: Vec<f64> = profile
            .elapsed
            .iter()
            .map(|elapsed| elapsed.as_secs_f64() * 1_000.0)
            .collect();
        let (p50_ms, p95_ms, avg_ms) = summarize_ms(&elapsed_ms);
        let mean_scored = profile.mean_items_scored();
        let scored_fraction = mean_scored / items as f64;
        let avg_features = profile.average_features_per_item();
        let matches_naive = same_scores(&output.results, &reference);

        println!(
            "bench={bench} algorithm={algorithm} mode={mode} items={items} features={features} k={} queries={} p50_ms={p50_ms:.6} p95_ms={p95_ms:.6} avg_ms={avg_ms:.6} mean_items_scored={mean_scored:.2} scored_fraction={scored_fraction:.6} avg_features_per_item={avg_features:.3} matches_naive={matches_naive}",
            config.top_k,
            queries.len(),
        );
        if !matches_naive {
            tracing::warn!(bench, %algorithm, "top-k scores diverged from naive scan");
        }
    }

    Ok(())
}

fn same_scores(left: &[Vec<ScoredItem>], right: &[Vec<ScoredItem>]) -> bool {
    left.len() == right.len()
        && left.iter().zip(right).all(|(left, right)| {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(left, right)| left.score == right.score)
        })
}

fn generate_dense(items: usize, features: usize) -> Result<DenseMatrix> {
    let values = (0..items * features)
        .map(|position| unit_value(7, position as u64))
        .collect();
    DenseMatrix::new(items, features, values).context("failed to build dense bench matrix")
}

fn generate_sparse(items: usize, features: usize, density: f64) -> Result<SparseMatrix> {
    let per_item = ((features as f64 * density).round() as usize).max(1);
    let triplets = (0..items).flat_map(move |item| {
        (0..per_item).map(move |slot| {
            let key = (item * per_item + slot) as u64;
            let feature = (mix(13, key) % features as u64) as usize;
            (item, feature, unit_value(17, key) + 0.01)
        })
    });
    SparseMatrix::from_triplets(items, features, triplets)
        .context("failed to build sparse bench matrix")
}

/// Non-negative queries square a centred value; the rest keep its sign.
fn generate_queries(count: usize, features: usize, non_negative: bool) -> Vec<Vec<f32>> {
    (0..count)
        .map(|query| {
            (0..features)
                .map(|feature| {
                    let centred = unit_value(1_000 + query as u64, feature as u64) * 2.0 - 1.0;
                    if non_negative {
                        centred * centred
                    } else {
                        centred
                    }
                })
                .collect()
        })
        .collect()
}

fn mix(seed: u64, index: u64) -> u64 {
    let value = seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(index.wrapping_mul(1_442_695_040_888_963_407))
        .wrapping_add(0x9e37_79b9);
    value ^ (value >> 29)
}

fn unit_value(seed: u64, index: u64) -> f32 {
    (mix(seed, index) % 10_000) as f32 / 10_000.0
}

fn summarize_ms(samples_ms: &[f64]) -> (f64, f64, f64) {
    let p50_ms = percentile_ms(samples_ms, 0.50);
    let p95_ms = percentile_ms(samples_ms, 0.95);
    let avg_ms = samples_ms.iter().sum::<f64>() / samples_ms.len().max(1) as f64;
    (p50_ms, p95_ms, avg_ms)
}

fn percentile_ms(samples_ms: &[f64], quantile: f64) -> f64 {
    if samples_ms.is_empty() {
        return 0.0;
    }

    let mut sorted = samples_ms.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last_index = sorted.len().saturating_sub(1);
    let position = (quantile.clamp(0.0, 1.0) * last_index as f64).round() as usize;
    sorted[position]
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("failed to initialize tracing subscriber: {error}");
    }
}
