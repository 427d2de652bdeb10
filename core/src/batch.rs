use std::sync::OnceLock;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::engine::{Algorithm, QueryError, QueryOutcome, TopKEngine};
use crate::topk::ScoredItem;

const BATCH_PARALLEL_MIN_QUERIES: usize = 8;
static BATCH_PARALLEL_MIN_QUERIES_CACHE: OnceLock<usize> = OnceLock::new();

fn batch_parallel_min_queries() -> usize {
    *BATCH_PARALLEL_MIN_QUERIES_CACHE.get_or_init(|| {
        std::env::var("SEPTA_BATCH_PARALLEL_MIN_QUERIES")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(BATCH_PARALLEL_MIN_QUERIES)
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Collect per-query scored-item counts and elapsed times.
    pub profile: bool,
    /// Spread queries over the rayon pool when the batch is large enough.
    pub parallel: bool,
}

/// Per-query work counters, aligned with the batch's query order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchProfile {
    pub items_scored: Vec<usize>,
    pub items_examined: Vec<usize>,
    pub features_evaluated: Vec<usize>,
    pub elapsed: Vec<Duration>,
}

impl BatchProfile {
    pub fn total_items_scored(&self) -> usize {
        self.items_scored.iter().sum()
    }

    pub fn mean_items_scored(&self) -> f64 {
        if self.items_scored.is_empty() {
            return 0.0;
        }
        self.total_items_scored() as f64 / self.items_scored.len() as f64
    }

    /// Features evaluated per examined item over the whole batch.
    pub fn average_features_per_item(&self) -> f64 {
        let examined: usize = self.items_examined.iter().sum();
        if examined == 0 {
            return 0.0;
        }
        self.features_evaluated.iter().sum::<usize>() as f64 / examined as f64
    }

    pub fn total_elapsed(&self) -> Duration {
        self.elapsed.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    pub results: Vec<Vec<ScoredItem>>,
    pub profile: Option<BatchProfile>,
}

impl TopKEngine {
    /// Runs every query with the same `k` and algorithm.
    ///
    /// Queries are independent; the first failing query aborts the batch.
    pub fn top_k_batch(
        &self,
        queries: &[Vec<f32>],
        k: usize,
        algorithm: Algorithm,
        options: BatchOptions,
    ) -> Result<BatchOutput, QueryError> {
        let started_at = Instant::now();
        let use_parallel = options.parallel && queries.len() >= batch_parallel_min_queries();

        let outcomes: Vec<QueryOutcome> = if use_parallel {
            queries
                .par_iter()
                .map(|query| self.top_k_profiled(query, k, algorithm))
                .collect::<Result<_, _>>()?
        } else {
            queries
                .iter()
                .map(|query| self.top_k_profiled(query, k, algorithm))
                .collect::<Result<_, _>>()?
        };

        let mut results = Vec::with_capacity(outcomes.len());
        let mut profile = options.profile.then(|| BatchProfile {
            items_scored: Vec::with_capacity(outcomes.len()),
            items_examined: Vec::with_capacity(outcomes.len()),
            features_evaluated: Vec::with_capacity(outcomes.len()),
            elapsed: Vec::with_capacity(outcomes.len()),
        });
        for outcome in outcomes {
            if let Some(profile) = profile.as_mut() {
                profile.items_scored.push(outcome.stats.items_scored);
                profile.items_examined.push(outcome.stats.items_examined);
                profile
                    .features_evaluated
                    .push(outcome.stats.features_evaluated);
                profile.elapsed.push(outcome.stats.elapsed);
            }
            results.push(outcome.items);
        }

        tracing::debug!(
            algorithm = algorithm.as_str(),
            queries = queries.len(),
            k,
            parallel = use_parallel,
            elapsed_ms = started_at.elapsed().as_secs_f64() * 1_000.0,
            "top-k batch finished"
        );

        Ok(BatchOutput { results, profile })
    }
}
