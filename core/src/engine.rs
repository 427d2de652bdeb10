use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::index::SortedAccessIndex;
use crate::matrix::{ItemId, ScoreMatrix};
use crate::topk::{ScoredItem, TopKAccumulator};
use crate::vector::PreparedQuery;

mod enhanced;
mod frontier;
mod naive;
mod partial;
mod threshold;
mod visited;

use self::visited::VisitedSet;

/// Top-K evaluation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Exhaustive scan of every item.
    Naive,
    /// Round-robin threshold algorithm over the sorted access lists.
    Threshold,
    /// Threshold algorithm advancing the most promising list first.
    Enhanced,
    /// Round-robin threshold algorithm with early-exit partial scoring.
    Partial,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Naive,
        Algorithm::Threshold,
        Algorithm::Enhanced,
        Algorithm::Partial,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Threshold => "threshold",
            Self::Enhanced => "enhanced",
            Self::Partial => "partial",
        }
    }

    pub fn requires_index(self) -> bool {
        !matches!(self, Self::Naive)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = QueryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "naive" => Ok(Self::Naive),
            "threshold" => Ok(Self::Threshold),
            "enhanced" => Ok(Self::Enhanced),
            "partial" => Ok(Self::Partial),
            _ => Err(QueryError::InvalidAlgorithm(raw.to_string())),
        }
    }
}

/// Error type for top-K queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Returned when an algorithm tag is not recognized.
    InvalidAlgorithm(String),
    /// Returned when an indexed algorithm runs before the index is built.
    UninitializedIndex,
    /// Returned when the query length differs from the feature count.
    DimensionMismatch { expected: usize, got: usize },
    /// Returned when `k` is zero or exceeds the number of items.
    InvalidK { k: usize, items: usize },
    /// Returned when the query holds NaN or an infinity.
    NonFiniteQuery { index: usize, value: f32 },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAlgorithm(tag) => write!(
                f,
                "unknown algorithm '{tag}', expected one of naive, threshold, enhanced, partial"
            ),
            Self::UninitializedIndex => {
                write!(f, "sorted access index is not initialized")
            }
            Self::DimensionMismatch { expected, got } => {
                write!(f, "query dimension mismatch: expected {expected}, got {got}")
            }
            Self::InvalidK { k, items } => {
                write!(f, "k must be in 1..={items}, got {k}")
            }
            Self::NonFiniteQuery { index, value } => {
                write!(f, "query contains non-finite value at index {index}: {value}")
            }
        }
    }
}

impl Error for QueryError {}

/// Work counters for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    /// Items whose full score was computed.
    pub items_scored: usize,
    /// Items touched, including those abandoned during partial scoring.
    pub items_examined: usize,
    /// Per-feature contributions evaluated while scoring.
    pub features_evaluated: usize,
    /// Sorted-access rounds (round-robin) or list pops (enhanced).
    pub rounds: usize,
    pub elapsed: Duration,
}

impl QueryStats {
    pub fn average_features_per_item(&self) -> f64 {
        if self.items_examined == 0 {
            return 0.0;
        }
        self.features_evaluated as f64 / self.items_examined as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub items: Vec<ScoredItem>,
    pub stats: QueryStats,
}

/// Top-K query engine over one score matrix.
///
/// The matrix and its sorted access index are read-only once built, so a
/// shared reference can serve queries from many threads.
#[derive(Debug, Clone)]
pub struct TopKEngine {
    matrix: ScoreMatrix,
    index: Option<SortedAccessIndex>,
}

impl TopKEngine {
    pub fn new(matrix: ScoreMatrix, build_index_eagerly: bool) -> Self {
        let mut engine = Self {
            matrix,
            index: None,
        };
        if build_index_eagerly {
            engine.initialize_index();
        }
        engine
    }

    /// Builds (or rebuilds) the sorted access index.
    pub fn initialize_index(&mut self) {
        self.index = Some(self.matrix.build_index());
    }

    pub fn is_index_initialized(&self) -> bool {
        self.index.is_some()
    }

    pub fn index(&self) -> Option<&SortedAccessIndex> {
        self.index.as_ref()
    }

    pub fn matrix(&self) -> &ScoreMatrix {
        &self.matrix
    }

    pub fn items(&self) -> usize {
        self.matrix.rows()
    }

    pub fn features(&self) -> usize {
        self.matrix.cols()
    }

    /// Returns at most `k` items sorted by descending score, ties by item id.
    pub fn top_k(
        &self,
        query: &[f32],
        k: usize,
        algorithm: Algorithm,
    ) -> Result<Vec<ScoredItem>, QueryError> {
        self.top_k_profiled(query, k, algorithm)
            .map(|outcome| outcome.items)
    }

    /// Like [`TopKEngine::top_k`], also returning work counters.
    pub fn top_k_profiled(
        &self,
        query: &[f32],
        k: usize,
        algorithm: Algorithm,
    ) -> Result<QueryOutcome, QueryError> {
        self.validate(query, k)?;
        let index = if algorithm.requires_index() {
            Some(self.index.as_ref().ok_or(QueryError::UninitializedIndex)?)
        } else {
            None
        };

        let started_at = Instant::now();
        let prepared = PreparedQuery::new(query);
        let mut run = QueryRun::new(&self.matrix, &prepared, k);
        match index {
            None => naive::run(&mut run),
            Some(_) if prepared.is_zero() => run.fill_unvisited_with_zero(),
            Some(index) => match algorithm {
                Algorithm::Naive => naive::run(&mut run),
                Algorithm::Threshold => threshold::run(&mut run, index),
                Algorithm::Enhanced => enhanced::run(&mut run, index),
                Algorithm::Partial => partial::run(&mut run, index),
            },
        }

        let outcome = run.finish(started_at);
        tracing::trace!(
            algorithm = algorithm.as_str(),
            k,
            rounds = outcome.stats.rounds,
            items_scored = outcome.stats.items_scored,
            items_examined = outcome.stats.items_examined,
            "top-k query finished"
        );
        Ok(outcome)
    }

    fn validate(&self, query: &[f32], k: usize) -> Result<(), QueryError> {
        if query.len() != self.features() {
            return Err(QueryError::DimensionMismatch {
                expected: self.features(),
                got: query.len(),
            });
        }
        if let Some((index, value)) = query
            .iter()
            .copied()
            .enumerate()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(QueryError::NonFiniteQuery { index, value });
        }
        if k == 0 || k > self.items() {
            return Err(QueryError::InvalidK {
                k,
                items: self.items(),
            });
        }
        Ok(())
    }
}

/// Query-local state: accumulator, visited set and counters.
struct QueryRun<'a> {
    matrix: &'a ScoreMatrix,
    query: &'a PreparedQuery<'a>,
    accumulator: TopKAccumulator,
    visited: VisitedSet,
    stats: QueryStats,
}

impl<'a> QueryRun<'a> {
    fn new(matrix: &'a ScoreMatrix, query: &'a PreparedQuery<'a>, k: usize) -> Self {
        Self {
            matrix,
            query,
            accumulator: TopKAccumulator::new(k),
            visited: VisitedSet::for_matrix(matrix),
            stats: QueryStats::default(),
        }
    }

    fn query(&self) -> &'a PreparedQuery<'a> {
        self.query
    }

    /// True once no unvisited item bounded by `upper_bound` can enter the
    /// accumulator.
    ///
    /// An unvisited item may tie the worst retained score, so the tie is
    /// checked against the lowest unvisited id rather than with `<=`.
    fn bound_settled(&mut self, upper_bound: f32) -> bool {
        let lowest = self.visited.lowest_unvisited();
        !self.accumulator.admits(upper_bound, lowest)
    }

    /// Marks an item visited; returns false if it was already visited.
    fn visit(&mut self, item: ItemId) -> bool {
        self.visited.insert(item)
    }

    fn all_visited(&self) -> bool {
        self.visited.len() >= self.matrix.rows()
    }

    fn score_and_offer(&mut self, item: ItemId) {
        self.stats.items_examined += 1;
        self.stats.features_evaluated += self.query.active_features().len();
        self.offer_full_score(item);
    }

    fn offer_full_score(&mut self, item: ItemId) {
        let score = self.matrix.score_prepared(item, self.query);
        self.stats.items_scored += 1;
        self.accumulator.offer(score, item);
    }

    fn record_partial(&mut self, features: usize) {
        self.stats.items_examined += 1;
        self.stats.features_evaluated += features;
    }

    /// Offers every unvisited item with score zero, in ascending id order.
    ///
    /// Only valid once no unvisited item can hold a nonzero entry for an
    /// active feature: after an all-zero query or once every list ran out.
    fn fill_unvisited_with_zero(&mut self) {
        for item in 0..self.matrix.rows() {
            if self.visited.contains(item) {
                continue;
            }
            if !self.accumulator.admits(0.0, item) {
                break;
            }
            self.accumulator.offer(0.0, item);
        }
    }

    fn finish(self, started_at: Instant) -> QueryOutcome {
        let mut stats = self.stats;
        stats.elapsed = started_at.elapsed();
        QueryOutcome {
            items: self.accumulator.into_sorted_vec(),
            stats,
        }
    }
}

#[cfg(test)]
mod tests;
