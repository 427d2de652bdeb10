#![forbid(unsafe_code)]
//! Top-K retrieval for separable linear scoring models.
//!
//! Given an item × feature score matrix `Y` and a query `x`, finds the `k`
//! items maximizing `Σ_r x[r] · Y[item, r]`. Besides the exhaustive scan, the
//! engine runs threshold-algorithm variants over per-feature sorted access
//! lists, which usually score only a small fraction of the items.

pub mod batch;
pub mod engine;
pub mod index;
pub mod matrix;
pub mod topk;
pub mod vector;

pub use batch::{BatchOptions, BatchOutput, BatchProfile};
pub use engine::{Algorithm, QueryError, QueryOutcome, QueryStats, TopKEngine};
pub use index::{FeatureList, IndexEntry, ScanDirection, SortedAccessIndex};
pub use matrix::{DenseMatrix, ItemId, MatrixError, ScoreMatrix, SparseMatrix};
pub use topk::{ScoredItem, TopKAccumulator};
