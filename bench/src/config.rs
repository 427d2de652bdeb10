use std::env;

use anyhow::{Context, Result};
use septa_core::Algorithm;

const ITEMS_DEFAULT: usize = 20_000;
const FEATURES_DEFAULT: usize = 10;
const SPARSE_FEATURES_DEFAULT: usize = 1_000;
const SPARSE_DENSITY_DEFAULT: f64 = 0.001;
const TOPK_DEFAULT: usize = 10;
const QUERIES_DEFAULT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scenario {
    All,
    Dense,
    Sparse,
}

impl Scenario {
    pub(crate) fn runs_dense(self) -> bool {
        matches!(self, Self::All | Self::Dense)
    }

    pub(crate) fn runs_sparse(self) -> bool {
        matches!(self, Self::All | Self::Sparse)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct BenchConfig {
    pub(crate) scenario: Scenario,
    pub(crate) items: usize,
    pub(crate) features: usize,
    pub(crate) sparse_features: usize,
    pub(crate) sparse_density: f64,
    pub(crate) top_k: usize,
    pub(crate) queries: usize,
    pub(crate) algorithms: Vec<Algorithm>,
    pub(crate) parallel: bool,
}

impl BenchConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let scenario = parse_scenario("SEPTA_BENCH_SCENARIO")?;
        let items = parse_usize("SEPTA_BENCH_ITEMS", ITEMS_DEFAULT)?;
        let features = parse_usize("SEPTA_BENCH_FEATURES", FEATURES_DEFAULT)?;
        let sparse_features = parse_usize("SEPTA_BENCH_SPARSE_FEATURES", SPARSE_FEATURES_DEFAULT)?;
        let sparse_density = parse_f64("SEPTA_BENCH_SPARSE_DENSITY", SPARSE_DENSITY_DEFAULT)?;
        let top_k = parse_usize("SEPTA_BENCH_TOPK", TOPK_DEFAULT)?;
        let queries = parse_usize("SEPTA_BENCH_QUERIES", QUERIES_DEFAULT)?;
        let algorithms = parse_algorithms("SEPTA_BENCH_ALGORITHMS")?;
        let parallel = parse_bool_env("SEPTA_BENCH_PARALLEL", false)?;

        if items == 0 {
            anyhow::bail!("SEPTA_BENCH_ITEMS must be > 0");
        }
        if features == 0 {
            anyhow::bail!("SEPTA_BENCH_FEATURES must be > 0");
        }
        if sparse_features == 0 {
            anyhow::bail!("SEPTA_BENCH_SPARSE_FEATURES must be > 0");
        }
        if !(sparse_density > 0.0 && sparse_density <= 1.0) {
            anyhow::bail!("SEPTA_BENCH_SPARSE_DENSITY must be in (0, 1], got {sparse_density}");
        }
        if top_k == 0 || top_k > items {
            anyhow::bail!("SEPTA_BENCH_TOPK must be in 1..={items}, got {top_k}");
        }
        if queries == 0 {
            anyhow::bail!("SEPTA_BENCH_QUERIES must be > 0");
        }

        Ok(Self {
            scenario,
            items,
            features,
            sparse_features,
            sparse_density,
            top_k,
            queries,
            algorithms,
            parallel,
        })
    }
}

fn parse_scenario(key: &str) -> Result<Scenario> {
    let raw = env::var(key).unwrap_or_else(|_| "all".to_string());
    match raw.to_ascii_lowercase().as_str() {
        "all" => Ok(Scenario::All),
        "dense" => Ok(Scenario::Dense),
        "sparse" => Ok(Scenario::Sparse),
        _ => anyhow::bail!("{key} must be one of all, dense, sparse, got '{raw}'"),
    }
}

fn parse_algorithms(key: &str) -> Result<Vec<Algorithm>> {
    let Ok(raw) = env::var(key) else {
        return Ok(Algorithm::ALL.to_vec());
    };
    let algorithms = raw
        .split(',')
        .filter(|tag| !tag.trim().is_empty())
        .map(|tag| tag.parse::<Algorithm>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("{key} must list algorithm tags, got '{raw}'"))?;
    if algorithms.is_empty() {
        anyhow::bail!("{key} must name at least one algorithm");
    }
    Ok(algorithms)
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))
}

fn parse_f64(key: &str, default: f64) -> Result<f64> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{key} must be a number, got '{raw}'"))
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{key} must be a boolean, got '{raw}'"),
    }
}
