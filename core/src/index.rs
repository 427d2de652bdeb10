use std::cmp::Ordering;
use std::time::Instant;

use rayon::prelude::*;

use crate::matrix::{DenseMatrix, ItemId, SparseMatrix};

/// One `(value, item)` pair of a feature's sorted access list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    pub value: f32,
    pub item: ItemId,
}

/// Direction in which a feature list is consumed for a given coefficient sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Largest values first; used for positive coefficients.
    Descending,
    /// Smallest values first; used for negative coefficients.
    Ascending,
}

impl ScanDirection {
    pub fn for_coefficient(coefficient: f32) -> Self {
        if coefficient < 0.0 {
            Self::Ascending
        } else {
            Self::Descending
        }
    }
}

/// Items of one feature sorted by value, descending, ties by ascending item id.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureList {
    entries: Vec<IndexEntry>,
    covers_all_items: bool,
}

impl FeatureList {
    fn from_entries(mut entries: Vec<IndexEntry>, items: usize) -> Self {
        entries.sort_by(compare_entries);
        let covers_all_items = entries.len() == items;
        Self {
            entries,
            covers_all_items,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// True when every item of the matrix appears in this list.
    ///
    /// Items missing from a sparse list hold an implicit zero for the feature.
    pub fn covers_all_items(&self) -> bool {
        self.covers_all_items
    }

    /// Returns the entry `depth` steps from the start of a scan in `direction`.
    pub fn entry_at(&self, depth: usize, direction: ScanDirection) -> Option<IndexEntry> {
        if depth >= self.entries.len() {
            return None;
        }
        let position = match direction {
            ScanDirection::Descending => depth,
            ScanDirection::Ascending => self.entries.len() - 1 - depth,
        };
        Some(self.entries[position])
    }
}

fn compare_entries(left: &IndexEntry, right: &IndexEntry) -> Ordering {
    right
        .value
        .total_cmp(&left.value)
        .then_with(|| left.item.cmp(&right.item))
}

/// Per-feature sorted access lists over a score matrix.
///
/// Built once per matrix and shared read-only by every query.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedAccessIndex {
    items: usize,
    lists: Vec<FeatureList>,
}

impl SortedAccessIndex {
    pub fn build_dense(matrix: &DenseMatrix) -> Self {
        let started_at = Instant::now();
        let items = matrix.rows();
        let lists: Vec<FeatureList> = (0..matrix.cols())
            .into_par_iter()
            .map(|feature| {
                let entries = (0..items)
                    .map(|item| IndexEntry {
                        value: matrix.value_at(item, feature),
                        item,
                    })
                    .collect();
                FeatureList::from_entries(entries, items)
            })
            .collect();

        let index = Self { items, lists };
        index.log_built(false, started_at);
        index
    }

    pub fn build_sparse(matrix: &SparseMatrix) -> Self {
        let started_at = Instant::now();
        let items = matrix.rows();
        let mut buckets: Vec<Vec<IndexEntry>> = vec![Vec::new(); matrix.cols()];
        for item in 0..items {
            for (feature, value) in matrix.row(item) {
                buckets[feature].push(IndexEntry { value, item });
            }
        }
        let lists: Vec<FeatureList> = buckets
            .into_par_iter()
            .map(|entries| FeatureList::from_entries(entries, items))
            .collect();

        let index = Self { items, lists };
        index.log_built(true, started_at);
        index
    }

    pub fn items(&self) -> usize {
        self.items
    }

    pub fn features(&self) -> usize {
        self.lists.len()
    }

    pub fn feature(&self, feature: usize) -> &FeatureList {
        &self.lists[feature]
    }

    pub fn total_entries(&self) -> usize {
        self.lists.iter().map(FeatureList::len).sum()
    }

    fn log_built(&self, sparse: bool, started_at: Instant) {
        tracing::debug!(
            items = self.items,
            features = self.lists.len(),
            entries = self.total_entries(),
            sparse,
            elapsed_ms = started_at.elapsed().as_secs_f64() * 1_000.0,
            "sorted access index built"
        );
    }
}
