use std::error::Error;
use std::fmt;

use crate::index::SortedAccessIndex;
use crate::vector::PreparedQuery;

pub type ItemId = usize;

/// Error type for score matrix construction and direct scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixError {
    /// Returned when a matrix has no items or no features.
    EmptyMatrix,
    /// Returned when a value buffer or query does not match the declared shape.
    ShapeMismatch { expected: usize, got: usize },
    /// Returned when one row of a row list has a different width.
    RaggedRows {
        row: usize,
        expected: usize,
        got: usize,
    },
    /// Returned when an entry or lookup falls outside the matrix.
    OutOfBounds { row: usize, col: usize },
    /// Returned when an entry is NaN or infinite.
    NonFinite { row: usize, col: usize, value: f32 },
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMatrix => write!(f, "matrix must have at least one item and one feature"),
            Self::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {expected} values, got {got}")
            }
            Self::RaggedRows { row, expected, got } => {
                write!(f, "row {row} has {got} features, expected {expected}")
            }
            Self::OutOfBounds { row, col } => {
                write!(f, "entry ({row}, {col}) is outside the matrix")
            }
            Self::NonFinite { row, col, value } => {
                write!(f, "non-finite value at ({row}, {col}): {value}")
            }
        }
    }
}

impl Error for MatrixError {}

/// Row-major item × feature matrix with full random access.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl DenseMatrix {
    pub fn new(rows: usize, cols: usize, values: Vec<f32>) -> Result<Self, MatrixError> {
        if rows == 0 || cols == 0 {
            return Err(MatrixError::EmptyMatrix);
        }
        let expected = rows.saturating_mul(cols);
        if values.len() != expected {
            return Err(MatrixError::ShapeMismatch {
                expected,
                got: values.len(),
            });
        }
        if let Some(position) = values.iter().position(|value| !value.is_finite()) {
            return Err(MatrixError::NonFinite {
                row: position / cols,
                col: position % cols,
                value: values[position],
            });
        }

        Ok(Self { rows, cols, values })
    }

    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, MatrixError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut values = Vec::with_capacity(rows.len().saturating_mul(cols));
        for (row, items) in rows.iter().enumerate() {
            if items.len() != cols {
                return Err(MatrixError::RaggedRows {
                    row,
                    expected: cols,
                    got: items.len(),
                });
            }
            values.extend_from_slice(items);
        }
        Self::new(rows.len(), cols, values)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, item: ItemId) -> &[f32] {
        let start = item * self.cols;
        &self.values[start..start + self.cols]
    }

    pub fn value_at(&self, item: ItemId, feature: usize) -> f32 {
        self.values[item * self.cols + feature]
    }
}

/// Compressed sparse row matrix. Entries not stored are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f32>,
}

impl SparseMatrix {
    /// Builds a matrix from `(row, col, value)` triplets.
    ///
    /// Duplicate coordinates are summed and entries that end up zero are not
    /// stored.
    pub fn from_triplets(
        rows: usize,
        cols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f32)>,
    ) -> Result<Self, MatrixError> {
        if rows == 0 || cols == 0 {
            return Err(MatrixError::EmptyMatrix);
        }

        let mut entries = Vec::new();
        for (row, col, value) in triplets {
            if row >= rows || col >= cols {
                return Err(MatrixError::OutOfBounds { row, col });
            }
            if !value.is_finite() {
                return Err(MatrixError::NonFinite { row, col, value });
            }
            entries.push((row, col, value));
        }
        entries.sort_by(|left, right| (left.0, left.1).cmp(&(right.0, right.1)));

        let mut merged: Vec<(usize, usize, f32)> = Vec::with_capacity(entries.len());
        for (row, col, value) in entries {
            match merged.last_mut() {
                Some(last) if last.0 == row && last.1 == col => last.2 += value,
                _ => merged.push((row, col, value)),
            }
        }

        let mut indptr = vec![0usize; rows + 1];
        let mut indices = Vec::with_capacity(merged.len());
        let mut data = Vec::with_capacity(merged.len());
        for (row, col, value) in merged {
            if !value.is_finite() {
                return Err(MatrixError::NonFinite { row, col, value });
            }
            if value == 0.0 {
                continue;
            }
            indptr[row + 1] += 1;
            indices.push(col);
            data.push(value);
        }
        for row in 0..rows {
            indptr[row + 1] += indptr[row];
        }

        Ok(Self {
            rows,
            cols,
            indptr,
            indices,
            data,
        })
    }

    /// Keeps the nonzero entries of a dense matrix.
    pub fn from_dense(dense: &DenseMatrix) -> Self {
        let mut indptr = Vec::with_capacity(dense.rows() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for item in 0..dense.rows() {
            for (feature, value) in dense.row(item).iter().copied().enumerate() {
                if value != 0.0 {
                    indices.push(feature);
                    data.push(value);
                }
            }
            indptr.push(indices.len());
        }

        Self {
            rows: dense.rows(),
            cols: dense.cols(),
            indptr,
            indices,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Iterates the stored `(feature, value)` pairs of one item in feature order.
    pub fn row(&self, item: ItemId) -> impl Iterator<Item = (usize, f32)> + '_ {
        let range = self.indptr[item]..self.indptr[item + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.data[range].iter().copied())
    }

    pub fn value_at(&self, item: ItemId, feature: usize) -> f32 {
        let range = self.indptr[item]..self.indptr[item + 1];
        match self.indices[range.clone()].binary_search(&feature) {
            Ok(offset) => self.data[range.start + offset],
            Err(_) => 0.0,
        }
    }

    fn dot_row(&self, item: ItemId, query: &[f32]) -> f32 {
        self.row(item)
            .fold(0.0f32, |acc, (feature, value)| acc + query[feature] * value)
    }
}

/// Item × feature score matrix consumed by the query engine.
///
/// Produced by an external trainer and immutable once handed to an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreMatrix {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl ScoreMatrix {
    pub fn rows(&self) -> usize {
        match self {
            Self::Dense(matrix) => matrix.rows(),
            Self::Sparse(matrix) => matrix.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Self::Dense(matrix) => matrix.cols(),
            Self::Sparse(matrix) => matrix.cols(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// Returns `Y[item, feature]`; missing sparse entries read as zero.
    pub fn value_at(&self, item: ItemId, feature: usize) -> f32 {
        match self {
            Self::Dense(matrix) => matrix.value_at(item, feature),
            Self::Sparse(matrix) => matrix.value_at(item, feature),
        }
    }

    /// Computes the full score `Σ_r query[r] · Y[item, r]` with validation.
    pub fn score(&self, item: ItemId, query: &[f32]) -> Result<f32, MatrixError> {
        if query.len() != self.cols() {
            return Err(MatrixError::ShapeMismatch {
                expected: self.cols(),
                got: query.len(),
            });
        }
        if item >= self.rows() {
            return Err(MatrixError::OutOfBounds { row: item, col: 0 });
        }
        Ok(self.score_prepared(item, &PreparedQuery::new(query)))
    }

    pub(crate) fn score_prepared(&self, item: ItemId, query: &PreparedQuery<'_>) -> f32 {
        match self {
            Self::Dense(matrix) => query.dot_dense(matrix.row(item)),
            Self::Sparse(matrix) => matrix.dot_row(item, query.values()),
        }
    }

    pub fn build_index(&self) -> SortedAccessIndex {
        match self {
            Self::Dense(matrix) => SortedAccessIndex::build_dense(matrix),
            Self::Sparse(matrix) => SortedAccessIndex::build_sparse(matrix),
        }
    }
}

impl From<DenseMatrix> for ScoreMatrix {
    fn from(matrix: DenseMatrix) -> Self {
        Self::Dense(matrix)
    }
}

impl From<SparseMatrix> for ScoreMatrix {
    fn from(matrix: SparseMatrix) -> Self {
        Self::Sparse(matrix)
    }
}
