//! Dot-product kernels shared by every scoring path.
//!
//! Every algorithm variant scores a full item through the same kernel so that
//! rank values agree bit-for-bit between the naive scan and the indexed
//! variants.

use wide::f32x8;

const SIMD_WIDTH: usize = 8;

/// Query coefficients packed once for repeated dense row scoring.
#[derive(Debug, Clone)]
pub struct PackedQuery {
    len: usize,
    simd_query: Vec<f32x8>,
    tail: [f32; SIMD_WIDTH],
    tail_len: usize,
}

impl PackedQuery {
    pub fn new(query: &[f32]) -> Self {
        let mut chunks = query.chunks_exact(SIMD_WIDTH);
        let simd_query = chunks.by_ref().map(load_f32x8).collect();
        let remainder = chunks.remainder();

        let mut tail = [0.0f32; SIMD_WIDTH];
        tail[..remainder.len()].copy_from_slice(remainder);
        Self {
            len: query.len(),
            simd_query,
            tail,
            tail_len: remainder.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Computes the dot product against a same-length row.
    pub fn dot(&self, row: &[f32]) -> f32 {
        debug_assert_eq!(row.len(), self.len);
        let simd_chunks = self.simd_query.len();
        let simd_prefix_len = simd_chunks * SIMD_WIDTH;

        let mut simd_sum0 = f32x8::ZERO;
        let mut simd_sum1 = f32x8::ZERO;
        let mut chunk_idx = 0usize;
        let mut offset = 0usize;

        while chunk_idx + 1 < simd_chunks {
            simd_sum0 += self.simd_query[chunk_idx] * load_f32x8(&row[offset..offset + SIMD_WIDTH]);
            offset += SIMD_WIDTH;
            simd_sum1 +=
                self.simd_query[chunk_idx + 1] * load_f32x8(&row[offset..offset + SIMD_WIDTH]);
            offset += SIMD_WIDTH;
            chunk_idx += 2;
        }
        if chunk_idx < simd_chunks {
            simd_sum0 += self.simd_query[chunk_idx] * load_f32x8(&row[offset..offset + SIMD_WIDTH]);
        }

        let mut scalar_sum = 0.0f32;
        for (index, value) in row[simd_prefix_len..]
            .iter()
            .enumerate()
            .take(self.tail_len)
        {
            scalar_sum += self.tail[index] * *value;
        }

        (simd_sum0 + simd_sum1).reduce_add() + scalar_sum
    }
}

/// A validated query prepared for one top-K evaluation.
///
/// Holds the raw coefficients, the SIMD packing used for dense rows and the
/// ascending list of features with a nonzero coefficient.
#[derive(Debug, Clone)]
pub(crate) struct PreparedQuery<'a> {
    values: &'a [f32],
    packed: PackedQuery,
    active: Vec<usize>,
}

impl<'a> PreparedQuery<'a> {
    pub(crate) fn new(values: &'a [f32]) -> Self {
        let active = values
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != 0.0)
            .map(|(feature, _)| feature)
            .collect();
        Self {
            values,
            packed: PackedQuery::new(values),
            active,
        }
    }

    pub(crate) fn values(&self) -> &'a [f32] {
        self.values
    }

    pub(crate) fn active_features(&self) -> &[usize] {
        &self.active
    }

    /// Iterates `(feature, coefficient)` over nonzero coefficients.
    pub(crate) fn active_terms(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.active
            .iter()
            .map(move |&feature| (feature, self.values[feature]))
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.active.is_empty()
    }

    pub(crate) fn dot_dense(&self, row: &[f32]) -> f32 {
        self.packed.dot(row)
    }
}

fn load_f32x8(values: &[f32]) -> f32x8 {
    debug_assert_eq!(values.len(), SIMD_WIDTH);
    f32x8::from([
        values[0], values[1], values[2], values[3], values[4], values[5], values[6], values[7],
    ])
}
