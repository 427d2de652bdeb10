use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::matrix::ItemId;

/// A fully scored item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: ItemId,
    pub score: f32,
}

/// Fixed-capacity set of the best items offered so far.
///
/// Higher scores win; equal scores prefer the lower item id. The worst retained
/// item sits at the top of the heap.
#[derive(Debug, Clone)]
pub struct TopKAccumulator {
    capacity: usize,
    heap: BinaryHeap<HeapCandidate>,
}

impl TopKAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Lowest retained score, or `-inf` while fewer than `capacity` items are held.
    pub fn threshold(&self) -> f32 {
        if !self.is_full() {
            return f32::NEG_INFINITY;
        }
        self.heap
            .peek()
            .map_or(f32::NEG_INFINITY, |worst| worst.score)
    }

    pub fn worst(&self) -> Option<ScoredItem> {
        self.heap.peek().map(HeapCandidate::scored)
    }

    /// Returns true when offering `(score, item)` would change the retained set.
    pub fn admits(&self, score: f32, item: ItemId) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if !self.is_full() {
            return true;
        }
        let candidate = HeapCandidate::new(score, item);
        self.heap
            .peek()
            .is_some_and(|worst| candidate.cmp(worst).is_lt())
    }

    /// Offers a scored item; returns whether it was retained.
    pub fn offer(&mut self, score: f32, item: ItemId) -> bool {
        if !self.admits(score, item) {
            return false;
        }
        if self.is_full() {
            let _ = self.heap.pop();
        }
        self.heap.push(HeapCandidate::new(score, item));
        true
    }

    /// Consumes the accumulator into items sorted by descending score.
    pub fn into_sorted_vec(self) -> Vec<ScoredItem> {
        self.heap
            .into_sorted_vec()
            .iter()
            .map(HeapCandidate::scored)
            .collect()
    }
}

#[derive(Debug, Clone)]
struct HeapCandidate {
    item: ItemId,
    score: f32,
}

impl HeapCandidate {
    fn new(score: f32, item: ItemId) -> Self {
        // -0.0 + 0.0 == +0.0, so total_cmp treats every zero score alike.
        Self {
            item,
            score: score + 0.0,
        }
    }

    fn scored(&self) -> ScoredItem {
        ScoredItem {
            item: self.item,
            score: self.score,
        }
    }
}

impl PartialEq for HeapCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.item == other.item && self.score.to_bits() == other.score.to_bits()
    }
}

impl Eq for HeapCandidate {}

impl PartialOrd for HeapCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Greater means worse: lower score, then higher item id.
impl Ord for HeapCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.item.cmp(&other.item))
    }
}
