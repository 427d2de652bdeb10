use crate::index::{FeatureList, IndexEntry, ScanDirection, SortedAccessIndex};
use crate::vector::PreparedQuery;

/// Read position of one active feature's sorted access list.
pub(super) struct Frontier<'a> {
    list: &'a FeatureList,
    coefficient: f32,
    direction: ScanDirection,
    depth: usize,
}

impl<'a> Frontier<'a> {
    /// One frontier per nonzero query coefficient, in ascending feature order.
    pub(super) fn for_query(
        index: &'a SortedAccessIndex,
        query: &PreparedQuery<'_>,
    ) -> Vec<Frontier<'a>> {
        query
            .active_terms()
            .map(|(feature, coefficient)| Frontier {
                list: index.feature(feature),
                coefficient,
                direction: ScanDirection::for_coefficient(coefficient),
                depth: 0,
            })
            .collect()
    }

    pub(super) fn peek(&self) -> Option<IndexEntry> {
        self.list.entry_at(self.depth, self.direction)
    }

    pub(super) fn advance(&mut self) {
        if self.depth < self.list.len() {
            self.depth += 1;
        }
    }

    pub(super) fn is_exhausted(&self) -> bool {
        self.depth >= self.list.len()
    }

    /// Largest contribution any item not yet read from this list can have.
    ///
    /// Items absent from a sparse list hold zero for the feature, so the bound
    /// of such a list never drops below zero.
    pub(super) fn bound(&self) -> f32 {
        match self.peek() {
            Some(entry) if self.list.covers_all_items() => self.coefficient * entry.value,
            Some(entry) => (self.coefficient * entry.value).max(0.0),
            None => 0.0,
        }
    }
}
