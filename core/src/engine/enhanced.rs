use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::index::SortedAccessIndex;

use super::frontier::Frontier;
use super::QueryRun;

/// Threshold algorithm that always advances the list with the largest bound.
///
/// The upper bound is the sum of every list's next-entry bound and is updated
/// incrementally as single lists advance.
pub(super) fn run(run: &mut QueryRun<'_>, index: &SortedAccessIndex) {
    let mut frontiers = Frontier::for_query(index, run.query());
    let mut upper_bound: f32 = frontiers.iter().map(Frontier::bound).sum();
    let mut queue: BinaryHeap<QueueEntry> = frontiers
        .iter()
        .enumerate()
        .filter(|(_, frontier)| !frontier.is_exhausted())
        .map(|(slot, frontier)| QueueEntry {
            bound: frontier.bound(),
            slot,
        })
        .collect();

    loop {
        if run.all_visited() || run.bound_settled(upper_bound) {
            return;
        }
        let Some(QueueEntry { bound, slot }) = queue.pop() else {
            run.fill_unvisited_with_zero();
            return;
        };
        run.stats.rounds += 1;

        let frontier = &mut frontiers[slot];
        if let Some(entry) = frontier.peek() {
            if run.visit(entry.item) {
                run.score_and_offer(entry.item);
            }
        }
        frontier.advance();

        let next_bound = frontier.bound();
        upper_bound += next_bound - bound;
        if !frontier.is_exhausted() {
            queue.push(QueueEntry {
                bound: next_bound,
                slot,
            });
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    bound: f32,
    slot: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Largest bound pops first; equal bounds pop the lower feature first.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bound
            .total_cmp(&other.bound)
            .then_with(|| other.slot.cmp(&self.slot))
    }
}
