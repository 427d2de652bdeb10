use crate::index::SortedAccessIndex;

use super::frontier::Frontier;
use super::QueryRun;

/// Round-robin threshold algorithm.
///
/// Every round reads one entry per active list at a shared depth. The upper
/// bound is rebuilt from that round's frontier entries only; the scan stops
/// once no unvisited item under that bound can still enter the accumulator.
pub(super) fn run(run: &mut QueryRun<'_>, index: &SortedAccessIndex) {
    let mut frontiers = Frontier::for_query(index, run.query());

    loop {
        if frontiers.iter().all(Frontier::is_exhausted) {
            run.fill_unvisited_with_zero();
            return;
        }
        run.stats.rounds += 1;

        let mut upper_bound = 0.0f32;
        for frontier in &mut frontiers {
            upper_bound += frontier.bound();
            if let Some(entry) = frontier.peek() {
                if run.visit(entry.item) {
                    run.score_and_offer(entry.item);
                }
            }
            frontier.advance();
        }

        if run.all_visited() || run.bound_settled(upper_bound) {
            return;
        }
    }
}
