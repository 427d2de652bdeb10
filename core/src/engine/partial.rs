use crate::index::SortedAccessIndex;
use crate::matrix::ItemId;

use super::frontier::Frontier;
use super::QueryRun;

/// Round-robin threshold algorithm with early-exit scoring.
///
/// A newly seen item is scored one feature at a time and abandoned as soon as
/// its partial score plus the best remaining contributions can no longer
/// enter the accumulator. Survivors are scored with the full kernel.
pub(super) fn run(run: &mut QueryRun<'_>, index: &SortedAccessIndex) {
    let mut frontiers = Frontier::for_query(index, run.query());
    let remaining = remaining_maxima(&frontiers);

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
                    score_partially(run, entry.item, &remaining);
                }
            }
            frontier.advance();
        }

        if run.all_visited() || run.bound_settled(upper_bound) {
            return;
        }
    }
}

/// `remaining[i]` bounds the contribution of active features `i..`.
fn remaining_maxima(frontiers: &[Frontier<'_>]) -> Vec<f32> {
    let mut remaining = vec![0.0f32; frontiers.len() + 1];
    for (step, frontier) in frontiers.iter().enumerate().rev() {
        remaining[step] = remaining[step + 1] + frontier.bound();
    }
    remaining
}

fn score_partially(run: &mut QueryRun<'_>, item: ItemId, remaining: &[f32]) {
    let mut partial = 0.0f32;
    for (step, (feature, coefficient)) in run.query().active_terms().enumerate() {
        if !run.accumulator.admits(partial + remaining[step], item) {
            run.record_partial(step);
            return;
        }
        partial += coefficient * run.matrix.value_at(item, feature);
    }

    let features = run.query().active_features().len();
    run.record_partial(features);
    if run.accumulator.admits(partial, item) {
        run.offer_full_score(item);
    }
}
