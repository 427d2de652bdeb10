use super::QueryRun;

/// Scores every item; needs no index.
pub(super) fn run(run: &mut QueryRun<'_>) {
    for item in 0..run.matrix.rows() {
        run.score_and_offer(item);
    }
}
