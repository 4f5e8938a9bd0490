//! Detection of a successful run that already covered identical content.

use crate::core::types::Run;

/// Return the first successful, completed run whose tree hash is `tree_hash`.
///
/// `older_runs` order is authoritative: the first match wins.
pub fn find_successful_duplicate<'a>(tree_hash: &str, older_runs: &'a [Run]) -> Option<&'a Run> {
    older_runs
        .iter()
        .find(|run| run.tree_hash == tree_hash && run.is_successful())
}

/// Runs created strictly before `current`, in their original order.
pub fn older_runs(current: &Run, runs: &[Run]) -> Vec<Run> {
    runs.iter()
        .filter(|run| run.created_at < current.created_at)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Conclusion, RunStatus};
    use crate::test_support::{in_progress_run, run, run_with_conclusion};

    #[test]
    fn finds_completed_success_with_same_tree() {
        let runs = vec![run(1, "T0"), run(2, "T1")];
        let found = find_successful_duplicate("T1", &runs).expect("duplicate");
        assert_eq!(found.id, 2);
    }

    #[test]
    fn ignores_unsuccessful_and_unfinished_runs() {
        let runs = vec![
            run_with_conclusion(1, "T1", Conclusion::Failure),
            run_with_conclusion(2, "T1", Conclusion::Cancelled),
            run_with_conclusion(3, "T1", Conclusion::Skipped),
            in_progress_run(4, "T1"),
        ];
        assert!(find_successful_duplicate("T1", &runs).is_none());
    }

    #[test]
    fn first_match_in_supplied_order_wins() {
        let runs = vec![run(7, "T1"), run(3, "T1")];
        let found = find_successful_duplicate("T1", &runs).expect("duplicate");
        assert_eq!(found.id, 7);
    }

    #[test]
    fn repeated_calls_return_the_same_run() {
        let runs = vec![run(1, "T0"), run(2, "T1"), run(3, "T1")];
        let first = find_successful_duplicate("T1", &runs).map(|r| r.id);
        for _ in 0..5 {
            assert_eq!(find_successful_duplicate("T1", &runs).map(|r| r.id), first);
        }
        assert_eq!(find_successful_duplicate("T9", &runs), None);
    }

    #[test]
    fn older_runs_keeps_strictly_earlier_runs_in_order() {
        let current = run(5, "T1");
        let mut same_time = run(6, "T2");
        same_time.created_at = current.created_at;
        let runs = vec![run(3, "T0"), run(9, "T1"), same_time, run(1, "T3")];
        let older: Vec<u64> = older_runs(&current, &runs).iter().map(|r| r.id).collect();
        assert_eq!(older, vec![3, 1]);
    }

    #[test]
    fn completed_without_conclusion_is_not_successful() {
        let mut r = run(1, "T1");
        r.status = RunStatus::Completed;
        r.conclusion = None;
        assert!(find_successful_duplicate("T1", &[r]).is_none());
    }
}
