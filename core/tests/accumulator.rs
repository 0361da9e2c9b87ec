//! Cohort accumulator: ordering, purge and snapshot behaviour.

use retention_core::{
    cohort_accumulator::{CohortAccumulator, PriorHistory},
    monthly_aggregator::MonthActivity,
    Month, RetentionError, VenueKey,
};

fn month(year: i32, m: u32) -> Month {
    Month::new(year, m).expect("valid month")
}

fn activity(visits: &[(&str, u32)], non_returning: &[&str]) -> MonthActivity {
    MonthActivity {
        visitors:      visits.iter().map(|&(u, n)| (u.to_string(), n)).collect(),
        non_returning: non_returning.iter().map(|u| u.to_string()).collect(),
    }
}

fn accumulator() -> CohortAccumulator {
    CohortAccumulator::new(VenueKey::new("chain-1", "venue-1"))
}

#[test]
fn fold_adds_visit_days() {
    let mut acc = accumulator();
    assert!(acc.is_empty());
    assert!(acc.snapshot().is_none(), "nothing folded yet");

    acc.fold_month(month(2024, 1), &activity(&[("a", 2), ("b", 1)], &[]))
        .expect("fold january");
    acc.fold_month(month(2024, 2), &activity(&[("a", 1)], &[]))
        .expect("fold february");

    assert_eq!(acc.prior_count("a"), 3);
    assert_eq!(acc.prior_count("b"), 1);
    assert_eq!(acc.prior_count("nobody"), 0);
    assert_eq!(acc.last_month(), Some(month(2024, 2)));
    assert_eq!(acc.len(), 2);
}

#[test]
fn non_returning_visitors_are_purged_after_the_fold() {
    let mut acc = accumulator();
    acc.fold_month(month(2024, 1), &activity(&[("a", 1), ("b", 1)], &[]))
        .expect("fold january");
    acc.fold_month(month(2025, 3), &activity(&[("a", 1), ("c", 1)], &["a"]))
        .expect("fold march");

    assert_eq!(acc.prior_count("a"), 0, "purged");
    assert_eq!(acc.prior_count("b"), 1);
    assert_eq!(acc.prior_count("c"), 1);
    assert_eq!(acc.purged(), 1);
    // a, b and c were all present before the purge.
    assert_eq!(acc.peak_size(), 3);
    assert_eq!(acc.len(), 2);
}

#[test]
fn purging_an_absent_visitor_counts_nothing() {
    let mut acc = accumulator();
    acc.fold_month(month(2024, 1), &activity(&[("a", 1)], &["ghost"]))
        .expect("fold");
    assert_eq!(acc.purged(), 0);
}

#[test]
fn folding_out_of_order_is_rejected() {
    let mut acc = accumulator();
    acc.fold_month(month(2024, 5), &activity(&[("a", 1)], &[]))
        .expect("fold may");

    let err = acc
        .fold_month(month(2024, 4), &activity(&[("a", 1)], &[]))
        .unwrap_err();
    match err {
        RetentionError::OutOfOrderMonth { month: m, last, .. } => {
            assert_eq!(m, month(2024, 4));
            assert_eq!(last, month(2024, 5));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(
        acc.fold_month(month(2024, 5), &activity(&[], &[])).is_err(),
        "the same month twice is also out of order"
    );
    assert_eq!(acc.prior_count("a"), 1, "rejected folds leave state alone");
}

#[test]
fn snapshot_is_a_detached_copy() {
    let mut acc = accumulator();
    acc.fold_month(month(2024, 1), &activity(&[("a", 1)], &[]))
        .expect("fold january");
    let snap = acc.snapshot().expect("snapshot after fold");

    acc.fold_month(month(2024, 2), &activity(&[("a", 4)], &[]))
        .expect("fold february");

    assert_eq!(snap.month, month(2024, 1));
    assert_eq!(snap.prior_count("a"), 1, "later folds must not leak into the copy");
    assert_eq!(acc.prior_count("a"), 5);
}
