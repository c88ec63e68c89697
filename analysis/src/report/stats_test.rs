use super::stats::{percentile, BoxStats};

#[test]
fn percentile_interpolates_linearly() {
    let sorted = [1.0, 2.0, 3.0, 4.0];

    assert_eq!(percentile(&sorted, 0.0), 1.0);
    assert_eq!(percentile(&sorted, 25.0), 1.75);
    assert_eq!(percentile(&sorted, 50.0), 2.5);
    assert_eq!(percentile(&sorted, 100.0), 4.0);
    assert_eq!(percentile(&[7.0], 75.0), 7.0);
}

#[test]
fn box_without_outliers() {
    let stats = BoxStats::compute(&[5.0, 1.0, 3.0, 2.0, 4.0], 1.5).unwrap();

    assert_eq!(stats.q1, 2.0);
    assert_eq!(stats.median, 3.0);
    assert_eq!(stats.q3, 4.0);
    assert_eq!(stats.whisker_low, 1.0);
    assert_eq!(stats.whisker_high, 5.0);
    assert!(stats.outliers.is_empty());
    assert_eq!(stats.extent(), (1.0, 5.0));
}

#[test]
fn points_beyond_whiskers_are_outliers() {
    // q1 = 1.5, q3 = 4.5, whiskers may reach [-3, 9]
    let stats = BoxStats::compute(&[1.0, 2.0, 3.0, 4.0, 5.0, 20.0, -4.0], 1.5).unwrap();

    assert_eq!(stats.median, 3.0);
    assert_eq!(stats.whisker_low, 1.0);
    assert_eq!(stats.whisker_high, 5.0);
    assert_eq!(stats.outliers, vec![-4.0, 20.0]);
    assert_eq!(stats.extent(), (-4.0, 20.0));
}

#[test]
fn empty_and_non_finite_samples() {
    assert!(BoxStats::compute(&[], 1.5).is_none());
    assert!(BoxStats::compute(&[f64::NAN], 1.5).is_none());

    let stats = BoxStats::compute(&[2.0, f64::INFINITY], 1.5).unwrap();
    assert_eq!(stats.median, 2.0);
    assert!(stats.outliers.is_empty());
}
