//! Range discovery over a reference simulation result.

use proptest::prelude::*;
use sf_sim::{
    CsvResultFile, RangeError, RangeMargin, ReferenceCache, RetryPolicy, SimulationResult,
    SimulationSource, discover_ranges, parse_result_csv,
};

const SIMPLE_LOOP: &str = "\
\"time\",\"s\",\"r\",\"x\",\"y\"
0.0,0.0,1.0,0.5,0.75
0.5,0.0,1.5,0.25,0.5
1.0,0.0,2.0,-0.5,0.25
";

#[test]
fn constant_zero_input_gets_nonzero_width() {
    let result = parse_result_csv(SIMPLE_LOOP).expect("valid csv");
    let ranges = discover_ranges(&["s", "r"], &result, &RangeMargin::default())
        .expect("ranges for known variables");

    let s = ranges.get("s").expect("s range");
    assert_eq!(s.observed_min, 0.0);
    assert_eq!(s.observed_max, 0.0);
    assert!(s.min < 0.0 && s.max > 0.0, "got [{}, {}]", s.min, s.max);
    assert_eq!(s.min, -s.max);

    let r = ranges.get("r").expect("r range");
    assert!(r.min < 1.0 && r.max > 2.0);
    assert!(r.contains(1.0) && r.contains(2.0));
}

#[test]
fn ranges_follow_request_order() {
    let result = parse_result_csv(SIMPLE_LOOP).unwrap();
    let ranges = discover_ranges(&["y", "x", "y"], &result, &RangeMargin::default()).unwrap();
    let names: Vec<&str> = ranges.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["y", "x"]);
}

#[test]
fn unknown_variable_is_reported() {
    let result = parse_result_csv(SIMPLE_LOOP).unwrap();
    let err = discover_ranges(&["s", "missing"], &result, &RangeMargin::default()).unwrap_err();
    assert_eq!(
        err,
        RangeError::UnknownVariable {
            name: "missing".to_string()
        }
    );
}

#[test]
fn non_finite_sample_is_reported() {
    let result = parse_result_csv("time,x\n0,1\n1,NaN\n").unwrap();
    let err = discover_ranges(&["x"], &result, &RangeMargin::default()).unwrap_err();
    assert!(matches!(err, RangeError::NonFinite { .. }));
}

#[test]
fn overflowing_span_is_reported() {
    let result = parse_result_csv("time,x\n0,-1e308\n1,1e308\n").unwrap();
    let err = discover_ranges(&["x"], &result, &RangeMargin::default()).unwrap_err();
    assert!(matches!(err, RangeError::NonFiniteSpan { ref name, .. } if name == "x"));
}

#[test]
fn header_only_result_is_empty() {
    let result = parse_result_csv("time,x\n").unwrap();
    let err = discover_ranges(&["x"], &result, &RangeMargin::default()).unwrap_err();
    assert_eq!(err, RangeError::EmptyResult);
}

#[test]
fn discovery_is_idempotent_through_the_cache() {
    let path = std::env::temp_dir().join(format!("sf_sim_ranges_{}.csv", std::process::id()));
    std::fs::write(&path, SIMPLE_LOOP).unwrap();

    let source = CsvResultFile::new(&path);
    let cache = ReferenceCache::new();
    let policy = RetryPolicy::default();

    let first = cache.get_or_run(&source, &policy).unwrap();
    let a = discover_ranges(&["r", "x"], &first, &RangeMargin::default()).unwrap();
    let second = cache.get_or_run(&source, &policy).unwrap();
    let b = discover_ranges(&["r", "x"], &second, &RangeMargin::default()).unwrap();
    assert_eq!(a, b);
    assert_eq!(cache.runs(), 1);

    // A fresh read of the same file yields the same bounds as well.
    let fresh = source.run(None).unwrap();
    let c = discover_ranges(&["r", "x"], &fresh, &RangeMargin::default()).unwrap();
    assert_eq!(a, c);

    std::fs::remove_file(&path).ok();
}

fn column_result(values: &[f64]) -> SimulationResult {
    let rows: Vec<Vec<f64>> = values
        .iter()
        .enumerate()
        .map(|(i, v)| vec![i as f64, *v])
        .collect();
    SimulationResult::from_rows(vec!["time".to_string(), "v".to_string()], &rows).unwrap()
}

proptest! {
    #[test]
    fn adjusted_range_is_open_and_covers_observed(
        values in prop::collection::vec(-1.0e6f64..1.0e6, 1..40),
    ) {
        let result = column_result(&values);
        let ranges = discover_ranges(&["v"], &result, &RangeMargin::default()).unwrap();
        let v = ranges.get("v").unwrap();
        prop_assert!(v.min < v.max);
        prop_assert!(v.min <= v.observed_min);
        prop_assert!(v.max >= v.observed_max);
    }

    #[test]
    fn constant_trajectory_still_has_width(value in -1.0e3f64..1.0e3) {
        let result = column_result(&[value, value, value]);
        let ranges = discover_ranges(&["v"], &result, &RangeMargin::default()).unwrap();
        let v = ranges.get("v").unwrap();
        prop_assert!(v.min < v.max);
    }
}
