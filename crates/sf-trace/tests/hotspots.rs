//! Integration tests for trace reading and hotspot selection.

use proptest::prelude::*;
use sf_core::EquationId;
use sf_trace::{TraceError, parse_trace, read_trace, select};

const SIMPLE_LOOP_TRACE: &str = r#"{
    "name": "simpleLoop",
    "totalTime": 0.00395,
    "profileBlocks": [
        { "id": 14, "ncall": 2512, "time": 0.0005925, "maxTime": 0.000004 },
        { "id": 11, "ncall": 2512, "time": 0.0001580 },
        { "id": 6,  "ncall": 1,    "time": 0.0000395, "kind": "linear" }
    ]
}"#;

#[test]
fn simple_loop_threshold_ten_percent_selects_e14() {
    let trace = parse_trace(SIMPLE_LOOP_TRACE).unwrap();
    let hotspots = select(trace.records(), 0.10).unwrap();

    assert_eq!(hotspots.len(), 1);
    let e14 = &hotspots[0];
    assert_eq!(e14.id, EquationId::new(14));
    assert_eq!(e14.call_count, 2512);
    assert!((e14.fraction_of_total() - 0.15).abs() < 1e-12);
}

#[test]
fn zero_threshold_returns_every_nonlinear_record_once() {
    let trace = parse_trace(SIMPLE_LOOP_TRACE).unwrap();
    let hotspots = select(trace.records(), 0.0).unwrap();
    let ids: Vec<u32> = hotspots.iter().map(|r| r.id.get()).collect();
    assert_eq!(ids, vec![14, 11]);
}

#[test]
fn read_trace_from_disk() {
    let path = std::env::temp_dir().join("sf_trace_read_from_disk.json");
    std::fs::write(&path, SIMPLE_LOOP_TRACE).unwrap();

    let trace = read_trace(&path).unwrap();
    assert_eq!(trace.len(), 3);
    assert!((trace.total_time_s - 0.00395).abs() < 1e-15);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_file_reports_path() {
    let path = std::env::temp_dir().join("sf_trace_does_not_exist.json");
    let _ = std::fs::remove_file(&path);
    let err = read_trace(&path).unwrap_err();
    assert!(matches!(err, TraceError::Read { .. }));
    assert!(err.to_string().contains("sf_trace_does_not_exist"));
}

fn trace_json(blocks: &[(u32, i64, f64, bool)], total: f64) -> String {
    let blocks: Vec<String> = blocks
        .iter()
        .map(|(id, ncall, time, nonlinear)| {
            let kind = if *nonlinear { "nonlinear" } else { "linear" };
            format!(r#"{{"id":{id},"ncall":{ncall},"time":{time},"kind":"{kind}"}}"#)
        })
        .collect();
    format!(
        r#"{{"totalTime":{total},"profileBlocks":[{}]}}"#,
        blocks.join(",")
    )
}

proptest! {
    #[test]
    fn selection_is_sorted_and_above_threshold(
        fractions in prop::collection::vec((0.0f64..=1.0, any::<bool>()), 0..40),
        threshold in 0.0f64..=1.0,
    ) {
        let total = 10.0;
        let blocks: Vec<(u32, i64, f64, bool)> = fractions
            .iter()
            .enumerate()
            .map(|(i, (f, nl))| (i as u32, 1, f * total, *nl))
            .collect();
        let trace = parse_trace(&trace_json(&blocks, total)).unwrap();
        let selected = select(trace.records(), threshold).unwrap();

        for pair in selected.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.fraction_of_total() >= b.fraction_of_total());
            if a.fraction_of_total() == b.fraction_of_total() {
                prop_assert!(a.id < b.id);
            }
        }
        for record in &selected {
            prop_assert!(record.fraction_of_total() >= threshold);
            prop_assert!(record.is_nonlinear());
            prop_assert!((0.0..=1.0).contains(&record.fraction_of_total()));
        }
    }

    #[test]
    fn zero_threshold_keeps_each_nonlinear_record_exactly_once(
        flags in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let blocks: Vec<(u32, i64, f64, bool)> = flags
            .iter()
            .enumerate()
            .map(|(i, nl)| (i as u32, 5, 0.01, *nl))
            .collect();
        let trace = parse_trace(&trace_json(&blocks, 1.0)).unwrap();
        let selected = select(trace.records(), 0.0).unwrap();

        let expected = flags.iter().filter(|nl| **nl).count();
        prop_assert_eq!(selected.len(), expected);
        let mut ids: Vec<EquationId> = selected.iter().map(|r| r.id).collect();
        ids.dedup();
        prop_assert_eq!(ids.len(), expected);
    }
}
