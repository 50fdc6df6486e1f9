//! Hotspot selection.
//!
//! Keeps the non-linear systems whose share of total simulation time reaches
//! a threshold, slowest first.

use std::cmp::Ordering;

use crate::error::{TraceError, TraceResult};
use crate::record::EquationRecord;

/// Default share of total simulation time a system needs to be a hotspot.
pub const DEFAULT_THRESHOLD: f64 = 0.03;

/// Select hotspots from profiled records.
///
/// Only non-linear systems are considered. The result is sorted by descending
/// `fraction_of_total`, ties broken by ascending id, and every entry satisfies
/// `fraction_of_total >= threshold`. `threshold = 0` keeps every non-linear
/// system. An empty result is not an error.
pub fn select<'a, I>(records: I, threshold: f64) -> TraceResult<Vec<EquationRecord>>
where
    I: IntoIterator<Item = &'a EquationRecord>,
{
    if !(0.0..=1.0).contains(&threshold) {
        return Err(TraceError::InvalidThreshold { threshold });
    }

    let mut hotspots: Vec<EquationRecord> = records
        .into_iter()
        .filter(|r| r.is_nonlinear() && r.fraction_of_total() >= threshold)
        .cloned()
        .collect();

    hotspots.sort_by(|a, b| {
        match b.fraction_of_total().total_cmp(&a.fraction_of_total()) {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        }
    });
    hotspots.dedup_by_key(|r| r.id);

    tracing::debug!(threshold, selected = hotspots.len(), "selected hotspots");
    Ok(hotspots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_trace;

    #[test]
    fn rejects_out_of_range_threshold() {
        let trace = parse_trace(r#"{"totalTime":1.0}"#).unwrap();
        assert!(select(trace.records(), -0.1).is_err());
        assert!(select(trace.records(), 1.5).is_err());
        assert!(select(trace.records(), f64::NAN).is_err());
    }

    #[test]
    fn ties_broken_by_ascending_id() {
        let trace = parse_trace(
            r#"{"totalTime":1.0,"profileBlocks":[
                {"id":9,"ncall":1,"time":0.2},
                {"id":4,"ncall":1,"time":0.2},
                {"id":7,"ncall":1,"time":0.5}]}"#,
        )
        .unwrap();
        let ids: Vec<u32> = select(trace.records(), 0.0)
            .unwrap()
            .iter()
            .map(|r| r.id.get())
            .collect();
        assert_eq!(ids, vec![7, 4, 9]);
    }

    #[test]
    fn skips_linear_and_other_blocks() {
        let trace = parse_trace(
            r#"{"totalTime":1.0,"profileBlocks":[
                {"id":1,"ncall":1,"time":0.4,"kind":"linear"},
                {"id":2,"ncall":1,"time":0.3,"kind":"other"},
                {"id":3,"ncall":1,"time":0.01}]}"#,
        )
        .unwrap();
        let selected = select(trace.records(), 0.0).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id.get(), 3);
    }

    #[test]
    fn nothing_above_threshold_is_empty_not_error() {
        let trace = parse_trace(
            r#"{"totalTime":1.0,"profileBlocks":[{"id":1,"ncall":1,"time":0.001}]}"#,
        )
        .unwrap();
        assert!(select(trace.records(), DEFAULT_THRESHOLD).unwrap().is_empty());
    }
}
