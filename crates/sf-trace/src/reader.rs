//! Profiling trace reader.
//!
//! Parses the simulator's per-equation profiling output and validates it
//! before anything downstream sees a record.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use sf_core::{EquationId, Tolerances, fraction_of};

use crate::error::{TraceError, TraceResult};
use crate::record::{EquationKind, EquationRecord, ProfileTrace};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrace {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    total_time: Option<f64>,
    #[serde(default)]
    profile_blocks: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
    id: EquationId,
    ncall: i64,
    time: f64,
    #[serde(default)]
    max_time: Option<f64>,
    #[serde(default)]
    kind: EquationKind,
}

/// Read and validate a profiling trace from disk.
pub fn read_trace(path: &Path) -> TraceResult<ProfileTrace> {
    let content = std::fs::read_to_string(path).map_err(|source| TraceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(&content)
}

/// Parse and validate a profiling trace held in memory.
pub fn parse_trace(content: &str) -> TraceResult<ProfileTrace> {
    let raw: RawTrace = serde_json::from_str(content)?;

    let total_time_s = raw.total_time.ok_or_else(|| TraceError::Malformed {
        reason: "missing totalTime".to_string(),
    })?;
    if !total_time_s.is_finite() || total_time_s <= 0.0 {
        return Err(TraceError::Malformed {
            reason: format!("totalTime must be positive and finite, got {total_time_s}"),
        });
    }

    let tol = Tolerances::default();
    let mut records = BTreeMap::new();
    for block in raw.profile_blocks {
        let id = block.id;
        if block.ncall < 0 {
            return Err(TraceError::MalformedBlock {
                id,
                reason: format!("negative call count {}", block.ncall),
            });
        }
        if !block.time.is_finite() || block.time < 0.0 {
            return Err(TraceError::MalformedBlock {
                id,
                reason: format!("invalid cumulative time {}", block.time),
            });
        }
        if let Some(max) = block.max_time
            && (!max.is_finite() || max < 0.0)
        {
            return Err(TraceError::MalformedBlock {
                id,
                reason: format!("invalid maxTime {max}"),
            });
        }

        let fraction =
            fraction_of(block.time, total_time_s, tol).map_err(|e| TraceError::MalformedBlock {
                id,
                reason: e.to_string(),
            })?;

        let record = EquationRecord::new(
            id,
            block.kind,
            block.time,
            block.ncall as u64,
            block.max_time,
            fraction,
        );
        if records.insert(id, record).is_some() {
            return Err(TraceError::MalformedBlock {
                id,
                reason: "duplicate equation id".to_string(),
            });
        }
    }

    tracing::debug!(
        blocks = records.len(),
        total_time_s,
        "parsed profiling trace"
    );

    Ok(ProfileTrace::new(raw.name, total_time_s, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_trace() {
        let trace = parse_trace(
            r#"{"name":"simpleLoop","totalTime":2.0,
                "profileBlocks":[{"id":3,"ncall":10,"time":0.5,"maxTime":0.1,"kind":"linear"}]}"#,
        )
        .unwrap();
        assert_eq!(trace.name.as_deref(), Some("simpleLoop"));
        let record = trace.get(EquationId::new(3)).unwrap();
        assert_eq!(record.call_count, 10);
        assert_eq!(record.kind, EquationKind::Linear);
        assert_eq!(record.max_time_s, Some(0.1));
        assert!((record.fraction_of_total() - 0.25).abs() < 1e-15);
    }

    #[test]
    fn missing_total_time_is_malformed() {
        let err = parse_trace(r#"{"profileBlocks":[]}"#).unwrap_err();
        assert!(matches!(err, TraceError::Malformed { .. }));
        assert!(err.is_malformed());
    }

    #[test]
    fn zero_total_time_is_malformed() {
        let err = parse_trace(r#"{"totalTime":0.0,"profileBlocks":[]}"#).unwrap_err();
        assert!(matches!(err, TraceError::Malformed { .. }));
    }

    #[test]
    fn negative_call_count_is_malformed() {
        let err = parse_trace(
            r#"{"totalTime":1.0,"profileBlocks":[{"id":1,"ncall":-3,"time":0.1}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TraceError::MalformedBlock { .. }));
    }

    #[test]
    fn time_exceeding_total_is_malformed() {
        let err = parse_trace(
            r#"{"totalTime":1.0,"profileBlocks":[{"id":1,"ncall":3,"time":1.5}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TraceError::MalformedBlock { .. }));
    }

    #[test]
    fn duplicate_ids_are_malformed() {
        let err = parse_trace(
            r#"{"totalTime":1.0,"profileBlocks":[
                {"id":1,"ncall":3,"time":0.1},
                {"id":1,"ncall":4,"time":0.2}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TraceError::MalformedBlock { .. }));
    }

    #[test]
    fn garbled_json_is_malformed() {
        let err = parse_trace("{ totalTime: ").unwrap_err();
        assert!(matches!(err, TraceError::Syntax(_)));
        assert!(err.is_malformed());
    }

    #[test]
    fn empty_block_list_is_valid() {
        let trace = parse_trace(r#"{"totalTime":1.0}"#).unwrap();
        assert!(trace.is_empty());
    }
}
