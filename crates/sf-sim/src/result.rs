//! Full-model simulation output.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{SimError, SimResult};

/// Time series of every emitted variable, stored column-wise.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
    columns: Vec<Vec<f64>>,
}

impl SimulationResult {
    /// Build a result from column names and rows (one row per timestep).
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> SimResult<Self> {
        let mut lookup = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if lookup.insert(name.clone(), i).is_some() {
                return Err(SimError::MalformedResult {
                    reason: format!("duplicate column '{name}'"),
                });
            }
        }

        let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != names.len() {
                return Err(SimError::MalformedResult {
                    reason: format!(
                        "row {} has {} values, expected {}",
                        row_idx,
                        row.len(),
                        names.len()
                    ),
                });
            }
            for (col, value) in columns.iter_mut().zip(row) {
                col.push(*value);
            }
        }

        Ok(Self {
            names,
            lookup,
            columns,
        })
    }

    /// Variable names in file order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of emitted timesteps.
    pub fn steps(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// All values of one variable, in time order.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.lookup.get(name).map(|&i| self.columns[i].as_slice())
    }

    /// Time column, when present.
    pub fn time(&self) -> Option<&[f64]> {
        self.column("time")
    }

    /// Time span covered by the result.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let time = self.time()?;
        Some((*time.first()?, *time.last()?))
    }
}

/// Read a CSV result file written by the simulator.
pub fn read_result_csv(path: &Path) -> SimResult<SimulationResult> {
    let content = std::fs::read_to_string(path).map_err(|source| SimError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_result_csv(&content)
}

/// Parse a CSV result: a header of (optionally quoted) variable names followed
/// by one numeric row per timestep.
pub fn parse_result_csv(content: &str) -> SimResult<SimulationResult> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or_else(|| SimError::MalformedResult {
        reason: "empty result file".to_string(),
    })?;
    let names: Vec<String> = split_fields(header)
        .into_iter()
        .map(|field| field.trim().to_string())
        .collect();
    if names.iter().any(String::is_empty) {
        return Err(SimError::MalformedResult {
            reason: "empty column name in header".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (line_no, line) in lines {
        let row = split_fields(line)
            .iter()
            .map(|field| {
                field
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| SimError::MalformedResult {
                        reason: format!("line {}: invalid number '{}'", line_no + 1, field),
                    })
            })
            .collect::<SimResult<Vec<f64>>>()?;
        rows.push(row);
    }

    SimulationResult::from_rows(names, &rows)
}

/// Split one CSV line, honouring double quotes and `""` escapes.
/// A single trailing separator is ignored.
fn split_fields(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.is_empty() || !line.ends_with(',') {
        fields.push(current);
    }
    fields
}
