//! Sample matrix text form (`eq_<id>/samples.csv`).
//!
//! Floats are written in shortest round-trip form, so a fixed seed gives
//! byte-identical files.

use std::fmt::Write;

use sf_sampler::TrainingSample;

/// Quote a header field when it contains a separator or quote.
fn header_field(name: &str) -> String {
    if name.contains([',', '"', '\n']) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

pub fn write_samples<'a>(
    columns: impl IntoIterator<Item = &'a str>,
    samples: &[TrainingSample],
) -> String {
    let mut out = columns
        .into_iter()
        .map(header_field)
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');
    for sample in samples {
        for (i, value) in sample.row().enumerate() {
            if i > 0 {
                out.push(',');
            }
            // Writing to a String cannot fail.
            let _ = write!(out, "{value:?}");
        }
        out.push('\n');
    }
    out
}

/// Split a sample matrix back into samples with `input_dim` leading columns.
/// Returns the header and the samples.
pub fn read_samples(
    content: &str,
    input_dim: usize,
) -> Result<(Vec<String>, Vec<TrainingSample>), String> {
    let table = sf_sim::parse_result_csv(content).map_err(|e| e.to_string())?;
    let names = table.names().to_vec();
    if input_dim > names.len() {
        return Err(format!(
            "{} input columns expected, file has {}",
            input_dim,
            names.len()
        ));
    }

    let columns: Vec<&[f64]> = names
        .iter()
        .filter_map(|name| table.column(name))
        .collect();
    let samples = (0..table.steps())
        .map(|row| {
            let values: Vec<f64> = columns.iter().map(|col| col[row]).collect();
            let (inputs, outputs) = values.split_at(input_dim);
            TrainingSample {
                inputs: inputs.to_vec(),
                outputs: outputs.to_vec(),
            }
        })
        .collect();
    Ok((names, samples))
}
