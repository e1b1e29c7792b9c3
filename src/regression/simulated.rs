use std::path::Path;

use anyhow::{bail, Context};

use crate::extract::writer::fmt_f64;
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedRow {
    pub vgs: f64,
    /// Simulated drain current, one entry per body bias.
    pub ids: Vec<f64>,
}

/// Reshapes raw simulator output into one row per gate voltage.
///
/// The input holds whitespace-separated `vgs id` pairs, the full gate sweep
/// of the first body bias followed by the sweep of the next, and so on.
pub fn parse_sweeps(text: &str, num_biases: usize) -> Result<Vec<SimulatedRow>> {
    let pairs = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let mut fields = line.split_whitespace().map(str::parse::<f64>);
            match (fields.next(), fields.next()) {
                (Some(Ok(x)), Some(Ok(y))) => Ok((x, y)),
                _ => bail!("malformed simulator output on line {}: `{line}`", i + 1),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    if pairs.is_empty() || num_biases == 0 || pairs.len() % num_biases != 0 {
        bail!(
            "{} simulated points cannot be split into {num_biases} sweeps",
            pairs.len()
        );
    }

    let sweep = pairs.len() / num_biases;
    Ok((0..sweep)
        .map(|i| SimulatedRow {
            vgs: pairs[i].0,
            ids: (0..num_biases).map(|j| pairs[j * sweep + i].1).collect(),
        })
        .collect())
}

/// Reads a raw result file and rewrites it in place as a `vgs,vb1..vbN` CSV.
pub fn reshape_result(path: impl AsRef<Path>, num_biases: usize) -> Result<Vec<SimulatedRow>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).with_context(|| format!("no results in {path:?}"))?;
    let rows = parse_sweeps(&text, num_biases).with_context(|| format!("in {path:?}"))?;
    write_simulated(path, &rows, num_biases)?;
    Ok(rows)
}

pub fn write_simulated(
    path: impl AsRef<Path>,
    rows: &[SimulatedRow],
    num_biases: usize,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["vgs".to_string()];
    header.extend((1..=num_biases).map(|j| format!("vb{j}")));
    writer.write_record(&header)?;
    for row in rows {
        let mut record = vec![fmt_f64(row.vgs)];
        record.extend(row.ids.iter().copied().map(fmt_f64));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
