//! Measured Id-Vgs curves, read straight from a raw per-device sheet.
//!
//! The regression sheets are addressed by their de-duplicated header names:
//! the first block carries `vgs ` and `vbs =<b>`, every later block `k` the
//! same quantities as `vgs (V)` / `vgs (V).<k-1>` and `vbs =<b>.<k>`.

use crate::config::family::Polarity;
use crate::config::DeviceConfig;
use crate::error::{MeasError, Result};
use crate::table::Sheet;

#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredRow {
    /// Gate voltage in the physical sign convention.
    pub vgs: f64,
    /// Drain current, one entry per body bias.
    pub ids: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredCurve {
    pub width: f64,
    pub length: f64,
    pub temp: i32,
    pub rows: Vec<MeasuredRow>,
}

impl MeasuredCurve {
    /// Start, stop and increment of the gate sweep, in measured order.
    pub fn vgs_sweep(&self) -> Option<(f64, f64, f64)> {
        let first = self.rows.first()?.vgs;
        let second = self.rows.get(1)?.vgs;
        let last = self.rows.last()?.vgs;
        Some((first, last, second - first))
    }
}

/// Names of the sweep column and the body-bias columns of raw block `block`.
pub fn block_columns(polarity: Polarity, block: usize, vbs: &[f64]) -> (String, Vec<String>) {
    let prefix = polarity.prefix();
    let sweep = match block {
        0 => format!("{prefix}vgs "),
        1 => format!("{prefix}vgs (V)"),
        k => format!("{prefix}vgs (V).{}", k - 1),
    };
    let biases = vbs
        .iter()
        .map(|b| match block {
            0 => format!("vbs ={b}"),
            k => format!("vbs ={b}.{k}"),
        })
        .collect();
    (sweep, biases)
}

/// Reads the rows of one raw block. Rows with any empty cell are dropped.
fn read_block(
    sheet: &Sheet,
    polarity: Polarity,
    block: usize,
    vbs: &[f64],
) -> Result<Vec<MeasuredRow>> {
    let (sweep, biases) = block_columns(polarity, block, vbs);
    let sweep = sheet.require_mangled(&sweep)?;
    let biases = biases
        .iter()
        .map(|name| sheet.require_mangled(name))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::new();
    'rows: for row in 0..sheet.num_rows() {
        let vgs = match sheet.cell(row, sweep).as_f64() {
            Some(vgs) => vgs,
            None => continue,
        };
        let mut ids = Vec::with_capacity(biases.len());
        for &col in biases.iter() {
            match sheet.cell(row, col).as_f64() {
                Some(id) => ids.push(id),
                None => continue 'rows,
            }
        }
        rows.push(MeasuredRow {
            vgs: vgs * polarity.sign(),
            ids,
        });
    }
    Ok(rows)
}

/// Extracts one measured curve per variation.
///
/// Variation `i` takes its geometry from row `i` of the `W (um)`/`L (um)`
/// columns and its data from raw block `2i`.
pub fn extract_measured(
    sheet: &Sheet,
    device: &DeviceConfig,
    temps: &[i32],
) -> Result<Vec<MeasuredCurve>> {
    let width_col = sheet.require("W (um)")?;
    let length_col = sheet.require("L (um)")?;
    let count = sheet.count_non_empty(length_col);
    if temps.len() != count {
        return Err(MeasError::TierMismatch {
            expected: temps.len(),
            found: count,
        });
    }

    let polarity = device.polarity();
    temps
        .iter()
        .enumerate()
        .map(|(i, &temp)| {
            let attr = |col: usize| {
                sheet
                    .cell(i, col)
                    .as_f64()
                    .ok_or_else(|| MeasError::InvalidCell {
                        column: sheet.header(col).to_string(),
                        row: i,
                        reason: "missing device geometry".to_string(),
                    })
            };
            Ok(MeasuredCurve {
                width: attr(width_col)?,
                length: attr(length_col)?,
                temp,
                rows: read_block(sheet, polarity, 2 * i, &device.vbs)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    #[test]
    fn test_block_columns() {
        let vbs = [0.0, -0.825, -3.0];
        let (sweep, biases) = block_columns(Polarity::N, 0, &vbs);
        assert_eq!(sweep, "vgs ");
        assert_eq!(biases, vec!["vbs =0", "vbs =-0.825", "vbs =-3"]);

        let (sweep, biases) = block_columns(Polarity::P, 1, &vbs);
        assert_eq!(sweep, "-vgs (V)");
        assert_eq!(biases[1], "vbs =-0.825.1");

        let (sweep, biases) = block_columns(Polarity::N, 4, &vbs);
        assert_eq!(sweep, "vgs (V).3");
        assert_eq!(biases[2], "vbs =-3.4");
    }

    #[test]
    fn test_extract_measured() {
        let mut headers = vec!["W (um)", "L (um)", "-vgs ", "vbs =0", "vbs =1.5"];
        for _ in 1..4 {
            headers.extend(["-vgs (V)", "vbs =0", "vbs =1.5"]);
        }
        let headers = headers.into_iter().map(String::from).collect::<Vec<_>>();

        let row = |w: Cell, l: Cell, vgs: f64, base: f64| {
            let mut r = vec![w, l];
            for k in 0..4 {
                let k = k as f64;
                r.push(vgs.into());
                r.push((base + k).into());
                r.push((base + k + 10.0).into());
            }
            r
        };
        let mut rows = vec![
            row(1.0.into(), 0.5.into(), 0.0, 1.0),
            row(2.0.into(), 0.6.into(), 0.5, 2.0),
        ];
        rows[1][4] = Cell::Empty;
        let sheet = Sheet::new("s", headers, rows);

        let device = DeviceConfig::new("pfet_03v3_iv", &[0.0, 1.5]);
        let curves = extract_measured(&sheet, &device, &[25, -40]).unwrap();
        assert_eq!(curves.len(), 2);

        // The empty cell only drops a row of block 0.
        assert_eq!(curves[0].rows.len(), 1);
        assert_eq!(curves[0].rows[0].vgs, -0.0);
        assert_eq!(curves[1].width, 2.0);
        assert_eq!(curves[1].temp, -40);
        assert_eq!(curves[1].rows.len(), 2);
        assert_eq!(
            curves[1].rows[1],
            MeasuredRow {
                vgs: -0.5,
                ids: vec![4.0, 14.0]
            }
        );
        assert_eq!(curves[1].vgs_sweep(), Some((-0.0, -0.5, -0.5)));

        assert!(extract_measured(&sheet, &device, &[25]).is_err());
    }
}
