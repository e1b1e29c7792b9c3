//! Percentage error between measured and simulated curves.

use std::path::Path;

use approx::relative_eq;

use crate::extract::writer::fmt_f64;
use crate::regression::measured::MeasuredCurve;
use crate::regression::simulated::SimulatedRow;
use crate::Result;

/// Absolute tolerance when matching sweep points, in volts.
pub const VGS_EPSILON: f64 = 1e-9;
/// Relative tolerance when matching sweep points.
pub const VGS_MAX_RELATIVE: f64 = 1e-6;

/// Error of a single sample, in percent of the measured value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StepError {
    Value(f64),
    /// The measured value is zero (or not finite), so no relative error
    /// exists.
    Undefined,
}

impl StepError {
    #[inline]
    pub fn value(self) -> Option<f64> {
        match self {
            StepError::Value(x) => Some(x),
            StepError::Undefined => None,
        }
    }
}

pub fn step_error(measured: f64, simulated: f64) -> StepError {
    if measured == 0.0 || !measured.is_finite() || !simulated.is_finite() {
        StepError::Undefined
    } else {
        StepError::Value((measured - simulated).abs() * 100.0 / measured)
    }
}

/// Mean of the sample errors of a row. Undefined if any sample is.
pub fn row_error(steps: &[StepError]) -> Option<f64> {
    if steps.is_empty() {
        return None;
    }
    let sum = steps
        .iter()
        .map(|s| s.value())
        .sum::<Option<f64>>()?;
    Some(sum.abs() / steps.len() as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRow {
    pub width: f64,
    pub length: f64,
    pub temp: i32,
    pub vgs: f64,
    pub simulated: Vec<f64>,
    pub measured: Vec<f64>,
    pub steps: Vec<StepError>,
    pub error: Option<f64>,
}

/// Joins simulated and measured rows on the gate voltage and computes the
/// error of every matched row. Simulated points without a measured
/// counterpart are not compared.
pub fn compare_curve(measured: &MeasuredCurve, simulated: &[SimulatedRow]) -> Vec<ErrorRow> {
    simulated
        .iter()
        .filter_map(|sim| {
            let meas = measured.rows.iter().find(|m| {
                relative_eq!(
                    m.vgs,
                    sim.vgs,
                    epsilon = VGS_EPSILON,
                    max_relative = VGS_MAX_RELATIVE
                )
            })?;
            let steps = meas
                .ids
                .iter()
                .zip(sim.ids.iter())
                .map(|(&m, &s)| step_error(m, s))
                .collect::<Vec<_>>();
            Some(ErrorRow {
                width: measured.width,
                length: measured.length,
                temp: measured.temp,
                vgs: sim.vgs,
                simulated: sim.ids.clone(),
                measured: meas.ids.clone(),
                error: row_error(&steps),
                steps,
            })
        })
        .collect()
}

pub fn write_error_analysis(
    path: impl AsRef<Path>,
    rows: &[ErrorRow],
    num_biases: usize,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![
        "W (um)".to_string(),
        "L (um)".to_string(),
        "temp".to_string(),
        "vgs".to_string(),
    ];
    header.extend((1..=num_biases).map(|j| format!("vb{j}")));
    header.extend((1..=num_biases).map(|j| format!("measured_vbs{j}")));
    header.extend((1..=num_biases).map(|j| format!("step{j}_error")));
    header.push("error".to_string());
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            fmt_f64(row.width),
            fmt_f64(row.length),
            row.temp.to_string(),
            fmt_f64(row.vgs),
        ];
        record.extend(padded(&row.simulated, num_biases));
        record.extend(padded(&row.measured, num_biases));
        record.extend((0..num_biases).map(|j| opt(row.steps.get(j).and_then(|s| s.value()))));
        record.push(opt(row.error));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn opt(x: Option<f64>) -> String {
    x.map(fmt_f64).unwrap_or_default()
}

/// `values` formatted into exactly `n` cells, empty past the end.
fn padded(values: &[f64], n: usize) -> impl Iterator<Item = String> + '_ {
    (0..n).map(move |j| opt(values.get(j).copied()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::measured::MeasuredRow;

    #[test]
    fn test_step_error() {
        assert_eq!(step_error(100.0, 105.0), StepError::Value(5.0));
        assert_eq!(step_error(0.0, 1e-9), StepError::Undefined);
    }

    #[test]
    fn test_row_error() {
        let steps = [0.0, 0.0, 0.0, 0.0, 10.0].map(StepError::Value);
        assert_eq!(row_error(&steps), Some(2.0));
        assert_eq!(
            row_error(&[StepError::Value(1.0), StepError::Undefined]),
            None
        );
        assert_eq!(row_error(&[]), None);
    }

    #[test]
    fn test_compare_joins_on_vgs() {
        let measured = MeasuredCurve {
            width: 10.0,
            length: 0.28,
            temp: 25,
            rows: vec![
                MeasuredRow {
                    vgs: 0.1,
                    ids: vec![100.0, 0.0],
                },
                MeasuredRow {
                    vgs: 0.2,
                    ids: vec![100.0, 200.0],
                },
            ],
        };
        let simulated = vec![
            SimulatedRow {
                vgs: 0.0,
                ids: vec![1.0, 1.0],
            },
            SimulatedRow {
                vgs: 0.1 + 1e-12,
                ids: vec![105.0, 1.0],
            },
            SimulatedRow {
                vgs: 0.2,
                ids: vec![95.0, 190.0],
            },
        ];

        let rows = compare_curve(&measured, &simulated);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].steps[1], StepError::Undefined);
        assert_eq!(rows[0].error, None);
        assert_eq!(rows[1].error, Some(5.0));
    }

    #[test]
    fn test_write_error_analysis_pads_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error_analysis.csv");
        let rows = vec![ErrorRow {
            width: 10.0,
            length: 0.28,
            temp: 25,
            vgs: 0.5,
            simulated: vec![105.0, 1.0],
            measured: vec![100.0],
            steps: vec![StepError::Value(5.0), StepError::Undefined],
            error: None,
        }];
        write_error_analysis(&path, &rows, 2).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0].split(',').collect::<Vec<_>>(),
            vec![
                "W (um)",
                "L (um)",
                "temp",
                "vgs",
                "vb1",
                "vb2",
                "measured_vbs1",
                "measured_vbs2",
                "step1_error",
                "step2_error",
                "error",
            ]
        );
        assert_eq!(lines[1], "10.0,0.28,25,0.5,105.0,1.0,100.0,,5.0,,");
    }
}
