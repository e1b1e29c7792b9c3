//! Output splitting and CSV writing.

use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::config::family::{CapLayout, OutputKind};
use crate::error::Result;
use crate::extract::cap::CapPoint;
use crate::extract::fet::FetPoint;
use crate::paths::{out_meas, out_sweeps};

/// A flat table of formatted cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new<'h>(headers: impl IntoIterator<Item = &'h str>) -> Self {
        Self {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    #[inline]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[inline]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Drops repeated rows, keeping the first occurrence.
    pub fn dedup(self) -> Self {
        Self {
            headers: self.headers,
            rows: self.rows.into_iter().unique().collect(),
        }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in self.rows.iter() {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[inline]
pub(crate) fn fmt_f64(x: f64) -> String {
    format!("{x:?}")
}

pub fn fet_meas_table<'a>(
    points: impl IntoIterator<Item = &'a FetPoint>,
    kind: OutputKind,
) -> CsvTable {
    let mut table = CsvTable::new(vec![
        "W (um)",
        "L (um)",
        "corner",
        "temp",
        "vds",
        "vgs",
        "vbs",
        kind.column(),
    ]);
    for p in points.into_iter().filter(|p| p.output == kind) {
        let v = &p.variation;
        table.push(vec![
            fmt_f64(v.width),
            fmt_f64(v.length),
            v.corner.to_string(),
            v.temp.to_string(),
            fmt_f64(p.vds),
            fmt_f64(p.vgs),
            fmt_f64(p.vbs),
            fmt_f64(p.value),
        ]);
    }
    table.dedup()
}

pub fn fet_sweeps_table<'a>(
    points: impl IntoIterator<Item = &'a FetPoint>,
    kind: OutputKind,
) -> CsvTable {
    let mut table = CsvTable::new(vec![
        "W (um)",
        "L (um)",
        "corner",
        "temp",
        "const_var",
        "const_var_val",
        "sweeps",
    ]);
    for p in points.into_iter().filter(|p| p.output == kind) {
        let v = &p.variation;
        table.push(vec![
            fmt_f64(v.width),
            fmt_f64(v.length),
            v.corner.to_string(),
            v.temp.to_string(),
            p.const_var.to_string(),
            fmt_f64(p.const_var_val),
            p.sweeps.to_string(),
        ]);
    }
    table.dedup()
}

/// Writes one measurement and one sweep file per output kind.
pub fn write_fet_outputs(
    points: &[FetPoint],
    device: &str,
    outputs: &[OutputKind],
    out_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let out_dir = out_dir.as_ref();
    let mut written = Vec::with_capacity(2 * outputs.len());
    for &kind in outputs {
        let meas = fet_meas_table(points, kind);
        let sweeps = fet_sweeps_table(points, kind);

        let meas_path = out_meas(out_dir, device, kind.file_tag());
        meas.write(&meas_path)?;
        log::info!(
            "Full extracted measurement data for {device} at: {:?} ({} rows)",
            meas_path,
            meas.rows().len()
        );

        let sweeps_path = out_sweeps(out_dir, device, kind.file_tag());
        sweeps.write(&sweeps_path)?;
        log::info!(
            "Number of sweep points for {device}: {} at {:?}",
            sweeps.rows().len(),
            sweeps_path
        );

        written.push(meas_path);
        written.push(sweeps_path);
    }
    Ok(written)
}

/// `sweep_column` and `output_column` name the junction voltage and
/// capacitance columns.
pub fn cap_meas_table(points: &[CapPoint], sweep_column: &str, output_column: &str) -> CsvTable {
    let mut table = CsvTable::new(vec![
        "device_name",
        "W (um)",
        "L (um)",
        "corner",
        "temp",
        sweep_column,
        output_column,
    ]);
    for p in points {
        table.push(vec![
            p.device_name.to_string(),
            fmt_f64(p.width),
            fmt_f64(p.length),
            p.corner.to_string(),
            p.temp.to_string(),
            fmt_f64(p.vj),
            fmt_f64(p.cj),
        ]);
    }
    table.dedup()
}

pub fn cap_sweeps_table(points: &[CapPoint]) -> CsvTable {
    let mut table = CsvTable::new(vec![
        "device_name",
        "W (um)",
        "L (um)",
        "corner",
        "temp",
        "sweeps",
    ]);
    for p in points {
        table.push(vec![
            p.device_name.to_string(),
            fmt_f64(p.width),
            fmt_f64(p.length),
            p.corner.to_string(),
            p.temp.to_string(),
            p.sweeps.to_string(),
        ]);
    }
    table.dedup()
}

pub fn write_cap_outputs(
    points: &[CapPoint],
    device: &str,
    layout: &CapLayout,
    out_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let out_dir = out_dir.as_ref();
    let tag = OutputKind::Cgg.file_tag();

    let meas = cap_meas_table(points, &layout.sweep_column, &layout.output_column);
    let meas_path = out_meas(out_dir, device, tag);
    meas.write(&meas_path)?;
    log::info!(
        "Full extracted measurement data for {device} at: {:?} ({} rows)",
        meas_path,
        meas.rows().len()
    );

    let sweeps_path = out_sweeps(out_dir, device, tag);
    cap_sweeps_table(points).write(&sweeps_path)?;

    Ok(vec![meas_path, sweeps_path])
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use arcstr::ArcStr;

    use super::*;
    use crate::config::family::BiasVar;
    use crate::extract::fet::Variation;

    fn point(output: OutputKind, vgs: f64, value: f64) -> FetPoint {
        FetPoint {
            variation: Variation {
                width: 10.0,
                length: 0.28,
                corner: ArcStr::from("typical"),
                temp: 25,
            },
            vds: 0.05,
            vgs,
            vbs: 0.0,
            output,
            value,
            const_var: BiasVar::Vds,
            const_var_val: 0.05,
            sweeps: ArcStr::from("vgs 0.0 1.0 0.5 vbs 0.0 0.0 0.0"),
        }
    }

    #[test]
    fn test_split_by_output() {
        let points = vec![
            point(OutputKind::Id, 0.0, 1e-6),
            point(OutputKind::Rds, 0.0, 100.0),
            point(OutputKind::Id, 0.0, 1e-6),
            point(OutputKind::Id, 0.5, 2e-6),
        ];

        let id = fet_meas_table(&points, OutputKind::Id);
        assert_eq!(id.headers().last().map(String::as_str), Some("id"));
        assert_eq!(id.rows().len(), 2);
        assert!(id.headers().iter().all(|h| *h != "rds"));

        let rds = fet_meas_table(&points, OutputKind::Rds);
        assert_eq!(rds.rows().len(), 1);
        assert_eq!(rds.rows()[0].last().map(String::as_str), Some("100.0"));

        let sweeps = fet_sweeps_table(&points, OutputKind::Id);
        assert_eq!(sweeps.rows().len(), 1);
        assert_eq!(sweeps.rows()[0][4], "vds");
    }

    #[test]
    fn test_split_outputs_rejoin_to_combined() {
        let kinds = [OutputKind::Id, OutputKind::Rds];
        let points = vec![
            point(OutputKind::Id, 0.0, 1e-6),
            point(OutputKind::Id, 0.5, 2e-6),
            point(OutputKind::Rds, 0.0, 100.0),
            point(OutputKind::Rds, 1.0, 50.0),
            point(OutputKind::Rds, 1.0, 50.0),
        ];

        // One column per output kind; a record fills exactly one of them.
        let combined = points
            .iter()
            .map(|p| {
                let v = &p.variation;
                let mut record = vec![
                    fmt_f64(v.width),
                    fmt_f64(v.length),
                    v.corner.to_string(),
                    v.temp.to_string(),
                    fmt_f64(p.vds),
                    fmt_f64(p.vgs),
                    fmt_f64(p.vbs),
                ];
                record.extend(kinds.iter().map(|&k| {
                    if p.output == k {
                        fmt_f64(p.value)
                    } else {
                        String::new()
                    }
                }));
                record
            })
            .collect::<BTreeSet<_>>();
        for record in combined.iter() {
            assert_eq!(record[7..].iter().filter(|c| !c.is_empty()).count(), 1);
        }

        // Outer join of the per-kind tables.
        let mut rejoined = BTreeSet::new();
        for (k, &kind) in kinds.iter().enumerate() {
            for row in fet_meas_table(&points, kind).rows() {
                let (key, value) = row.split_at(7);
                let mut record = key.to_vec();
                record.extend((0..kinds.len()).map(|j| {
                    if j == k {
                        value[0].clone()
                    } else {
                        String::new()
                    }
                }));
                rejoined.insert(record);
            }
        }
        assert_eq!(rejoined, combined);
    }

    #[test]
    fn test_cap_columns_follow_layout() {
        let points = vec![CapPoint {
            device_name: ArcStr::from("cap_mim_06v0"),
            width: 1.0,
            length: 1.0,
            corner: ArcStr::from("typical"),
            temp: 25,
            vj: -1.0,
            cj: 2.0,
            sweeps: ArcStr::from("Vj -1.0 1.0 1.0"),
        }];
        let table = cap_meas_table(&points, "Vj", "Cj (fF)");
        assert_eq!(
            table.headers(),
            &["device_name", "W (um)", "L (um)", "corner", "temp", "Vj", "Cj (fF)"]
        );
        assert_eq!(table.rows()[0][6], "2.0");
    }

    #[test]
    fn test_write_fet_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let points = vec![
            point(OutputKind::Id, 0.0, 1e-6),
            point(OutputKind::Rds, 0.0, 100.0),
        ];
        let written = write_fet_outputs(
            &points,
            "nfet_03v3",
            &[OutputKind::Id, OutputKind::Rds],
            dir.path(),
        )
        .unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.exists()));

        let text = std::fs::read_to_string(dir.path().join("nfet_03v3_meas_rds.csv")).unwrap();
        assert_eq!(
            text,
            "W (um),L (um),corner,temp,vds,vgs,vbs,rds\n10.0,0.28,typical,25,0.05,0.0,0.0,100.0\n"
        );
    }
}
