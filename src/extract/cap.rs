//! MOS and MIM capacitor C-V sheets.
//!
//! Each block holds a junction-voltage column followed by one capacitance
//! column per process corner; the corner is the stacked column's header.
//! Device name and geometry come from a label column, one label per block.

use arcstr::ArcStr;

use crate::config::family::CapLayout;
use crate::error::{MeasError, Result};
use crate::extract::reshape::{split_blocks, stack_columns, SweepRange};
use crate::table::Sheet;

#[derive(Debug, Clone, PartialEq)]
pub struct CapLabel {
    pub device_name: ArcStr,
    pub width: f64,
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapPoint {
    pub device_name: ArcStr,
    pub width: f64,
    pub length: f64,
    pub corner: ArcStr,
    pub temp: i32,
    pub vj: f64,
    pub cj: f64,
    pub sweeps: ArcStr,
}

/// Maps foundry device names onto model names, e.g. `nmoscap_3p3` to
/// `cap_nmos_03v3`.
pub fn normalize_device_name(name: &str) -> String {
    name.replace("nmoscap", "cap_nmos")
        .replace("pmoscap", "cap_pmos")
        .replace("mimcap", "cap_mim")
        .replace("3p3", "03v3")
        .replace("6p0", "06v0")
}

/// Parses a label such as `"nmoscap_3p3\n(50u x50u )"`.
pub fn parse_label(label: &str) -> Option<CapLabel> {
    let (name, geometry) = label.split_once('\n')?;
    let (w, l) = geometry.split_once('x')?;
    let dims = |s: &str| -> Option<f64> {
        s.replace(['(', ')', 'u'], "").trim().parse().ok()
    };
    Some(CapLabel {
        device_name: ArcStr::from(normalize_device_name(name.trim())),
        width: dims(w)?,
        length: dims(l)?,
    })
}

pub fn extract_caps(sheet: &Sheet, layout: &CapLayout) -> Result<Vec<CapPoint>> {
    let sheet = sheet
        .drop_empty_columns()
        .drop_unwanted(&layout.unwanted.exact, &layout.unwanted.containing);

    let count = layout.tiers.total();
    let temps = layout.tiers.assign(count)?;

    let label_col = sheet.require(&layout.label_column)?;
    let labels = (0..count)
        .map(|row| {
            let cell = sheet.cell(row, label_col);
            cell.as_text()
                .as_deref()
                .and_then(parse_label)
                .ok_or_else(|| MeasError::InvalidCell {
                    column: layout.label_column.clone(),
                    row,
                    reason: format!("expected `<device>\\n(<W>u x<L>u )`, found {cell:?}"),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let data = sheet.retain_columns(|_, h| h != layout.label_column && h != layout.corner_column);
    let blocks = split_blocks(&data, count)?;

    let mut points = Vec::new();
    for ((block, label), temp) in blocks.iter().zip(labels).zip(temps) {
        let block = &block.sheet;
        let vj = block.require(&layout.sweep_column)?;
        let corners = (0..block.num_cols()).filter(|&c| c != vj).collect::<Vec<_>>();
        let stacked = stack_columns(block, vj, &corners)?;

        let range = SweepRange::new(
            stacked.iter().map(|s| s.key),
            (block.cell(0, vj).as_f64(), block.cell(1, vj).as_f64()),
        );
        let sweeps = ArcStr::from(format!("{} {range}", layout.sweep_column));

        points.extend(stacked.into_iter().map(|s| CapPoint {
            device_name: label.device_name.clone(),
            width: label.width,
            length: label.length,
            corner: ArcStr::from(s.label),
            temp,
            vj: s.key,
            cj: s.value,
            sweeps: sweeps.clone(),
        }));
    }

    log::info!("Length of all data points {}", points.len());
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::family::TempTiers;
    use crate::table::Cell;

    #[test]
    fn test_parse_label() {
        let label = parse_label("nmoscap_3p3\n(50u x50u )").unwrap();
        assert_eq!(label.device_name, "cap_nmos_03v3");
        assert_eq!(label.width, 50.0);
        assert_eq!(label.length, 50.0);

        let label = parse_label("pmoscap_6p0_b\n(1u x50u )").unwrap();
        assert_eq!(label.device_name, "cap_pmos_06v0_b");
        assert_eq!(label.width, 1.0);

        assert!(parse_label("nmoscap_3p3 (50u x50u )").is_none());
    }

    #[test]
    fn test_extract_caps() {
        let layout = CapLayout {
            tiers: TempTiers::uniform(&[25, 175], 1),
            ..CapLayout::default()
        };
        let headers = [
            "w",
            "l",
            "",
            "corners",
            "Vj",
            "typical",
            "ff",
            "Vj",
            "typical",
            "ff",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let row = |label: Cell, vj: f64| {
            vec![
                1.0.into(),
                1.0.into(),
                label,
                "typical".into(),
                vj.into(),
                (vj + 1.0).into(),
                (vj + 2.0).into(),
                vj.into(),
                (vj + 3.0).into(),
                if vj < 1.0 {
                    (vj + 4.0).into()
                } else {
                    Cell::Empty
                },
            ]
        };
        let sheet = Sheet::new(
            "cap",
            headers,
            vec![
                row(Cell::Text("nmoscap_3p3\n(50u x50u )".into()), -1.0),
                row(Cell::Text("mimcap_6p0\n(1u x1u )".into()), 0.0),
                row(Cell::Empty, 1.0),
            ],
        );

        let points = extract_caps(&sheet, &layout).unwrap();
        let first = points.iter().filter(|p| p.temp == 25).count();
        assert_eq!(first, 6);
        assert_eq!(points.len(), 11);

        assert!(points[..6].iter().all(|p| p.device_name == "cap_nmos_03v3"));
        assert!(points[6..].iter().all(|p| p.device_name == "cap_mim_06v0"));
        assert_eq!(points[1].corner, "ff");
        assert_eq!(points[1].cj, 1.0);
        assert_eq!(points[0].sweeps, "Vj -1.0 1.0 1.0");
        assert_eq!(points[10].corner, "typical");
        assert_eq!(points[10].cj, 4.0);
    }
}
